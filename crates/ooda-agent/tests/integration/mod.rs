//! Integration tests for ooda-agent.
//!
//! These tests drive the state machine against scripted collaborators:
//! - full OODA cycles from decision to reservation
//! - risk rejections and cooldowns
//! - startup recovery
//! - kill switch halt
//! - webhook delivery

pub mod common;
