//! ooda-dashboard - status surface for the OODA trading agent.
//!
//! - [`DashboardEventQueue`]: bounded, lossy queue of lifecycle events
//!   (a full queue drops the newest event, the producer never blocks)
//! - [`StatusBoard`]: latest [`AgentStatusSnapshot`] published by the agent
//! - [`run_server`]: read-only HTTP server
//!
//! ```text
//! GET /api/status → AgentStatusSnapshot (JSON)
//! GET /metrics    → Prometheus text format
//! GET /ws         → WebSocket stream of DashboardEvent
//! ```
//!
//! A background task drains the event queue every `update_interval_ms`
//! and broadcasts each event to connected WebSocket clients.

mod config;
mod error;
mod events;
mod queue;
mod server;
mod status;

pub use config::DashboardConfig;
pub use error::{DashboardError, DashboardResult};
pub use events::{DashboardEvent, DashboardEventKind};
pub use queue::{DashboardEventQueue, DEFAULT_QUEUE_CAPACITY};
pub use server::{create_router, run_server, serve, DashboardState};
pub use status::{AgentStatusSnapshot, StatusBoard, UnifiedStatus};
