//! Autonomous OODA trading agent.
//!
//! Runs the observe/orient/decide/act loop over a watchlist:
//! - startup recovery of open positions
//! - portfolio perception and the kill switch
//! - concurrent decision requests per batch of pairs
//! - risk gating, exposure reservation and execution
//! - learning from closed trades

pub mod app;
pub mod config;
pub mod decisions;
pub mod error;
pub mod machine;
pub mod paper;
pub mod provider;
pub mod recovery;
pub mod state;

pub use app::Application;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use machine::{AgentDeps, AgentStateMachine};
pub use state::AgentState;
