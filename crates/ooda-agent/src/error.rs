//! Application error types.

use thiserror::Error;

use crate::state::AgentState;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// Fatal: the transition table was violated.
    #[error("Illegal state transition: {from} -> {to}")]
    IllegalTransition { from: AgentState, to: AgentState },

    #[error("Core error: {0}")]
    Core(#[from] ooda_core::CoreError),

    #[error("Risk error: {0}")]
    Risk(#[from] ooda_risk::RiskError),

    #[error("Executor error: {0}")]
    Executor(#[from] ooda_executor::ExecutorError),

    #[error("Position error: {0}")]
    Position(#[from] ooda_position::PositionError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] ooda_telemetry::TelemetryError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] ooda_persistence::PersistenceError),

    #[error("Dashboard error: {0}")]
    Dashboard(#[from] ooda_dashboard::DashboardError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Shutdown requested")]
    Shutdown,
}

impl AppError {
    /// Errors that end the run loop instead of abandoning one cycle.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::IllegalTransition { .. } | AppError::Config(_))
    }
}

pub type AppResult<T> = Result<T, AppError>;
