//! Executor error types.

use ooda_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("Reservation requires a non-empty decision id")]
    EmptyDecisionId,

    #[error("Decision {0} already has a reservation")]
    AlreadyReserved(String),

    #[error("Exposure limit reached for {asset_pair}: {active} active reservation(s)")]
    PairLimitReached { asset_pair: String, active: usize },

    #[error("{operation} failed after {attempts} attempt(s): {source}")]
    RetriesExhausted {
        operation: String,
        attempts: u32,
        #[source]
        source: CoreError,
    },

    #[error("{operation} failed: {source}")]
    NonRetryable {
        operation: String,
        #[source]
        source: CoreError,
    },

    #[error("Cancelled during {0}")]
    Cancelled(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Persistence error: {0}")]
    Persistence(#[from] ooda_persistence::PersistenceError),
}

pub type ExecutorResult<T> = Result<T, ExecutorError>;
