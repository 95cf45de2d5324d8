//! Position error types.

use ooda_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PositionError {
    #[error("Platform error: {0}")]
    Platform(#[from] CoreError),

    #[error("Trade monitor is shutting down")]
    ShuttingDown,
}

pub type PositionResult<T> = Result<T, PositionError>;
