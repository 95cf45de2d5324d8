//! Error types for ooda-core.

use thiserror::Error;

/// Core error types.
///
/// Collaborator failures are classified here so that every crate agrees on
/// what may be retried.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Network or venue hiccup; safe to retry.
    #[error("Transient failure: {0}")]
    Transient(String),

    /// A call did not complete within its deadline; safe to retry.
    #[error("Timed out after {0}ms")]
    Timeout(u64),

    /// The collaborator answered with data that failed validation.
    #[error("Malformed data: {0}")]
    Malformed(String),

    /// The collaborator refused the request.
    #[error("Rejected: {0}")]
    Rejected(String),

    #[error("Invalid decision: {0}")]
    InvalidDecision(String),

    #[error("Invalid asset pair: {0}")]
    InvalidAssetPair(String),

    #[error("Decimal parse error: {0}")]
    DecimalParse(#[from] rust_decimal::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl CoreError {
    /// Check if the error may be retried with backoff.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::Transient(_) | CoreError::Timeout(_))
    }
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
