//! Bounded retries for collaborator calls.
//!
//! Every external call runs under a per-call timeout. A timeout counts as a
//! retryable failure. Retryable failures back off exponentially
//! (`base * 2^(attempt-1)`, capped) until attempts run out; anything else is
//! returned immediately. The wait between attempts is cancellation-aware.

use std::future::Future;
use std::time::Duration;

use ooda_core::CoreError;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{ExecutorError, ExecutorResult};

/// Retry configuration shared by platform and provider calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Deadline for a single call.
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    10_000
}

fn default_call_timeout_ms() -> u64 {
    10_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            call_timeout_ms: default_call_timeout_ms(),
        }
    }
}

impl RetryConfig {
    /// Delay before retrying after failed attempt number `attempt` (1-based).
    #[must_use]
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        // attempt=1 -> base, attempt=2 -> 2*base, attempt=3 -> 4*base
        let exponent = attempt.saturating_sub(1).min(10);
        let delay = self.base_delay_ms.saturating_mul(1u64 << exponent);
        Duration::from_millis(delay.min(self.max_delay_ms))
    }

    #[must_use]
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

/// Run `call` until it succeeds, fails non-retryably, or attempts run out.
pub async fn retry_with_backoff<T, F, Fut>(
    config: &RetryConfig,
    operation: &str,
    shutdown: &CancellationToken,
    mut call: F,
) -> ExecutorResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CoreError>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        let result = tokio::select! {
            r = tokio::time::timeout(config.call_timeout(), call()) => match r {
                Ok(inner) => inner,
                Err(_) => Err(CoreError::Timeout(config.call_timeout_ms)),
            },
            () = shutdown.cancelled() => {
                return Err(ExecutorError::Cancelled(operation.to_string()));
            }
        };

        let err = match result {
            Ok(value) => {
                if attempt > 1 {
                    debug!(operation, attempt, "Succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) => e,
        };

        if !err.is_retryable() {
            return Err(ExecutorError::NonRetryable {
                operation: operation.to_string(),
                source: err,
            });
        }
        if attempt >= max_attempts {
            warn!(operation, attempts = attempt, error = %err, "Retries exhausted");
            return Err(ExecutorError::RetriesExhausted {
                operation: operation.to_string(),
                attempts: attempt,
                source: err,
            });
        }

        let delay = config.backoff_delay(attempt);
        warn!(
            operation,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Retryable failure, backing off"
        );
        tokio::select! {
            () = tokio::time::sleep(delay) => {}
            () = shutdown.cancelled() => {
                return Err(ExecutorError::Cancelled(operation.to_string()));
            }
        }
    }
}
