//! Prometheus metrics and structured logging for the OODA trading agent.
//!
//! - Prometheus metrics for the control loop, risk gates, execution and
//!   position tracking
//! - Structured logging with tracing (JSON in production)

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{init_logging, DEFAULT_LOG_FILTER};
pub use metrics::Metrics;
