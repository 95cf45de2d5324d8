//! Execution plumbing for the OODA trading agent.
//!
//! Everything that sits between an approved decision and the venue:
//!
//! - [`ExposureReservationManager`]: reserve / commit / rollback of capital per decision
//! - [`retry_with_backoff`]: bounded, timeout-wrapped retries for collaborator calls
//! - [`PendingOrderTracker`]: fill confirmation with orphan timeout, mirrored to disk
//! - [`WebhookNotifier`]: JSON webhook delivery with exponential backoff

pub mod error;
pub mod exposure;
pub mod pending;
pub mod retry;
pub mod webhook;

pub use error::{ExecutorError, ExecutorResult};
pub use exposure::{
    ExposureConfig, ExposureReservation, ExposureReservationManager, ReservationState,
};
pub use pending::{PendingOrderEntry, PendingOrderOutcome, PendingOrderTracker};
pub use retry::{retry_with_backoff, RetryConfig};
pub use webhook::{
    DeliveryError, ReqwestTransport, WebhookConfig, WebhookDelivery, WebhookNotifier,
    WebhookPayload, WebhookTransport,
};
