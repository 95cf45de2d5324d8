//! Position lifecycle tracking for the OODA trading agent.
//!
//! Open positions are watched by a bounded pool of trackers that run beside
//! the agent's control loop and report closed trades back over a queue.
//!
//! # Key Components
//!
//! - [`TradeMonitor`]: detection loop, bounded tracker pool, portfolio
//!   stop-loss / take-profit pause, closed-trade queue
//! - [`TradeTracker`]: watches one position until it closes
//! - [`TradeId`]: content hash of a position's immutable attributes
//! - [`DecisionAssociations`]: expected pair -> originating decision, with TTL
//! - [`classify_exit`]: best-effort exit reason heuristic

pub mod error;
pub mod exit;
pub mod identity;
pub mod monitor;
pub mod tracker;

pub use error::{PositionError, PositionResult};
pub use exit::classify_exit;
pub use identity::{DecisionAssociations, TradeId, DEFAULT_ASSOCIATION_TTL};
pub use monitor::{TradeMonitor, TradeMonitorConfig};
pub use tracker::{TrackedPosition, TradeMetrics, TradeTracker};
