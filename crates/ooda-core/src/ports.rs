//! Collaborator ports.
//!
//! The agent talks to the outside world only through these traits:
//! - `DecisionProvider`: proposes a decision per asset pair
//! - `TradingPlatform`: portfolio queries, order entry, position closes
//! - `PortfolioMemory`: receives normalised trade outcomes
//!
//! Methods return `BoxFuture` so the traits stay dyn-compatible and can be
//! shared as `Arc<dyn Trait>` between the agent loop and tracker tasks.

use crate::decision::{AssetPair, Decision};
use crate::error::Result;
use crate::position::{ExecutionReport, OrderStatus, PlatformPosition, PortfolioBreakdown, TradeOutcome};
use std::pin::Pin;
use std::sync::Arc;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Source of trade decisions.
pub trait DecisionProvider: Send + Sync {
    /// Ask for a decision on one asset pair. `Ok(None)` means no opinion.
    fn generate_decision<'a>(
        &'a self,
        asset_pair: &'a AssetPair,
    ) -> BoxFuture<'a, Result<Option<Decision>>>;
}

/// Broker or exchange adapter.
pub trait TradingPlatform: Send + Sync {
    /// Current portfolio value and open futures positions.
    fn get_portfolio_breakdown(&self) -> BoxFuture<'_, Result<PortfolioBreakdown>>;

    /// Submit the order described by `decision`.
    ///
    /// A venue-side refusal is `Ok` with `success = false`; `Err` is reserved
    /// for transport-level failures.
    fn execute_trade<'a>(&'a self, decision: &'a Decision) -> BoxFuture<'a, Result<ExecutionReport>>;

    /// Status of a previously submitted order; `None` if the venue does not know it.
    fn get_order_status<'a>(&'a self, order_id: &'a str) -> BoxFuture<'a, Result<Option<OrderStatus>>>;

    /// Flatten an open position.
    fn close_position<'a>(&'a self, position: &'a PlatformPosition) -> BoxFuture<'a, Result<()>>;
}

/// Long-term store of trade outcomes used for learning.
pub trait PortfolioMemory: Send + Sync {
    fn record_outcome(&self, outcome: TradeOutcome) -> BoxFuture<'_, Result<()>>;
}

pub type DynDecisionProvider = Arc<dyn DecisionProvider>;
pub type DynTradingPlatform = Arc<dyn TradingPlatform>;
pub type DynPortfolioMemory = Arc<dyn PortfolioMemory>;
