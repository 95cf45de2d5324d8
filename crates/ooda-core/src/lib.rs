//! Core domain types for the OODA trading agent.
//!
//! This crate provides the fundamental types shared by every other crate:
//! - `AssetPair`, `Decision`, `TradeAction`: what the decision provider proposes
//! - `Price`, `Size`: precision-safe numeric types
//! - `Pct`: percentage configuration values normalised once at the boundary
//! - `PlatformPosition`, `PortfolioBreakdown`: what the trading venue reports
//! - `DecisionProvider`, `TradingPlatform`, `PortfolioMemory`: collaborator ports

pub mod decimal;
pub mod decision;
pub mod error;
pub mod mock;
pub mod pct;
pub mod ports;
pub mod position;

pub use decimal::{Price, Size};
pub use decision::{AssetPair, Decision, DecisionId, PositionSide, TradeAction};
pub use error::{CoreError, Result};
pub use pct::{normalize_pct, Pct};
pub use ports::{
    BoxFuture, DecisionProvider, DynDecisionProvider, DynPortfolioMemory, DynTradingPlatform,
    PortfolioMemory, TradingPlatform,
};
pub use position::{
    ExecutionReport, ExitReason, MarketStats, OrderStatus, OutcomeSource, PairCorrelation,
    PlatformPosition, PortfolioBreakdown, RawFuturesPosition, TradeOutcome,
};
