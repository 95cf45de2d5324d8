//! Risk policy for the OODA trading agent.
//!
//! Implements the checks a decision must pass before capital is reserved:
//! - Correlation: no piling into an already-correlated cluster
//! - Concentration: single-pair share of the portfolio within limit
//! - VaR: parametric portfolio Value-at-Risk within limit
//! - Drawdown: projected drawdown from peak within limit
//!
//! Also provides:
//! - KillSwitch: session-level halt on drawdown, gain or loss thresholds
//! - RejectionCache: cooldown that stops a rejected pair being re-proposed

pub mod error;
pub mod gatekeeper;
pub mod kill_switch;
pub mod rejection;

pub use error::{RiskError, RiskResult};
pub use gatekeeper::{
    z_score, GateResult, Holding, PortfolioRiskSnapshot, RiskGatekeeper, RiskGatekeeperConfig,
    RiskVerdict,
};
pub use kill_switch::{KillSwitch, KillSwitchConfig, KillSwitchLatch, KillSwitchReason};
pub use rejection::{RejectionCache, RejectionCacheEntry};
