//! Pre-trade risk gatekeeper.
//!
//! Every actionable decision is evaluated against the current portfolio
//! before any exposure is reserved. Gates run in a fixed order and the first
//! block wins:
//!
//! 1. correlation - candidate vs. already-held correlated assets
//! 2. concentration - post-trade share of one pair in the portfolio
//! 3. var - parametric portfolio VaR after hypothetically adding the trade
//! 4. drawdown - projected drawdown from peak if the trade loses its VaR
//!
//! The gatekeeper holds configuration only. Each call is evaluated against
//! the snapshot it is given, so one instance is shared for the whole run.

use std::collections::BTreeMap;

use crate::error::{RiskError, RiskResult};
use ooda_core::{AssetPair, Decision, MarketStats, Pct, PlatformPosition, Price};
use serde::{Deserialize, Serialize};
use tracing::trace;

// ============================================================================
// Configuration
// ============================================================================

/// Risk gatekeeper configuration.
///
/// Percentage fields accept `0.05` or `5` notation (see [`Pct`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskGatekeeperConfig {
    /// Absolute correlation above which two assets count as correlated.
    #[serde(default = "default_correlation_threshold")]
    pub correlation_threshold: f64,
    /// Maximum size of a correlated cluster including the candidate.
    #[serde(default = "default_max_correlated_assets")]
    pub max_correlated_assets: usize,
    /// Maximum post-trade share of one pair in the portfolio.
    #[serde(default = "default_max_position_pct")]
    pub max_position_pct: Pct,
    /// Confidence level for VaR (e.g. 95).
    #[serde(default = "default_var_confidence")]
    pub var_confidence: Pct,
    /// Maximum one-day portfolio VaR as a share of portfolio value.
    #[serde(default = "default_max_var_pct")]
    pub max_var_pct: Pct,
    /// Maximum projected drawdown from peak.
    #[serde(default = "default_max_drawdown_percent")]
    pub max_drawdown_percent: Pct,
    /// Daily volatility assumed when the venue reports none for a pair.
    #[serde(default = "default_volatility")]
    pub default_volatility: Pct,
}

fn default_correlation_threshold() -> f64 {
    0.7
}

fn default_max_correlated_assets() -> usize {
    2
}

fn default_max_position_pct() -> Pct {
    Pct::new(25.0)
}

fn default_var_confidence() -> Pct {
    Pct::new(95.0)
}

fn default_max_var_pct() -> Pct {
    Pct::new(5.0)
}

fn default_max_drawdown_percent() -> Pct {
    Pct::new(15.0)
}

fn default_volatility() -> Pct {
    Pct::new(5.0)
}

impl Default for RiskGatekeeperConfig {
    fn default() -> Self {
        Self {
            correlation_threshold: default_correlation_threshold(),
            max_correlated_assets: default_max_correlated_assets(),
            max_position_pct: default_max_position_pct(),
            var_confidence: default_var_confidence(),
            max_var_pct: default_max_var_pct(),
            max_drawdown_percent: default_max_drawdown_percent(),
            default_volatility: default_volatility(),
        }
    }
}

impl RiskGatekeeperConfig {
    /// Reject configurations that would make the gates meaningless.
    pub fn validate(&self) -> RiskResult<()> {
        if !(0.0..=1.0).contains(&self.correlation_threshold) {
            return Err(RiskError::ConfigError(format!(
                "correlation_threshold {} outside [0, 1]",
                self.correlation_threshold
            )));
        }
        let confidence = self.var_confidence.fraction();
        if confidence <= 0.5 || confidence >= 1.0 {
            return Err(RiskError::ConfigError(format!(
                "var_confidence {} outside (50%, 100%)",
                self.var_confidence
            )));
        }
        if self.max_correlated_assets == 0 {
            return Err(RiskError::ConfigError(
                "max_correlated_assets must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Snapshot
// ============================================================================

/// One held exposure.
#[derive(Debug, Clone, PartialEq)]
pub struct Holding {
    pub asset_pair: AssetPair,
    /// Positive long, negative short.
    pub signed_notional: Price,
}

/// Portfolio state a decision is evaluated against.
#[derive(Debug, Clone)]
pub struct PortfolioRiskSnapshot {
    pub total_value: Price,
    /// Highest portfolio value seen this session.
    pub peak_value: Price,
    pub holdings: Vec<Holding>,
    pub stats: MarketStats,
}

impl PortfolioRiskSnapshot {
    /// Build from validated venue positions.
    #[must_use]
    pub fn from_positions(
        total_value: Price,
        peak_value: Price,
        positions: &[PlatformPosition],
        stats: MarketStats,
    ) -> Self {
        Self {
            total_value,
            peak_value,
            holdings: positions
                .iter()
                .map(|p| Holding {
                    asset_pair: p.asset_pair.clone(),
                    signed_notional: p.signed_notional(),
                })
                .collect(),
            stats,
        }
    }

    /// Net signed exposure per pair.
    fn net_exposure(&self) -> BTreeMap<AssetPair, f64> {
        let mut net = BTreeMap::new();
        for h in &self.holdings {
            *net.entry(h.asset_pair.clone()).or_insert(0.0) += h.signed_notional.to_f64();
        }
        net
    }
}

// ============================================================================
// Results
// ============================================================================

/// Result of a single gate.
#[derive(Debug, Clone, PartialEq)]
pub enum GateResult {
    Pass,
    Block(String),
}

impl GateResult {
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }

    pub fn is_block(&self) -> bool {
        matches!(self, Self::Block(_))
    }
}

/// Outcome of `RiskGatekeeper::validate`.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskVerdict {
    pub approved: bool,
    pub reason: String,
    /// Name of the blocking gate, if any.
    pub gate: Option<String>,
}

impl RiskVerdict {
    fn approved(reason: impl Into<String>) -> Self {
        Self {
            approved: true,
            reason: reason.into(),
            gate: None,
        }
    }
}

// ============================================================================
// RiskGatekeeper
// ============================================================================

/// Pre-trade policy evaluator.
#[derive(Debug, Clone)]
pub struct RiskGatekeeper {
    config: RiskGatekeeperConfig,
    z: f64,
}

impl RiskGatekeeper {
    pub fn new(config: RiskGatekeeperConfig) -> RiskResult<Self> {
        config.validate()?;
        let z = z_score(config.var_confidence.fraction());
        Ok(Self { config, z })
    }

    #[must_use]
    pub fn config(&self) -> &RiskGatekeeperConfig {
        &self.config
    }

    /// Evaluate a decision and return `(approved, reason)` as a verdict.
    pub fn validate(&self, decision: &Decision, snapshot: &PortfolioRiskSnapshot) -> RiskVerdict {
        if decision.action.is_hold() {
            return RiskVerdict::approved("HOLD changes no exposure");
        }
        match self.check_all(decision, snapshot) {
            Ok(()) => RiskVerdict::approved("all risk checks passed"),
            Err(RiskError::GateBlocked { gate, reason }) => RiskVerdict {
                approved: false,
                reason,
                gate: Some(gate),
            },
            Err(e) => RiskVerdict {
                approved: false,
                reason: e.to_string(),
                gate: None,
            },
        }
    }

    /// Run every gate in order, returning the first block.
    pub fn check_all(&self, decision: &Decision, snapshot: &PortfolioRiskSnapshot) -> RiskResult<()> {
        let g1 = self.check_correlation(decision, snapshot);
        if let GateResult::Block(reason) = g1 {
            trace!(gate = "correlation", %reason, "decision blocked");
            return Err(RiskError::GateBlocked {
                gate: "correlation".to_string(),
                reason,
            });
        }

        let g2 = self.check_concentration(decision, snapshot);
        if let GateResult::Block(reason) = g2 {
            trace!(gate = "concentration", %reason, "decision blocked");
            return Err(RiskError::GateBlocked {
                gate: "concentration".to_string(),
                reason,
            });
        }

        let g3 = self.check_var(decision, snapshot);
        if let GateResult::Block(reason) = g3 {
            trace!(gate = "var", %reason, "decision blocked");
            return Err(RiskError::GateBlocked {
                gate: "var".to_string(),
                reason,
            });
        }

        let g4 = self.check_drawdown(decision, snapshot);
        if let GateResult::Block(reason) = g4 {
            trace!(gate = "drawdown", %reason, "decision blocked");
            return Err(RiskError::GateBlocked {
                gate: "drawdown".to_string(),
                reason,
            });
        }

        Ok(())
    }

    /// Correlation gate.
    ///
    /// Counts held pairs (other than the candidate's own) whose absolute
    /// correlation to the candidate exceeds the threshold. Blocks when that
    /// count exceeds `max_correlated_assets`.
    pub fn check_correlation(
        &self,
        decision: &Decision,
        snapshot: &PortfolioRiskSnapshot,
    ) -> GateResult {
        let correlated: Vec<AssetPair> = snapshot
            .net_exposure()
            .into_iter()
            .filter(|(pair, exposure)| *exposure != 0.0 && pair != &decision.asset_pair)
            .filter(|(pair, _)| {
                snapshot.stats.correlation(&decision.asset_pair, pair).abs()
                    > self.config.correlation_threshold
            })
            .map(|(pair, _)| pair)
            .collect();

        let count = correlated.len();
        if count > self.config.max_correlated_assets {
            let names: Vec<&str> = correlated.iter().map(AssetPair::as_str).collect();
            return GateResult::Block(format!(
                "{} correlated with {} held assets [{}] (threshold {:.2}, max {})",
                decision.asset_pair,
                count,
                names.join(", "),
                self.config.correlation_threshold,
                self.config.max_correlated_assets
            ));
        }
        GateResult::Pass
    }

    /// Concentration gate.
    pub fn check_concentration(
        &self,
        decision: &Decision,
        snapshot: &PortfolioRiskSnapshot,
    ) -> GateResult {
        let total = snapshot.total_value.to_f64();
        if total <= 0.0 {
            return GateResult::Block("portfolio value unavailable".to_string());
        }
        let existing = snapshot
            .net_exposure()
            .get(&decision.asset_pair)
            .copied()
            .unwrap_or(0.0);
        let post_trade = (existing + decision.signed_notional().to_f64()).abs();
        let share = post_trade / total;
        if share > self.config.max_position_pct.fraction() {
            return GateResult::Block(format!(
                "{} would be {:.2}% of portfolio > {} max",
                decision.asset_pair,
                share * 100.0,
                self.config.max_position_pct
            ));
        }
        GateResult::Pass
    }

    /// VaR gate.
    pub fn check_var(&self, decision: &Decision, snapshot: &PortfolioRiskSnapshot) -> GateResult {
        let Some(var) = self.projected_var(decision, snapshot) else {
            return GateResult::Block("portfolio value unavailable".to_string());
        };
        if var > self.config.max_var_pct.fraction() {
            return GateResult::Block(format!(
                "portfolio VaR {:.2}% at {} confidence > {} max",
                var * 100.0,
                self.config.var_confidence,
                self.config.max_var_pct
            ));
        }
        GateResult::Pass
    }

    /// Drawdown gate.
    pub fn check_drawdown(
        &self,
        decision: &Decision,
        snapshot: &PortfolioRiskSnapshot,
    ) -> GateResult {
        let current = snapshot.total_value.to_f64();
        let peak = snapshot.peak_value.to_f64().max(current);
        if peak <= 0.0 {
            return GateResult::Block("portfolio value unavailable".to_string());
        }
        let candidate_loss =
            decision.notional().to_f64().abs() * self.volatility(&decision.asset_pair, snapshot) * self.z;
        let projected = (peak - (current - candidate_loss)) / peak;
        if projected > self.config.max_drawdown_percent.fraction() {
            return GateResult::Block(format!(
                "projected drawdown {:.2}% > {} max",
                projected * 100.0,
                self.config.max_drawdown_percent
            ));
        }
        GateResult::Pass
    }

    /// One-day parametric VaR as a fraction of portfolio value, with the
    /// decision hypothetically added. `None` when portfolio value is not positive.
    #[must_use]
    pub fn projected_var(&self, decision: &Decision, snapshot: &PortfolioRiskSnapshot) -> Option<f64> {
        let total = snapshot.total_value.to_f64();
        if total <= 0.0 {
            return None;
        }
        let mut exposure = snapshot.net_exposure();
        *exposure.entry(decision.asset_pair.clone()).or_insert(0.0) +=
            decision.signed_notional().to_f64();

        let legs: Vec<(&AssetPair, f64, f64)> = exposure
            .iter()
            .filter(|(_, notional)| **notional != 0.0)
            .map(|(pair, notional)| (pair, notional / total, self.volatility(pair, snapshot)))
            .collect();

        let mut variance = 0.0;
        for (pair_i, w_i, s_i) in &legs {
            for (pair_j, w_j, s_j) in &legs {
                let rho = snapshot.stats.correlation(pair_i, pair_j);
                variance += w_i * w_j * s_i * s_j * rho;
            }
        }
        Some(self.z * variance.max(0.0).sqrt())
    }

    fn volatility(&self, pair: &AssetPair, snapshot: &PortfolioRiskSnapshot) -> f64 {
        snapshot
            .stats
            .volatility
            .get(pair)
            .copied()
            .filter(|v| v.is_finite() && *v > 0.0)
            .unwrap_or_else(|| self.config.default_volatility.fraction())
    }
}

/// Standard normal quantile for `p` in (0, 1).
///
/// Rational approximation after Acklam; relative error below 1.2e-9.
#[must_use]
pub fn z_score(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969_683_028_665_376e1,
        2.209_460_984_245_205e2,
        -2.759_285_104_469_687e2,
        1.383_577_518_672_69e2,
        -3.066_479_806_614_716e1,
        2.506_628_277_459_239,
    ];
    const B: [f64; 5] = [
        -5.447_609_879_822_406e1,
        1.615_858_368_580_409e2,
        -1.556_989_798_598_866e2,
        6.680_131_188_771_972e1,
        -1.328_068_155_288_572e1,
    ];
    const C: [f64; 6] = [
        -7.784_894_002_430_293e-3,
        -3.223_964_580_411_365e-1,
        -2.400_758_277_161_838,
        -2.549_732_539_343_734,
        4.374_664_141_464_968,
        2.938_163_982_698_783,
    ];
    const D: [f64; 4] = [
        7.784_695_709_041_462e-3,
        3.224_671_290_700_398e-1,
        2.445_134_137_142_996,
        3.754_408_661_907_416,
    ];
    const P_LOW: f64 = 0.02425;

    let p = p.clamp(1e-12, 1.0 - 1e-12);
    let tail = |q: f64| {
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    };

    if p < P_LOW {
        tail((-2.0 * p.ln()).sqrt())
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        -tail((-2.0 * (1.0 - p).ln()).sqrt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ooda_core::{DecisionId, PairCorrelation, Size, TradeAction};
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn pair(s: &str) -> AssetPair {
        AssetPair::new(s).unwrap()
    }

    fn decision(asset: &str, action: TradeAction, size: rust_decimal::Decimal) -> Decision {
        Decision {
            id: DecisionId::new(format!("d-{asset}")),
            asset_pair: pair(asset),
            action,
            confidence: 75.0,
            recommended_position_size: Size::new(size),
            entry_price: Price::new(dec!(100)),
            reasoning: String::new(),
            created_at: Utc::now(),
        }
    }

    fn snapshot(holdings: &[(&str, rust_decimal::Decimal)]) -> PortfolioRiskSnapshot {
        PortfolioRiskSnapshot {
            total_value: Price::new(dec!(10000)),
            peak_value: Price::new(dec!(10000)),
            holdings: holdings
                .iter()
                .map(|(p, n)| Holding {
                    asset_pair: pair(p),
                    signed_notional: Price::new(*n),
                })
                .collect(),
            stats: MarketStats::default(),
        }
    }

    fn permissive() -> RiskGatekeeperConfig {
        RiskGatekeeperConfig {
            max_position_pct: Pct::new(100.0),
            max_var_pct: Pct::new(100.0),
            max_drawdown_percent: Pct::new(100.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_z_score_known_quantiles() {
        assert!((z_score(0.95) - 1.644_853_6).abs() < 1e-6);
        assert!((z_score(0.99) - 2.326_347_9).abs() < 1e-6);
        assert!((z_score(0.5)).abs() < 1e-9);
        assert!((z_score(0.01) + 2.326_347_9).abs() < 1e-6);
    }

    #[test]
    fn test_config_defaults_are_normalized() {
        let cfg = RiskGatekeeperConfig::default();
        assert_eq!(cfg.var_confidence.fraction(), 0.95);
        assert_eq!(cfg.max_var_pct.fraction(), 0.05);
        assert_eq!(cfg.max_drawdown_percent.fraction(), 0.15);

        let parsed: RiskGatekeeperConfig =
            toml::from_str("max_var_pct = 0.05\nmax_drawdown_percent = 15\n").unwrap();
        assert_eq!(parsed.max_var_pct, cfg.max_var_pct);
        assert_eq!(parsed.max_drawdown_percent, cfg.max_drawdown_percent);
    }

    #[test]
    fn test_config_validation() {
        let bad = RiskGatekeeperConfig {
            var_confidence: Pct::new(0.3),
            ..Default::default()
        };
        assert!(RiskGatekeeper::new(bad).is_err());

        let bad = RiskGatekeeperConfig {
            correlation_threshold: 1.5,
            ..Default::default()
        };
        assert!(RiskGatekeeper::new(bad).is_err());
    }

    #[test]
    fn test_hold_is_always_approved() {
        let gk = RiskGatekeeper::new(RiskGatekeeperConfig::default()).unwrap();
        let mut snap = snapshot(&[]);
        snap.total_value = Price::ZERO;
        let verdict = gk.validate(&decision("BTC-USD", TradeAction::Hold, dec!(0)), &snap);
        assert!(verdict.approved);
    }

    #[test]
    fn test_small_trade_passes_all_gates() {
        let gk = RiskGatekeeper::new(RiskGatekeeperConfig::default()).unwrap();
        // 10 * 100 = 1000 notional = 10% of portfolio
        let verdict = gk.validate(&decision("BTC-USD", TradeAction::Buy, dec!(10)), &snapshot(&[]));
        assert!(verdict.approved, "{}", verdict.reason);
        assert!(verdict.gate.is_none());
    }

    #[test]
    fn test_correlation_blocks_crowded_cluster() {
        let gk = RiskGatekeeper::new(permissive()).unwrap();
        let mut snap = snapshot(&[
            ("ETH-USD", dec!(1000)),
            ("SOL-USD", dec!(1000)),
            ("AVAX-USD", dec!(1000)),
        ]);
        snap.stats.correlations = vec![
            PairCorrelation { a: pair("BTC-USD"), b: pair("ETH-USD"), value: 0.9 },
            PairCorrelation { a: pair("BTC-USD"), b: pair("SOL-USD"), value: 0.8 },
            PairCorrelation { a: pair("BTC-USD"), b: pair("AVAX-USD"), value: -0.75 },
        ];

        let verdict = gk.validate(&decision("BTC-USD", TradeAction::Buy, dec!(1)), &snap);
        assert!(!verdict.approved);
        assert_eq!(verdict.gate.as_deref(), Some("correlation"));
        assert!(verdict.reason.contains("3 held assets"), "{}", verdict.reason);
    }

    #[test]
    fn test_correlation_allows_cluster_at_max() {
        let gk = RiskGatekeeper::new(permissive()).unwrap();
        let mut snap = snapshot(&[("ETH-USD", dec!(1000)), ("SOL-USD", dec!(1000))]);
        snap.stats.correlations = vec![
            PairCorrelation { a: pair("BTC-USD"), b: pair("ETH-USD"), value: 0.9 },
            PairCorrelation { a: pair("BTC-USD"), b: pair("SOL-USD"), value: 0.9 },
        ];

        // two correlated holdings with max 2 is not over the cap
        let verdict = gk.validate(&decision("BTC-USD", TradeAction::Buy, dec!(1)), &snap);
        assert!(verdict.approved, "{}", verdict.reason);
    }

    #[test]
    fn test_correlation_allows_single_correlated_holding() {
        let gk = RiskGatekeeper::new(permissive()).unwrap();
        let mut snap = snapshot(&[("ETH-USD", dec!(1000)), ("SOL-USD", dec!(1000))]);
        snap.stats.correlations = vec![
            PairCorrelation { a: pair("BTC-USD"), b: pair("ETH-USD"), value: 0.9 },
            PairCorrelation { a: pair("BTC-USD"), b: pair("SOL-USD"), value: 0.2 },
        ];

        let verdict = gk.validate(&decision("BTC-USD", TradeAction::Buy, dec!(1)), &snap);
        assert!(verdict.approved, "{}", verdict.reason);
    }

    #[test]
    fn test_concentration_counts_existing_exposure() {
        let gk = RiskGatekeeper::new(RiskGatekeeperConfig {
            max_var_pct: Pct::new(100.0),
            max_drawdown_percent: Pct::new(100.0),
            ..Default::default()
        })
        .unwrap();
        // Existing 2000 + new 1000 = 30% > 25%
        let snap = snapshot(&[("BTC-USD", dec!(2000))]);
        let verdict = gk.validate(&decision("BTC-USD", TradeAction::Buy, dec!(10)), &snap);
        assert_eq!(verdict.gate.as_deref(), Some("concentration"));

        // Selling against the long reduces exposure and passes
        let verdict = gk.validate(&decision("BTC-USD", TradeAction::Sell, dec!(10)), &snap);
        assert!(verdict.approved, "{}", verdict.reason);
    }

    #[test]
    fn test_var_blocks_large_position() {
        let gk = RiskGatekeeper::new(RiskGatekeeperConfig {
            max_position_pct: Pct::new(100.0),
            max_drawdown_percent: Pct::new(100.0),
            ..Default::default()
        })
        .unwrap();
        // 80% weight * 5% vol * 1.645 = 6.6% > 5%
        let verdict = gk.validate(&decision("BTC-USD", TradeAction::Buy, dec!(80)), &snapshot(&[]));
        assert_eq!(verdict.gate.as_deref(), Some("var"));

        // 40% weight -> 3.3% passes
        let verdict = gk.validate(&decision("BTC-USD", TradeAction::Buy, dec!(40)), &snapshot(&[]));
        assert!(verdict.approved, "{}", verdict.reason);
    }

    #[test]
    fn test_var_hedge_reduces_risk() {
        let gk = RiskGatekeeper::new(permissive()).unwrap();
        let mut snap = snapshot(&[("ETH-USD", dec!(5000))]);
        snap.stats.correlations = vec![PairCorrelation {
            a: pair("BTC-USD"),
            b: pair("ETH-USD"),
            value: 0.95,
        }];
        let mut vol = HashMap::new();
        vol.insert(pair("BTC-USD"), 0.05);
        vol.insert(pair("ETH-USD"), 0.05);
        snap.stats.volatility = vol;

        let long = gk.projected_var(&decision("BTC-USD", TradeAction::Buy, dec!(30)), &snap).unwrap();
        let short = gk.projected_var(&decision("BTC-USD", TradeAction::Sell, dec!(30)), &snap).unwrap();
        assert!(short < long);
    }

    #[test]
    fn test_drawdown_uses_peak() {
        let gk = RiskGatekeeper::new(RiskGatekeeperConfig {
            max_position_pct: Pct::new(100.0),
            max_var_pct: Pct::new(100.0),
            ..Default::default()
        })
        .unwrap();
        let mut snap = snapshot(&[]);
        snap.peak_value = Price::new(dec!(11700));
        // Already 14.5% below peak; any meaningful loss pushes past 15%.
        let verdict = gk.validate(&decision("BTC-USD", TradeAction::Buy, dec!(10)), &snap);
        assert_eq!(verdict.gate.as_deref(), Some("drawdown"));

        snap.peak_value = Price::new(dec!(10000));
        let verdict = gk.validate(&decision("BTC-USD", TradeAction::Buy, dec!(10)), &snap);
        assert!(verdict.approved, "{}", verdict.reason);
    }

    #[test]
    fn test_zero_portfolio_blocks() {
        let gk = RiskGatekeeper::new(RiskGatekeeperConfig::default()).unwrap();
        let mut snap = snapshot(&[]);
        snap.total_value = Price::ZERO;
        let verdict = gk.validate(&decision("BTC-USD", TradeAction::Buy, dec!(1)), &snap);
        assert!(!verdict.approved);
        assert_eq!(verdict.gate.as_deref(), Some("concentration"));
    }

    #[test]
    fn test_gate_order_correlation_first() {
        // Both correlation and concentration would block; correlation reports.
        let gk = RiskGatekeeper::new(RiskGatekeeperConfig {
            max_correlated_assets: 1,
            ..Default::default()
        })
        .unwrap();
        let mut snap = snapshot(&[("ETH-USD", dec!(1000))]);
        snap.stats.correlations = vec![PairCorrelation {
            a: pair("BTC-USD"),
            b: pair("ETH-USD"),
            value: 0.9,
        }];
        let verdict = gk.validate(&decision("BTC-USD", TradeAction::Buy, dec!(90)), &snap);
        assert_eq!(verdict.gate.as_deref(), Some("correlation"));
    }
}
