//! Venue-facing position, order and outcome types.

use crate::decimal::{Price, Size};
use crate::decision::{AssetPair, Decision, DecisionId, PositionSide, TradeAction};
use crate::error::{CoreError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ============================================================================
// Raw venue data
// ============================================================================

/// One entry of `futures_positions` as reported by the venue.
///
/// Every field is optional because venues omit fields freely; `validate`
/// turns it into a `PlatformPosition` or reports it as malformed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawFuturesPosition {
    #[serde(default)]
    pub product_id: Option<String>,
    #[serde(default)]
    pub side: Option<String>,
    #[serde(default)]
    pub contracts: Option<Decimal>,
    #[serde(default)]
    pub entry_price: Option<Decimal>,
    #[serde(default)]
    pub current_price: Option<Decimal>,
    #[serde(default)]
    pub unrealized_pnl: Option<Decimal>,
    #[serde(default)]
    pub opened_at: Option<DateTime<Utc>>,
}

impl RawFuturesPosition {
    /// Validate into a typed position.
    ///
    /// Missing instrument, side, size or entry price is malformed. A missing
    /// mark falls back to the entry price, a missing P&L is derived from it.
    pub fn validate(&self) -> Result<PlatformPosition> {
        let product_id = self
            .product_id
            .as_deref()
            .ok_or_else(|| CoreError::Malformed("position without product_id".to_string()))?;
        let asset_pair = AssetPair::new(product_id)
            .map_err(|e| CoreError::Malformed(format!("bad product_id: {e}")))?;

        let side_raw = self
            .side
            .as_deref()
            .ok_or_else(|| CoreError::Malformed(format!("{asset_pair}: missing side")))?;
        let side = PositionSide::parse(side_raw)
            .ok_or_else(|| CoreError::Malformed(format!("{asset_pair}: unknown side {side_raw}")))?;

        let contracts = self
            .contracts
            .ok_or_else(|| CoreError::Malformed(format!("{asset_pair}: missing contracts")))?;
        if contracts <= Decimal::ZERO {
            return Err(CoreError::Malformed(format!(
                "{asset_pair}: non-positive contracts {contracts}"
            )));
        }

        let entry = self
            .entry_price
            .ok_or_else(|| CoreError::Malformed(format!("{asset_pair}: missing entry_price")))?;
        if entry <= Decimal::ZERO {
            return Err(CoreError::Malformed(format!(
                "{asset_pair}: non-positive entry_price {entry}"
            )));
        }

        let entry_price = Price::new(entry);
        let current_price = Price::new(self.current_price.unwrap_or(entry));
        let size = Size::new(contracts);
        let unrealized_pnl = match self.unrealized_pnl {
            Some(pnl) => Price::new(pnl),
            None => PlatformPosition::pnl_at(side, entry_price, current_price, size),
        };

        Ok(PlatformPosition {
            asset_pair,
            side,
            size,
            entry_price,
            current_price,
            unrealized_pnl,
            opened_at: self.opened_at,
        })
    }
}

/// An open position after boundary validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformPosition {
    pub asset_pair: AssetPair,
    pub side: PositionSide,
    pub size: Size,
    pub entry_price: Price,
    pub current_price: Price,
    pub unrealized_pnl: Price,
    pub opened_at: Option<DateTime<Utc>>,
}

impl PlatformPosition {
    /// P&L of `size` opened at `entry` and marked at `mark`.
    #[must_use]
    pub fn pnl_at(side: PositionSide, entry: Price, mark: Price, size: Size) -> Price {
        let diff = match side {
            PositionSide::Long => mark - entry,
            PositionSide::Short => entry - mark,
        };
        diff * size.inner()
    }

    #[must_use]
    pub fn notional(&self) -> Price {
        self.size.notional(self.entry_price)
    }

    /// Signed exposure at entry: positive long, negative short.
    #[must_use]
    pub fn signed_notional(&self) -> Price {
        match self.side {
            PositionSide::Long => self.notional(),
            PositionSide::Short => -self.notional(),
        }
    }

    /// Convert into a decision-shaped record so recovered positions flow
    /// through the same bookkeeping as fresh decisions.
    #[must_use]
    pub fn to_recovery_decision(&self) -> Decision {
        Decision {
            id: DecisionId::generate(),
            asset_pair: self.asset_pair.clone(),
            action: self.side.opening_action(),
            confidence: 0.0,
            recommended_position_size: self.size,
            entry_price: self.entry_price,
            reasoning: "recovered open position".to_string(),
            created_at: self.opened_at.unwrap_or_else(Utc::now),
        }
    }
}

/// Per-asset statistics the venue (or a market data adapter) may attach.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketStats {
    /// Daily return volatility per asset pair (fraction).
    #[serde(default)]
    pub volatility: HashMap<AssetPair, f64>,
    #[serde(default)]
    pub correlations: Vec<PairCorrelation>,
}

impl MarketStats {
    /// Correlation between two pairs. Identity is 1, unknown is 0.
    #[must_use]
    pub fn correlation(&self, a: &AssetPair, b: &AssetPair) -> f64 {
        if a == b {
            return 1.0;
        }
        self.correlations
            .iter()
            .find(|c| (&c.a == a && &c.b == b) || (&c.a == b && &c.b == a))
            .map(|c| c.value)
            .unwrap_or(0.0)
    }
}

/// Symmetric correlation coefficient between two pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairCorrelation {
    pub a: AssetPair,
    pub b: AssetPair,
    pub value: f64,
}

/// Result of `get_portfolio_breakdown`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioBreakdown {
    pub total_value_usd: Price,
    #[serde(default)]
    pub futures_positions: Vec<RawFuturesPosition>,
    /// When the underlying market data was observed.
    #[serde(default)]
    pub as_of: Option<DateTime<Utc>>,
    #[serde(default)]
    pub market_stats: MarketStats,
}

impl PortfolioBreakdown {
    /// Validate every position, failing on the first malformed one.
    pub fn validated_positions(&self) -> Result<Vec<PlatformPosition>> {
        self.futures_positions
            .iter()
            .map(RawFuturesPosition::validate)
            .collect()
    }
}

// ============================================================================
// Orders
// ============================================================================

/// Result of `execute_trade`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub success: bool,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ExecutionReport {
    #[must_use]
    pub fn accepted(order_id: impl Into<String>) -> Self {
        Self {
            success: true,
            order_id: Some(order_id.into()),
            error: None,
        }
    }

    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            order_id: None,
            error: Some(error.into()),
        }
    }
}

/// Venue order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Open,
    PartiallyFilled,
    Filled,
    Cancelled,
    Rejected,
}

impl OrderStatus {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Rejected
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::Open => write!(f, "open"),
            OrderStatus::PartiallyFilled => write!(f, "partially_filled"),
            OrderStatus::Filled => write!(f, "filled"),
            OrderStatus::Cancelled => write!(f, "cancelled"),
            OrderStatus::Rejected => write!(f, "rejected"),
        }
    }
}

// ============================================================================
// Outcomes
// ============================================================================

/// Why a tracked position ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// The tracker was stopped before the venue closed the position.
    ForcedStop,
    StopLoss,
    TakeProfit,
    Manual,
}

impl ExitReason {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::ForcedStop => "forced_stop",
            ExitReason::StopLoss => "stop_loss",
            ExitReason::TakeProfit => "take_profit",
            ExitReason::Manual => "manual",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an outcome record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeSource {
    Recovery,
    Live,
}

/// Normalised record handed to the portfolio-memory collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeOutcome {
    pub decision_id: DecisionId,
    pub asset_pair: AssetPair,
    pub action: TradeAction,
    pub position_size: Size,
    pub entry_price: Price,
    pub source: OutcomeSource,
    pub opened_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_price: Option<Price>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realized_pnl: Option<Price>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_reason: Option<ExitReason>,
}

impl TradeOutcome {
    /// Outcome record for a position adopted at startup.
    #[must_use]
    pub fn from_recovery(decision: &Decision) -> Self {
        Self {
            decision_id: decision.id.clone(),
            asset_pair: decision.asset_pair.clone(),
            action: decision.action,
            position_size: decision.recommended_position_size,
            entry_price: decision.entry_price,
            source: OutcomeSource::Recovery,
            opened_at: decision.created_at,
            exit_price: None,
            realized_pnl: None,
            closed_at: None,
            exit_reason: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn raw(product: &str, side: &str) -> RawFuturesPosition {
        RawFuturesPosition {
            product_id: Some(product.to_string()),
            side: Some(side.to_string()),
            contracts: Some(dec!(2)),
            entry_price: Some(dec!(100)),
            current_price: Some(dec!(110)),
            unrealized_pnl: None,
            opened_at: None,
        }
    }

    #[test]
    fn test_validate_derives_pnl() {
        let long = raw("eth-usd", "LONG").validate().unwrap();
        assert_eq!(long.asset_pair.as_str(), "ETH-USD");
        assert_eq!(long.unrealized_pnl, Price::new(dec!(20)));

        let short = raw("eth-usd", "short").validate().unwrap();
        assert_eq!(short.unrealized_pnl, Price::new(dec!(-20)));
    }

    #[test]
    fn test_validate_rejects_incomplete_data() {
        let mut r = raw("eth-usd", "LONG");
        r.contracts = None;
        assert!(matches!(r.validate(), Err(CoreError::Malformed(_))));

        let mut r = raw("eth-usd", "LONG");
        r.entry_price = Some(dec!(0));
        assert!(matches!(r.validate(), Err(CoreError::Malformed(_))));

        let r = raw("eth-usd", "sideways");
        assert!(matches!(r.validate(), Err(CoreError::Malformed(_))));

        let mut r = raw("eth-usd", "LONG");
        r.product_id = None;
        assert!(matches!(r.validate(), Err(CoreError::Malformed(_))));
    }

    #[test]
    fn test_breakdown_fails_on_any_malformed_entry() {
        let mut bad = raw("btc-usd", "LONG");
        bad.side = None;
        let breakdown = PortfolioBreakdown {
            total_value_usd: Price::new(dec!(10000)),
            futures_positions: vec![raw("eth-usd", "LONG"), bad],
            as_of: None,
            market_stats: MarketStats::default(),
        };
        assert!(breakdown.validated_positions().is_err());
    }

    #[test]
    fn test_breakdown_parses_venue_json() {
        let json = r#"{
            "total_value_usd": "10000",
            "futures_positions": [
                {"product_id": "BTC-USD", "side": "LONG", "contracts": "0.5",
                 "entry_price": "60000", "unrealized_pnl": "-12.5"}
            ]
        }"#;
        let b: PortfolioBreakdown = serde_json::from_str(json).unwrap();
        let positions = b.validated_positions().unwrap();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].unrealized_pnl, Price::new(dec!(-12.5)));
        assert_eq!(positions[0].current_price, Price::new(dec!(60000)));
    }

    #[test]
    fn test_market_stats_correlation_lookup() {
        let btc = AssetPair::new("BTC-USD").unwrap();
        let eth = AssetPair::new("ETH-USD").unwrap();
        let sol = AssetPair::new("SOL-USD").unwrap();
        let stats = MarketStats {
            volatility: HashMap::new(),
            correlations: vec![PairCorrelation {
                a: btc.clone(),
                b: eth.clone(),
                value: 0.85,
            }],
        };
        assert_eq!(stats.correlation(&eth, &btc), 0.85);
        assert_eq!(stats.correlation(&btc, &btc), 1.0);
        assert_eq!(stats.correlation(&btc, &sol), 0.0);
    }

    #[test]
    fn test_recovery_decision_shape() {
        let p = raw("btc-usd", "SHORT").validate().unwrap();
        let d = p.to_recovery_decision();
        assert_eq!(d.action, TradeAction::Sell);
        assert_eq!(d.recommended_position_size, Size::new(dec!(2)));
        assert!(!d.id.is_empty());

        let outcome = TradeOutcome::from_recovery(&d);
        assert_eq!(outcome.source, OutcomeSource::Recovery);
        assert_eq!(outcome.entry_price, Price::new(dec!(100)));
    }
}
