//! Decisions proposed by the external decision provider.

use crate::decimal::{Price, Size};
use crate::error::{CoreError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// AssetPair
// ============================================================================

/// Instrument identifier such as `BTC-USD`.
///
/// Normalised to upper case with surrounding whitespace removed so that
/// `btc-usd` and `BTC-USD ` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AssetPair(String);

impl AssetPair {
    pub fn new(raw: impl AsRef<str>) -> Result<Self> {
        let normalized = raw.as_ref().trim().to_uppercase();
        if normalized.is_empty() {
            return Err(CoreError::InvalidAssetPair("empty asset pair".to_string()));
        }
        Ok(Self(normalized))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AssetPair {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<AssetPair> for String {
    fn from(pair: AssetPair) -> Self {
        pair.0
    }
}

impl fmt::Display for AssetPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// DecisionId
// ============================================================================

/// Unique decision identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DecisionId(String);

impl DecisionId {
    /// Create from an existing identifier. May be empty; callers that
    /// require a usable id check `is_empty`.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a new random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for DecisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// TradeAction / PositionSide
// ============================================================================

/// Action proposed for an asset pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeAction {
    Buy,
    Sell,
    Hold,
}

impl TradeAction {
    /// Position side opened by this action. `Hold` opens nothing.
    #[must_use]
    pub fn side(&self) -> Option<PositionSide> {
        match self {
            TradeAction::Buy => Some(PositionSide::Long),
            TradeAction::Sell => Some(PositionSide::Short),
            TradeAction::Hold => None,
        }
    }

    #[must_use]
    pub fn is_hold(&self) -> bool {
        matches!(self, TradeAction::Hold)
    }
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeAction::Buy => write!(f, "BUY"),
            TradeAction::Sell => write!(f, "SELL"),
            TradeAction::Hold => write!(f, "HOLD"),
        }
    }
}

/// Direction of an open position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    /// Parse the spellings venues commonly use.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "LONG" | "BUY" => Some(PositionSide::Long),
            "SHORT" | "SELL" => Some(PositionSide::Short),
            _ => None,
        }
    }

    /// The action that opened a position on this side.
    #[must_use]
    pub fn opening_action(&self) -> TradeAction {
        match self {
            PositionSide::Long => TradeAction::Buy,
            PositionSide::Short => TradeAction::Sell,
        }
    }

    /// `1` for long, `-1` for short.
    #[must_use]
    pub fn sign(&self) -> i32 {
        match self {
            PositionSide::Long => 1,
            PositionSide::Short => -1,
        }
    }
}

impl fmt::Display for PositionSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionSide::Long => write!(f, "LONG"),
            PositionSide::Short => write!(f, "SHORT"),
        }
    }
}

// ============================================================================
// Decision
// ============================================================================

/// A trade proposal for one asset pair.
///
/// Lives for a single cycle: produced in REASONING, consumed by RISK_CHECK
/// and EXECUTION, then discarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub id: DecisionId,
    pub asset_pair: AssetPair,
    pub action: TradeAction,
    /// Provider confidence in `[0, 100]`.
    pub confidence: f64,
    pub recommended_position_size: Size,
    pub entry_price: Price,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Decision {
    /// Validate a decision received across the provider boundary.
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(CoreError::InvalidDecision("empty decision id".to_string()));
        }
        if !self.confidence.is_finite() || !(0.0..=100.0).contains(&self.confidence) {
            return Err(CoreError::InvalidDecision(format!(
                "confidence {} outside [0, 100]",
                self.confidence
            )));
        }
        if self.action.is_hold() {
            return Ok(());
        }
        if !self.recommended_position_size.is_positive() {
            return Err(CoreError::InvalidDecision(format!(
                "non-positive position size {}",
                self.recommended_position_size
            )));
        }
        if !self.entry_price.is_positive() {
            return Err(CoreError::InvalidDecision(format!(
                "non-positive entry price {}",
                self.entry_price
            )));
        }
        Ok(())
    }

    /// Absolute notional value of the proposal.
    #[must_use]
    pub fn notional(&self) -> Price {
        self.recommended_position_size.notional(self.entry_price)
    }

    /// Notional with direction: positive for BUY, negative for SELL, zero for HOLD.
    #[must_use]
    pub fn signed_notional(&self) -> Price {
        match self.action {
            TradeAction::Buy => self.notional(),
            TradeAction::Sell => -self.notional(),
            TradeAction::Hold => Price::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample(action: TradeAction) -> Decision {
        Decision {
            id: DecisionId::new("d-1"),
            asset_pair: AssetPair::new("btc-usd").unwrap(),
            action,
            confidence: 72.0,
            recommended_position_size: Size::new(dec!(0.1)),
            entry_price: Price::new(dec!(50000)),
            reasoning: "trend".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_asset_pair_normalization() {
        let a = AssetPair::new(" btc-usd ").unwrap();
        assert_eq!(a.as_str(), "BTC-USD");
        assert!(AssetPair::new("   ").is_err());

        let parsed: AssetPair = serde_json::from_str(r#""eth-usd""#).unwrap();
        assert_eq!(parsed.to_string(), "ETH-USD");
        assert!(serde_json::from_str::<AssetPair>(r#""""#).is_err());
    }

    #[test]
    fn test_decision_validation() {
        assert!(sample(TradeAction::Buy).validate().is_ok());

        let mut d = sample(TradeAction::Buy);
        d.id = DecisionId::new("");
        assert!(d.validate().is_err());

        let mut d = sample(TradeAction::Sell);
        d.confidence = 101.0;
        assert!(d.validate().is_err());

        let mut d = sample(TradeAction::Buy);
        d.recommended_position_size = Size::ZERO;
        assert!(d.validate().is_err());

        // HOLD carries no size requirement
        let mut d = sample(TradeAction::Hold);
        d.recommended_position_size = Size::ZERO;
        assert!(d.validate().is_ok());
    }

    #[test]
    fn test_signed_notional() {
        assert_eq!(sample(TradeAction::Buy).signed_notional(), Price::new(dec!(5000.0)));
        assert_eq!(sample(TradeAction::Sell).signed_notional(), Price::new(dec!(-5000.0)));
        assert_eq!(sample(TradeAction::Hold).signed_notional(), Price::ZERO);
    }

    #[test]
    fn test_decision_deserializes_with_defaults() {
        let json = r#"{
            "id": "abc",
            "asset_pair": "sol-usd",
            "action": "BUY",
            "confidence": 80,
            "recommended_position_size": "2",
            "entry_price": "150.5"
        }"#;
        let d: Decision = serde_json::from_str(json).unwrap();
        assert_eq!(d.asset_pair.as_str(), "SOL-USD");
        assert_eq!(d.action, TradeAction::Buy);
        assert!(d.reasoning.is_empty());
        assert!(d.validate().is_ok());
    }

    #[test]
    fn test_position_side_parse() {
        assert_eq!(PositionSide::parse("long"), Some(PositionSide::Long));
        assert_eq!(PositionSide::parse("SELL"), Some(PositionSide::Short));
        assert_eq!(PositionSide::parse("flat"), None);
        assert_eq!(PositionSide::Short.opening_action(), TradeAction::Sell);
    }
}
