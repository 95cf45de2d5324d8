//! Position identity and decision associations.
//!
//! Venues do not hand out stable position ids, so a position is identified
//! by a SHA-256 of the attributes that cannot change while it is open:
//! instrument, side and entry price.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use ooda_core::{AssetPair, DecisionId, PlatformPosition, PositionSide, Price};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

/// Default lifetime of a decision association.
pub const DEFAULT_ASSOCIATION_TTL: Duration = Duration::from_secs(300);

/// Hex digest prefix length used as the trade id.
const TRADE_ID_LEN: usize = 16;

// ============================================================================
// TradeId
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TradeId(String);

impl TradeId {
    /// Identity of an open position.
    #[must_use]
    pub fn for_position(position: &PlatformPosition) -> Self {
        Self::from_parts(&position.asset_pair, position.side, position.entry_price)
    }

    #[must_use]
    pub fn from_parts(asset_pair: &AssetPair, side: PositionSide, entry_price: Price) -> Self {
        // normalize() so that 100 and 100.00 hash the same
        let material = format!(
            "{}|{}|{}",
            asset_pair,
            side,
            entry_price.inner().normalize()
        );
        let mut hasher = Sha256::new();
        hasher.update(material.as_bytes());
        let digest = hex::encode(hasher.finalize());
        Self(digest[..TRADE_ID_LEN].to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// DecisionAssociations
// ============================================================================

/// Expected asset pair -> decision that is about to open a position there.
///
/// Set when an order is submitted, consumed when the detection loop first
/// sees the resulting position. Stale associations are purged.
#[derive(Debug)]
pub struct DecisionAssociations {
    ttl: chrono::Duration,
    entries: HashMap<AssetPair, (DecisionId, DateTime<Utc>)>,
}

impl Default for DecisionAssociations {
    fn default() -> Self {
        Self::new(DEFAULT_ASSOCIATION_TTL)
    }
}

impl DecisionAssociations {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl: chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::weeks(52)),
            entries: HashMap::new(),
        }
    }

    /// Associate `decision_id` with the next position detected on `asset_pair`.
    /// A newer association for the same pair replaces the older one.
    pub fn associate(&mut self, asset_pair: AssetPair, decision_id: DecisionId, now: DateTime<Utc>) {
        debug!(%asset_pair, %decision_id, "Associating decision with expected position");
        self.entries.insert(asset_pair, (decision_id, now));
    }

    /// Consume the association for `asset_pair` if it has not expired.
    pub fn take(&mut self, asset_pair: &AssetPair, now: DateTime<Utc>) -> Option<DecisionId> {
        let (decision_id, at) = self.entries.remove(asset_pair)?;
        (now - at <= self.ttl).then_some(decision_id)
    }

    /// Drop associations older than the TTL. Returns how many went.
    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries.retain(|_, (_, at)| now - *at <= ttl);
        before - self.entries.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn pair(s: &str) -> AssetPair {
        AssetPair::new(s).unwrap()
    }

    #[test]
    fn test_trade_id_ignores_trailing_zeros() {
        let a = TradeId::from_parts(&pair("BTC-USD"), PositionSide::Long, Price::new(dec!(100)));
        let b = TradeId::from_parts(&pair("BTC-USD"), PositionSide::Long, Price::new(dec!(100.00)));
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), TRADE_ID_LEN);
    }

    #[test]
    fn test_trade_id_differs_by_side_and_price() {
        let base = TradeId::from_parts(&pair("BTC-USD"), PositionSide::Long, Price::new(dec!(100)));
        let short = TradeId::from_parts(&pair("BTC-USD"), PositionSide::Short, Price::new(dec!(100)));
        let other = TradeId::from_parts(&pair("BTC-USD"), PositionSide::Long, Price::new(dec!(101)));
        assert_ne!(base, short);
        assert_ne!(base, other);
    }

    #[test]
    fn test_association_consumed_once() {
        let mut assoc = DecisionAssociations::default();
        let now = Utc::now();
        assoc.associate(pair("ETH-USD"), DecisionId::new("d1"), now);

        assert_eq!(assoc.take(&pair("ETH-USD"), now), Some(DecisionId::new("d1")));
        assert_eq!(assoc.take(&pair("ETH-USD"), now), None);
    }

    #[test]
    fn test_association_expires() {
        let mut assoc = DecisionAssociations::new(Duration::from_secs(300));
        let t0 = Utc::now();
        assoc.associate(pair("ETH-USD"), DecisionId::new("d1"), t0);
        assoc.associate(pair("SOL-USD"), DecisionId::new("d2"), t0 + chrono::Duration::seconds(200));

        assert_eq!(assoc.purge_expired(t0 + chrono::Duration::seconds(301)), 1);
        assert_eq!(assoc.len(), 1);
        assert_eq!(assoc.take(&pair("SOL-USD"), t0 + chrono::Duration::seconds(600)), None);
    }
}
