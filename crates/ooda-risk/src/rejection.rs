//! Cooldown for rejected decisions.
//!
//! When a decision is rejected by the gatekeeper its asset pair is parked for
//! a cooldown window so the provider is not asked about it again right away.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use ooda_core::{AssetPair, DecisionId};
use tracing::debug;

/// Default cooldown window.
pub const DEFAULT_REJECTION_COOLDOWN: Duration = Duration::from_secs(300);

/// One rejected decision.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectionCacheEntry {
    pub rejected_at: DateTime<Utc>,
    pub asset_pair: AssetPair,
    pub reason: String,
}

/// Rejected decisions keyed by decision id.
#[derive(Debug)]
pub struct RejectionCache {
    cooldown: chrono::Duration,
    entries: HashMap<DecisionId, RejectionCacheEntry>,
}

impl Default for RejectionCache {
    fn default() -> Self {
        Self::new(DEFAULT_REJECTION_COOLDOWN)
    }
}

impl RejectionCache {
    #[must_use]
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown: chrono::Duration::from_std(cooldown)
                .unwrap_or_else(|_| chrono::Duration::weeks(52)),
            entries: HashMap::new(),
        }
    }

    pub fn record(
        &mut self,
        decision_id: DecisionId,
        asset_pair: AssetPair,
        reason: impl Into<String>,
        now: DateTime<Utc>,
    ) {
        self.entries.insert(
            decision_id,
            RejectionCacheEntry {
                rejected_at: now,
                asset_pair,
                reason: reason.into(),
            },
        );
    }

    /// Whether `pair` has a rejection still inside its cooldown window.
    #[must_use]
    pub fn is_cooling_down(&self, pair: &AssetPair, now: DateTime<Utc>) -> bool {
        self.entries
            .values()
            .any(|e| &e.asset_pair == pair && now - e.rejected_at <= self.cooldown)
    }

    /// Remove entries strictly older than the cooldown. Returns how many went.
    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        let cooldown = self.cooldown;
        self.entries.retain(|_, e| now - e.rejected_at <= cooldown);
        let purged = before - self.entries.len();
        if purged > 0 {
            debug!(purged, remaining = self.entries.len(), "Purged expired rejections");
        }
        purged
    }

    #[must_use]
    pub fn get(&self, decision_id: &DecisionId) -> Option<&RejectionCacheEntry> {
        self.entries.get(decision_id)
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

    fn pair(s: &str) -> AssetPair {
        AssetPair::new(s).unwrap()
    }

    #[test]
    fn test_purge_respects_cooldown_boundary() {
        let mut cache = RejectionCache::new(Duration::from_secs(300));
        let t0 = Utc::now();
        cache.record(DecisionId::new("a"), pair("BTC-USD"), "var", t0);

        // Exactly at the window edge: kept
        assert_eq!(cache.purge_expired(t0 + chrono::Duration::seconds(300)), 0);
        assert_eq!(cache.len(), 1);

        // One second past: purged
        assert_eq!(cache.purge_expired(t0 + chrono::Duration::seconds(301)), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_purge_keeps_fresh_entries() {
        let mut cache = RejectionCache::default();
        let t0 = Utc::now();
        cache.record(DecisionId::new("old"), pair("BTC-USD"), "var", t0);
        cache.record(
            DecisionId::new("new"),
            pair("ETH-USD"),
            "drawdown",
            t0 + chrono::Duration::seconds(200),
        );

        let purged = cache.purge_expired(t0 + chrono::Duration::seconds(400));
        assert_eq!(purged, 1);
        assert!(cache.get(&DecisionId::new("new")).is_some());
        assert!(cache.get(&DecisionId::new("old")).is_none());
    }

    #[test]
    fn test_cooling_down_by_pair() {
        let mut cache = RejectionCache::new(Duration::from_secs(60));
        let t0 = Utc::now();
        cache.record(DecisionId::new("a"), pair("BTC-USD"), "corr", t0);

        assert!(cache.is_cooling_down(&pair("BTC-USD"), t0 + chrono::Duration::seconds(30)));
        assert!(!cache.is_cooling_down(&pair("ETH-USD"), t0));
        assert!(!cache.is_cooling_down(&pair("BTC-USD"), t0 + chrono::Duration::seconds(61)));
    }
}
