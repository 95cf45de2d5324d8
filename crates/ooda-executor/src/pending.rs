//! Fill confirmation for submitted orders.
//!
//! An order the venue accepted is not yet a position. Each accepted order is
//! tracked as a [`PendingOrderEntry`] and polled with `get_order_status`
//! until it reaches a terminal status or has been checked `max_checks`
//! times without one, at which point it is dropped as an orphan.
//!
//! The entry list is mirrored to a JSON snapshot after every change so that
//! a restart resumes confirmation instead of forgetting in-flight orders.

use std::time::Duration;

use chrono::{DateTime, Utc};
use ooda_core::{
    AssetPair, DecisionId, OrderStatus, Price, Size, TradeAction, TradingPlatform,
};
use ooda_persistence::SnapshotStore;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::ExecutorResult;

/// Durable record of an order awaiting fill confirmation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingOrderEntry {
    pub order_id: String,
    pub decision_id: DecisionId,
    pub asset_pair: AssetPair,
    /// Venue name the order went to.
    pub platform: String,
    pub action: TradeAction,
    pub size: Size,
    pub entry_price: Price,
    /// Status polls performed so far.
    pub checks: u32,
    pub submitted_at: DateTime<Utc>,
}

/// What happened to a pending order during a poll.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingOrderOutcome {
    Filled(PendingOrderEntry),
    /// Cancelled or rejected by the venue.
    Failed {
        entry: PendingOrderEntry,
        status: OrderStatus,
    },
    /// No terminal status after the maximum number of checks.
    Orphaned(PendingOrderEntry),
}

impl PendingOrderOutcome {
    #[must_use]
    pub fn entry(&self) -> &PendingOrderEntry {
        match self {
            Self::Filled(entry) | Self::Orphaned(entry) => entry,
            Self::Failed { entry, .. } => entry,
        }
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Filled(_) => "filled",
            Self::Failed { .. } => "failed",
            Self::Orphaned(_) => "orphaned",
        }
    }
}

/// Tracks pending orders until they fill, fail, or are orphaned.
pub struct PendingOrderTracker {
    entries: Mutex<Vec<PendingOrderEntry>>,
    max_checks: u32,
    /// Deadline for one status query. A timeout counts as a check.
    call_timeout: Duration,
    store: Option<SnapshotStore<Vec<PendingOrderEntry>>>,
}

const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

impl PendingOrderTracker {
    /// In-memory tracker.
    #[must_use]
    pub fn new(max_checks: u32) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            max_checks: max_checks.max(1),
            call_timeout: DEFAULT_CALL_TIMEOUT,
            store: None,
        }
    }

    #[must_use]
    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    /// Tracker mirrored to `store`; existing entries are reloaded.
    pub fn with_store(
        max_checks: u32,
        store: SnapshotStore<Vec<PendingOrderEntry>>,
    ) -> ExecutorResult<Self> {
        let restored = store.load()?.unwrap_or_default();
        if !restored.is_empty() {
            info!(
                count = restored.len(),
                path = %store.path().display(),
                "Restored pending orders from snapshot"
            );
        }
        Ok(Self {
            entries: Mutex::new(restored),
            max_checks: max_checks.max(1),
            call_timeout: DEFAULT_CALL_TIMEOUT,
            store: Some(store),
        })
    }

    /// Start tracking an accepted order. A second entry for the same
    /// order id replaces the first.
    pub fn track(&self, entry: PendingOrderEntry) {
        {
            let mut entries = self.entries.lock();
            entries.retain(|e| e.order_id != entry.order_id);
            debug!(
                order_id = %entry.order_id,
                decision_id = %entry.decision_id,
                asset_pair = %entry.asset_pair,
                "Tracking pending order"
            );
            entries.push(entry);
        }
        self.persist();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    #[must_use]
    pub fn entries(&self) -> Vec<PendingOrderEntry> {
        self.entries.lock().clone()
    }

    /// Poll every pending order once.
    ///
    /// The list is copied under the lock, the venue is queried without it,
    /// and the result is merged back under the lock. Orders tracked while
    /// the poll was running are kept untouched.
    pub async fn poll(&self, platform: &dyn TradingPlatform) -> Vec<PendingOrderOutcome> {
        let snapshot = self.entries.lock().clone();
        if snapshot.is_empty() {
            return Vec::new();
        }

        let mut outcomes = Vec::new();
        let mut still_pending = Vec::new();
        for mut entry in snapshot.iter().cloned() {
            entry.checks += 1;
            let query = platform.get_order_status(&entry.order_id);
            let status = match tokio::time::timeout(self.call_timeout, query).await {
                Ok(Ok(status)) => status,
                Ok(Err(e)) => {
                    warn!(order_id = %entry.order_id, error = %e, "Order status query failed");
                    None
                }
                Err(_) => {
                    warn!(order_id = %entry.order_id, "Order status query timed out");
                    None
                }
            };

            match status {
                Some(OrderStatus::Filled) => {
                    info!(order_id = %entry.order_id, asset_pair = %entry.asset_pair, "Order filled");
                    outcomes.push(PendingOrderOutcome::Filled(entry));
                }
                Some(status @ (OrderStatus::Cancelled | OrderStatus::Rejected)) => {
                    warn!(order_id = %entry.order_id, %status, "Order ended without fill");
                    outcomes.push(PendingOrderOutcome::Failed { entry, status });
                }
                _ if entry.checks >= self.max_checks => {
                    warn!(
                        order_id = %entry.order_id,
                        checks = entry.checks,
                        "Order never confirmed, dropping as orphan"
                    );
                    outcomes.push(PendingOrderOutcome::Orphaned(entry));
                }
                _ => still_pending.push(entry),
            }
        }

        {
            let polled: Vec<&str> = snapshot.iter().map(|e| e.order_id.as_str()).collect();
            let mut entries = self.entries.lock();
            let added: Vec<PendingOrderEntry> = entries
                .iter()
                .filter(|e| !polled.contains(&e.order_id.as_str()))
                .cloned()
                .collect();
            *entries = still_pending;
            entries.extend(added);
        }
        self.persist();
        outcomes
    }

    fn persist(&self) {
        if let Some(store) = &self.store {
            let entries = self.entries.lock().clone();
            if let Err(e) = store.save(&entries) {
                warn!(error = %e, "Failed to persist pending orders");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ooda_core::mock::MockPlatform;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    fn entry(order_id: &str) -> PendingOrderEntry {
        PendingOrderEntry {
            order_id: order_id.to_string(),
            decision_id: DecisionId::new(format!("d-{order_id}")),
            asset_pair: AssetPair::new("BTC-USD").unwrap(),
            platform: "mock".to_string(),
            action: TradeAction::Buy,
            size: Size::new(dec!(0.1)),
            entry_price: Price::new(dec!(50000)),
            checks: 0,
            submitted_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_filled_and_failed_are_removed() {
        let platform = MockPlatform::default();
        platform.set_order_status("o1", OrderStatus::Filled);
        platform.set_order_status("o2", OrderStatus::Rejected);
        platform.set_order_status("o3", OrderStatus::Open);

        let tracker = PendingOrderTracker::new(5);
        tracker.track(entry("o1"));
        tracker.track(entry("o2"));
        tracker.track(entry("o3"));

        let outcomes = tracker.poll(&platform).await;
        assert_eq!(outcomes.len(), 2);
        assert!(matches!(outcomes[0], PendingOrderOutcome::Filled(_)));
        assert!(matches!(
            outcomes[1],
            PendingOrderOutcome::Failed {
                status: OrderStatus::Rejected,
                ..
            }
        ));
        assert_eq!(tracker.len(), 1);
        assert_eq!(tracker.entries()[0].checks, 1);
    }

    #[tokio::test]
    async fn test_orphan_after_max_checks() {
        let platform = MockPlatform::default();
        let tracker = PendingOrderTracker::new(3);
        tracker.track(entry("ghost"));

        assert!(tracker.poll(&platform).await.is_empty());
        assert!(tracker.poll(&platform).await.is_empty());
        let outcomes = tracker.poll(&platform).await;
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].label(), "orphaned");
        assert_eq!(outcomes[0].entry().checks, 3);
        assert!(tracker.is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_survives_restart() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pending_orders.json");

        {
            let tracker = PendingOrderTracker::with_store(5, SnapshotStore::new(&path)).unwrap();
            tracker.track(entry("o1"));
            tracker.track(entry("o2"));
        }

        let platform = MockPlatform::default();
        platform.set_order_status("o1", OrderStatus::Filled);
        let tracker = PendingOrderTracker::with_store(5, SnapshotStore::new(&path)).unwrap();
        assert_eq!(tracker.len(), 2);

        tracker.poll(&platform).await;
        let reloaded = PendingOrderTracker::with_store(5, SnapshotStore::new(&path)).unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.entries()[0].order_id, "o2");
    }

    #[test]
    fn test_track_replaces_same_order_id() {
        let tracker = PendingOrderTracker::new(5);
        tracker.track(entry("o1"));
        tracker.track(entry("o1"));
        assert_eq!(tracker.len(), 1);
    }
}
