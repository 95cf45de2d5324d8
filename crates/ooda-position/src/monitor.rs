//! Trade monitor: bounded tracker pool with position detection.
//!
//! The monitor runs its own detection tick, separate from the agent's
//! cycle. Each tick it:
//!
//! 1. Reads open positions from the platform
//! 2. Checks portfolio P&L against the portfolio stop-loss / take-profit
//!    and pauses new entries when either is crossed
//! 3. Queues positions whose [`TradeId`] is not tracked yet, picking up a
//!    pre-associated decision id for the pair when one exists
//! 4. Starts trackers from the queue while worker slots are free
//!
//! Finished trackers push their [`TradeMetrics`] onto an unbounded queue
//! that the agent drains once per LEARNING pass.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use ooda_core::{
    AssetPair, CoreError, DecisionId, DynTradingPlatform, Pct, PlatformPosition, Price,
};
use ooda_telemetry::Metrics;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{PositionError, PositionResult};
use crate::identity::{DecisionAssociations, TradeId};
use crate::tracker::{TrackedPosition, TradeMetrics, TradeTracker};

// ============================================================================
// TradeMonitorConfig
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeMonitorConfig {
    /// Concurrent trackers. Further positions wait in the queue.
    #[serde(default = "default_max_concurrent_trackers")]
    pub max_concurrent_trackers: usize,

    #[serde(default = "default_detection_interval_ms")]
    pub detection_interval_ms: u64,

    /// Poll interval of each tracker.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Deadline for a single platform call.
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,

    #[serde(default = "default_association_ttl_secs")]
    pub association_ttl_secs: u64,

    /// Portfolio loss from the monitor baseline that pauses entries.
    /// Zero disables.
    #[serde(default = "default_portfolio_stop_loss_pct")]
    pub portfolio_stop_loss_pct: Pct,

    /// Portfolio gain from the monitor baseline that pauses entries.
    /// Zero disables.
    #[serde(default = "default_portfolio_take_profit_pct")]
    pub portfolio_take_profit_pct: Pct,

    /// Per-trade levels used to classify exits.
    #[serde(default = "default_trade_stop_loss_pct")]
    pub trade_stop_loss_pct: Pct,

    #[serde(default = "default_trade_take_profit_pct")]
    pub trade_take_profit_pct: Pct,

    /// How long `stop` waits for each tracker.
    #[serde(default = "default_join_timeout_ms")]
    pub join_timeout_ms: u64,
}

fn default_max_concurrent_trackers() -> usize {
    2
}

fn default_detection_interval_ms() -> u64 {
    5_000
}

fn default_poll_interval_ms() -> u64 {
    5_000
}

fn default_call_timeout_ms() -> u64 {
    10_000
}

fn default_association_ttl_secs() -> u64 {
    300
}

fn default_portfolio_stop_loss_pct() -> Pct {
    Pct::new(10.0)
}

fn default_portfolio_take_profit_pct() -> Pct {
    Pct::new(20.0)
}

fn default_trade_stop_loss_pct() -> Pct {
    Pct::new(2.0)
}

fn default_trade_take_profit_pct() -> Pct {
    Pct::new(5.0)
}

fn default_join_timeout_ms() -> u64 {
    5_000
}

impl Default for TradeMonitorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_trackers: default_max_concurrent_trackers(),
            detection_interval_ms: default_detection_interval_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            call_timeout_ms: default_call_timeout_ms(),
            association_ttl_secs: default_association_ttl_secs(),
            portfolio_stop_loss_pct: default_portfolio_stop_loss_pct(),
            portfolio_take_profit_pct: default_portfolio_take_profit_pct(),
            trade_stop_loss_pct: default_trade_stop_loss_pct(),
            trade_take_profit_pct: default_trade_take_profit_pct(),
            join_timeout_ms: default_join_timeout_ms(),
        }
    }
}

impl TradeMonitorConfig {
    #[must_use]
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    #[must_use]
    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }
}

// ============================================================================
// TradeMonitor
// ============================================================================

struct TrackerSlot {
    asset_pair: AssetPair,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

struct QueuedPosition {
    trade_id: TradeId,
    position: PlatformPosition,
    decision_id: Option<DecisionId>,
}

pub struct TradeMonitor {
    config: TradeMonitorConfig,
    platform: DynTradingPlatform,
    /// Running trackers.
    active: DashMap<TradeId, TrackerSlot>,
    /// Detected positions waiting for a slot. The lock also serializes
    /// slot allocation.
    queue: Mutex<VecDeque<QueuedPosition>>,
    associations: Mutex<DecisionAssociations>,
    /// Venue positions the agent declined to adopt. Detection skips them
    /// until they leave the venue.
    ignored: Mutex<HashSet<TradeId>>,
    closed_tx: mpsc::UnboundedSender<TradeMetrics>,
    closed_rx: Mutex<mpsc::UnboundedReceiver<TradeMetrics>>,
    paused: watch::Sender<bool>,
    pause_reason: Mutex<Option<String>>,
    /// Portfolio value the SL/TP pause is measured from.
    baseline: Mutex<Option<Price>>,
    shutdown: CancellationToken,
    detection: Mutex<Option<JoinHandle<()>>>,
}

impl TradeMonitor {
    #[must_use]
    pub fn new(config: TradeMonitorConfig, platform: DynTradingPlatform) -> Arc<Self> {
        let (closed_tx, closed_rx) = mpsc::unbounded_channel();
        let (paused, _) = watch::channel(false);
        let associations =
            DecisionAssociations::new(Duration::from_secs(config.association_ttl_secs));
        Arc::new(Self {
            config,
            platform,
            active: DashMap::new(),
            queue: Mutex::new(VecDeque::new()),
            associations: Mutex::new(associations),
            ignored: Mutex::new(HashSet::new()),
            closed_tx,
            closed_rx: Mutex::new(closed_rx),
            paused,
            pause_reason: Mutex::new(None),
            baseline: Mutex::new(None),
            shutdown: CancellationToken::new(),
            detection: Mutex::new(None),
        })
    }

    #[must_use]
    pub fn config(&self) -> &TradeMonitorConfig {
        &self.config
    }

    /// Spawn the detection loop. A second call is a no-op.
    pub fn start(self: &Arc<Self>) {
        let mut detection = self.detection.lock();
        if detection.is_some() || self.shutdown.is_cancelled() {
            return;
        }
        let monitor = Arc::clone(self);
        *detection = Some(tokio::spawn(monitor.run_detection()));
    }

    #[must_use]
    pub fn is_started(&self) -> bool {
        self.detection.lock().is_some()
    }

    /// Keep detection from adopting these positions.
    pub fn ignore(&self, positions: &[PlatformPosition]) {
        let mut ignored = self.ignored.lock();
        for position in positions {
            let trade_id = TradeId::for_position(position);
            debug!(%trade_id, asset_pair = %position.asset_pair, "Ignoring venue position");
            ignored.insert(trade_id);
        }
    }

    async fn run_detection(self: Arc<Self>) {
        info!(
            max_trackers = self.config.max_concurrent_trackers,
            interval_ms = self.config.detection_interval_ms,
            "TradeMonitor detection started"
        );

        let interval = Duration::from_millis(self.config.detection_interval_ms);
        // first pass one interval in: positions known at start are tracked explicitly
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }
            let result = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                result = self.detect_once() => result,
            };
            if let Err(e) = result {
                warn!(error = %e, "Position detection failed");
            }
        }

        debug!("TradeMonitor detection stopped");
    }

    /// One detection pass. Returns how many new positions were queued.
    pub async fn detect_once(self: &Arc<Self>) -> PositionResult<usize> {
        if self.shutdown.is_cancelled() {
            return Err(PositionError::ShuttingDown);
        }

        let timeout = self.config.call_timeout();
        let breakdown = tokio::time::timeout(timeout, self.platform.get_portfolio_breakdown())
            .await
            .map_err(|_| CoreError::Timeout(timeout.as_millis() as u64))??;

        self.check_portfolio(breakdown.total_value_usd);

        let now = Utc::now();
        let mut queued = 0;
        let mut seen = HashSet::new();
        for raw in &breakdown.futures_positions {
            let position = match raw.validate() {
                Ok(p) => p,
                Err(e) => {
                    warn!(error = %e, "Skipping malformed position");
                    continue;
                }
            };
            let trade_id = TradeId::for_position(&position);
            seen.insert(trade_id.clone());
            if self.is_tracked(&trade_id) || self.ignored.lock().contains(&trade_id) {
                continue;
            }
            let decision_id = self.associations.lock().take(&position.asset_pair, now);
            if decision_id.is_none() {
                debug!(
                    %trade_id,
                    asset_pair = %position.asset_pair,
                    "Detected position without an originating decision"
                );
            }
            if self.enqueue(trade_id, position, decision_id) {
                queued += 1;
            }
        }

        // an ignored position that left the venue is forgotten
        self.ignored.lock().retain(|id| seen.contains(id));

        let purged = self.associations.lock().purge_expired(now);
        if purged > 0 {
            debug!(purged, "Purged expired decision associations");
        }

        self.fill_slots();
        Ok(queued)
    }

    /// Track a known position (e.g. one adopted at startup) under its
    /// decision id. Returns false if it is already tracked or queued.
    pub fn track(self: &Arc<Self>, position: PlatformPosition, decision_id: Option<DecisionId>) -> bool {
        let trade_id = TradeId::for_position(&position);
        let queued = self.enqueue(trade_id, position, decision_id);
        self.fill_slots();
        queued
    }

    /// Pre-associate `decision_id` with the next position detected on
    /// `asset_pair`.
    pub fn associate_decision(&self, asset_pair: AssetPair, decision_id: DecisionId) {
        self.associations
            .lock()
            .associate(asset_pair, decision_id, Utc::now());
    }

    fn enqueue(
        &self,
        trade_id: TradeId,
        position: PlatformPosition,
        decision_id: Option<DecisionId>,
    ) -> bool {
        let mut queue = self.queue.lock();
        if self.active.contains_key(&trade_id) || queue.iter().any(|q| q.trade_id == trade_id) {
            return false;
        }
        info!(
            %trade_id,
            asset_pair = %position.asset_pair,
            side = %position.side,
            decision_id = decision_id.as_ref().map(|d| d.as_str()).unwrap_or("-"),
            "Queued position for tracking"
        );
        queue.push_back(QueuedPosition {
            trade_id,
            position,
            decision_id,
        });
        true
    }

    /// Start trackers from the queue while slots are free.
    fn fill_slots(self: &Arc<Self>) {
        let mut queue = self.queue.lock();
        while self.active.len() < self.config.max_concurrent_trackers
            && !self.shutdown.is_cancelled()
        {
            let Some(next) = queue.pop_front() else {
                break;
            };
            self.spawn_tracker(next);
        }
        Metrics::trackers_set(self.active.len(), queue.len());
    }

    fn spawn_tracker(self: &Arc<Self>, queued: QueuedPosition) {
        let cancel = self.shutdown.child_token();
        let tracked = TrackedPosition::new(&queued.position, queued.decision_id);
        let trade_id = queued.trade_id;

        self.active.insert(
            trade_id.clone(),
            TrackerSlot {
                asset_pair: tracked.asset_pair.clone(),
                cancel: cancel.clone(),
                handle: None,
            },
        );

        let tracker = TradeTracker::new(tracked, Arc::clone(&self.platform), cancel)
            .with_poll_interval(
                Duration::from_millis(self.config.poll_interval_ms),
                self.config.call_timeout(),
            )
            .with_exit_levels(
                self.config.trade_stop_loss_pct,
                self.config.trade_take_profit_pct,
            );

        let monitor = Arc::clone(self);
        let handle = tokio::spawn(async move {
            tracker
                .run(|metrics| monitor.on_tracker_closed(metrics))
                .await;
        });

        // The tracker may already have finished and removed its slot
        if let Some(mut slot) = self.active.get_mut(&trade_id) {
            slot.handle = Some(handle);
        }
    }

    fn on_tracker_closed(self: &Arc<Self>, metrics: TradeMetrics) {
        self.active.remove(&metrics.trade_id);
        Metrics::trade_closed(metrics.exit_reason.as_str());
        if self.closed_tx.send(metrics).is_err() {
            warn!("Closed-trade queue receiver dropped");
        }
        self.fill_slots();
    }

    /// Take every closed trade reported since the last drain, oldest first.
    pub fn drain_closed_trades(&self) -> Vec<TradeMetrics> {
        let mut rx = self.closed_rx.lock();
        let mut drained = Vec::new();
        while let Ok(metrics) = rx.try_recv() {
            drained.push(metrics);
        }
        drained
    }

    #[must_use]
    pub fn is_tracked(&self, trade_id: &TradeId) -> bool {
        self.active.contains_key(trade_id)
            || self.queue.lock().iter().any(|q| &q.trade_id == trade_id)
    }

    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    #[must_use]
    pub fn queued_count(&self) -> usize {
        self.queue.lock().len()
    }

    /// Asset pairs with a running tracker.
    #[must_use]
    pub fn active_pairs(&self) -> Vec<AssetPair> {
        self.active.iter().map(|e| e.value().asset_pair.clone()).collect()
    }

    // ------------------------------------------------------------------------
    // Portfolio stop-loss / take-profit pause
    // ------------------------------------------------------------------------

    /// Compare portfolio value with the baseline and pause on a crossing.
    /// The first observation after construction or `resume` becomes the
    /// baseline.
    pub fn check_portfolio(&self, total_value: Price) {
        let baseline = {
            let mut baseline = self.baseline.lock();
            match *baseline {
                Some(b) => b,
                None => {
                    *baseline = Some(total_value);
                    return;
                }
            }
        };
        if self.is_paused() {
            return;
        }
        let Some(pnl) = total_value.fraction_from(baseline) else {
            return;
        };

        let sl = self.config.portfolio_stop_loss_pct.fraction();
        let tp = self.config.portfolio_take_profit_pct.fraction();
        let reason = if sl > 0.0 && pnl <= -sl {
            Some(format!(
                "portfolio stop-loss: {:.2}% <= -{}",
                pnl * 100.0,
                self.config.portfolio_stop_loss_pct
            ))
        } else if tp > 0.0 && pnl >= tp {
            Some(format!(
                "portfolio take-profit: {:.2}% >= {}",
                pnl * 100.0,
                self.config.portfolio_take_profit_pct
            ))
        } else {
            None
        };

        if let Some(reason) = reason {
            warn!(%baseline, current = %total_value, %reason, "Pausing new trade entries");
            *self.pause_reason.lock() = Some(reason);
            self.paused.send_replace(true);
            Metrics::monitor_paused_set(true);
        }
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        *self.paused.borrow()
    }

    #[must_use]
    pub fn pause_reason(&self) -> Option<String> {
        self.pause_reason.lock().clone()
    }

    /// Watch the pause flag.
    #[must_use]
    pub fn subscribe_pause(&self) -> watch::Receiver<bool> {
        self.paused.subscribe()
    }

    /// Clear the pause. The next observed portfolio value becomes the new
    /// baseline.
    pub fn resume(&self) {
        if self.paused.send_replace(false) {
            info!("Resuming new trade entries");
        }
        *self.pause_reason.lock() = None;
        *self.baseline.lock() = None;
        Metrics::monitor_paused_set(false);
    }

    // ------------------------------------------------------------------------
    // Shutdown
    // ------------------------------------------------------------------------

    /// Stop detection and every tracker, joining each with the configured
    /// timeout. Returns how many trackers did not stop in time.
    pub async fn stop(&self) -> usize {
        self.shutdown.cancel();
        let join_timeout = self.config.join_timeout();

        let detection = self.detection.lock().take();
        if let Some(handle) = detection {
            if tokio::time::timeout(join_timeout, handle).await.is_err() {
                warn!("Detection loop did not stop in time");
            }
        }

        self.queue.lock().clear();
        let handles: Vec<(TradeId, JoinHandle<()>)> = self
            .active
            .iter_mut()
            .filter_map(|mut entry| {
                entry.value().cancel.cancel();
                let trade_id = entry.key().clone();
                entry.value_mut().handle.take().map(|h| (trade_id, h))
            })
            .collect();

        let mut timed_out = 0;
        for (trade_id, handle) in handles {
            let abort = handle.abort_handle();
            match tokio::time::timeout(join_timeout, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(%trade_id, error = %e, "Tracker task failed"),
                Err(_) => {
                    warn!(
                        %trade_id,
                        timeout_ms = join_timeout.as_millis() as u64,
                        "Tracker did not stop in time"
                    );
                    abort.abort();
                    timed_out += 1;
                }
            }
        }

        info!(timed_out, "TradeMonitor stopped");
        timed_out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ooda_core::mock::MockPlatform;
    use ooda_core::{ExitReason, RawFuturesPosition};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn raw(pair: &str, entry: Decimal) -> RawFuturesPosition {
        RawFuturesPosition {
            product_id: Some(pair.to_string()),
            side: Some("LONG".to_string()),
            contracts: Some(dec!(1)),
            entry_price: Some(entry),
            current_price: Some(entry),
            unrealized_pnl: None,
            opened_at: None,
        }
    }

    fn fast_config() -> TradeMonitorConfig {
        TradeMonitorConfig {
            detection_interval_ms: 20,
            poll_interval_ms: 10,
            call_timeout_ms: 500,
            join_timeout_ms: 500,
            ..TradeMonitorConfig::default()
        }
    }

    async fn wait_for<F: Fn() -> bool>(cond: F) {
        for _ in 0..200 {
            if cond() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test]
    async fn test_pool_is_bounded_and_queue_drains() {
        let platform = Arc::new(MockPlatform::default());
        platform.set_positions(vec![
            raw("BTC-USD", dec!(100)),
            raw("ETH-USD", dec!(10)),
            raw("SOL-USD", dec!(1)),
        ]);
        let monitor = TradeMonitor::new(fast_config(), platform.clone());

        assert_eq!(monitor.detect_once().await.unwrap(), 3);
        assert_eq!(monitor.active_count(), 2);
        assert_eq!(monitor.queued_count(), 1);

        // Re-detection does not duplicate
        assert_eq!(monitor.detect_once().await.unwrap(), 0);

        // Closing everything frees slots; the queued position gets one
        platform.set_positions(vec![raw("SOL-USD", dec!(1))]);
        wait_for(|| monitor.queued_count() == 0 && monitor.active_count() == 1).await;
        assert_eq!(monitor.active_pairs(), vec![AssetPair::new("SOL-USD").unwrap()]);

        let closed = monitor.drain_closed_trades();
        assert_eq!(closed.len(), 2);
        assert!(closed.iter().all(|m| m.exit_reason == ExitReason::Manual));

        assert_eq!(monitor.stop().await, 0);
    }

    #[tokio::test]
    async fn test_ignored_positions_are_not_adopted() {
        let platform = Arc::new(MockPlatform::default());
        platform.set_positions(vec![raw("BTC-USD", dec!(100)), raw("ETH-USD", dec!(10))]);
        let monitor = TradeMonitor::new(fast_config(), platform.clone());

        let btc = raw("BTC-USD", dec!(100)).validate().unwrap();
        monitor.ignore(&[btc]);
        assert_eq!(monitor.detect_once().await.unwrap(), 1);
        assert_eq!(monitor.active_pairs(), vec![AssetPair::new("ETH-USD").unwrap()]);

        // once the venue drops it, the same identity is adopted again
        platform.set_positions(vec![raw("ETH-USD", dec!(10))]);
        monitor.detect_once().await.unwrap();
        platform.set_positions(vec![raw("ETH-USD", dec!(10)), raw("BTC-USD", dec!(100))]);
        assert_eq!(monitor.detect_once().await.unwrap(), 1);

        monitor.stop().await;
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let platform = Arc::new(MockPlatform::default());
        let monitor = TradeMonitor::new(fast_config(), platform.clone());
        assert!(!monitor.is_started());

        monitor.start();
        monitor.start();
        assert!(monitor.is_started());

        monitor.stop().await;
        assert!(!monitor.is_started());
        monitor.start();
        assert!(!monitor.is_started());
    }

    #[tokio::test]
    async fn test_association_attaches_decision_id() {
        let platform = Arc::new(MockPlatform::default());
        let monitor = TradeMonitor::new(fast_config(), platform.clone());
        monitor.associate_decision(AssetPair::new("BTC-USD").unwrap(), DecisionId::new("d-42"));

        platform.set_positions(vec![raw("BTC-USD", dec!(100))]);
        monitor.detect_once().await.unwrap();
        platform.set_positions(Vec::new());

        wait_for(|| monitor.active_count() == 0).await;
        let closed = monitor.drain_closed_trades();
        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].decision_id, Some(DecisionId::new("d-42")));
        monitor.stop().await;
    }

    #[tokio::test]
    async fn test_recovered_position_is_not_redetected() {
        let platform = Arc::new(MockPlatform::default());
        let position = raw("BTC-USD", dec!(100));
        platform.set_positions(vec![position.clone()]);
        let monitor = TradeMonitor::new(fast_config(), platform.clone());

        assert!(monitor.track(position.validate().unwrap(), Some(DecisionId::new("rec-1"))));
        assert_eq!(monitor.detect_once().await.unwrap(), 0);
        assert_eq!(monitor.active_count(), 1);
        monitor.stop().await;
    }

    #[tokio::test]
    async fn test_portfolio_stop_loss_pauses_until_resume() {
        let platform = Arc::new(MockPlatform::default());
        let monitor = TradeMonitor::new(
            TradeMonitorConfig {
                portfolio_stop_loss_pct: Pct::new(10.0),
                ..fast_config()
            },
            platform,
        );
        let mut rx = monitor.subscribe_pause();

        monitor.check_portfolio(Price::new(dec!(10000)));
        monitor.check_portfolio(Price::new(dec!(9500)));
        assert!(!monitor.is_paused());

        monitor.check_portfolio(Price::new(dec!(9000)));
        assert!(monitor.is_paused());
        assert!(rx.has_changed().unwrap());
        assert!(*rx.borrow_and_update());
        assert!(monitor.pause_reason().unwrap().contains("stop-loss"));

        monitor.resume();
        assert!(!monitor.is_paused());
        // New baseline: 9000 -> 8500 is only -5.6%
        monitor.check_portfolio(Price::new(dec!(9000)));
        monitor.check_portfolio(Price::new(dec!(8500)));
        assert!(!monitor.is_paused());
    }

    #[tokio::test]
    async fn test_stop_forces_trackers_out() {
        let platform = Arc::new(MockPlatform::default());
        platform.set_positions(vec![raw("BTC-USD", dec!(100))]);
        let monitor = TradeMonitor::new(fast_config(), platform);
        monitor.start();

        wait_for(|| monitor.active_count() == 1).await;
        assert_eq!(monitor.stop().await, 0);

        let closed = monitor.drain_closed_trades();
        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].exit_reason, ExitReason::ForcedStop);
        assert_eq!(monitor.active_count(), 0);
    }
}
