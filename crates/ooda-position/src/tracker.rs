//! Single-position tracker.
//!
//! A [`TradeTracker`] polls the platform on a fixed interval, keeps the
//! position's P&L, peak P&L and worst drawdown from that peak, and finalizes
//! once the platform stops reporting the position. A stop request finalizes
//! it as a forced stop. Either way the resulting [`TradeMetrics`] are handed
//! to the close callback exactly once.

use std::time::Duration;

use chrono::{DateTime, Utc};
use ooda_core::{
    AssetPair, DecisionId, DynTradingPlatform, ExitReason, OutcomeSource, Pct, PlatformPosition,
    PortfolioBreakdown, PositionSide, Price, Size, TradeOutcome,
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::exit::classify_exit;
use crate::identity::TradeId;

// ============================================================================
// TrackedPosition
// ============================================================================

/// Live state of one tracked position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackedPosition {
    pub trade_id: TradeId,
    pub decision_id: Option<DecisionId>,
    pub asset_pair: AssetPair,
    pub side: PositionSide,
    pub entry_price: Price,
    pub position_size: Size,
    pub current_price: Price,
    pub current_pnl: Price,
    pub peak_pnl: Price,
    /// Largest fall from `peak_pnl` seen so far (non-negative).
    pub max_drawdown: Price,
    pub opened_at: DateTime<Utc>,
}

impl TrackedPosition {
    #[must_use]
    pub fn new(position: &PlatformPosition, decision_id: Option<DecisionId>) -> Self {
        Self {
            trade_id: TradeId::for_position(position),
            decision_id,
            asset_pair: position.asset_pair.clone(),
            side: position.side,
            entry_price: position.entry_price,
            position_size: position.size,
            current_price: position.current_price,
            current_pnl: position.unrealized_pnl,
            peak_pnl: position.unrealized_pnl,
            max_drawdown: Price::ZERO,
            opened_at: position.opened_at.unwrap_or_else(Utc::now),
        }
    }

    /// Apply one poll result.
    pub fn observe(&mut self, mark: Price, pnl: Price) {
        self.current_price = mark;
        self.current_pnl = pnl;
        if pnl > self.peak_pnl {
            self.peak_pnl = pnl;
        }
        let drawdown = self.peak_pnl - pnl;
        if drawdown > self.max_drawdown {
            self.max_drawdown = drawdown;
        }
    }

    /// Current P&L over entry notional.
    #[must_use]
    pub fn return_fraction(&self) -> f64 {
        let notional = self.position_size.notional(self.entry_price);
        if notional.is_zero() {
            return 0.0;
        }
        self.current_pnl.to_f64() / notional.to_f64()
    }
}

// ============================================================================
// TradeMetrics
// ============================================================================

/// Final report of a tracked trade.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeMetrics {
    pub trade_id: TradeId,
    pub decision_id: Option<DecisionId>,
    pub asset_pair: AssetPair,
    pub side: PositionSide,
    pub entry_price: Price,
    pub exit_price: Price,
    pub position_size: Size,
    pub realized_pnl: Price,
    pub return_fraction: f64,
    pub peak_pnl: Price,
    pub max_drawdown: Price,
    pub opened_at: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,
    pub polls: u64,
    pub exit_reason: ExitReason,
}

impl TradeMetrics {
    /// Outcome record for the portfolio memory. Trades detected without an
    /// originating decision are keyed by their trade id.
    #[must_use]
    pub fn to_outcome(&self) -> TradeOutcome {
        let decision_id = self
            .decision_id
            .clone()
            .unwrap_or_else(|| DecisionId::new(format!("trade-{}", self.trade_id)));
        TradeOutcome {
            decision_id,
            asset_pair: self.asset_pair.clone(),
            action: self.side.opening_action(),
            position_size: self.position_size,
            entry_price: self.entry_price,
            source: OutcomeSource::Live,
            opened_at: self.opened_at,
            exit_price: Some(self.exit_price),
            realized_pnl: Some(self.realized_pnl),
            closed_at: Some(self.closed_at),
            exit_reason: Some(self.exit_reason),
        }
    }
}

// ============================================================================
// TradeTracker
// ============================================================================

pub struct TradeTracker {
    position: TrackedPosition,
    platform: DynTradingPlatform,
    cancel: CancellationToken,
    poll_interval: Duration,
    call_timeout: Duration,
    stop_loss: Pct,
    take_profit: Pct,
    polls: u64,
}

impl TradeTracker {
    #[must_use]
    pub fn new(
        position: TrackedPosition,
        platform: DynTradingPlatform,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            position,
            platform,
            cancel,
            poll_interval: Duration::from_secs(5),
            call_timeout: Duration::from_secs(10),
            stop_loss: Pct::from_fraction(0.0),
            take_profit: Pct::from_fraction(0.0),
            polls: 0,
        }
    }

    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration, call_timeout: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.call_timeout = call_timeout;
        self
    }

    /// Per-trade levels used by the exit heuristic.
    #[must_use]
    pub fn with_exit_levels(mut self, stop_loss: Pct, take_profit: Pct) -> Self {
        self.stop_loss = stop_loss;
        self.take_profit = take_profit;
        self
    }

    #[must_use]
    pub fn position(&self) -> &TrackedPosition {
        &self.position
    }

    /// Track until the position closes or the tracker is stopped, then hand
    /// the metrics to `on_close`.
    pub async fn run<F>(mut self, on_close: F)
    where
        F: FnOnce(TradeMetrics) + Send,
    {
        info!(
            trade_id = %self.position.trade_id,
            asset_pair = %self.position.asset_pair,
            side = %self.position.side,
            entry_price = %self.position.entry_price,
            "TradeTracker started"
        );

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        let forced = loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break true,
                _ = ticker.tick() => {}
            }

            let call = tokio::time::timeout(
                self.call_timeout,
                self.platform.get_portfolio_breakdown(),
            );
            let result = tokio::select! {
                _ = self.cancel.cancelled() => break true,
                result = call => result,
            };
            self.polls += 1;

            match result {
                Ok(Ok(breakdown)) => match self.find(&breakdown) {
                    Some(live) => {
                        self.position.observe(live.current_price, live.unrealized_pnl);
                        trace!(
                            trade_id = %self.position.trade_id,
                            pnl = %self.position.current_pnl,
                            peak = %self.position.peak_pnl,
                            "Position polled"
                        );
                    }
                    None => break false,
                },
                Ok(Err(e)) => {
                    warn!(trade_id = %self.position.trade_id, error = %e, "Position poll failed");
                }
                Err(_) => {
                    warn!(
                        trade_id = %self.position.trade_id,
                        timeout_ms = self.call_timeout.as_millis() as u64,
                        "Position poll timed out"
                    );
                }
            }
        };

        let metrics = self.finalize(forced);
        info!(
            trade_id = %metrics.trade_id,
            asset_pair = %metrics.asset_pair,
            exit_reason = %metrics.exit_reason,
            realized_pnl = %metrics.realized_pnl,
            polls = metrics.polls,
            "Trade closed"
        );
        on_close(metrics);
    }

    fn find(&self, breakdown: &PortfolioBreakdown) -> Option<PlatformPosition> {
        breakdown
            .futures_positions
            .iter()
            .filter_map(|raw| match raw.validate() {
                Ok(p) => Some(p),
                Err(e) => {
                    debug!(error = %e, "Skipping malformed position while polling");
                    None
                }
            })
            .find(|p| TradeId::for_position(p) == self.position.trade_id)
    }

    fn finalize(&self, forced: bool) -> TradeMetrics {
        let p = &self.position;
        let return_fraction = p.return_fraction();
        TradeMetrics {
            trade_id: p.trade_id.clone(),
            decision_id: p.decision_id.clone(),
            asset_pair: p.asset_pair.clone(),
            side: p.side,
            entry_price: p.entry_price,
            exit_price: p.current_price,
            position_size: p.position_size,
            realized_pnl: p.current_pnl,
            return_fraction,
            peak_pnl: p.peak_pnl,
            max_drawdown: p.max_drawdown,
            opened_at: p.opened_at,
            closed_at: Utc::now(),
            polls: self.polls,
            exit_reason: classify_exit(forced, return_fraction, self.stop_loss, self.take_profit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ooda_core::mock::MockPlatform;
    use ooda_core::RawFuturesPosition;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use tokio::sync::oneshot;

    fn raw(mark: rust_decimal::Decimal) -> RawFuturesPosition {
        RawFuturesPosition {
            product_id: Some("BTC-USD".to_string()),
            side: Some("LONG".to_string()),
            contracts: Some(dec!(1)),
            entry_price: Some(dec!(100)),
            current_price: Some(mark),
            unrealized_pnl: None,
            opened_at: None,
        }
    }

    fn tracked() -> TrackedPosition {
        TrackedPosition::new(&raw(dec!(100)).validate().unwrap(), Some(DecisionId::new("d1")))
    }

    #[test]
    fn test_observe_tracks_peak_and_drawdown() {
        let mut p = tracked();
        p.observe(Price::new(dec!(110)), Price::new(dec!(10)));
        p.observe(Price::new(dec!(104)), Price::new(dec!(4)));
        p.observe(Price::new(dec!(107)), Price::new(dec!(7)));

        assert_eq!(p.peak_pnl, Price::new(dec!(10)));
        assert_eq!(p.max_drawdown, Price::new(dec!(6)));
        assert_eq!(p.current_pnl, Price::new(dec!(7)));
        assert!((p.return_fraction() - 0.07).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_finalizes_when_position_disappears() {
        let platform = Arc::new(MockPlatform::default());
        platform.set_positions(vec![raw(dec!(106))]);

        let tracker = TradeTracker::new(tracked(), platform.clone(), CancellationToken::new())
            .with_poll_interval(Duration::from_millis(10), Duration::from_millis(200))
            .with_exit_levels(Pct::new(2.0), Pct::new(5.0));

        let (tx, rx) = oneshot::channel();
        let handle = tokio::spawn(tracker.run(move |m| {
            let _ = tx.send(m);
        }));

        tokio::time::sleep(Duration::from_millis(50)).await;
        platform.set_positions(Vec::new());

        let metrics = tokio::time::timeout(Duration::from_secs(2), rx)
            .await
            .unwrap()
            .unwrap();
        handle.await.unwrap();

        assert_eq!(metrics.exit_reason, ExitReason::TakeProfit);
        assert_eq!(metrics.realized_pnl, Price::new(dec!(6)));
        assert_eq!(metrics.decision_id, Some(DecisionId::new("d1")));
        assert!(metrics.polls >= 2);
    }

    #[tokio::test]
    async fn test_cancel_is_forced_stop() {
        let platform = Arc::new(MockPlatform::default());
        platform.set_positions(vec![raw(dec!(99))]);
        let cancel = CancellationToken::new();

        let tracker = TradeTracker::new(tracked(), platform, cancel.clone())
            .with_poll_interval(Duration::from_millis(10), Duration::from_millis(200));

        let (tx, rx) = oneshot::channel();
        let handle = tokio::spawn(tracker.run(move |m| {
            let _ = tx.send(m);
        }));
        tokio::time::sleep(Duration::from_millis(30)).await;
        cancel.cancel();

        let metrics = rx.await.unwrap();
        handle.await.unwrap();
        assert_eq!(metrics.exit_reason, ExitReason::ForcedStop);
    }

    #[test]
    fn test_outcome_without_decision_uses_trade_id() {
        let mut p = tracked();
        p.decision_id = None;
        let tracker = TradeTracker::new(
            p,
            Arc::new(MockPlatform::default()),
            CancellationToken::new(),
        );
        let outcome = tracker.finalize(false).to_outcome();
        assert!(outcome.decision_id.as_str().starts_with("trade-"));
        assert_eq!(outcome.source, OutcomeSource::Live);
        assert_eq!(outcome.exit_reason, Some(ExitReason::Manual));
    }
}
