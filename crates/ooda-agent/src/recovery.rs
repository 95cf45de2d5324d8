//! Startup recovery of open positions.
//!
//! The venue is the source of truth after a restart. Recovery reads its open
//! positions, keeps at most `limit` of them and closes the rest. Anything
//! short of a clean result leaves the agent with no positions:
//! - the query fails after one retry or the whole run exceeds its deadline
//! - a reported position is malformed
//! - any close of an excess position fails

use std::cmp::Ordering;
use std::time::Duration;

use ooda_core::{PlatformPosition, TradingPlatform};
use ooda_executor::{retry_with_backoff, RetryConfig};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Result of a recovery run.
#[derive(Debug, Clone, Default)]
pub struct RecoveryOutcome {
    /// Positions adopted by the agent.
    pub kept: Vec<PlatformPosition>,
    /// Excess positions flattened during recovery.
    pub closed: Vec<PlatformPosition>,
    /// Why recovery fell back to an empty position set.
    pub failure: Option<String>,
    /// Well-formed venue positions left open by a failed recovery. The agent
    /// does not adopt them.
    pub abandoned: Vec<PlatformPosition>,
}

impl RecoveryOutcome {
    fn failed(reason: impl Into<String>) -> Self {
        Self {
            failure: Some(reason.into()),
            ..Self::default()
        }
    }

    fn abandon(mut self, positions: Vec<PlatformPosition>) -> Self {
        self.abandoned = positions;
        self
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

/// Order positions best-first: higher unrealized P&L, then older.
///
/// A position without an open time sorts after one that has it.
fn rank(a: &PlatformPosition, b: &PlatformPosition) -> Ordering {
    b.unrealized_pnl
        .cmp(&a.unrealized_pnl)
        .then_with(|| match (a.opened_at, b.opened_at) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
}

/// Split positions into the `limit` to keep and the rest to close.
#[must_use]
pub fn select_positions(
    mut positions: Vec<PlatformPosition>,
    limit: usize,
) -> (Vec<PlatformPosition>, Vec<PlatformPosition>) {
    positions.sort_by(rank);
    let excess = positions.split_off(limit.min(positions.len()));
    (positions, excess)
}

/// Startup recovery against one platform.
pub struct StartupRecovery<'a> {
    platform: &'a dyn TradingPlatform,
    limit: usize,
    deadline: Duration,
    retry: RetryConfig,
}

impl<'a> StartupRecovery<'a> {
    /// `retry` supplies the per-call timeout and backoff. The position query
    /// gets at most two attempts. Each close is attempted once.
    #[must_use]
    pub fn new(
        platform: &'a dyn TradingPlatform,
        limit: usize,
        deadline: Duration,
        retry: &RetryConfig,
    ) -> Self {
        Self {
            platform,
            limit,
            deadline,
            retry: RetryConfig {
                max_attempts: 2,
                ..retry.clone()
            },
        }
    }

    pub async fn run(&self, shutdown: &CancellationToken) -> RecoveryOutcome {
        let outcome = match tokio::time::timeout(self.deadline, self.recover(shutdown)).await {
            Ok(outcome) => outcome,
            Err(_) => RecoveryOutcome::failed(format!(
                "recovery exceeded {}ms",
                self.deadline.as_millis()
            )),
        };
        match &outcome.failure {
            None => info!(
                kept = outcome.kept.len(),
                closed = outcome.closed.len(),
                "Startup recovery complete"
            ),
            Some(reason) => warn!(
                %reason,
                "Startup recovery failed, starting with no positions"
            ),
        }
        outcome
    }

    async fn recover(&self, shutdown: &CancellationToken) -> RecoveryOutcome {
        let breakdown = match retry_with_backoff(
            &self.retry,
            "get_portfolio_breakdown",
            shutdown,
            || self.platform.get_portfolio_breakdown(),
        )
        .await
        {
            Ok(b) => b,
            Err(e) => return RecoveryOutcome::failed(e.to_string()),
        };

        let positions = match breakdown.validated_positions() {
            Ok(p) => p,
            Err(e) => {
                let well_formed = breakdown
                    .futures_positions
                    .iter()
                    .filter_map(|raw| raw.validate().ok())
                    .collect();
                return RecoveryOutcome::failed(format!("venue positions rejected: {e}"))
                    .abandon(well_formed);
            }
        };

        let (kept, excess) = select_positions(positions, self.limit);
        if !excess.is_empty() {
            info!(
                open = kept.len() + excess.len(),
                limit = self.limit,
                closing = excess.len(),
                "More open positions than allowed, closing the lowest ranked"
            );
        }

        // a timed-out close may still have gone through, so a close is never repeated
        let once = RetryConfig {
            max_attempts: 1,
            ..self.retry.clone()
        };
        for (i, position) in excess.iter().enumerate() {
            let closed = retry_with_backoff(&once, "close_position", shutdown, || {
                self.platform.close_position(position)
            })
            .await;
            if let Err(e) = closed {
                let mut open = kept.clone();
                open.extend_from_slice(&excess[i..]);
                return RecoveryOutcome::failed(format!(
                    "closing {} {} failed: {e}",
                    position.asset_pair, position.side
                ))
                .abandon(open);
            }
            info!(
                asset_pair = %position.asset_pair,
                side = %position.side,
                unrealized_pnl = %position.unrealized_pnl,
                "Closed excess position"
            );
        }

        RecoveryOutcome {
            kept,
            closed: excess,
            failure: None,
            abandoned: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use ooda_core::mock::MockPlatform;
    use ooda_core::{AssetPair, CoreError, Price, RawFuturesPosition};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn raw(pair: &str, pnl: Decimal, opened_min: u32) -> RawFuturesPosition {
        RawFuturesPosition {
            product_id: Some(pair.to_string()),
            side: Some("LONG".to_string()),
            contracts: Some(dec!(1)),
            entry_price: Some(dec!(100)),
            current_price: Some(dec!(100) + pnl),
            unrealized_pnl: Some(pnl),
            opened_at: Some(Utc.with_ymd_and_hms(2026, 1, 1, 0, opened_min, 0).unwrap()),
        }
    }

    fn fast_retry() -> RetryConfig {
        RetryConfig {
            base_delay_ms: 1,
            max_delay_ms: 5,
            call_timeout_ms: 200,
            ..RetryConfig::default()
        }
    }

    fn pairs(positions: &[PlatformPosition]) -> Vec<String> {
        positions.iter().map(|p| p.asset_pair.to_string()).collect()
    }

    #[tokio::test]
    async fn test_keeps_best_two_and_closes_the_rest() {
        let platform = MockPlatform::default();
        platform.set_positions(vec![
            raw("AAA-USD", dec!(500), 2),
            raw("BBB-USD", dec!(500), 1),
            raw("CCC-USD", dec!(-50), 0),
        ]);

        let recovery = StartupRecovery::new(&platform, 2, Duration::from_secs(5), &fast_retry());
        let outcome = recovery.run(&CancellationToken::new()).await;

        assert!(outcome.is_success());
        // equal P&L: the older position ranks first
        assert_eq!(pairs(&outcome.kept), vec!["BBB-USD", "AAA-USD"]);
        assert_eq!(pairs(&outcome.closed), vec!["CCC-USD"]);
        assert_eq!(pairs(&platform.closed()), vec!["CCC-USD"]);
    }

    #[tokio::test]
    async fn test_failed_close_keeps_nothing() {
        let platform = MockPlatform::default();
        platform.set_positions(vec![
            raw("AAA-USD", dec!(500), 0),
            raw("BBB-USD", dec!(100), 0),
            raw("CCC-USD", dec!(-50), 0),
        ]);
        platform.fail_close_for(AssetPair::new("CCC-USD").unwrap());

        let recovery = StartupRecovery::new(&platform, 2, Duration::from_secs(5), &fast_retry());
        let outcome = recovery.run(&CancellationToken::new()).await;

        assert!(!outcome.is_success());
        assert!(outcome.kept.is_empty());
        assert_eq!(pairs(&outcome.abandoned), vec!["AAA-USD", "BBB-USD", "CCC-USD"]);
    }

    #[tokio::test]
    async fn test_transient_close_failure_is_not_retried() {
        let platform = MockPlatform::default();
        platform.set_positions(vec![
            raw("AAA-USD", dec!(500), 0),
            raw("BBB-USD", dec!(100), 0),
            raw("CCC-USD", dec!(-50), 0),
        ]);
        platform.push_close_result(Err(CoreError::Transient("close timed out".to_string())));

        let recovery = StartupRecovery::new(&platform, 2, Duration::from_secs(5), &fast_retry());
        let outcome = recovery.run(&CancellationToken::new()).await;

        assert!(!outcome.is_success());
        assert!(outcome.kept.is_empty());
        assert!(outcome.failure.unwrap().contains("CCC-USD"));
        assert_eq!(platform.close_calls(), 1);
        assert!(platform.closed().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_position_keeps_nothing() {
        let platform = MockPlatform::default();
        let mut broken = raw("AAA-USD", dec!(10), 0);
        broken.side = None;
        platform.set_positions(vec![raw("BBB-USD", dec!(10), 0), broken]);

        let recovery = StartupRecovery::new(&platform, 2, Duration::from_secs(5), &fast_retry());
        let outcome = recovery.run(&CancellationToken::new()).await;

        assert!(outcome.kept.is_empty());
        assert!(outcome.failure.unwrap().contains("rejected"));
        assert!(platform.closed().is_empty());
        // the well-formed one is still reported so it is not adopted later
        assert_eq!(pairs(&outcome.abandoned), vec!["BBB-USD"]);
    }

    #[tokio::test]
    async fn test_one_retry_on_transient_failure() {
        let platform = MockPlatform::default();
        platform.set_positions(vec![raw("AAA-USD", dec!(10), 0)]);
        platform.push_breakdown_result(Err(CoreError::Transient("blip".to_string())));

        let recovery = StartupRecovery::new(&platform, 2, Duration::from_secs(5), &fast_retry());
        let outcome = recovery.run(&CancellationToken::new()).await;
        assert!(outcome.is_success());
        assert_eq!(outcome.kept.len(), 1);
        assert_eq!(platform.breakdown_calls(), 2);

        let platform = MockPlatform::default();
        for _ in 0..2 {
            platform.push_breakdown_result(Err(CoreError::Transient("down".to_string())));
        }
        let recovery = StartupRecovery::new(&platform, 2, Duration::from_secs(5), &fast_retry());
        let outcome = recovery.run(&CancellationToken::new()).await;
        assert!(!outcome.is_success());
        assert_eq!(platform.breakdown_calls(), 2);
    }

    #[tokio::test]
    async fn test_overall_deadline() {
        let platform = MockPlatform::default();
        platform.set_latency(Some(Duration::from_millis(300)));
        let retry = RetryConfig {
            call_timeout_ms: 1_000,
            ..fast_retry()
        };

        let recovery = StartupRecovery::new(&platform, 2, Duration::from_millis(50), &retry);
        let outcome = recovery.run(&CancellationToken::new()).await;
        assert!(outcome.failure.unwrap().contains("exceeded"));
    }

    #[test]
    fn test_select_under_limit_keeps_all() {
        let positions: Vec<_> = [dec!(-5), dec!(7)]
            .iter()
            .map(|pnl| raw("AAA-USD", *pnl, 0).validate().unwrap())
            .collect();
        let (kept, excess) = select_positions(positions, 5);
        assert_eq!(kept.len(), 2);
        assert!(excess.is_empty());
        assert_eq!(kept[0].unrealized_pnl, Price::new(dec!(7)));
    }
}
