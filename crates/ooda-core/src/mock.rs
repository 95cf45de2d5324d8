//! Scriptable collaborator mocks.
//!
//! Used by unit tests across the workspace and by the integration tests.
//! Each mock records the calls it receives and returns scripted results,
//! falling back to a configurable default once the script runs out.

use crate::decision::{AssetPair, Decision};
use crate::error::{CoreError, Result};
use crate::ports::{BoxFuture, DecisionProvider, PortfolioMemory, TradingPlatform};
use crate::position::{
    ExecutionReport, OrderStatus, PlatformPosition, PortfolioBreakdown, RawFuturesPosition,
    TradeOutcome,
};
use crate::Price;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

// ============================================================================
// MockPlatform
// ============================================================================

/// Mock trading platform.
#[derive(Debug)]
pub struct MockPlatform {
    breakdown: Mutex<PortfolioBreakdown>,
    scripted_breakdowns: Mutex<VecDeque<Result<PortfolioBreakdown>>>,
    scripted_executions: Mutex<VecDeque<Result<ExecutionReport>>>,
    order_statuses: Mutex<HashMap<String, OrderStatus>>,
    close_failures: Mutex<HashSet<AssetPair>>,
    scripted_closes: Mutex<VecDeque<Result<()>>>,
    close_calls: AtomicUsize,
    executed: Mutex<Vec<Decision>>,
    closed: Mutex<Vec<PlatformPosition>>,
    breakdown_calls: AtomicUsize,
    next_order: AtomicUsize,
    latency: Mutex<Option<Duration>>,
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self::new(Price::new(rust_decimal::Decimal::from(10_000)))
    }
}

impl MockPlatform {
    /// Create a platform with no positions and the given portfolio value.
    pub fn new(total_value_usd: Price) -> Self {
        Self {
            breakdown: Mutex::new(PortfolioBreakdown {
                total_value_usd,
                futures_positions: Vec::new(),
                as_of: None,
                market_stats: Default::default(),
            }),
            scripted_breakdowns: Mutex::new(VecDeque::new()),
            scripted_executions: Mutex::new(VecDeque::new()),
            order_statuses: Mutex::new(HashMap::new()),
            close_failures: Mutex::new(HashSet::new()),
            scripted_closes: Mutex::new(VecDeque::new()),
            close_calls: AtomicUsize::new(0),
            executed: Mutex::new(Vec::new()),
            closed: Mutex::new(Vec::new()),
            breakdown_calls: AtomicUsize::new(0),
            next_order: AtomicUsize::new(1),
            latency: Mutex::new(None),
        }
    }

    /// Replace the default portfolio value.
    pub fn set_total_value(&self, value: Price) {
        self.breakdown.lock().total_value_usd = value;
    }

    /// Replace the default open positions.
    pub fn set_positions(&self, positions: Vec<RawFuturesPosition>) {
        self.breakdown.lock().futures_positions = positions;
    }

    /// Replace the whole default breakdown.
    pub fn set_breakdown(&self, breakdown: PortfolioBreakdown) {
        *self.breakdown.lock() = breakdown;
    }

    /// Queue a one-shot breakdown result served before the default.
    pub fn push_breakdown_result(&self, result: Result<PortfolioBreakdown>) {
        self.scripted_breakdowns.lock().push_back(result);
    }

    /// Queue a one-shot execution result served before the default (accepted).
    pub fn push_execution_result(&self, result: Result<ExecutionReport>) {
        self.scripted_executions.lock().push_back(result);
    }

    pub fn set_order_status(&self, order_id: &str, status: OrderStatus) {
        self.order_statuses.lock().insert(order_id.to_string(), status);
    }

    /// Make `close_position` fail for this pair.
    pub fn fail_close_for(&self, pair: AssetPair) {
        self.close_failures.lock().insert(pair);
    }

    /// Queue a result for the next `close_position` call.
    pub fn push_close_result(&self, result: Result<()>) {
        self.scripted_closes.lock().push_back(result);
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    /// Delay every breakdown query, used to exercise timeouts.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock() = latency;
    }

    pub fn executed(&self) -> Vec<Decision> {
        self.executed.lock().clone()
    }

    pub fn closed(&self) -> Vec<PlatformPosition> {
        self.closed.lock().clone()
    }

    pub fn breakdown_calls(&self) -> usize {
        self.breakdown_calls.load(Ordering::SeqCst)
    }
}

impl TradingPlatform for MockPlatform {
    fn get_portfolio_breakdown(&self) -> BoxFuture<'_, Result<PortfolioBreakdown>> {
        Box::pin(async move {
            self.breakdown_calls.fetch_add(1, Ordering::SeqCst);
            let latency = *self.latency.lock();
            if let Some(delay) = latency {
                tokio::time::sleep(delay).await;
            }
            if let Some(scripted) = self.scripted_breakdowns.lock().pop_front() {
                return scripted;
            }
            Ok(self.breakdown.lock().clone())
        })
    }

    fn execute_trade<'a>(&'a self, decision: &'a Decision) -> BoxFuture<'a, Result<ExecutionReport>> {
        Box::pin(async move {
            self.executed.lock().push(decision.clone());
            if let Some(scripted) = self.scripted_executions.lock().pop_front() {
                return scripted;
            }
            let n = self.next_order.fetch_add(1, Ordering::SeqCst);
            Ok(ExecutionReport::accepted(format!("order-{n}")))
        })
    }

    fn get_order_status<'a>(&'a self, order_id: &'a str) -> BoxFuture<'a, Result<Option<OrderStatus>>> {
        Box::pin(async move { Ok(self.order_statuses.lock().get(order_id).copied()) })
    }

    fn close_position<'a>(&'a self, position: &'a PlatformPosition) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.close_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(Err(e)) = self.scripted_closes.lock().pop_front() {
                return Err(e);
            }
            if self.close_failures.lock().contains(&position.asset_pair) {
                return Err(CoreError::Rejected(format!(
                    "close refused for {}",
                    position.asset_pair
                )));
            }
            self.closed.lock().push(position.clone());
            let mut breakdown = self.breakdown.lock();
            breakdown.futures_positions.retain(|raw| {
                raw.validate()
                    .map(|p| !(p.asset_pair == position.asset_pair && p.side == position.side))
                    .unwrap_or(true)
            });
            Ok(())
        })
    }
}

// ============================================================================
// MockDecisionProvider
// ============================================================================

/// Mock decision provider answering per asset pair.
#[derive(Debug, Default)]
pub struct MockDecisionProvider {
    answers: Mutex<HashMap<AssetPair, Decision>>,
    scripted: Mutex<HashMap<AssetPair, VecDeque<Result<Option<Decision>>>>>,
    calls: Mutex<Vec<AssetPair>>,
}

impl MockDecisionProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every request for `decision.asset_pair` with a fresh copy of `decision`.
    pub fn set_decision(&self, decision: Decision) {
        self.answers.lock().insert(decision.asset_pair.clone(), decision);
    }

    /// Queue a one-shot result for `pair`.
    pub fn push_result(&self, pair: AssetPair, result: Result<Option<Decision>>) {
        self.scripted.lock().entry(pair).or_default().push_back(result);
    }

    pub fn calls(&self) -> Vec<AssetPair> {
        self.calls.lock().clone()
    }
}

impl DecisionProvider for MockDecisionProvider {
    fn generate_decision<'a>(
        &'a self,
        asset_pair: &'a AssetPair,
    ) -> BoxFuture<'a, Result<Option<Decision>>> {
        Box::pin(async move {
            self.calls.lock().push(asset_pair.clone());
            if let Some(result) = self
                .scripted
                .lock()
                .get_mut(asset_pair)
                .and_then(VecDeque::pop_front)
            {
                return result;
            }
            // Each answer gets its own id so repeated cycles do not collide.
            Ok(self.answers.lock().get(asset_pair).map(|d| Decision {
                id: crate::DecisionId::generate(),
                ..d.clone()
            }))
        })
    }
}

// ============================================================================
// MockMemory
// ============================================================================

/// Mock portfolio memory.
#[derive(Debug, Default)]
pub struct MockMemory {
    outcomes: Mutex<Vec<TradeOutcome>>,
    fail: std::sync::atomic::AtomicBool,
}

impl MockMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn outcomes(&self) -> Vec<TradeOutcome> {
        self.outcomes.lock().clone()
    }
}

impl PortfolioMemory for MockMemory {
    fn record_outcome(&self, outcome: TradeOutcome) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            if self.fail.load(Ordering::SeqCst) {
                return Err(CoreError::Transient("memory unavailable".to_string()));
            }
            self.outcomes.lock().push(outcome);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DecisionId, Size, TradeAction};
    use rust_decimal_macros::dec;

    fn position(pair: &str) -> RawFuturesPosition {
        RawFuturesPosition {
            product_id: Some(pair.to_string()),
            side: Some("LONG".to_string()),
            contracts: Some(dec!(1)),
            entry_price: Some(dec!(100)),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_mock_platform_close_removes_position() {
        let platform = MockPlatform::default();
        platform.set_positions(vec![position("BTC-USD"), position("ETH-USD")]);

        let breakdown = platform.get_portfolio_breakdown().await.unwrap();
        let positions = breakdown.validated_positions().unwrap();
        platform.close_position(&positions[0]).await.unwrap();

        let after = platform.get_portfolio_breakdown().await.unwrap();
        assert_eq!(after.futures_positions.len(), 1);
        assert_eq!(platform.closed().len(), 1);
        assert_eq!(platform.breakdown_calls(), 2);
    }

    #[tokio::test]
    async fn test_mock_platform_scripted_results_come_first() {
        let platform = MockPlatform::default();
        platform.push_breakdown_result(Err(CoreError::Transient("503".to_string())));

        assert!(platform.get_portfolio_breakdown().await.is_err());
        assert!(platform.get_portfolio_breakdown().await.is_ok());
    }

    #[tokio::test]
    async fn test_mock_provider_fresh_ids() {
        let provider = MockDecisionProvider::new();
        let pair = AssetPair::new("BTC-USD").unwrap();
        provider.set_decision(Decision {
            id: DecisionId::new("template"),
            asset_pair: pair.clone(),
            action: TradeAction::Buy,
            confidence: 70.0,
            recommended_position_size: Size::new(dec!(1)),
            entry_price: Price::new(dec!(100)),
            reasoning: String::new(),
            created_at: chrono::Utc::now(),
        });

        let a = provider.generate_decision(&pair).await.unwrap().unwrap();
        let b = provider.generate_decision(&pair).await.unwrap().unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(provider.calls().len(), 2);
    }
}
