//! Shared builders for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use ooda_agent::config::AppConfig;
use ooda_agent::machine::{AgentDeps, AgentStateMachine};
use ooda_core::mock::{MockDecisionProvider, MockMemory, MockPlatform};
use ooda_core::{AssetPair, Decision, DecisionId, Price, RawFuturesPosition, Size, TradeAction};
use ooda_dashboard::{DashboardEvent, DashboardEventKind, DashboardEventQueue, DashboardState};
use ooda_executor::{ExposureReservationManager, PendingOrderTracker, WebhookNotifier};
use ooda_position::TradeMonitor;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio_util::sync::CancellationToken;

pub fn pair(raw: &str) -> AssetPair {
    AssetPair::new(raw).unwrap()
}

/// Configuration with short intervals and fast retries.
pub fn test_config(watchlist: &[&str]) -> AppConfig {
    let mut config = AppConfig::default();
    config.agent.watchlist = watchlist.iter().map(|p| pair(p)).collect();
    config.agent.cycle_interval_ms = 20;
    config.agent.error_backoff_ms = 20;
    config.agent.recovery_timeout_ms = 2_000;
    config.agent.max_status_checks = 3;
    config.retry.base_delay_ms = 1;
    config.retry.max_delay_ms = 5;
    config.retry.call_timeout_ms = 500;
    config.monitor.poll_interval_ms = 50;
    // background detection stays out of the way unless a test shortens it
    config.monitor.detection_interval_ms = 60_000;
    config.monitor.join_timeout_ms = 200;
    config.webhook.base_delay_ms = 1;
    config.webhook.max_delay_ms = 5;
    config.webhook.timeout_ms = 1_000;
    config
}

pub fn decision(raw_pair: &str, action: TradeAction, size: Decimal, price: Decimal) -> Decision {
    Decision {
        id: DecisionId::generate(),
        asset_pair: pair(raw_pair),
        action,
        confidence: 75.0,
        recommended_position_size: Size::new(size),
        entry_price: Price::new(price),
        reasoning: "test".to_string(),
        created_at: Utc::now(),
    }
}

/// Small long position that passes every risk gate on a 10k portfolio.
pub fn small_buy(raw_pair: &str) -> Decision {
    decision(raw_pair, TradeAction::Buy, dec!(0.1), dec!(100))
}

pub fn raw_position(raw_pair: &str, pnl: Decimal, opened_min: u32) -> RawFuturesPosition {
    RawFuturesPosition {
        product_id: Some(raw_pair.to_string()),
        side: Some("LONG".to_string()),
        contracts: Some(dec!(1)),
        entry_price: Some(dec!(100)),
        current_price: Some(dec!(100) + pnl),
        unrealized_pnl: Some(pnl),
        opened_at: Some(Utc.with_ymd_and_hms(2026, 1, 1, 0, opened_min, 0).unwrap()),
    }
}

/// Mocks and shared components wired into a state machine.
pub struct Harness {
    pub config: AppConfig,
    pub platform: Arc<MockPlatform>,
    pub provider: Arc<MockDecisionProvider>,
    pub memory: Arc<MockMemory>,
    pub monitor: Arc<TradeMonitor>,
    pub exposure: Arc<ExposureReservationManager>,
    pub pending_orders: Arc<PendingOrderTracker>,
    pub dashboard: DashboardState,
    pub shutdown: CancellationToken,
}

impl Harness {
    pub fn new(config: AppConfig) -> Self {
        let platform = Arc::new(MockPlatform::default());
        let monitor = TradeMonitor::new(config.monitor.clone(), platform.clone());
        Self {
            exposure: Arc::new(ExposureReservationManager::new(config.exposure.clone())),
            pending_orders: Arc::new(
                PendingOrderTracker::new(config.agent.max_status_checks)
                    .with_call_timeout(config.retry.call_timeout()),
            ),
            dashboard: DashboardState::new(Arc::new(DashboardEventQueue::new(1_000))),
            provider: Arc::new(MockDecisionProvider::new()),
            memory: Arc::new(MockMemory::new()),
            shutdown: CancellationToken::new(),
            platform,
            monitor,
            config,
        }
    }

    pub fn machine(&self) -> AgentStateMachine {
        let deps = AgentDeps {
            platform: self.platform.clone(),
            provider: self.provider.clone(),
            memory: self.memory.clone(),
            monitor: Arc::clone(&self.monitor),
            exposure: Arc::clone(&self.exposure),
            pending_orders: Arc::clone(&self.pending_orders),
            webhook: Arc::new(WebhookNotifier::new(self.config.webhook.clone()).unwrap()),
            dashboard: self.dashboard.clone(),
        };
        AgentStateMachine::new(&self.config, deps, self.shutdown.clone()).unwrap()
    }

    pub fn events(&self) -> Vec<DashboardEvent> {
        self.dashboard.events.drain()
    }
}

/// `(from, to)` pairs of every state transition event.
pub fn transitions(events: &[DashboardEvent]) -> Vec<(String, String)> {
    events
        .iter()
        .filter_map(|e| match &e.kind {
            DashboardEventKind::StateTransition { from, to } => Some((from.clone(), to.clone())),
            _ => None,
        })
        .collect()
}

/// Poll `check` until it holds or `limit` elapses.
pub async fn wait_for(limit: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
