//! Application wiring.
//!
//! Builds the platform, decision provider, memory and shared components from
//! configuration, then drives the state machine until it stops.

use std::sync::Arc;

use ooda_core::{DynDecisionProvider, DynPortfolioMemory, DynTradingPlatform};
use ooda_dashboard::{run_server, DashboardConfig, DashboardEventQueue, DashboardState};
use ooda_executor::{ExposureReservationManager, PendingOrderTracker, WebhookNotifier};
use ooda_persistence::{OutcomeJournal, SnapshotStore};
use ooda_position::TradeMonitor;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::machine::{AgentDeps, AgentStateMachine};
use crate::paper::PaperPlatform;
use crate::provider::HttpDecisionProvider;

/// Main application.
pub struct Application {
    config: AppConfig,
}

impl Application {
    /// Create an application from a validated configuration.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Force the paper platform regardless of configuration.
    #[must_use]
    pub fn with_paper(mut self) -> Self {
        self.config.paper.enabled = true;
        self
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    fn platform(&self) -> AppResult<DynTradingPlatform> {
        if !self.config.paper.enabled {
            return Err(AppError::Config(
                "no trading platform configured: enable [paper]".to_string(),
            ));
        }
        info!(
            initial_balance = %self.config.paper.initial_balance,
            marks = self.config.paper.marks.len(),
            "Using paper trading platform"
        );
        Ok(Arc::new(PaperPlatform::from_config(&self.config.paper)))
    }

    /// Run until the kill switch trips, `shutdown` fires, or a fatal error.
    pub async fn run(self, shutdown: CancellationToken) -> AppResult<()> {
        let config = &self.config;

        let platform = self.platform()?;
        let provider: DynDecisionProvider = Arc::new(HttpDecisionProvider::new(&config.provider)?);
        let memory: DynPortfolioMemory =
            Arc::new(OutcomeJournal::new(config.persistence.outcomes_dir()));

        let pending_orders = PendingOrderTracker::with_store(
            config.agent.max_status_checks,
            SnapshotStore::new(config.persistence.pending_orders_path()),
        )?
        .with_call_timeout(config.retry.call_timeout());

        // detection is started by the agent after startup recovery
        let monitor = TradeMonitor::new(config.monitor.clone(), Arc::clone(&platform));

        let dashboard = DashboardState::new(event_queue(&config.dashboard));
        if config.dashboard.enabled {
            let (state, dashboard_config, token) =
                (dashboard.clone(), config.dashboard.clone(), shutdown.clone());
            tokio::spawn(async move {
                if let Err(e) = run_server(state, dashboard_config, token).await {
                    error!(error = %e, "Dashboard server failed");
                }
            });
        }

        let deps = AgentDeps {
            platform,
            provider,
            memory,
            monitor: Arc::clone(&monitor),
            exposure: Arc::new(ExposureReservationManager::new(config.exposure.clone())),
            pending_orders: Arc::new(pending_orders),
            webhook: Arc::new(WebhookNotifier::new(config.webhook.clone())?),
            dashboard,
        };

        let mut agent = AgentStateMachine::new(config, deps, shutdown.clone())?;
        let result = agent.run().await;

        let abandoned = monitor.stop().await;
        if abandoned > 0 {
            warn!(abandoned, "Trackers stopped with trades still open");
        }
        shutdown.cancel();

        info!(
            cycles = agent.cycle_count(),
            kill_switch = agent.kill_switch().is_triggered(),
            "Application stopped"
        );
        result
    }
}

/// Events are only queued when the dashboard server will drain them.
fn event_queue(config: &DashboardConfig) -> Arc<DashboardEventQueue> {
    if config.enabled {
        Arc::new(DashboardEventQueue::new(config.queue_capacity))
    } else {
        Arc::new(DashboardEventQueue::detached())
    }
}
