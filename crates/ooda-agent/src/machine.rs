//! The OODA state machine.
//!
//! One scheduling tick runs a sweep over the watchlist:
//!
//! ```text
//! IDLE ─► RECOVERING (first tick only) ─► PERCEPTION ─► REASONING ─► RISK_CHECK
//!   ▲                                        │  ▲                        │
//!   │◄──────── checks fail / kill switch ────┘  └──── more pairs ──┐     ▼
//!   └───────────────────── sweep done ◄──────────────── LEARNING ◄─ EXECUTION
//! ```
//!
//! Every state change goes through [`AgentStateMachine::transition`], which
//! rejects anything outside the transition table with a fatal error.
//! Collaborator failures inside a state end that state with no output, so
//! the cycle always returns to IDLE along legal edges.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures_util::future::join_all;
use ooda_core::{
    AssetPair, Decision, DynDecisionProvider, DynPortfolioMemory, DynTradingPlatform,
    MarketStats, PlatformPosition, Price, TradeOutcome,
};
use ooda_dashboard::{AgentStatusSnapshot, DashboardEvent, DashboardEventKind, DashboardState};
use ooda_executor::{
    retry_with_backoff, ExecutorError, ExposureReservationManager, PendingOrderEntry,
    PendingOrderOutcome, PendingOrderTracker, RetryConfig, WebhookNotifier, WebhookPayload,
};
use ooda_position::{TradeMetrics, TradeMonitor};
use ooda_risk::{
    Holding, KillSwitch, KillSwitchReason, PortfolioRiskSnapshot, RejectionCache, RiskGatekeeper,
};
use ooda_telemetry::Metrics;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{AgentConfig, AppConfig};
use crate::decisions::PendingDecisions;
use crate::error::{AppError, AppResult};
use crate::recovery::StartupRecovery;
use crate::state::{unified_status, AgentState, StatusInputs};

/// Collaborators and shared components the agent drives.
pub struct AgentDeps {
    pub platform: DynTradingPlatform,
    pub provider: DynDecisionProvider,
    pub memory: DynPortfolioMemory,
    pub monitor: Arc<TradeMonitor>,
    pub exposure: Arc<ExposureReservationManager>,
    pub pending_orders: Arc<PendingOrderTracker>,
    pub webhook: Arc<WebhookNotifier>,
    pub dashboard: DashboardState,
}

/// Portfolio as seen by the last successful PERCEPTION.
#[derive(Debug, Clone)]
struct Observation {
    total_value: Price,
    positions: Vec<PlatformPosition>,
    stats: MarketStats,
}

pub struct AgentStateMachine {
    config: AgentConfig,
    retry: RetryConfig,
    state: AgentState,

    platform: DynTradingPlatform,
    provider: DynDecisionProvider,
    memory: DynPortfolioMemory,
    monitor: Arc<TradeMonitor>,
    exposure: Arc<ExposureReservationManager>,
    pending_orders: Arc<PendingOrderTracker>,
    webhook: Arc<WebhookNotifier>,
    dashboard: DashboardState,

    gatekeeper: RiskGatekeeper,
    kill_switch: Arc<KillSwitch>,
    rejections: RejectionCache,
    decisions: PendingDecisions,
    /// RISK_CHECK output consumed by EXECUTION.
    approved: Vec<Decision>,
    observation: Option<Observation>,

    /// Next watchlist index to analyse in the current sweep.
    sweep_cursor: usize,
    recovered: bool,
    cycle_count: u64,
    /// Set by the kill switch or shutdown; `run` returns once set.
    stopped: bool,
    fatal: bool,
    shutdown: CancellationToken,
}

impl AgentStateMachine {
    pub fn new(
        config: &AppConfig,
        deps: AgentDeps,
        shutdown: CancellationToken,
    ) -> AppResult<Self> {
        let gatekeeper = RiskGatekeeper::new(config.risk.clone())?;
        let machine = Self {
            config: config.agent.clone(),
            retry: config.retry.clone(),
            state: AgentState::Idle,
            platform: deps.platform,
            provider: deps.provider,
            memory: deps.memory,
            monitor: deps.monitor,
            exposure: deps.exposure,
            pending_orders: deps.pending_orders,
            webhook: deps.webhook,
            dashboard: deps.dashboard,
            gatekeeper,
            kill_switch: Arc::new(KillSwitch::new(config.kill_switch.clone())),
            rejections: RejectionCache::new(config.agent.rejection_cooldown()),
            decisions: PendingDecisions::new(),
            approved: Vec::new(),
            observation: None,
            sweep_cursor: 0,
            recovered: false,
            cycle_count: 0,
            stopped: false,
            fatal: false,
            shutdown,
        };
        Metrics::agent_state_set(machine.state.as_str());
        machine.publish_status();
        Ok(machine)
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    #[must_use]
    pub fn state(&self) -> AgentState {
        self.state
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Completed OODA passes.
    #[must_use]
    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    /// Handle to the shared pending-decision queue.
    #[must_use]
    pub fn decisions(&self) -> PendingDecisions {
        self.decisions.clone()
    }

    #[must_use]
    pub fn kill_switch(&self) -> Arc<KillSwitch> {
        Arc::clone(&self.kill_switch)
    }

    #[must_use]
    pub fn rejections(&self) -> &RejectionCache {
        &self.rejections
    }

    #[must_use]
    pub fn status(&self) -> AgentStatusSnapshot {
        let inputs = StatusInputs {
            stopped: self.stopped,
            kill_switch_triggered: self.kill_switch.is_triggered(),
            fatal: self.fatal,
            cycle_count: self.cycle_count,
        };
        AgentStatusSnapshot {
            state: self.state.as_str().to_string(),
            unified_status: unified_status(self.state, inputs),
            stopped: self.stopped,
            cycle_count: self.cycle_count,
            active_trackers: self.monitor.active_count(),
            pending_decisions: self.decisions.len(),
            active_reservations: self.exposure.active_count(),
            kill_switch_reason: self.kill_switch.latch().reason().map(|r| r.to_string()),
            monitor_paused: self.monitor.is_paused(),
            updated_at: Utc::now(),
        }
    }

    // ------------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------------

    /// Move to `next`. Anything outside the transition table is fatal.
    pub fn transition(&mut self, next: AgentState) -> AppResult<()> {
        let from = self.state;
        if !from.can_transition_to(next) {
            error!(%from, to = %next, "Illegal state transition");
            return Err(AppError::IllegalTransition { from, to: next });
        }
        debug!(%from, to = %next, "State transition");
        self.state = next;
        Metrics::agent_state_set(next.as_str());
        self.emit(DashboardEventKind::StateTransition {
            from: from.to_string(),
            to: next.to_string(),
        });
        self.publish_status();
        Ok(())
    }

    /// Walk the remaining legal edges back to IDLE, discarding whatever the
    /// interrupted cycle had queued.
    fn unwind_to_idle(&mut self) -> AppResult<()> {
        self.approved.clear();
        let dropped = self.decisions.clear();
        if dropped > 0 {
            debug!(dropped, "Discarded pending decisions of interrupted cycle");
        }
        while self.state != AgentState::Idle {
            let next = match self.state {
                AgentState::Recovering => AgentState::Perception,
                AgentState::Perception | AgentState::Learning => AgentState::Idle,
                AgentState::Reasoning => AgentState::RiskCheck,
                AgentState::RiskCheck => AgentState::Execution,
                AgentState::Execution => AgentState::Learning,
                AgentState::Idle => break,
            };
            self.transition(next)?;
        }
        Ok(())
    }

    fn check_shutdown(&self) -> AppResult<()> {
        if self.shutdown.is_cancelled() {
            return Err(AppError::Shutdown);
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Run loop
    // ------------------------------------------------------------------------

    /// Run sweeps until the kill switch trips, shutdown is requested, or a
    /// fatal error occurs.
    pub async fn run(&mut self) -> AppResult<()> {
        info!(
            watchlist = self.config.watchlist.len(),
            batch = self.config.max_assets_per_cycle,
            interval_ms = self.config.cycle_interval_ms,
            "Agent loop started"
        );

        while !self.stopped {
            let wait = match self.run_sweep().await {
                Ok(()) => self.config.cycle_interval(),
                Err(AppError::Shutdown) => break,
                Err(e) if e.is_fatal() => {
                    error!(error = %e, state = %self.state, "Fatal agent error");
                    Metrics::cycle_error("fatal");
                    self.fatal = true;
                    self.publish_status();
                    return Err(e);
                }
                Err(e) => {
                    error!(error = %e, state = %self.state, "Cycle failed, backing off");
                    Metrics::cycle_error("unexpected");
                    self.unwind_to_idle()?;
                    self.config.error_backoff()
                }
            };
            if self.stopped {
                break;
            }
            tokio::select! {
                () = self.shutdown.cancelled() => break,
                () = tokio::time::sleep(wait) => {}
            }
        }

        self.unwind_to_idle()?;
        self.stopped = true;
        self.publish_status();
        info!(
            cycles = self.cycle_count,
            kill_switch = self.kill_switch.is_triggered(),
            "Agent loop stopped"
        );
        Ok(())
    }

    /// One scheduling tick: recovery on the first tick, then OODA passes
    /// until the watchlist sweep is complete.
    pub async fn run_sweep(&mut self) -> AppResult<()> {
        self.check_shutdown()?;
        if self.sweep_cursor >= self.config.watchlist.len() {
            self.sweep_cursor = 0;
        }

        if !self.recovered {
            self.transition(AgentState::Recovering)?;
            self.recover().await?;
            self.recovered = true;
            // detection starts only once recovery has settled the venue's positions
            self.monitor.start();
        }
        self.transition(AgentState::Perception)?;

        loop {
            let started = Instant::now();

            if !self.perceive().await? {
                return self.transition(AgentState::Idle);
            }

            self.transition(AgentState::Reasoning)?;
            self.reason().await?;

            self.transition(AgentState::RiskCheck)?;
            self.risk_check();

            self.transition(AgentState::Execution)?;
            self.execute().await?;

            self.transition(AgentState::Learning)?;
            let more = self.learn().await;

            self.cycle_count += 1;
            Metrics::cycle_completed(started.elapsed().as_secs_f64() * 1000.0);
            self.publish_status();

            if more {
                self.transition(AgentState::Perception)?;
            } else {
                return self.transition(AgentState::Idle);
            }
        }
    }

    // ------------------------------------------------------------------------
    // RECOVERING
    // ------------------------------------------------------------------------

    async fn recover(&mut self) -> AppResult<()> {
        let outcome = StartupRecovery::new(
            self.platform.as_ref(),
            self.config.max_concurrent_trades,
            self.config.recovery_timeout(),
            &self.retry,
        )
        .run(&self.shutdown)
        .await;
        self.check_shutdown()?;

        for position in &outcome.kept {
            let decision = position.to_recovery_decision();
            let recorded = retry_with_backoff(&self.retry, "record_outcome", &self.shutdown, || {
                self.memory
                    .record_outcome(TradeOutcome::from_recovery(&decision))
            })
            .await;
            if let Err(e) = recorded {
                warn!(
                    asset_pair = %decision.asset_pair,
                    error = %e,
                    "Failed to record recovered position"
                );
            }

            match self.exposure.reserve(
                &decision.id,
                &decision.asset_pair,
                decision.action,
                decision.recommended_position_size,
                decision.notional(),
            ) {
                Ok(()) => {
                    self.exposure.commit(&decision.id);
                }
                Err(e) => warn!(
                    asset_pair = %decision.asset_pair,
                    error = %e,
                    "No exposure reservation for recovered position"
                ),
            }

            if !self.monitor.track(position.clone(), Some(decision.id.clone())) {
                warn!(
                    asset_pair = %decision.asset_pair,
                    decision_id = %decision.id,
                    "Recovered position is already tracked"
                );
            }
        }
        if !outcome.abandoned.is_empty() {
            self.monitor.ignore(&outcome.abandoned);
        }

        self.emit(DashboardEventKind::Recovery {
            success: outcome.is_success(),
            kept: outcome.kept.len(),
            closed: outcome.closed.len(),
            message: outcome.failure.clone(),
        });
        Metrics::active_reservations_set(self.exposure.active_count());
        Ok(())
    }

    // ------------------------------------------------------------------------
    // PERCEPTION
    // ------------------------------------------------------------------------

    /// Returns false when the cycle should not proceed.
    async fn perceive(&mut self) -> AppResult<bool> {
        self.check_shutdown()?;
        self.resolve_pending_orders().await;

        let breakdown = match retry_with_backoff(
            &self.retry,
            "get_portfolio_breakdown",
            &self.shutdown,
            || self.platform.get_portfolio_breakdown(),
        )
        .await
        {
            Ok(b) => b,
            Err(ExecutorError::Cancelled(_)) => return Err(AppError::Shutdown),
            Err(e) => {
                warn!(error = %e, "Portfolio unavailable, skipping cycle");
                Metrics::cycle_error("perception");
                return Ok(false);
            }
        };

        if let Some(as_of) = breakdown.as_of {
            let limit = Duration::from_secs(self.config.data_freshness_secs);
            // a timestamp in the future reads as fresh
            if let Ok(age) = (Utc::now() - as_of).to_std() {
                if age > limit {
                    warn!(
                        age_secs = age.as_secs(),
                        limit_secs = limit.as_secs(),
                        "Portfolio data is stale, skipping cycle"
                    );
                    Metrics::cycle_error("stale_data");
                    return Ok(false);
                }
            }
        }

        // ahead of position validation: the kill switch only needs the total
        if let Some(reason) = self.kill_switch.observe(breakdown.total_value_usd) {
            self.halt(&reason);
            return Ok(false);
        }

        let positions = match breakdown.validated_positions() {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "Venue reported malformed positions, skipping cycle");
                Metrics::cycle_error("malformed_positions");
                return Ok(false);
            }
        };

        self.observation = Some(Observation {
            total_value: breakdown.total_value_usd,
            positions,
            stats: breakdown.market_stats,
        });
        Ok(true)
    }

    async fn resolve_pending_orders(&self) {
        if self.pending_orders.is_empty() {
            return;
        }
        for outcome in self.pending_orders.poll(self.platform.as_ref()).await {
            Metrics::pending_order_resolved(outcome.label());
            let entry = outcome.entry();
            match &outcome {
                PendingOrderOutcome::Filled(_) => {}
                PendingOrderOutcome::Failed { status, .. } => {
                    self.exposure.release(&entry.decision_id);
                    self.notify(
                        order_payload("trade_failed", entry)
                            .with_detail("status", status.to_string()),
                    );
                }
                PendingOrderOutcome::Orphaned(_) => {
                    self.exposure.release(&entry.decision_id);
                }
            }
        }
    }

    /// Trip handling: stop trading for the session.
    fn halt(&mut self, reason: &KillSwitchReason) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        warn!(reason = %reason, "Kill switch tripped, agent stopping");
        Metrics::kill_switch_triggered(reason.kind());
        self.emit(DashboardEventKind::KillSwitch {
            reason: reason.to_string(),
        });
        self.notify(
            WebhookPayload::new("kill_switch")
                .with_detail("reason", reason.to_string())
                .with_detail("kind", reason.kind()),
        );
        self.publish_status();
    }

    // ------------------------------------------------------------------------
    // REASONING
    // ------------------------------------------------------------------------

    async fn reason(&mut self) -> AppResult<()> {
        self.check_shutdown()?;
        let len = self.config.watchlist.len();

        if self.monitor.is_paused() {
            info!(
                reason = self.monitor.pause_reason().as_deref().unwrap_or("-"),
                "Trade entry paused, skipping decision provider"
            );
            self.sweep_cursor = len;
            return Ok(());
        }

        let end = (self.sweep_cursor + self.config.max_assets_per_cycle).min(len);
        let now = Utc::now();
        let batch: Vec<AssetPair> = self.config.watchlist[self.sweep_cursor..end]
            .iter()
            .filter(|pair| {
                let cooling = self.rejections.is_cooling_down(pair, now);
                if cooling {
                    debug!(asset_pair = %pair, "Pair in rejection cooldown, skipping");
                }
                !cooling
            })
            .cloned()
            .collect();
        self.sweep_cursor = end;

        let this = &*self;
        let results = join_all(batch.iter().map(|pair| this.request_decision(pair))).await;
        if results.iter().any(Result::is_err) {
            return Err(AppError::Shutdown);
        }
        Ok(())
    }

    /// Ask the provider about one pair and queue a tradeable answer.
    async fn request_decision(&self, pair: &AssetPair) -> AppResult<()> {
        let answer = retry_with_backoff(&self.retry, "generate_decision", &self.shutdown, || {
            self.provider.generate_decision(pair)
        })
        .await;

        let decision = match answer {
            Ok(Some(d)) => d,
            Ok(None) => {
                debug!(asset_pair = %pair, "No decision");
                Metrics::decision("none");
                return Ok(());
            }
            Err(ExecutorError::Cancelled(_)) => return Err(AppError::Shutdown),
            Err(e) => {
                warn!(asset_pair = %pair, error = %e, "Decision provider failed");
                Metrics::decision("provider_error");
                return Ok(());
            }
        };

        if let Err(e) = decision.validate() {
            warn!(asset_pair = %pair, error = %e, "Discarding invalid decision");
            Metrics::decision("invalid");
            return Ok(());
        }
        if &decision.asset_pair != pair {
            warn!(
                asset_pair = %pair,
                got = %decision.asset_pair,
                "Discarding decision for another pair"
            );
            Metrics::decision("invalid");
            return Ok(());
        }

        self.emit(DashboardEventKind::Decision {
            decision_id: decision.id.clone(),
            asset_pair: decision.asset_pair.clone(),
            action: decision.action,
            confidence: decision.confidence,
        });

        if decision.action.is_hold() {
            debug!(asset_pair = %pair, decision_id = %decision.id, "HOLD");
            Metrics::decision("hold");
            return Ok(());
        }

        info!(
            decision_id = %decision.id,
            asset_pair = %pair,
            action = %decision.action,
            confidence = decision.confidence,
            size = %decision.recommended_position_size,
            "Decision proposed"
        );
        Metrics::decision("proposed");
        self.decisions.push(decision);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // RISK_CHECK
    // ------------------------------------------------------------------------

    fn risk_check(&mut self) {
        let pending = self.decisions.snapshot();
        if pending.is_empty() {
            return;
        }
        let processed: Vec<_> = pending.iter().map(|d| d.id.clone()).collect();

        let Some(observation) = self.observation.clone() else {
            warn!(count = pending.len(), "No portfolio observation, dropping decisions");
            self.decisions.write_back(&processed, Vec::new());
            return;
        };
        let peak = self
            .kill_switch
            .peak()
            .map_or(observation.total_value, |p| p.max(observation.total_value));
        let mut snapshot = PortfolioRiskSnapshot::from_positions(
            observation.total_value,
            peak,
            &observation.positions,
            observation.stats,
        );

        let now = Utc::now();
        let mut approved = Vec::new();
        for decision in pending {
            let verdict = self.gatekeeper.validate(&decision, &snapshot);
            if verdict.approved {
                info!(
                    decision_id = %decision.id,
                    asset_pair = %decision.asset_pair,
                    "Decision approved"
                );
                Metrics::decision("approved");
                self.notify(WebhookPayload::for_decision("decision_approved", &decision));
                // later decisions in this batch see this one as held
                snapshot.holdings.push(Holding {
                    asset_pair: decision.asset_pair.clone(),
                    signed_notional: decision.signed_notional(),
                });
                approved.push(decision);
                continue;
            }

            let gate = verdict.gate.clone().unwrap_or_else(|| "unknown".to_string());
            warn!(
                decision_id = %decision.id,
                asset_pair = %decision.asset_pair,
                %gate,
                reason = %verdict.reason,
                "Decision rejected by risk gate"
            );
            Metrics::decision("rejected");
            Metrics::risk_rejected(&gate, decision.asset_pair.as_str());
            self.rejections.record(
                decision.id.clone(),
                decision.asset_pair.clone(),
                verdict.reason.clone(),
                now,
            );
            self.emit(DashboardEventKind::RiskRejection {
                decision_id: decision.id.clone(),
                asset_pair: decision.asset_pair.clone(),
                gate: verdict.gate.clone(),
                reason: verdict.reason.clone(),
            });
            self.notify(
                WebhookPayload::for_decision("decision_rejected", &decision)
                    .with_detail("reason", verdict.reason)
                    .with_detail("gate", gate),
            );
        }

        self.decisions.write_back(&processed, Vec::new());
        self.approved = approved;
    }

    // ------------------------------------------------------------------------
    // EXECUTION
    // ------------------------------------------------------------------------

    async fn execute(&mut self) -> AppResult<()> {
        let approved = std::mem::take(&mut self.approved);
        // an order submission is never retried: a timed-out order may have filled
        let once = RetryConfig {
            max_attempts: 1,
            ..self.retry.clone()
        };

        for decision in &approved {
            self.check_shutdown()?;

            if let Err(e) = self.exposure.reserve(
                &decision.id,
                &decision.asset_pair,
                decision.action,
                decision.recommended_position_size,
                decision.notional(),
            ) {
                warn!(
                    decision_id = %decision.id,
                    asset_pair = %decision.asset_pair,
                    error = %e,
                    "Exposure reservation denied"
                );
                Metrics::execution("reservation_denied");
                self.emit(DashboardEventKind::Execution {
                    decision_id: decision.id.clone(),
                    asset_pair: decision.asset_pair.clone(),
                    success: false,
                    order_id: None,
                    error: Some(e.to_string()),
                });
                continue;
            }

            let result = retry_with_backoff(&once, "execute_trade", &self.shutdown, || {
                self.platform.execute_trade(decision)
            })
            .await;

            match result {
                Ok(report) if report.success => self.on_executed(decision, report.order_id),
                Ok(report) => {
                    self.exposure.rollback(&decision.id);
                    let reason = report
                        .error
                        .unwrap_or_else(|| "rejected by venue".to_string());
                    self.on_failed(decision, reason);
                }
                Err(ExecutorError::Cancelled(_)) => {
                    self.exposure.rollback(&decision.id);
                    return Err(AppError::Shutdown);
                }
                Err(e) => {
                    self.exposure.rollback(&decision.id);
                    self.on_failed(decision, e.to_string());
                }
            }
        }

        let stale = self.exposure.clear_stale();
        if stale > 0 {
            warn!(stale, "Stale exposure reservations cleared after execution");
            Metrics::stale_reservations_cleared(stale);
        }
        Metrics::active_reservations_set(self.exposure.active_count());
        Ok(())
    }

    fn on_executed(&self, decision: &Decision, order_id: Option<String>) {
        self.exposure.commit(&decision.id);
        self.monitor
            .associate_decision(decision.asset_pair.clone(), decision.id.clone());
        if let Some(order_id) = &order_id {
            self.pending_orders.track(PendingOrderEntry {
                order_id: order_id.clone(),
                decision_id: decision.id.clone(),
                asset_pair: decision.asset_pair.clone(),
                platform: self.config.platform_name.clone(),
                action: decision.action,
                size: decision.recommended_position_size,
                entry_price: decision.entry_price,
                checks: 0,
                submitted_at: Utc::now(),
            });
        }

        info!(
            decision_id = %decision.id,
            asset_pair = %decision.asset_pair,
            action = %decision.action,
            order_id = order_id.as_deref().unwrap_or("-"),
            "Trade executed"
        );
        Metrics::execution("success");
        self.emit(DashboardEventKind::Execution {
            decision_id: decision.id.clone(),
            asset_pair: decision.asset_pair.clone(),
            success: true,
            order_id: order_id.clone(),
            error: None,
        });
        let mut payload = WebhookPayload::for_decision("trade_executed", decision);
        if let Some(order_id) = order_id {
            payload = payload.with_detail("order_id", order_id);
        }
        self.notify(payload);
    }

    fn on_failed(&self, decision: &Decision, reason: String) {
        warn!(
            decision_id = %decision.id,
            asset_pair = %decision.asset_pair,
            %reason,
            "Trade execution failed, reservation rolled back"
        );
        Metrics::execution("failed");
        self.emit(DashboardEventKind::Execution {
            decision_id: decision.id.clone(),
            asset_pair: decision.asset_pair.clone(),
            success: false,
            order_id: None,
            error: Some(reason.clone()),
        });
        self.notify(
            WebhookPayload::for_decision("trade_failed", decision).with_detail("error", reason),
        );
    }

    // ------------------------------------------------------------------------
    // LEARNING
    // ------------------------------------------------------------------------

    /// Returns whether the current sweep still has pairs to analyse.
    async fn learn(&mut self) -> bool {
        for trade in self.monitor.drain_closed_trades() {
            self.learn_from(&trade).await;
        }

        let purged = self.rejections.purge_expired(Utc::now());
        if purged > 0 {
            debug!(purged, "Expired rejection cooldowns purged");
        }
        Metrics::trackers_set(self.monitor.active_count(), self.monitor.queued_count());
        Metrics::active_reservations_set(self.exposure.active_count());

        !self.stopped && self.sweep_cursor < self.config.watchlist.len()
    }

    async fn learn_from(&self, trade: &TradeMetrics) {
        let outcome = trade.to_outcome();
        let recorded = retry_with_backoff(&self.retry, "record_outcome", &self.shutdown, || {
            self.memory.record_outcome(outcome.clone())
        })
        .await;
        if let Err(e) = recorded {
            warn!(trade_id = %trade.trade_id, error = %e, "Failed to record trade outcome");
        }

        let released = match &trade.decision_id {
            Some(id) => self.exposure.release(id),
            None => self
                .exposure
                .committed_for_pair(&trade.asset_pair)
                .is_some_and(|id| self.exposure.release(&id)),
        };

        info!(
            trade_id = %trade.trade_id,
            asset_pair = %trade.asset_pair,
            exit_reason = %trade.exit_reason,
            realized_pnl = %trade.realized_pnl,
            released,
            "Trade closed"
        );
        Metrics::trade_closed(trade.exit_reason.as_str());
        self.emit(DashboardEventKind::TradeClosed {
            trade_id: trade.trade_id.to_string(),
            decision_id: trade.decision_id.clone(),
            asset_pair: trade.asset_pair.clone(),
            exit_reason: trade.exit_reason.to_string(),
            realized_pnl: trade.realized_pnl.to_string(),
        });

        let mut payload = WebhookPayload::new("trade_closed")
            .with_detail("trade_id", trade.trade_id.to_string())
            .with_detail("exit_reason", trade.exit_reason.as_str())
            .with_detail("realized_pnl", trade.realized_pnl.to_string());
        payload.decision_id = trade.decision_id.clone();
        payload.asset_pair = Some(trade.asset_pair.clone());
        payload.action = Some(trade.side.opening_action());
        self.notify(payload);
    }

    // ------------------------------------------------------------------------
    // Outputs
    // ------------------------------------------------------------------------

    fn publish_status(&self) {
        self.dashboard.status.publish(self.status());
    }

    fn emit(&self, kind: DashboardEventKind) {
        // a full queue logs and counts the drop itself
        let _ = self.dashboard.events.push(DashboardEvent::now(kind));
    }

    /// Deliver a webhook in the background so retries never stall the loop.
    fn notify(&self, payload: WebhookPayload) {
        if !self.webhook.is_enabled() {
            return;
        }
        let webhook = Arc::clone(&self.webhook);
        tokio::spawn(async move {
            let delivery = webhook.deliver(&payload).await;
            Metrics::webhook_delivery(&payload.event_type, delivery.success);
        });
    }
}

fn order_payload(event_type: &str, entry: &PendingOrderEntry) -> WebhookPayload {
    let mut payload =
        WebhookPayload::new(event_type).with_detail("order_id", entry.order_id.clone());
    payload.decision_id = Some(entry.decision_id.clone());
    payload.asset_pair = Some(entry.asset_pair.clone());
    payload.action = Some(entry.action);
    payload
}

#[cfg(test)]
mod tests {
    use super::*;
    use ooda_core::mock::{MockDecisionProvider, MockMemory, MockPlatform};
    use ooda_executor::{ExposureConfig, WebhookConfig};
    use ooda_position::TradeMonitorConfig;

    fn machine() -> AgentStateMachine {
        let platform: DynTradingPlatform = Arc::new(MockPlatform::default());
        let config = AppConfig::default();
        let deps = AgentDeps {
            monitor: TradeMonitor::new(TradeMonitorConfig::default(), platform.clone()),
            platform,
            provider: Arc::new(MockDecisionProvider::new()),
            memory: Arc::new(MockMemory::new()),
            exposure: Arc::new(ExposureReservationManager::new(ExposureConfig::default())),
            pending_orders: Arc::new(PendingOrderTracker::new(3)),
            webhook: Arc::new(
                WebhookNotifier::new(WebhookConfig::default()).expect("http client"),
            ),
            dashboard: DashboardState::default(),
        };
        AgentStateMachine::new(&config, deps, CancellationToken::new()).unwrap()
    }

    #[tokio::test]
    async fn test_illegal_transition_is_fatal() {
        let mut agent = machine();
        let err = agent.transition(AgentState::Execution).unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(
            err,
            AppError::IllegalTransition {
                from: AgentState::Idle,
                to: AgentState::Execution
            }
        ));
        assert_eq!(agent.state(), AgentState::Idle);
    }

    #[tokio::test]
    async fn test_unwind_walks_legal_edges() {
        let mut agent = machine();
        agent.transition(AgentState::Perception).unwrap();
        agent.transition(AgentState::Reasoning).unwrap();
        agent.unwind_to_idle().unwrap();
        assert_eq!(agent.state(), AgentState::Idle);

        let transitions: Vec<_> = agent
            .dashboard
            .events
            .drain()
            .into_iter()
            .filter_map(|e| match e.kind {
                DashboardEventKind::StateTransition { to, .. } => Some(to),
                _ => None,
            })
            .collect();
        assert_eq!(
            transitions,
            vec!["PERCEPTION", "REASONING", "RISK_CHECK", "EXECUTION", "LEARNING", "IDLE"]
        );
    }

    #[tokio::test]
    async fn test_status_before_first_cycle() {
        let agent = machine();
        let status = agent.status();
        assert_eq!(status.state, "IDLE");
        assert_eq!(status.unified_status, ooda_dashboard::UnifiedStatus::Initializing);
        assert!(!status.stopped);
    }
}
