//! Prometheus metrics for the OODA trading agent.
//!
//! Covers:
//! - Agent state and cycle timing
//! - Decisions, risk gate rejections and executions
//! - Exposure reservations
//! - Trade trackers and closed trades
//! - Kill switch, webhooks and the dashboard queue
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. A registration failure
//! means duplicate metric names, which is a startup bug that should crash
//! immediately. These panics only occur during static initialization.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge_vec, register_histogram, register_int_counter,
    register_int_gauge, CounterVec, Encoder, GaugeVec, Histogram, IntCounter, IntGauge,
    TextEncoder,
};

use crate::error::{TelemetryError, TelemetryResult};

/// States reported by [`Metrics::agent_state_set`].
const AGENT_STATES: [&str; 7] = [
    "IDLE",
    "RECOVERING",
    "PERCEPTION",
    "REASONING",
    "RISK_CHECK",
    "EXECUTION",
    "LEARNING",
];

/// Current agent state (1 = active, 0 = inactive).
pub static AGENT_STATE: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "ooda_agent_state",
        "Agent state machine current state (1=active, 0=inactive)",
        &["state"]
    )
    .unwrap()
});

/// Completed OODA cycles.
pub static CYCLES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("ooda_cycles_total", "Total completed OODA cycles").unwrap()
});

/// Cycle duration in milliseconds.
pub static CYCLE_DURATION_MS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "ooda_cycle_duration_ms",
        "OODA cycle duration in milliseconds",
        vec![10.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0, 30000.0]
    )
    .unwrap()
});

/// Cycles abandoned because of an error.
pub static CYCLE_ERRORS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "ooda_cycle_errors_total",
        "Total abandoned OODA cycles",
        &["kind"]
    )
    .unwrap()
});

/// Decisions by outcome (proposed/approved/rejected/hold/none).
pub static DECISIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "ooda_decisions_total",
        "Total decisions by outcome",
        &["outcome"]
    )
    .unwrap()
});

/// Risk gate rejections.
pub static RISK_REJECTIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "ooda_risk_rejections_total",
        "Total risk gate rejections",
        &["gate", "asset_pair"]
    )
    .unwrap()
});

/// Trade executions by result (success/failed/reservation_denied).
pub static EXECUTIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "ooda_executions_total",
        "Total trade executions by result",
        &["result"]
    )
    .unwrap()
});

/// Pending order resolutions (filled/failed/orphaned).
pub static PENDING_ORDERS_RESOLVED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "ooda_pending_orders_resolved_total",
        "Total pending orders resolved by outcome",
        &["outcome"]
    )
    .unwrap()
});

/// Reservations in RESERVED or COMMITTED state.
pub static ACTIVE_RESERVATIONS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "ooda_active_reservations",
        "Exposure reservations currently RESERVED or COMMITTED"
    )
    .unwrap()
});

/// Stale reservations garbage-collected.
pub static STALE_RESERVATIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "ooda_stale_reservations_total",
        "Total stale exposure reservations cleared"
    )
    .unwrap()
});

/// Running trade trackers.
pub static ACTIVE_TRACKERS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("ooda_active_trackers", "Trade trackers currently running").unwrap()
});

/// Positions waiting for a tracker slot.
pub static TRACKER_QUEUE_DEPTH: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "ooda_tracker_queue_depth",
        "Detected positions waiting for a tracker slot"
    )
    .unwrap()
});

/// Closed trades by exit reason.
pub static TRADES_CLOSED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "ooda_trades_closed_total",
        "Total closed trades by exit reason",
        &["exit_reason"]
    )
    .unwrap()
});

/// Portfolio-level stop-loss / take-profit pause (1 = paused).
pub static MONITOR_PAUSED: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "ooda_monitor_paused",
        "Trade entry paused by portfolio stop-loss/take-profit (1=paused)"
    )
    .unwrap()
});

/// Kill switch trips.
pub static KILL_SWITCH_TRIGGERED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "ooda_kill_switch_triggered_total",
        "Total kill switch triggers",
        &["reason"]
    )
    .unwrap()
});

/// Webhook deliveries by result.
pub static WEBHOOK_DELIVERIES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "ooda_webhook_deliveries_total",
        "Total webhook deliveries",
        &["event_type", "result"]
    )
    .unwrap()
});

/// Dashboard events dropped because the queue was full.
pub static DASHBOARD_EVENTS_DROPPED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "ooda_dashboard_events_dropped_total",
        "Total dashboard events dropped on a full queue"
    )
    .unwrap()
});

/// Metrics facade.
pub struct Metrics;

impl Metrics {
    /// Set the agent state. Only the active state is 1.
    pub fn agent_state_set(state: &str) {
        for s in AGENT_STATES {
            AGENT_STATE.with_label_values(&[s]).set(0.0);
        }
        AGENT_STATE.with_label_values(&[state]).set(1.0);
    }

    /// Record a completed cycle.
    pub fn cycle_completed(duration_ms: f64) {
        CYCLES_TOTAL.inc();
        CYCLE_DURATION_MS.observe(duration_ms);
    }

    /// Record an abandoned cycle.
    pub fn cycle_error(kind: &str) {
        CYCLE_ERRORS_TOTAL.with_label_values(&[kind]).inc();
    }

    pub fn decision(outcome: &str) {
        DECISIONS_TOTAL.with_label_values(&[outcome]).inc();
    }

    pub fn risk_rejected(gate: &str, asset_pair: &str) {
        RISK_REJECTIONS_TOTAL
            .with_label_values(&[gate, asset_pair])
            .inc();
    }

    pub fn execution(result: &str) {
        EXECUTIONS_TOTAL.with_label_values(&[result]).inc();
    }

    pub fn pending_order_resolved(outcome: &str) {
        PENDING_ORDERS_RESOLVED_TOTAL
            .with_label_values(&[outcome])
            .inc();
    }

    pub fn active_reservations_set(count: usize) {
        ACTIVE_RESERVATIONS.set(count as i64);
    }

    pub fn stale_reservations_cleared(count: usize) {
        STALE_RESERVATIONS_TOTAL.inc_by(count as u64);
    }

    pub fn trackers_set(active: usize, queued: usize) {
        ACTIVE_TRACKERS.set(active as i64);
        TRACKER_QUEUE_DEPTH.set(queued as i64);
    }

    pub fn trade_closed(exit_reason: &str) {
        TRADES_CLOSED_TOTAL.with_label_values(&[exit_reason]).inc();
    }

    pub fn monitor_paused_set(paused: bool) {
        MONITOR_PAUSED.set(i64::from(paused));
    }

    pub fn kill_switch_triggered(reason: &str) {
        KILL_SWITCH_TRIGGERED_TOTAL
            .with_label_values(&[reason])
            .inc();
    }

    pub fn webhook_delivery(event_type: &str, success: bool) {
        let result = if success { "success" } else { "failed" };
        WEBHOOK_DELIVERIES_TOTAL
            .with_label_values(&[event_type, result])
            .inc();
    }

    pub fn dashboard_event_dropped() {
        DASHBOARD_EVENTS_DROPPED_TOTAL.inc();
    }

    /// Render the default registry in Prometheus text format.
    pub fn render() -> TelemetryResult<String> {
        let families = prometheus::gather();
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&families, &mut buffer)
            .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::Metrics(e.to_string()))
    }
}
