//! Session kill switch.
//!
//! KillSwitchLatch: once tripped, stays tripped for the rest of the session.
//! KillSwitch: tracks the session-start and peak portfolio values and trips
//! the latch on drawdown-from-peak, session gain or session loss.
//!
//! Thresholds are boundary-inclusive: reaching a threshold exactly trips.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use ooda_core::{Pct, Price};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

/// Absorbs float rounding so that a value computed to land exactly on a
/// threshold still trips it.
const BOUNDARY_EPSILON: f64 = 1e-12;

// ============================================================================
// KillSwitchReason
// ============================================================================

/// Reason the kill switch tripped.
#[derive(Debug, Clone, PartialEq)]
pub enum KillSwitchReason {
    /// Portfolio fell too far below its session peak.
    Drawdown { drawdown: f64, threshold: Pct },
    /// Session P&L reached the gain target.
    SessionGain { pnl_pct: f64, threshold: Pct },
    /// Session P&L reached the loss limit.
    SessionLoss { pnl_pct: f64, threshold: Pct },
    /// Operator request.
    Manual { message: String },
}

impl KillSwitchReason {
    /// Short label for metrics and events.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Drawdown { .. } => "drawdown",
            Self::SessionGain { .. } => "session_gain",
            Self::SessionLoss { .. } => "session_loss",
            Self::Manual { .. } => "manual",
        }
    }
}

impl std::fmt::Display for KillSwitchReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Drawdown { drawdown, threshold } => write!(
                f,
                "Drawdown from peak {:.2}% >= {}",
                drawdown * 100.0,
                threshold
            ),
            Self::SessionGain { pnl_pct, threshold } => {
                write!(f, "Session gain {:.2}% >= {}", pnl_pct * 100.0, threshold)
            }
            Self::SessionLoss { pnl_pct, threshold } => {
                write!(f, "Session loss {:.2}% <= -{}", pnl_pct * 100.0, threshold)
            }
            Self::Manual { message } => write!(f, "Manual: {}", message),
        }
    }
}

// ============================================================================
// KillSwitchLatch
// ============================================================================

/// Kill-switch latch.
///
/// Irreversible for the session: there is no reset. A new session (process
/// restart) starts untripped.
///
/// Thread-safe: can be shared via `Arc<KillSwitchLatch>`.
#[derive(Debug, Default)]
pub struct KillSwitchLatch {
    triggered: AtomicBool,
    triggered_at: RwLock<Option<DateTime<Utc>>>,
    reason: RwLock<Option<KillSwitchReason>>,
}

impl KillSwitchLatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Trip the latch. Returns `true` if this call tripped it; later calls
    /// keep the original reason.
    pub fn trigger(&self, reason: KillSwitchReason) -> bool {
        if self
            .triggered
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            *self.triggered_at.write() = Some(Utc::now());
            *self.reason.write() = Some(reason.clone());
            error!(reason = %reason, "KILL SWITCH TRIGGERED");
            true
        } else {
            warn!(new_reason = %reason, "Kill switch already triggered, ignoring new trigger");
            false
        }
    }

    #[must_use]
    pub fn triggered_at(&self) -> Option<DateTime<Utc>> {
        *self.triggered_at.read()
    }

    #[must_use]
    pub fn reason(&self) -> Option<KillSwitchReason> {
        self.reason.read().clone()
    }
}

// ============================================================================
// KillSwitchConfig
// ============================================================================

/// Kill-switch thresholds. A zero threshold disables that check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KillSwitchConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Maximum drawdown from the session peak.
    #[serde(default = "default_max_drawdown_percent")]
    pub max_drawdown_percent: Pct,
    /// Session gain that ends trading for the session.
    #[serde(default = "default_gain_pct")]
    pub gain_pct: Pct,
    /// Session loss that ends trading for the session.
    #[serde(default = "default_loss_pct")]
    pub loss_pct: Pct,
}

fn default_enabled() -> bool {
    true
}

fn default_max_drawdown_percent() -> Pct {
    Pct::new(15.0)
}

fn default_gain_pct() -> Pct {
    Pct::new(20.0)
}

fn default_loss_pct() -> Pct {
    Pct::new(10.0)
}

impl Default for KillSwitchConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            max_drawdown_percent: default_max_drawdown_percent(),
            gain_pct: default_gain_pct(),
            loss_pct: default_loss_pct(),
        }
    }
}

// ============================================================================
// KillSwitch
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct SessionMarks {
    start: Price,
    peak: Price,
}

/// Session-level P&L and drawdown guard.
#[derive(Debug)]
pub struct KillSwitch {
    config: KillSwitchConfig,
    latch: KillSwitchLatch,
    marks: Mutex<Option<SessionMarks>>,
}

impl KillSwitch {
    #[must_use]
    pub fn new(config: KillSwitchConfig) -> Self {
        Self {
            config,
            latch: KillSwitchLatch::new(),
            marks: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn latch(&self) -> &KillSwitchLatch {
        &self.latch
    }

    #[must_use]
    pub fn is_triggered(&self) -> bool {
        self.latch.is_triggered()
    }

    /// Set the session baseline explicitly (e.g. from a persisted snapshot).
    pub fn seed(&self, start: Price, peak: Price) {
        let peak = peak.max(start);
        *self.marks.lock() = Some(SessionMarks { start, peak });
    }

    /// Session-start value, once known.
    #[must_use]
    pub fn session_start(&self) -> Option<Price> {
        self.marks.lock().map(|m| m.start)
    }

    /// Highest value seen this session, once known.
    #[must_use]
    pub fn peak(&self) -> Option<Price> {
        self.marks.lock().map(|m| m.peak)
    }

    /// Record a new portfolio valuation and evaluate the thresholds.
    ///
    /// The first observation becomes the session start. Returns the trip
    /// reason if the switch is (or already was) tripped.
    pub fn observe(&self, current: Price) -> Option<KillSwitchReason> {
        if self.latch.is_triggered() {
            return self.latch.reason();
        }
        if !self.config.enabled {
            return None;
        }

        let marks = {
            let mut guard = self.marks.lock();
            let marks = guard.get_or_insert(SessionMarks {
                start: current,
                peak: current,
            });
            if current > marks.peak {
                marks.peak = current;
            }
            *marks
        };

        let reason = evaluate(&self.config, marks.start, marks.peak, current)?;
        self.latch.trigger(reason.clone());
        Some(reason)
    }

    /// Trip the switch by hand.
    pub fn trigger_manual(&self, message: impl Into<String>) {
        self.latch.trigger(KillSwitchReason::Manual {
            message: message.into(),
        });
    }
}

/// Pure threshold evaluation.
///
/// Trips when `drawdown_from_peak >= max_drawdown_percent`,
/// `pnl_pct >= gain_pct` or `pnl_pct <= -loss_pct`.
#[must_use]
pub fn evaluate(
    config: &KillSwitchConfig,
    start: Price,
    peak: Price,
    current: Price,
) -> Option<KillSwitchReason> {
    let start = start.to_f64();
    let peak = peak.to_f64();
    let current = current.to_f64();

    let max_dd = config.max_drawdown_percent.fraction();
    if max_dd > 0.0 && peak > 0.0 {
        let drawdown = (peak - current) / peak;
        debug!(drawdown, threshold = max_dd, "kill switch drawdown check");
        if drawdown + BOUNDARY_EPSILON >= max_dd {
            return Some(KillSwitchReason::Drawdown {
                drawdown,
                threshold: config.max_drawdown_percent,
            });
        }
    }

    if start > 0.0 {
        let pnl_pct = (current - start) / start;
        let gain = config.gain_pct.fraction();
        if gain > 0.0 && pnl_pct + BOUNDARY_EPSILON >= gain {
            return Some(KillSwitchReason::SessionGain {
                pnl_pct,
                threshold: config.gain_pct,
            });
        }
        let loss = config.loss_pct.fraction();
        if loss > 0.0 && pnl_pct - BOUNDARY_EPSILON <= -loss {
            return Some(KillSwitchReason::SessionLoss {
                pnl_pct,
                threshold: config.loss_pct,
            });
        }
    }

    None
}
