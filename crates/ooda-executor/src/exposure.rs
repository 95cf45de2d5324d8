//! Exposure reservations.
//!
//! Capital is reserved for a decision before it is sent to the venue so that
//! two decisions in flight cannot both claim the same room. A reservation is
//! created `RESERVED`, then moves to `COMMITTED` when the venue accepts the
//! order or to `ROLLED_BACK` when it does not. Committed reservations move
//! to `RELEASED` once the resulting trade is closed. Resolved entries stay as
//! tombstones until they age past the stale bound.
//!
//! Invariants:
//! - one reservation per decision id, ever
//! - at most `max_concurrent_per_pair` RESERVED or COMMITTED reservations per pair
//!
//! All state sits behind one lock so the per-pair check and the insert are a
//! single atomic step.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use ooda_core::{AssetPair, DecisionId, Price, Size, TradeAction};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ExecutorError, ExecutorResult};

// ============================================================================
// Types
// ============================================================================

/// Reservation lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationState {
    Reserved,
    Committed,
    RolledBack,
    Released,
}

impl ReservationState {
    /// Whether the reservation still holds exposure.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Reserved | Self::Committed)
    }
}

impl std::fmt::Display for ReservationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reserved => write!(f, "RESERVED"),
            Self::Committed => write!(f, "COMMITTED"),
            Self::RolledBack => write!(f, "ROLLED_BACK"),
            Self::Released => write!(f, "RELEASED"),
        }
    }
}

/// Capital held for one decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExposureReservation {
    pub decision_id: DecisionId,
    pub asset_pair: AssetPair,
    pub action: TradeAction,
    pub position_size: Size,
    pub notional_value: Price,
    pub state: ReservationState,
    pub created_at: DateTime<Utc>,
    /// When the reservation last changed state.
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Exposure manager configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExposureConfig {
    /// Age after which an unresolved reservation counts as stale.
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: u64,
    /// RESERVED + COMMITTED reservations allowed per asset pair.
    #[serde(default = "default_max_concurrent_per_pair")]
    pub max_concurrent_per_pair: usize,
}

fn default_stale_after_secs() -> u64 {
    300
}

fn default_max_concurrent_per_pair() -> usize {
    1
}

impl Default for ExposureConfig {
    fn default() -> Self {
        Self {
            stale_after_secs: default_stale_after_secs(),
            max_concurrent_per_pair: default_max_concurrent_per_pair(),
        }
    }
}

impl ExposureConfig {
    #[must_use]
    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }
}

// ============================================================================
// ExposureReservationManager
// ============================================================================

/// Reserve / commit / rollback protocol for decision exposure.
#[derive(Debug)]
pub struct ExposureReservationManager {
    config: ExposureConfig,
    reservations: Mutex<HashMap<DecisionId, ExposureReservation>>,
}

impl Default for ExposureReservationManager {
    fn default() -> Self {
        Self::new(ExposureConfig::default())
    }
}

impl ExposureReservationManager {
    #[must_use]
    pub fn new(config: ExposureConfig) -> Self {
        Self {
            config,
            reservations: Mutex::new(HashMap::new()),
        }
    }

    /// Reserve exposure for a decision.
    ///
    /// Fails if the id is empty, already has a reservation in any state, or
    /// the pair is at its concurrent limit.
    pub fn reserve(
        &self,
        decision_id: &DecisionId,
        asset_pair: &AssetPair,
        action: TradeAction,
        position_size: Size,
        notional_value: Price,
    ) -> ExecutorResult<()> {
        if decision_id.is_empty() {
            return Err(ExecutorError::EmptyDecisionId);
        }

        let mut reservations = self.reservations.lock();
        if reservations.contains_key(decision_id) {
            return Err(ExecutorError::AlreadyReserved(decision_id.to_string()));
        }

        let active = reservations
            .values()
            .filter(|r| &r.asset_pair == asset_pair && r.state.is_active())
            .count();
        if active >= self.config.max_concurrent_per_pair {
            return Err(ExecutorError::PairLimitReached {
                asset_pair: asset_pair.to_string(),
                active,
            });
        }

        reservations.insert(
            decision_id.clone(),
            ExposureReservation {
                decision_id: decision_id.clone(),
                asset_pair: asset_pair.clone(),
                action,
                position_size,
                notional_value,
                state: ReservationState::Reserved,
                created_at: Utc::now(),
                resolved_at: None,
            },
        );
        debug!(
            decision_id = %decision_id,
            asset_pair = %asset_pair,
            notional = %notional_value,
            "Exposure reserved"
        );
        Ok(())
    }

    /// Mark a reservation as committed. No-op (returns `false`) unless it is RESERVED.
    pub fn commit(&self, decision_id: &DecisionId) -> bool {
        self.resolve(decision_id, ReservationState::Committed)
    }

    /// Mark a reservation as rolled back. No-op (returns `false`) unless it is RESERVED.
    pub fn rollback(&self, decision_id: &DecisionId) -> bool {
        self.resolve(decision_id, ReservationState::RolledBack)
    }

    fn resolve(&self, decision_id: &DecisionId, to: ReservationState) -> bool {
        let mut reservations = self.reservations.lock();
        match reservations.get_mut(decision_id) {
            Some(r) if r.state == ReservationState::Reserved => {
                r.state = to;
                r.resolved_at = Some(Utc::now());
                debug!(decision_id = %decision_id, state = %to, "Reservation resolved");
                true
            }
            Some(r) => {
                debug!(
                    decision_id = %decision_id,
                    state = %r.state,
                    requested = %to,
                    "Reservation already resolved, ignoring"
                );
                false
            }
            None => false,
        }
    }

    /// Free a committed reservation once its trade has closed. The entry is
    /// kept as `RELEASED` so the id cannot be reserved again.
    pub fn release(&self, decision_id: &DecisionId) -> bool {
        let mut reservations = self.reservations.lock();
        match reservations.get_mut(decision_id) {
            Some(r) if r.state == ReservationState::Committed => {
                r.state = ReservationState::Released;
                r.resolved_at = Some(Utc::now());
                debug!(decision_id = %decision_id, "Committed exposure released");
                true
            }
            _ => false,
        }
    }

    /// Remove RESERVED entries older than the stale bound. Also forgets
    /// rolled-back and released entries past the same bound. Returns the
    /// stale count.
    pub fn clear_stale(&self) -> usize {
        self.clear_stale_at(Utc::now())
    }

    pub fn clear_stale_at(&self, now: DateTime<Utc>) -> usize {
        let bound = chrono::Duration::from_std(self.config.stale_after())
            .unwrap_or_else(|_| chrono::Duration::seconds(300));
        let mut reservations = self.reservations.lock();

        let mut stale = Vec::new();
        reservations.retain(|id, r| match r.state {
            ReservationState::Reserved if now - r.created_at > bound => {
                stale.push((id.clone(), r.asset_pair.clone()));
                false
            }
            ReservationState::RolledBack | ReservationState::Released => r
                .resolved_at
                .map_or(true, |at| now - at <= bound),
            _ => true,
        });

        for (id, pair) in &stale {
            warn!(decision_id = %id, asset_pair = %pair, "Cleared stale exposure reservation");
        }
        stale.len()
    }

    #[must_use]
    pub fn get(&self, decision_id: &DecisionId) -> Option<ExposureReservation> {
        self.reservations.lock().get(decision_id).cloned()
    }

    /// Number of RESERVED or COMMITTED reservations.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.reservations
            .lock()
            .values()
            .filter(|r| r.state.is_active())
            .count()
    }

    /// Active reservations for one pair.
    #[must_use]
    pub fn active_for_pair(&self, asset_pair: &AssetPair) -> usize {
        self.reservations
            .lock()
            .values()
            .filter(|r| &r.asset_pair == asset_pair && r.state.is_active())
            .count()
    }

    /// Sum of notional over active reservations.
    #[must_use]
    pub fn total_active_notional(&self) -> Price {
        self.reservations
            .lock()
            .values()
            .filter(|r| r.state.is_active())
            .fold(Price::ZERO, |acc, r| acc + r.notional_value)
    }

    /// Committed reservation for a pair, if any. Used to tie a closed trade
    /// back to the decision that opened it.
    #[must_use]
    pub fn committed_for_pair(&self, asset_pair: &AssetPair) -> Option<DecisionId> {
        self.reservations
            .lock()
            .values()
            .filter(|r| &r.asset_pair == asset_pair && r.state == ReservationState::Committed)
            .min_by_key(|r| r.created_at)
            .map(|r| r.decision_id.clone())
    }
}
