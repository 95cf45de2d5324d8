//! Agent status as seen from outside.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Coarse status for external consumers, so they never interpret raw
/// agent states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnifiedStatus {
    Offline,
    Initializing,
    Ready,
    Active,
    Error,
}

impl UnifiedStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Offline => "offline",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Active => "active",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for UnifiedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of the agent served at `/api/status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentStatusSnapshot {
    /// Raw agent state (`IDLE`, `PERCEPTION`, ...).
    pub state: String,
    pub unified_status: UnifiedStatus,
    pub stopped: bool,
    pub cycle_count: u64,
    pub active_trackers: usize,
    pub pending_decisions: usize,
    pub active_reservations: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kill_switch_reason: Option<String>,
    pub monitor_paused: bool,
    pub updated_at: DateTime<Utc>,
}

impl Default for AgentStatusSnapshot {
    fn default() -> Self {
        Self {
            state: "IDLE".to_string(),
            unified_status: UnifiedStatus::Offline,
            stopped: false,
            cycle_count: 0,
            active_trackers: 0,
            pending_decisions: 0,
            active_reservations: 0,
            kill_switch_reason: None,
            monitor_paused: false,
            updated_at: Utc::now(),
        }
    }
}

/// Latest snapshot, written by the agent and read by the server.
#[derive(Debug, Clone, Default)]
pub struct StatusBoard {
    inner: Arc<RwLock<AgentStatusSnapshot>>,
}

impl StatusBoard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, snapshot: AgentStatusSnapshot) {
        *self.inner.write() = snapshot;
    }

    #[must_use]
    pub fn snapshot(&self) -> AgentStatusSnapshot {
        self.inner.read().clone()
    }
}
