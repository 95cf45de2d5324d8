//! Agent states and the transition table.

use std::fmt;

use ooda_dashboard::UnifiedStatus;
use serde::{Deserialize, Serialize};

/// Position of the agent in its OODA cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentState {
    Idle,
    Recovering,
    Perception,
    Reasoning,
    RiskCheck,
    Execution,
    Learning,
}

impl AgentState {
    pub const ALL: [AgentState; 7] = [
        AgentState::Idle,
        AgentState::Recovering,
        AgentState::Perception,
        AgentState::Reasoning,
        AgentState::RiskCheck,
        AgentState::Execution,
        AgentState::Learning,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentState::Idle => "IDLE",
            AgentState::Recovering => "RECOVERING",
            AgentState::Perception => "PERCEPTION",
            AgentState::Reasoning => "REASONING",
            AgentState::RiskCheck => "RISK_CHECK",
            AgentState::Execution => "EXECUTION",
            AgentState::Learning => "LEARNING",
        }
    }

    /// States reachable from `self` in one step.
    #[must_use]
    pub fn successors(self) -> &'static [AgentState] {
        use AgentState::*;
        match self {
            Idle => &[Recovering, Perception],
            Recovering => &[Perception],
            Perception => &[Reasoning, Idle],
            Reasoning => &[RiskCheck],
            RiskCheck => &[Execution],
            Execution => &[Learning],
            Learning => &[Perception, Idle],
        }
    }

    #[must_use]
    pub fn can_transition_to(self, next: AgentState) -> bool {
        self.successors().contains(&next)
    }
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs to the externally visible status.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusInputs {
    pub stopped: bool,
    pub kill_switch_triggered: bool,
    pub fatal: bool,
    pub cycle_count: u64,
}

/// Collapse the raw state into the coarse status shown to consumers.
#[must_use]
pub fn unified_status(state: AgentState, inputs: StatusInputs) -> UnifiedStatus {
    if inputs.fatal {
        return UnifiedStatus::Error;
    }
    if inputs.stopped || inputs.kill_switch_triggered {
        return UnifiedStatus::Offline;
    }
    match state {
        AgentState::Recovering => UnifiedStatus::Initializing,
        AgentState::Idle if inputs.cycle_count == 0 => UnifiedStatus::Initializing,
        AgentState::Idle => UnifiedStatus::Ready,
        _ => UnifiedStatus::Active,
    }
}
