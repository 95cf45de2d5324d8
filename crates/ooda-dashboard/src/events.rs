//! Dashboard event records.

use chrono::{DateTime, Utc};
use ooda_core::{AssetPair, DecisionId, TradeAction};
use serde::{Deserialize, Serialize};

/// One lifecycle notification: `{type, timestamp, ...}` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardEvent {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: DashboardEventKind,
}

impl DashboardEvent {
    #[must_use]
    pub fn now(kind: DashboardEventKind) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
        }
    }

    #[must_use]
    pub fn event_type(&self) -> &'static str {
        self.kind.event_type()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DashboardEventKind {
    StateTransition {
        from: String,
        to: String,
    },
    Decision {
        decision_id: DecisionId,
        asset_pair: AssetPair,
        action: TradeAction,
        confidence: f64,
    },
    RiskRejection {
        decision_id: DecisionId,
        asset_pair: AssetPair,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        gate: Option<String>,
        reason: String,
    },
    Execution {
        decision_id: DecisionId,
        asset_pair: AssetPair,
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        order_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    TradeClosed {
        trade_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        decision_id: Option<DecisionId>,
        asset_pair: AssetPair,
        exit_reason: String,
        realized_pnl: String,
    },
    KillSwitch {
        reason: String,
    },
    Recovery {
        success: bool,
        kept: usize,
        closed: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
}

impl DashboardEventKind {
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::StateTransition { .. } => "state_transition",
            Self::Decision { .. } => "decision",
            Self::RiskRejection { .. } => "risk_rejection",
            Self::Execution { .. } => "execution",
            Self::TradeClosed { .. } => "trade_closed",
            Self::KillSwitch { .. } => "kill_switch",
            Self::Recovery { .. } => "recovery",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape_is_flat_with_type_tag() {
        let event = DashboardEvent::now(DashboardEventKind::StateTransition {
            from: "IDLE".to_string(),
            to: "PERCEPTION".to_string(),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "state_transition");
        assert_eq!(json["to"], "PERCEPTION");
        assert!(json["timestamp"].is_string());

        let back: DashboardEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back.event_type(), "state_transition");
    }
}
