//! Per-tick output and read-only records for downstream consumers

use serde::{Deserialize, Serialize};

use crate::anomaly::{AnomalyEvent, DwellExit, EscalationTier};
use crate::core::input::Command;
use crate::core::types::{InstanceId, Tick};
use crate::planner::{GoalId, PlannerEvent, PlannerSnapshot};
use crate::state::{Mode, TransitionRecord};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum PilotEvent {
    Transition(TransitionRecord),
    TransitionRejected {
        from: Option<Mode>,
        to: Mode,
        consecutive: u32,
    },
    DwellRecorded(DwellExit),
    Anomaly(AnomalyEvent),
    EscalationApplied {
        tier: EscalationTier,
    },
    EmergencyEntered {
        mode: Mode,
        reason: String,
    },
    Recovered {
        presses: u32,
    },
    Planner(PlannerEvent),
    SessionStalled {
        consecutive: u32,
    },
}

/// The one output of a tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub tick: Tick,
    pub command: Command,
    pub rationale: String,
    pub score: f32,
    /// Mode after this tick's transitions
    pub mode: Option<Mode>,
    pub tier: EscalationTier,
    pub events: Vec<PilotEvent>,
}

impl Decision {
    pub fn has_event(&self, predicate: impl Fn(&PilotEvent) -> bool) -> bool {
        self.events.iter().any(predicate)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PilotSnapshot {
    pub instance: InstanceId,
    pub tick: Tick,
    pub mode: Option<Mode>,
    pub tier: EscalationTier,
    pub active_goal: Option<GoalId>,
    pub planner: PlannerSnapshot,
    pub last_anomaly: Option<AnomalyEvent>,
    pub transitions: usize,
    pub rejections: u64,
    pub consecutive_exhaustions: u32,
}
