use thiserror::Error;

use crate::anomaly::AnomalyEvent;
use crate::core::types::TilePos;
use crate::planner::goal::{GoalId, Shortfall};
use crate::state::Mode;

/// An illegal mode change was attempted; the machine state is unchanged
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid transition: {} -> {to}", from.map(|m| m.name()).unwrap_or("none"))]
pub struct InvalidTransition {
    pub from: Option<Mode>,
    pub to: Mode,
}

/// No route exists under the current navigation capabilities
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("No path from {from} to {to}")]
pub struct PathNotFound {
    pub from: TilePos,
    pub to: TilePos,
}

/// A goal's resource or dependency requirements are not met
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Goal {goal} infeasible: {} requirement(s) unmet", shortfall.len())]
pub struct GoalInfeasible {
    pub goal: GoalId,
    pub shortfall: Vec<Shortfall>,
}

#[derive(Error, Debug)]
pub enum PilotError {
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),

    #[error(transparent)]
    GoalInfeasible(#[from] GoalInfeasible),

    #[error(transparent)]
    PathNotFound(#[from] PathNotFound),

    #[error("Plan exhausted for goal {goal} after {replans} failed replans")]
    PlanExhausted { goal: GoalId, replans: u32 },

    #[error("Anomaly detected: {0}")]
    AnomalyDetected(AnomalyEvent),

    #[error("Session stalled: {consecutive} goals exhausted their plans in a row")]
    SessionStall { consecutive: u32 },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
}

impl PilotError {
    /// Errors the core recovers from locally (replan, escalate, or emergency)
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            PilotError::SessionStall { .. }
                | PilotError::Config(_)
                | PilotError::IoError(_)
                | PilotError::SerdeError(_)
                | PilotError::TomlError(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, PilotError>;
