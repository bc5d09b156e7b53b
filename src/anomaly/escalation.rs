//! Escalation ladder and anomaly events

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::types::Tick;
use crate::state::Mode;

/// Response level to a sustained dwell-time anomaly, lowest first
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum EscalationTier {
    #[default]
    None,
    EnhancedMonitoring,
    PlanSimplification,
    EmergencyProtocol,
    ResetCondition,
}

impl EscalationTier {
    pub const LADDER: [EscalationTier; 5] = [
        EscalationTier::None,
        EscalationTier::EnhancedMonitoring,
        EscalationTier::PlanSimplification,
        EscalationTier::EmergencyProtocol,
        EscalationTier::ResetCondition,
    ];

    pub fn level(&self) -> u8 {
        match self {
            EscalationTier::None => 0,
            EscalationTier::EnhancedMonitoring => 1,
            EscalationTier::PlanSimplification => 2,
            EscalationTier::EmergencyProtocol => 3,
            EscalationTier::ResetCondition => 4,
        }
    }

    /// Tier at `level`, saturating at the top
    pub fn from_level(level: u64) -> EscalationTier {
        let idx = usize::try_from(level)
            .unwrap_or(usize::MAX)
            .min(Self::LADDER.len() - 1);
        Self::LADDER[idx]
    }

    /// One tier up; ResetCondition stays put
    pub fn next(&self) -> EscalationTier {
        Self::from_level(u64::from(self.level()) + 1)
    }

    pub fn name(&self) -> &'static str {
        match self {
            EscalationTier::None => "none",
            EscalationTier::EnhancedMonitoring => "enhanced_monitoring",
            EscalationTier::PlanSimplification => "plan_simplification",
            EscalationTier::EmergencyProtocol => "emergency_protocol",
            EscalationTier::ResetCondition => "reset_condition",
        }
    }
}

impl fmt::Display for EscalationTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A mode outstayed its threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyEvent {
    pub mode: Mode,
    /// Ticks spent in the mode so far
    pub observed: Tick,
    /// Threshold in ticks at the time of the breach
    pub threshold: f64,
    pub tier: EscalationTier,
    pub tick: Tick,
}

impl fmt::Display for AnomalyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} dwell {} ticks exceeds {:.1} (tier {})",
            self.mode, self.observed, self.threshold, self.tier
        )
    }
}
