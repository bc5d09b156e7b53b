//! Pilot configuration with documented constants
//!
//! All tunable numbers of the decision core are collected here with
//! explanations of their purpose and how they interact with each other.
//! Every section deserializes with defaults, so a TOML file only needs to
//! name the values it changes.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::core::error::{PilotError, Result};
use crate::core::types::Tick;
use crate::state::Category;

/// Configuration for the whole decision core
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PilotConfig {
    pub planner: PlannerConfig,
    pub priority: PriorityConfig,
    pub navigation: NavigationConfig,
    pub combat: CombatConfig,
    pub anomaly: AnomalyConfig,
    pub session: SessionConfig,
}

// === PLANNER ===

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Consecutive failed replans allowed per goal activation
    ///
    /// A replan "fails" when the search finds no plan or the plan it produced
    /// is discarded before any step completes. Reaching this count marks the
    /// goal failed and forces an Emergency mode.
    pub max_replans: u32,

    /// Longest action sequence the search will consider
    pub max_plan_depth: usize,

    /// Depth cap used while escalation is at PlanSimplification or above
    ///
    /// Short plans re-check the world more often, which is what a stalled
    /// pilot needs.
    pub simplified_plan_depth: usize,

    /// Node expansion budget for one search
    ///
    /// Keeps a tick bounded even with a large catalog. At 4096 expansions and
    /// depth 8 the search stays well under a millisecond on typical catalogs.
    pub max_expansions: usize,

    /// Ticks an abandoned goal waits before it is queued again
    pub abandon_cooldown_ticks: Tick,

    /// Consecutive unconfirmed commands before the running step is failed
    pub actuation_failure_limit: u32,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_replans: 10,
            max_plan_depth: 8,
            simplified_plan_depth: 2,
            max_expansions: 4096,
            abandon_cooldown_ticks: 600,
            actuation_failure_limit: 5,
        }
    }
}

// === GOAL PRIORITY ===

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityConfig {
    /// Window (ticks) before a deadline in which the temporal multiplier rises
    pub temporal_horizon_ticks: Tick,

    /// Temporal multiplier reached at (or past) the deadline
    pub temporal_max: f32,

    /// Added to the dependency multiplier per queued goal this goal unblocks
    pub dependency_weight: f32,

    /// Efficiency decay per estimated remaining action
    ///
    /// efficiency = 1 / (1 + decay × actions). At 0.1 a goal one action away
    /// scores ~0.91, a goal five actions away ~0.67.
    pub efficiency_decay: f32,

    /// Deepest action chain the efficiency estimate looks for
    ///
    /// Goals the catalog cannot reach within this depth are estimated at
    /// depth + 1.
    pub estimate_max_depth: usize,

    /// State expansions allowed for one efficiency estimate
    pub estimate_max_expansions: usize,

    /// Success multiplier base, raised to the number of recorded failures
    pub success_decay: f32,

    /// Lower bound of the success multiplier
    ///
    /// Keeps persistently failing goals selectable when nothing else is left.
    pub success_floor: f32,

    /// Penalty per unit of party HP lost during the goal's last attempt
    pub risk_weight: f32,
}

impl Default for PriorityConfig {
    fn default() -> Self {
        Self {
            temporal_horizon_ticks: 1200,
            temporal_max: 2.0,
            dependency_weight: 0.25,
            efficiency_decay: 0.1,
            estimate_max_depth: 8,
            estimate_max_expansions: 512,
            success_decay: 0.75,
            success_floor: 0.05,
            risk_weight: 10.0,
        }
    }
}

// === NAVIGATION ===

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Cost multiplier for tall grass
    pub tall_grass_multiplier: f32,

    /// Cost multiplier for tall grass when encounters should be avoided
    pub tall_grass_avoid_multiplier: f32,

    /// Cost multiplier when entering a ledge along its fall direction
    pub ledge_with_fall_multiplier: f32,

    /// Cost multiplier when entering a ledge sideways
    pub ledge_lateral_multiplier: f32,

    /// Cost multiplier for tiles inside a trainer's line of sight
    pub trainer_vision_multiplier: f32,

    /// Trainer sight multiplier when encounters should be avoided
    pub trainer_vision_avoid_multiplier: f32,

    /// Cost multiplier for HM-gated tiles (time spent using the field move)
    pub hm_multiplier: f32,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            tall_grass_multiplier: 2.0,
            tall_grass_avoid_multiplier: 5.0,
            ledge_with_fall_multiplier: 0.9,
            ledge_lateral_multiplier: 2.0,
            trainer_vision_multiplier: 3.0,
            trainer_vision_avoid_multiplier: 8.0,
            hm_multiplier: 1.5,
        }
    }
}

impl NavigationConfig {
    /// Smallest multiplier any step can receive; scales the A* heuristic
    pub fn min_step_multiplier(&self) -> f32 {
        [
            1.0,
            self.tall_grass_multiplier,
            self.tall_grass_avoid_multiplier,
            self.ledge_with_fall_multiplier,
            self.ledge_lateral_multiplier,
            self.trainer_vision_multiplier,
            self.trainer_vision_avoid_multiplier,
            self.hm_multiplier,
        ]
        .into_iter()
        .fold(f32::INFINITY, f32::min)
    }
}

// === COMBAT ===

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Turns of expected incoming damage considered by switch evaluation
    pub switch_horizon_turns: u32,

    /// Switching is considered once incoming damage over the horizon exceeds
    /// this fraction of current HP
    pub switch_danger_ratio: f32,

    /// A bench member must beat the active's combined score by this much
    ///
    /// Prevents oscillating between two similar matchups every turn.
    pub switch_margin: f32,

    /// Flee wild battles when the active's HP fraction falls below this
    pub flee_hp_threshold: f32,

    /// Throw a ball once the catch probability reaches this value
    pub catch_throw_threshold: f32,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            switch_horizon_turns: 3,
            switch_danger_ratio: 1.0,
            switch_margin: 2.0,
            flee_hp_threshold: 0.25,
            catch_throw_threshold: 0.3,
        }
    }
}

// === ANOMALY DETECTION ===

/// When the escalation ladder drops back to None
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeescalationPolicy {
    /// Reset only when a mode is left within its threshold
    #[default]
    OnModeExit,
    /// Reset on any mode exit, even a late one
    OnAnyExit,
}

/// Default dwell thresholds per category, in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryThresholds {
    pub boot: f64,
    pub title: f64,
    pub menu: f64,
    pub dialog: f64,
    pub overworld: f64,
    pub battle: f64,
    pub emergency: f64,
    pub transition: f64,
}

impl Default for CategoryThresholds {
    fn default() -> Self {
        Self {
            boot: 120.0,
            title: 120.0,
            menu: 120.0,
            dialog: 60.0,
            overworld: 300.0,
            battle: 300.0,
            emergency: 180.0,
            transition: 30.0,
        }
    }
}

impl CategoryThresholds {
    pub fn seconds_for(&self, category: Category) -> f64 {
        match category {
            Category::Boot => self.boot,
            Category::Title => self.title,
            Category::Menu => self.menu,
            Category::Dialog => self.dialog,
            Category::Overworld => self.overworld,
            Category::Battle => self.battle,
            Category::Emergency => self.emergency,
            Category::Transition => self.transition,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyConfig {
    /// Exponential smoothing factor for learned dwell times
    ///
    /// newMean = α·observed + (1−α)·oldMean. At 0.3 a profile follows a new
    /// steady duration to within 1% after 13 exits.
    pub smoothing_alpha: f64,

    /// Learned mean is multiplied by this before comparing with the default
    pub threshold_factor: f64,

    /// Wall-clock seconds represented by one tick
    ///
    /// Only used to turn the second-based defaults into tick counts; the core
    /// itself never reads a clock.
    pub tick_seconds: f64,

    /// Ticks of sustained breach needed to climb one more tier
    pub escalation_step_ticks: Tick,

    pub thresholds: CategoryThresholds,

    pub deescalation: DeescalationPolicy,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            smoothing_alpha: 0.3,
            threshold_factor: 2.0,
            tick_seconds: 1.0,
            escalation_step_ticks: 30,
            thresholds: CategoryThresholds::default(),
            deescalation: DeescalationPolicy::default(),
        }
    }
}

impl AnomalyConfig {
    /// Default threshold for a category converted to ticks
    pub fn default_threshold_ticks(&self, category: Category) -> f64 {
        self.thresholds.seconds_for(category) / self.tick_seconds
    }
}

// === SESSION ===

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Consecutive PlanExhausted goals that count as a session-level stall
    pub stall_threshold: u32,

    /// Consecutive rejected observed transitions before the pilot declares
    /// an Exception emergency
    ///
    /// A single rejection is usually a misclassified frame; a run of them
    /// means the machine and the game disagree.
    pub rejection_limit: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            stall_threshold: 3,
            rejection_limit: 5,
        }
    }
}

impl PilotConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: PilotConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        let alpha = self.anomaly.smoothing_alpha;
        if !(alpha > 0.0 && alpha < 1.0) {
            return Err(PilotError::Config(format!(
                "smoothing_alpha ({}) must be in (0, 1)",
                alpha
            )));
        }

        if self.anomaly.tick_seconds <= 0.0 {
            return Err(PilotError::Config("tick_seconds must be positive".into()));
        }

        if self.planner.max_replans == 0 {
            return Err(PilotError::Config("max_replans must be at least 1".into()));
        }

        if self.planner.simplified_plan_depth > self.planner.max_plan_depth {
            return Err(PilotError::Config(format!(
                "simplified_plan_depth ({}) should be <= max_plan_depth ({})",
                self.planner.simplified_plan_depth, self.planner.max_plan_depth
            )));
        }

        let nav = &self.navigation;
        if nav.min_step_multiplier() <= 0.0 {
            return Err(PilotError::Config(
                "navigation multipliers must be positive".into(),
            ));
        }
        if nav.tall_grass_avoid_multiplier < nav.tall_grass_multiplier {
            return Err(PilotError::Config(format!(
                "tall_grass_avoid_multiplier ({}) should be >= tall_grass_multiplier ({})",
                nav.tall_grass_avoid_multiplier, nav.tall_grass_multiplier
            )));
        }

        if self.priority.estimate_max_expansions == 0 {
            return Err(PilotError::Config(
                "estimate_max_expansions must be at least 1".into(),
            ));
        }

        let success_decay = self.priority.success_decay;
        if !(success_decay > 0.0 && success_decay <= 1.0) {
            return Err(PilotError::Config(format!(
                "success_decay ({}) must be in (0, 1]",
                success_decay
            )));
        }

        if self.combat.switch_horizon_turns == 0 {
            return Err(PilotError::Config(
                "switch_horizon_turns must be at least 1".into(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(PilotConfig::default().validate().is_ok());
    }

    #[test]
    fn test_default_values_match_documented_constants() {
        let config = PilotConfig::default();
        assert_eq!(config.planner.max_replans, 10);
        assert_eq!(config.anomaly.smoothing_alpha, 0.3);
        assert_eq!(config.anomaly.thresholds.battle, 300.0);
        assert_eq!(config.anomaly.thresholds.dialog, 60.0);
        assert_eq!(config.anomaly.thresholds.overworld, 300.0);
        assert_eq!(config.navigation.tall_grass_multiplier, 2.0);
        assert_eq!(config.navigation.tall_grass_avoid_multiplier, 5.0);
        assert_eq!(config.combat.switch_horizon_turns, 3);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = PilotConfig::from_toml_str(
            r#"
            [planner]
            max_replans = 4

            [anomaly]
            tick_seconds = 0.5
            deescalation = "on_any_exit"

            [anomaly.thresholds]
            dialog = 90.0
            "#,
        )
        .unwrap();

        assert_eq!(config.planner.max_replans, 4);
        assert_eq!(config.planner.max_plan_depth, 8);
        assert_eq!(config.anomaly.deescalation, DeescalationPolicy::OnAnyExit);
        assert_eq!(config.anomaly.default_threshold_ticks(Category::Dialog), 180.0);
        assert_eq!(config.anomaly.default_threshold_ticks(Category::Battle), 600.0);
    }

    #[test]
    fn test_invalid_alpha_rejected() {
        let result = PilotConfig::from_toml_str("[anomaly]\nsmoothing_alpha = 1.5\n");
        assert!(matches!(result, Err(PilotError::Config(_))));
    }

    #[test]
    fn test_malformed_toml_rejected() {
        let result = PilotConfig::from_toml_str("[planner\nmax_replans = ");
        assert!(matches!(result, Err(PilotError::TomlError(_))));
    }
}
