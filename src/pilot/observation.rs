//! Per-tick inputs from the perception and actuation collaborators

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::combat::BattleState;
use crate::core::types::{Capabilities, ItemId, Tick, TilePos};
use crate::planner::WorldState;
use crate::state::Mode;

/// Classified screen state for one tick
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Observation {
    /// Mode perception classified the frame as; None when unsure
    pub mode: Option<Mode>,
    pub position: Option<TilePos>,
    pub battle: Option<BattleState>,
    /// HP fraction of each party member, in party order
    pub party_hp: Vec<f32>,
    pub money: u32,
    pub badges: u8,
    pub items: BTreeMap<ItemId, u32>,
    pub flags: BTreeSet<String>,
    /// Scripted water crossing available (ferry, cutscene boat)
    pub water_substitute: bool,
}

impl Observation {
    pub fn in_mode(mode: Mode) -> Self {
        Self {
            mode: Some(mode),
            ..Self::default()
        }
    }

    fn hp_fractions(&self) -> Vec<f32> {
        if !self.party_hp.is_empty() {
            return self.party_hp.clone();
        }
        self.battle
            .as_ref()
            .map(|b| b.party.iter().map(|p| p.hp).collect())
            .unwrap_or_default()
    }

    /// Average party HP in percent; 100 when nothing was reported
    pub fn party_health_percent(&self) -> u8 {
        let hp = self.hp_fractions();
        if hp.is_empty() {
            return 100;
        }
        let mean = hp.iter().map(|h| h.clamp(0.0, 1.0)).sum::<f32>() / hp.len() as f32;
        (mean * 100.0).round() as u8
    }

    /// Every reported party member is at zero HP
    pub fn party_fainted(&self) -> bool {
        let hp = self.hp_fractions();
        !hp.is_empty() && hp.iter().all(|h| *h <= 0.0)
    }

    /// Planning view of this observation
    pub fn world_state(&self, capabilities: Capabilities) -> WorldState {
        WorldState {
            position: self.position,
            mode: self.mode,
            capabilities,
            money: self.money,
            badges: self.badges,
            party_health: self.party_health_percent(),
            items: self.items.clone(),
            flags: self.flags.clone(),
        }
    }
}

/// What actuation reports back each tick
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActuationReport {
    pub tick: Tick,
    /// HM field moves currently usable
    pub capabilities: Capabilities,
    /// Whether the previous command executed; None when unknown
    pub last_command_executed: Option<bool>,
}

impl ActuationReport {
    pub fn at(tick: Tick) -> Self {
        Self {
            tick,
            ..Self::default()
        }
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn confirmed(mut self, executed: bool) -> Self {
        self.last_command_executed = Some(executed);
        self
    }
}
