//! Party and opponent data as reported by perception

use serde::{Deserialize, Serialize};

use super::constants::{
    ESTIMATED_BASE_STAT, ESTIMATED_HP_BONUS, ESTIMATED_STAT_BONUS, STRUGGLE_POWER,
};
use super::types::PokemonType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveCategory {
    #[default]
    Physical,
    Special,
    Status,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Move {
    pub name: String,
    pub move_type: PokemonType,
    pub power: u16,
    /// Hit chance in percent; None for moves that never miss
    #[serde(default)]
    pub accuracy: Option<u8>,
    #[serde(default)]
    pub priority: i8,
    pub pp: u8,
    #[serde(default)]
    pub category: MoveCategory,
}

impl Move {
    pub fn new(name: impl Into<String>, move_type: PokemonType, power: u16, accuracy: u8) -> Self {
        Self {
            name: name.into(),
            move_type,
            power,
            accuracy: Some(accuracy),
            priority: 0,
            pp: 10,
            category: if power == 0 {
                MoveCategory::Status
            } else {
                MoveCategory::Physical
            },
        }
    }

    pub fn with_pp(mut self, pp: u8) -> Self {
        self.pp = pp;
        self
    }

    pub fn with_priority(mut self, priority: i8) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_category(mut self, category: MoveCategory) -> Self {
        self.category = category;
        self
    }

    /// Fallback attack once every move is out of PP
    pub fn struggle() -> Self {
        Self {
            name: "Struggle".to_string(),
            move_type: PokemonType::Normal,
            power: STRUGGLE_POWER,
            accuracy: None,
            priority: 0,
            pp: 1,
            category: MoveCategory::Physical,
        }
    }

    pub fn accuracy_factor(&self) -> f32 {
        self.accuracy.map_or(1.0, |a| f32::from(a.min(100)) / 100.0)
    }

    pub fn is_damaging(&self) -> bool {
        self.power > 0 && self.category != MoveCategory::Status
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatBlock {
    pub hp: u32,
    pub attack: u32,
    pub defense: u32,
    pub sp_attack: u32,
    pub sp_defense: u32,
    pub speed: u32,
}

impl StatBlock {
    /// Typical stats at `level` when the real ones are unknown
    ///
    /// Uses the standard growth curve with a mid-range base stat and no
    /// individual or effort values.
    pub fn estimate(level: u8) -> Self {
        let level = u32::from(level.max(1));
        let grown = 2 * ESTIMATED_BASE_STAT * level / 100;
        let stat = grown + ESTIMATED_STAT_BONUS;
        Self {
            hp: grown + level + ESTIMATED_HP_BONUS,
            attack: stat,
            defense: stat,
            sp_attack: stat,
            sp_defense: stat,
            speed: stat,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCondition {
    #[default]
    None,
    Sleep,
    Freeze,
    Paralysis,
    Poison,
    Burn,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pokemon {
    pub species: String,
    pub level: u8,
    /// Remaining HP as a fraction of max HP
    pub hp: f32,
    pub types: Vec<PokemonType>,
    #[serde(default)]
    pub moves: Vec<Move>,
    /// Exact stats when perception can read them
    #[serde(default)]
    pub stats: Option<StatBlock>,
    #[serde(default)]
    pub status: StatusCondition,
    /// Species catch rate (wild opponents)
    #[serde(default)]
    pub catch_rate: Option<u8>,
}

impl Pokemon {
    pub fn new(species: impl Into<String>, level: u8, types: Vec<PokemonType>) -> Self {
        Self {
            species: species.into(),
            level,
            hp: 1.0,
            types,
            moves: Vec::new(),
            stats: None,
            status: StatusCondition::None,
            catch_rate: None,
        }
    }

    pub fn with_moves(mut self, moves: Vec<Move>) -> Self {
        self.moves = moves;
        self
    }

    pub fn with_hp(mut self, hp: f32) -> Self {
        self.hp = hp.clamp(0.0, 1.0);
        self
    }

    pub fn with_stats(mut self, stats: StatBlock) -> Self {
        self.stats = Some(stats);
        self
    }

    pub fn with_status(mut self, status: StatusCondition) -> Self {
        self.status = status;
        self
    }

    pub fn with_catch_rate(mut self, rate: u8) -> Self {
        self.catch_rate = Some(rate);
        self
    }

    pub fn is_fainted(&self) -> bool {
        self.hp <= 0.0
    }

    pub fn has_type(&self, t: PokemonType) -> bool {
        self.types.contains(&t)
    }

    /// Real stats if known, otherwise the level-based estimate
    pub fn effective_stats(&self) -> StatBlock {
        self.stats.unwrap_or_else(|| StatBlock::estimate(self.level))
    }

    pub fn max_hp(&self) -> f32 {
        self.effective_stats().hp as f32
    }

    pub fn remaining_hp(&self) -> f32 {
        self.hp.max(0.0) * self.max_hp()
    }

    /// Moves that still have PP, with their catalog index
    pub fn usable_moves(&self) -> impl Iterator<Item = (usize, &Move)> {
        self.moves.iter().enumerate().filter(|(_, m)| m.pp > 0)
    }
}
