//! Damage model
//!
//! base  = ((2·level/5 + 2) · power · attack / defense) / 50 + 2
//! final = floor(base × STAB × effectiveness × random × crit), at least 1
//!
//! Immune targets take 0. The formula uses real division throughout; the
//! only rounding is the final floor.

use serde::{Deserialize, Serialize};

use super::constants::{
    CRITICAL_MULTIPLIER, MAX_RANDOM_FACTOR, MEAN_RANDOM_FACTOR, MIN_RANDOM_FACTOR,
    STAB_MULTIPLIER,
};
use super::pokemon::{Move, MoveCategory, Pokemon};
use super::types::TypeChart;

/// Pre-modifier damage
pub fn base_damage(level: u8, power: u16, attack: u32, defense: u32) -> f32 {
    let level = f32::from(level);
    let power = f32::from(power);
    let defense = defense.max(1) as f32;
    ((2.0 * level / 5.0 + 2.0) * power * attack as f32 / defense) / 50.0 + 2.0
}

/// Multipliers applied on top of base damage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DamageModifiers {
    pub stab: f32,
    pub effectiveness: f32,
    pub random: f32,
    pub critical: bool,
}

impl DamageModifiers {
    pub fn neutral() -> Self {
        Self {
            stab: 1.0,
            effectiveness: 1.0,
            random: 1.0,
            critical: false,
        }
    }

    pub fn product(&self) -> f32 {
        let crit = if self.critical { CRITICAL_MULTIPLIER } else { 1.0 };
        self.stab * self.effectiveness * self.random * crit
    }
}

impl Default for DamageModifiers {
    fn default() -> Self {
        Self::neutral()
    }
}

/// Apply modifiers to a base value and floor the result
pub fn final_damage(base: f32, modifiers: &DamageModifiers) -> u32 {
    if modifiers.effectiveness <= 0.0 {
        return 0;
    }
    ((base * modifiers.product()).floor() as u32).max(1)
}

/// Damage range of one move from one attacker against one defender
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DamageEstimate {
    pub min: u32,
    pub max: u32,
    /// Mean roll, not weighted by accuracy
    pub expected: f32,
    pub effectiveness: f32,
    pub stab: bool,
}

impl DamageEstimate {
    pub fn none() -> Self {
        Self {
            min: 0,
            max: 0,
            expected: 0.0,
            effectiveness: 0.0,
            stab: false,
        }
    }

    /// Does the weakest roll still knock out a target with `remaining_hp`?
    pub fn guaranteed_knockout(&self, remaining_hp: f32) -> bool {
        self.min > 0 && self.min as f32 >= remaining_hp
    }
}

/// Estimate the damage `mv` from `attacker` does to `defender`
///
/// Stats fall back to level-based estimates when perception did not report
/// them. Status moves deal nothing.
pub fn estimate_damage(
    attacker: &Pokemon,
    defender: &Pokemon,
    mv: &Move,
    chart: &TypeChart,
) -> DamageEstimate {
    if !mv.is_damaging() {
        return DamageEstimate::none();
    }

    let atk_stats = attacker.effective_stats();
    let def_stats = defender.effective_stats();
    let (attack, defense) = match mv.category {
        MoveCategory::Special => (atk_stats.sp_attack, def_stats.sp_defense),
        _ => (atk_stats.attack, def_stats.defense),
    };

    let base = base_damage(attacker.level, mv.power, attack, defense);
    let effectiveness = chart.effectiveness_against(mv.move_type, &defender.types);
    let stab = attacker.has_type(mv.move_type);

    let roll = |random: f32| DamageModifiers {
        stab: if stab { STAB_MULTIPLIER } else { 1.0 },
        effectiveness,
        random,
        critical: false,
    };

    DamageEstimate {
        min: final_damage(base, &roll(MIN_RANDOM_FACTOR)),
        max: final_damage(base, &roll(MAX_RANDOM_FACTOR)),
        expected: if effectiveness > 0.0 {
            base * roll(MEAN_RANDOM_FACTOR).product()
        } else {
            0.0
        },
        effectiveness,
        stab,
    }
}
