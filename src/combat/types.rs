//! Elemental types and the 18×18 effectiveness chart

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PokemonType {
    Normal,
    Fire,
    Water,
    Electric,
    Grass,
    Ice,
    Fighting,
    Poison,
    Ground,
    Flying,
    Psychic,
    Bug,
    Rock,
    Ghost,
    Dragon,
    Dark,
    Steel,
    Fairy,
}

impl PokemonType {
    pub const COUNT: usize = 18;

    pub const ALL: [PokemonType; Self::COUNT] = [
        PokemonType::Normal,
        PokemonType::Fire,
        PokemonType::Water,
        PokemonType::Electric,
        PokemonType::Grass,
        PokemonType::Ice,
        PokemonType::Fighting,
        PokemonType::Poison,
        PokemonType::Ground,
        PokemonType::Flying,
        PokemonType::Psychic,
        PokemonType::Bug,
        PokemonType::Rock,
        PokemonType::Ghost,
        PokemonType::Dragon,
        PokemonType::Dark,
        PokemonType::Steel,
        PokemonType::Fairy,
    ];

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn name(&self) -> &'static str {
        match self {
            PokemonType::Normal => "normal",
            PokemonType::Fire => "fire",
            PokemonType::Water => "water",
            PokemonType::Electric => "electric",
            PokemonType::Grass => "grass",
            PokemonType::Ice => "ice",
            PokemonType::Fighting => "fighting",
            PokemonType::Poison => "poison",
            PokemonType::Ground => "ground",
            PokemonType::Flying => "flying",
            PokemonType::Psychic => "psychic",
            PokemonType::Bug => "bug",
            PokemonType::Rock => "rock",
            PokemonType::Ghost => "ghost",
            PokemonType::Dragon => "dragon",
            PokemonType::Dark => "dark",
            PokemonType::Steel => "steel",
            PokemonType::Fairy => "fairy",
        }
    }

    /// Case-insensitive lookup, as perception reports type labels
    pub fn from_name(name: &str) -> Option<PokemonType> {
        let lower = name.to_ascii_lowercase();
        Self::ALL.iter().copied().find(|t| t.name() == lower)
    }
}

impl fmt::Display for PokemonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Attacking type → (super effective, not very effective, no effect)
type ChartRow = (
    PokemonType,
    &'static [PokemonType],
    &'static [PokemonType],
    &'static [PokemonType],
);

const STANDARD_CHART: &[ChartRow] = {
    use PokemonType::*;
    &[
        (Normal, &[], &[Rock, Steel], &[Ghost]),
        (Fire, &[Grass, Ice, Bug, Steel], &[Fire, Water, Rock, Dragon], &[]),
        (Water, &[Fire, Ground, Rock], &[Water, Grass, Dragon], &[]),
        (Electric, &[Water, Flying], &[Electric, Grass, Dragon], &[Ground]),
        (
            Grass,
            &[Water, Ground, Rock],
            &[Fire, Grass, Poison, Flying, Bug, Dragon, Steel],
            &[],
        ),
        (Ice, &[Grass, Ground, Flying, Dragon], &[Fire, Water, Ice, Steel], &[]),
        (
            Fighting,
            &[Normal, Ice, Rock, Dark, Steel],
            &[Poison, Flying, Psychic, Bug, Fairy],
            &[Ghost],
        ),
        (Poison, &[Grass, Fairy], &[Poison, Ground, Rock, Ghost], &[Steel]),
        (
            Ground,
            &[Fire, Electric, Poison, Rock, Steel],
            &[Grass, Bug],
            &[Flying],
        ),
        (Flying, &[Grass, Fighting, Bug], &[Electric, Rock, Steel], &[]),
        (Psychic, &[Fighting, Poison], &[Psychic, Steel], &[Dark]),
        (
            Bug,
            &[Grass, Psychic, Dark],
            &[Fire, Fighting, Poison, Flying, Ghost, Steel, Fairy],
            &[],
        ),
        (Rock, &[Fire, Ice, Flying, Bug], &[Fighting, Ground, Steel], &[]),
        (Ghost, &[Psychic, Ghost], &[Dark], &[Normal]),
        (Dragon, &[Dragon], &[Steel], &[Fairy]),
        (Dark, &[Psychic, Ghost], &[Fighting, Dark, Fairy], &[]),
        (Steel, &[Ice, Rock, Fairy], &[Fire, Water, Electric, Steel], &[]),
        (Fairy, &[Fighting, Dragon, Dark], &[Fire, Poison, Steel], &[]),
    ]
};

/// Single-type effectiveness matrix, indexed [attacker][defender]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeChart {
    matrix: [[f32; PokemonType::COUNT]; PokemonType::COUNT],
}

impl TypeChart {
    /// All-neutral chart
    pub fn neutral() -> Self {
        Self {
            matrix: [[1.0; PokemonType::COUNT]; PokemonType::COUNT],
        }
    }

    /// The modern 18-type chart
    pub fn standard() -> Self {
        let mut chart = Self::neutral();
        for (attacker, strong, weak, immune) in STANDARD_CHART {
            for defender in strong.iter() {
                chart.set(*attacker, *defender, 2.0);
            }
            for defender in weak.iter() {
                chart.set(*attacker, *defender, 0.5);
            }
            for defender in immune.iter() {
                chart.set(*attacker, *defender, 0.0);
            }
        }
        chart
    }

    pub fn set(&mut self, attacker: PokemonType, defender: PokemonType, value: f32) {
        self.matrix[attacker.index()][defender.index()] = value;
    }

    /// Multiplier of one attacking type against one defending type
    pub fn effectiveness(&self, attacker: PokemonType, defender: PokemonType) -> f32 {
        self.matrix[attacker.index()][defender.index()]
    }

    /// Product over all of the defender's types (0, 0.25, 0.5, 1, 2 or 4)
    pub fn effectiveness_against(&self, attacker: PokemonType, defender: &[PokemonType]) -> f32 {
        defender
            .iter()
            .map(|d| self.effectiveness(attacker, *d))
            .product()
    }

    pub fn is_super_effective(&self, attacker: PokemonType, defender: &[PokemonType]) -> bool {
        self.effectiveness_against(attacker, defender) > 1.0
    }
}

impl Default for TypeChart {
    fn default() -> Self {
        Self::standard()
    }
}
