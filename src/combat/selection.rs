//! Move selection
//!
//! score = (power/10) × effectiveness × accuracy × coverage
//!         + STAB bonus + knockout bonus + priority bonus
//!
//! Immune matchups score 0 and get no bonuses. Moves without PP are never
//! picked; ties go to the lowest move index.

use serde::{Deserialize, Serialize};

use super::constants::{
    COVERAGE_BONUS_PER_TARGET, KNOCKOUT_BONUS, POWER_SCALE, PRIORITY_BONUS, STAB_BONUS,
};
use super::damage::estimate_damage;
use super::pokemon::{Move, Pokemon};
use super::types::{PokemonType, TypeChart};

/// Breakdown of one move's score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveScore {
    pub index: usize,
    pub name: String,
    pub score: f32,
    pub effectiveness: f32,
    pub stab: bool,
    pub knockout: bool,
}

/// The selected move; `index` is None for Struggle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveChoice {
    pub index: Option<usize>,
    pub name: String,
    pub score: f32,
    pub rationale: String,
}

/// Score `mv` (at catalog position `index`) against `defender`
///
/// `known_opponents` lists the types of the other opponents seen so far;
/// each one the move hits super effectively adds to the coverage factor.
pub fn score_move(
    index: usize,
    mv: &Move,
    attacker: &Pokemon,
    defender: &Pokemon,
    known_opponents: &[Vec<PokemonType>],
    chart: &TypeChart,
) -> MoveScore {
    let estimate = estimate_damage(attacker, defender, mv, chart);
    let effectiveness = chart.effectiveness_against(mv.move_type, &defender.types);

    let mut score = MoveScore {
        index,
        name: mv.name.clone(),
        score: 0.0,
        effectiveness,
        stab: estimate.stab,
        knockout: false,
    };
    if !mv.is_damaging() || effectiveness == 0.0 {
        return score;
    }

    let covered = known_opponents
        .iter()
        .filter(|types| chart.is_super_effective(mv.move_type, types))
        .count();
    let coverage = 1.0 + COVERAGE_BONUS_PER_TARGET * covered as f32;

    let mut total =
        (f32::from(mv.power) / POWER_SCALE) * effectiveness * mv.accuracy_factor() * coverage;

    if estimate.stab {
        total += STAB_BONUS;
    }
    if estimate.guaranteed_knockout(defender.remaining_hp()) {
        score.knockout = true;
        total += KNOCKOUT_BONUS;
    }
    if mv.priority > 0 {
        total += PRIORITY_BONUS * f32::from(mv.priority);
    }

    score.score = total;
    score
}

/// Scores of every move that still has PP, in catalog order
pub fn score_moves(
    attacker: &Pokemon,
    defender: &Pokemon,
    known_opponents: &[Vec<PokemonType>],
    chart: &TypeChart,
) -> Vec<MoveScore> {
    attacker
        .usable_moves()
        .map(|(i, mv)| score_move(i, mv, attacker, defender, known_opponents, chart))
        .collect()
}

/// Pick the best move, falling back to Struggle when nothing has PP
pub fn select_move(
    attacker: &Pokemon,
    defender: &Pokemon,
    known_opponents: &[Vec<PokemonType>],
    chart: &TypeChart,
) -> MoveChoice {
    let scores = score_moves(attacker, defender, known_opponents, chart);

    let mut best: Option<&MoveScore> = None;
    for candidate in &scores {
        // Strictly greater keeps the lowest index on ties
        if best.map_or(true, |b| candidate.score > b.score) {
            best = Some(candidate);
        }
    }

    match best {
        Some(best) => MoveChoice {
            index: Some(best.index),
            name: best.name.clone(),
            score: best.score,
            rationale: format!(
                "{} vs {}: {:.2} (x{} effectiveness{}{})",
                best.name,
                defender.species,
                best.score,
                best.effectiveness,
                if best.stab { ", STAB" } else { "" },
                if best.knockout { ", KO" } else { "" },
            ),
        },
        None => {
            let struggle = Move::struggle();
            let s = score_move(0, &struggle, attacker, defender, known_opponents, chart);
            MoveChoice {
                index: None,
                name: struggle.name,
                score: s.score,
                rationale: "no move has PP left".to_string(),
            }
        }
    }
}

/// Best score any usable move of `attacker` reaches against `defender`
pub fn best_offensive_score(attacker: &Pokemon, defender: &Pokemon, chart: &TypeChart) -> f32 {
    score_moves(attacker, defender, &[], chart)
        .iter()
        .map(|s| s.score)
        .fold(0.0, f32::max)
}
