//! Switch evaluation
//!
//! Switching is only considered when the opponent is expected to take more
//! than `switch_danger_ratio` of the active's HP within the horizon. Each
//! candidate is scored as defensive profile plus best offensive score, and
//! a switch needs to beat the active by `switch_margin`.

use serde::{Deserialize, Serialize};

use super::constants::DEFENSIVE_WEIGHT;
use super::pokemon::Pokemon;
use super::selection::best_offensive_score;
use super::trainer::{assumed_moves, expected_incoming};
use super::types::TypeChart;
use crate::core::config::CombatConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SwitchDecision {
    /// Incoming damage is below the danger threshold
    Safe { incoming: f32 },
    /// In danger, but no bench member beats the active by the margin
    Stay { current: f32, best_alternative: Option<f32> },
    Switch { index: usize, score: f32, current: f32 },
}

/// Worst effectiveness of the opponent's attacks against `member`
fn worst_incoming_effectiveness(member: &Pokemon, opponent: &Pokemon, chart: &TypeChart) -> f32 {
    assumed_moves(opponent)
        .iter()
        .filter(|m| m.is_damaging())
        .map(|m| chart.effectiveness_against(m.move_type, &member.types))
        .fold(0.0, f32::max)
}

/// Defensive type profile weighted by remaining HP
pub fn defensive_score(member: &Pokemon, opponent: &Pokemon, chart: &TypeChart) -> f32 {
    let worst = worst_incoming_effectiveness(member, opponent, chart);
    DEFENSIVE_WEIGHT / (1.0 + worst) * member.hp
}

/// Defensive plus offensive score of `member` against `opponent`
pub fn matchup_score(member: &Pokemon, opponent: &Pokemon, chart: &TypeChart) -> f32 {
    defensive_score(member, opponent, chart) + best_offensive_score(member, opponent, chart)
}

/// Expected damage over the horizon as a fraction of max HP
pub fn incoming_fraction(
    active: &Pokemon,
    opponent: &Pokemon,
    turns: u32,
    chart: &TypeChart,
) -> f32 {
    let per_turn = expected_incoming(opponent, active, chart);
    per_turn * turns as f32 / active.max_hp()
}

/// Decide whether to switch out `party[active]`
pub fn evaluate_switch(
    party: &[Pokemon],
    active: usize,
    opponent: &Pokemon,
    chart: &TypeChart,
    config: &CombatConfig,
) -> SwitchDecision {
    let Some(current) = party.get(active) else {
        return SwitchDecision::Safe { incoming: 0.0 };
    };

    let incoming = incoming_fraction(current, opponent, config.switch_horizon_turns, chart);
    if incoming <= config.switch_danger_ratio * current.hp {
        return SwitchDecision::Safe { incoming };
    }

    let current_score = matchup_score(current, opponent, chart);
    let best = best_bench_member(party, active, opponent, chart);

    match best {
        Some((index, score)) if score > current_score + config.switch_margin => {
            tracing::debug!(
                from = %current.species,
                to = %party[index].species,
                score,
                current = current_score,
                "Switch recommended"
            );
            SwitchDecision::Switch {
                index,
                score,
                current: current_score,
            }
        }
        other => SwitchDecision::Stay {
            current: current_score,
            best_alternative: other.map(|(_, s)| s),
        },
    }
}

/// Highest-scoring healthy bench member, lowest index on ties
pub fn best_bench_member(
    party: &[Pokemon],
    active: usize,
    opponent: &Pokemon,
    chart: &TypeChart,
) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (i, member) in party.iter().enumerate() {
        if i == active || member.is_fainted() {
            continue;
        }
        let score = matchup_score(member, opponent, chart);
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((i, score));
        }
    }
    best
}

/// Replacement after the active fainted
pub fn forced_switch(
    party: &[Pokemon],
    fainted: usize,
    opponent: &Pokemon,
    chart: &TypeChart,
) -> Option<usize> {
    best_bench_member(party, fainted, opponent, chart).map(|(i, _)| i)
}
