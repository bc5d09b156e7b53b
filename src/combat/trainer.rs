//! Opponent behaviour prediction
//!
//! Trainers are modelled as greedy: they use the move that deals the most
//! expected damage to our active Pokémon, and heal once their active drops
//! below a fixed HP fraction while they still hold items.

use serde::{Deserialize, Serialize};

use super::constants::{ASSUMED_MOVE_POWER, TRAINER_ITEM_HP_THRESHOLD};
use super::damage::estimate_damage;
use super::pokemon::{Move, MoveCategory, Pokemon};
use super::types::TypeChart;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PredictedAction {
    UseMove { name: String, expected_damage: f32 },
    UseItem,
}

/// Moves the opponent is assumed to have
///
/// Revealed moves when perception has seen any; otherwise one attack of
/// moderate power per opponent type.
pub fn assumed_moves(opponent: &Pokemon) -> Vec<Move> {
    if !opponent.moves.is_empty() {
        return opponent.moves.clone();
    }
    opponent
        .types
        .iter()
        .map(|t| Move {
            name: format!("{} attack", t),
            move_type: *t,
            power: ASSUMED_MOVE_POWER,
            accuracy: Some(100),
            priority: 0,
            pp: 1,
            category: MoveCategory::Physical,
        })
        .collect()
}

/// Highest expected damage (absolute HP) the opponent can deal to `target`
pub fn expected_incoming(opponent: &Pokemon, target: &Pokemon, chart: &TypeChart) -> f32 {
    assumed_moves(opponent)
        .iter()
        .map(|mv| estimate_damage(opponent, target, mv, chart).expected * mv.accuracy_factor())
        .fold(0.0, f32::max)
}

/// Predict the opponent's next action against our `active`
pub fn predict_action(
    opponent: &Pokemon,
    active: &Pokemon,
    items_remaining: u32,
    chart: &TypeChart,
) -> PredictedAction {
    if items_remaining > 0 && opponent.hp < TRAINER_ITEM_HP_THRESHOLD && !opponent.is_fainted() {
        return PredictedAction::UseItem;
    }

    let mut best: Option<(String, f32)> = None;
    for mv in assumed_moves(opponent).iter().filter(|m| m.pp > 0) {
        let damage = estimate_damage(opponent, active, mv, chart).expected * mv.accuracy_factor();
        if best.as_ref().map_or(true, |(_, d)| damage > *d) {
            best = Some((mv.name.clone(), damage));
        }
    }

    match best {
        Some((name, expected_damage)) => PredictedAction::UseMove {
            name,
            expected_damage,
        },
        None => PredictedAction::UseMove {
            name: Move::struggle().name,
            expected_damage: estimate_damage(opponent, active, &Move::struggle(), chart).expected,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::types::PokemonType::*;

    #[test]
    fn test_predicts_strongest_move() {
        let chart = TypeChart::standard();
        let opponent = Pokemon::new("Geodude", 12, vec![Rock, Ground]).with_moves(vec![
            Move::new("Tackle", Normal, 40, 100),
            Move::new("Rock Throw", Rock, 50, 90),
        ]);
        let ours = Pokemon::new("Charmander", 12, vec![Fire]);
        match predict_action(&opponent, &ours, 0, &chart) {
            PredictedAction::UseMove { name, .. } => assert_eq!(name, "Rock Throw"),
            other => panic!("unexpected prediction {:?}", other),
        }
    }

    #[test]
    fn test_predicts_item_when_low() {
        let chart = TypeChart::standard();
        let opponent = Pokemon::new("Onix", 14, vec![Rock, Ground]).with_hp(0.1);
        let ours = Pokemon::new("Squirtle", 14, vec![Water]);
        assert_eq!(predict_action(&opponent, &ours, 2, &chart), PredictedAction::UseItem);
        assert!(matches!(
            predict_action(&opponent, &ours, 0, &chart),
            PredictedAction::UseMove { .. }
        ));
    }

    #[test]
    fn test_unknown_moves_assumed_from_types() {
        let opponent = Pokemon::new("Staryu", 10, vec![Water]);
        let moves = assumed_moves(&opponent);
        assert_eq!(moves.len(), 1);
        assert_eq!(moves[0].move_type, Water);
        assert_eq!(moves[0].power, ASSUMED_MOVE_POWER);
    }

    #[test]
    fn test_incoming_respects_immunity() {
        let chart = TypeChart::standard();
        let opponent = Pokemon::new("Pikachu", 10, vec![Electric]);
        let ground = Pokemon::new("Diglett", 10, vec![Ground]);
        assert_eq!(expected_incoming(&opponent, &ground, &chart), 0.0);
    }
}
