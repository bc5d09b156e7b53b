//! Combat heuristics
//!
//! Deterministic, formula-driven battle decisions: damage estimation, move
//! scoring, switch evaluation, catch odds and opponent prediction. All
//! weights are named constants in `constants`.

pub mod capture;
pub mod constants;
pub mod damage;
pub mod pokemon;
pub mod selection;
pub mod switching;
pub mod trainer;
pub mod types;

pub use capture::{best_ball, catch_probability, Ball};
pub use damage::{base_damage, estimate_damage, final_damage, DamageEstimate, DamageModifiers};
pub use pokemon::{Move, MoveCategory, Pokemon, StatBlock, StatusCondition};
pub use selection::{score_move, select_move, MoveChoice, MoveScore};
pub use switching::{evaluate_switch, forced_switch, SwitchDecision};
pub use trainer::{predict_action, PredictedAction};
pub use types::{PokemonType, TypeChart};

use serde::{Deserialize, Serialize};

use crate::core::config::CombatConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BattleKind {
    Wild,
    Trainer,
}

/// What the plan wants out of the current battle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BattleIntent {
    /// Win by knocking the opponent out
    #[default]
    Fight,
    /// Weaken then catch (wild battles only)
    Catch,
    /// Leave the battle (wild battles only)
    Flee,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BattleOutcome {
    Won,
    Lost,
    Fled,
    Caught,
}

/// Battle snapshot reported by perception
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleState {
    pub kind: BattleKind,
    pub party: Vec<Pokemon>,
    /// Index of our active Pokémon in `party`
    pub active: usize,
    pub opponent: Pokemon,
    /// Types of the opponent's other revealed party members
    #[serde(default)]
    pub revealed: Vec<Vec<PokemonType>>,
    /// Healing items the opposing trainer is assumed to hold
    #[serde(default)]
    pub opponent_items: u32,
    #[serde(default)]
    pub balls: Vec<(Ball, u32)>,
    #[serde(default)]
    pub turn: u32,
    #[serde(default)]
    pub outcome: Option<BattleOutcome>,
}

impl BattleState {
    pub fn active_pokemon(&self) -> Option<&Pokemon> {
        self.party.get(self.active)
    }

    pub fn party_wiped(&self) -> bool {
        !self.party.is_empty() && self.party.iter().all(|p| p.is_fainted())
    }

    pub fn is_over(&self) -> bool {
        self.outcome.is_some()
    }
}

/// Concrete battle command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BattleChoice {
    /// Use a move; None means Struggle
    UseMove { index: Option<usize> },
    Switch { index: usize },
    ThrowBall { ball: Ball },
    Run,
    /// Nothing sensible to do this turn
    Pass,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleDecision {
    pub choice: BattleChoice,
    pub score: f32,
    pub rationale: String,
}

/// Battle decision maker
#[derive(Debug, Clone, Default)]
pub struct CombatEngine {
    chart: TypeChart,
    config: CombatConfig,
}

impl CombatEngine {
    pub fn new(config: CombatConfig) -> Self {
        Self {
            chart: TypeChart::standard(),
            config,
        }
    }

    pub fn with_chart(mut self, chart: TypeChart) -> Self {
        self.chart = chart;
        self
    }

    pub fn chart(&self) -> &TypeChart {
        &self.chart
    }

    pub fn config(&self) -> &CombatConfig {
        &self.config
    }

    /// Choose this turn's command
    pub fn decide(&self, state: &BattleState, intent: BattleIntent) -> BattleDecision {
        let Some(active) = state.active_pokemon() else {
            return pass("no active Pokémon reported");
        };
        let opponent = &state.opponent;

        if active.is_fainted() {
            return match forced_switch(&state.party, state.active, opponent, &self.chart) {
                Some(index) => BattleDecision {
                    choice: BattleChoice::Switch { index },
                    score: switching::matchup_score(&state.party[index], opponent, &self.chart),
                    rationale: format!("{} fainted, sending {}", active.species, state.party[index].species),
                },
                None => pass("no healthy party member left"),
            };
        }

        let wild = state.kind == BattleKind::Wild;

        if wild && intent == BattleIntent::Flee {
            return run("fleeing as planned");
        }

        if wild && intent == BattleIntent::Catch {
            if let Some(decision) = self.catch_attempt(state, active) {
                return decision;
            }
        }

        if wild && intent == BattleIntent::Fight && active.hp < self.config.flee_hp_threshold {
            return run(&format!(
                "{} at {:.0}% HP, leaving wild battle",
                active.species,
                active.hp * 100.0
            ));
        }

        if let SwitchDecision::Switch { index, score, current } =
            evaluate_switch(&state.party, state.active, opponent, &self.chart, &self.config)
        {
            return BattleDecision {
                choice: BattleChoice::Switch { index },
                score,
                rationale: format!(
                    "switching to {} ({:.2} vs {:.2})",
                    state.party[index].species, score, current
                ),
            };
        }

        let choice = select_move(active, opponent, &state.revealed, &self.chart);
        BattleDecision {
            choice: BattleChoice::UseMove {
                index: choice.index,
            },
            score: choice.score,
            rationale: choice.rationale,
        }
    }

    /// Throw when the odds are good, otherwise weaken without knocking out
    fn catch_attempt(&self, state: &BattleState, active: &Pokemon) -> Option<BattleDecision> {
        let opponent = &state.opponent;
        let ball = best_ball(&state.balls)?;
        let p = catch_probability(opponent, ball);

        if p >= self.config.catch_throw_threshold {
            return Some(BattleDecision {
                choice: BattleChoice::ThrowBall { ball },
                score: p,
                rationale: format!("catch chance {:.0}% with {:?} ball", p * 100.0, ball),
            });
        }

        // Strongest move whose best roll cannot knock the target out
        let remaining = opponent.remaining_hp();
        let mut best: Option<(usize, f32)> = None;
        for (i, mv) in active.usable_moves() {
            let estimate = estimate_damage(active, opponent, mv, &self.chart);
            if estimate.max == 0 || estimate.max as f32 >= remaining {
                continue;
            }
            let s = score_move(i, mv, active, opponent, &[], &self.chart).score;
            if best.map_or(true, |(_, b)| s > b) {
                best = Some((i, s));
            }
        }

        match best {
            Some((index, score)) => Some(BattleDecision {
                choice: BattleChoice::UseMove { index: Some(index) },
                score,
                rationale: format!("weakening before catch (chance {:.0}%)", p * 100.0),
            }),
            // Every attack would knock it out; throw anyway
            None => Some(BattleDecision {
                choice: BattleChoice::ThrowBall { ball },
                score: p,
                rationale: format!("no safe weakening move, throwing at {:.0}%", p * 100.0),
            }),
        }
    }

    /// Predicted opponent action for diagnostics
    pub fn predict(&self, state: &BattleState) -> Option<PredictedAction> {
        let active = state.active_pokemon()?;
        Some(predict_action(
            &state.opponent,
            active,
            state.opponent_items,
            &self.chart,
        ))
    }
}

fn pass(reason: &str) -> BattleDecision {
    BattleDecision {
        choice: BattleChoice::Pass,
        score: 0.0,
        rationale: reason.to_string(),
    }
}

fn run(reason: &str) -> BattleDecision {
    BattleDecision {
        choice: BattleChoice::Run,
        score: 0.0,
        rationale: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PokemonType::*;

    fn wild_battle(active: Pokemon, opponent: Pokemon) -> BattleState {
        BattleState {
            kind: BattleKind::Wild,
            party: vec![active],
            active: 0,
            opponent,
            revealed: vec![],
            opponent_items: 0,
            balls: vec![(Ball::Poke, 5)],
            turn: 1,
            outcome: None,
        }
    }

    fn charmander() -> Pokemon {
        Pokemon::new("Charmander", 10, vec![Fire]).with_moves(vec![
            Move::new("Ember", Fire, 40, 100),
            Move::new("Scratch", Normal, 40, 100),
        ])
    }

    #[test]
    fn test_fight_picks_super_effective() {
        let engine = CombatEngine::default();
        let state = wild_battle(charmander(), Pokemon::new("Oddish", 8, vec![Grass]));
        let decision = engine.decide(&state, BattleIntent::Fight);
        assert_eq!(decision.choice, BattleChoice::UseMove { index: Some(0) });
    }

    #[test]
    fn test_low_hp_flees_wild() {
        let engine = CombatEngine::default();
        let state = wild_battle(charmander().with_hp(0.1), Pokemon::new("Oddish", 8, vec![Grass]));
        assert_eq!(engine.decide(&state, BattleIntent::Fight).choice, BattleChoice::Run);
    }

    #[test]
    fn test_trainer_battles_never_flee() {
        let engine = CombatEngine::default();
        let mut state = wild_battle(charmander().with_hp(0.1), Pokemon::new("Oddish", 8, vec![Grass]));
        state.kind = BattleKind::Trainer;
        let decision = engine.decide(&state, BattleIntent::Flee);
        assert!(matches!(decision.choice, BattleChoice::UseMove { .. }));
    }

    #[test]
    fn test_catch_throws_when_weak() {
        let engine = CombatEngine::default();
        let target = Pokemon::new("Caterpie", 3, vec![Bug])
            .with_hp(0.1)
            .with_catch_rate(255);
        let state = wild_battle(charmander(), target);
        let decision = engine.decide(&state, BattleIntent::Catch);
        assert_eq!(decision.choice, BattleChoice::ThrowBall { ball: Ball::Poke });
    }

    #[test]
    fn test_catch_weakens_first() {
        let engine = CombatEngine::default();
        let target = Pokemon::new("Onix", 30, vec![Rock, Ground]).with_catch_rate(45);
        let state = wild_battle(charmander(), target);
        let decision = engine.decide(&state, BattleIntent::Catch);
        assert!(matches!(decision.choice, BattleChoice::UseMove { index: Some(_) }));
    }

    #[test]
    fn test_fainted_active_forces_switch() {
        let engine = CombatEngine::default();
        let mut state = wild_battle(charmander().with_hp(0.0), Pokemon::new("Oddish", 8, vec![Grass]));
        state.party.push(Pokemon::new("Squirtle", 10, vec![Water]));
        let decision = engine.decide(&state, BattleIntent::Fight);
        assert_eq!(decision.choice, BattleChoice::Switch { index: 1 });
    }

    #[test]
    fn test_wiped_party_passes() {
        let engine = CombatEngine::default();
        let state = wild_battle(charmander().with_hp(0.0), Pokemon::new("Oddish", 8, vec![Grass]));
        assert!(state.party_wiped());
        assert_eq!(engine.decide(&state, BattleIntent::Fight).choice, BattleChoice::Pass);
    }
}
