//! Goal priority scoring
//!
//! score = base × temporal × dependency × efficiency × success − risk
//!
//! Efficiency is driven by the number of catalog actions a goal needs from
//! the current state. `StepEstimator` finds it with a relaxed breadth-first
//! search that applies action effects but ignores route reachability and
//! cost, memoized until the world state changes.
//!
//! Ranking compares score, then base priority, then insertion order, so two
//! goals never compare equal and repeated evaluations of the same state
//! always produce the same order.

use ahash::{AHashMap, AHashSet};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::VecDeque;

use super::action::ActionCatalog;
use super::goal::{Goal, GoalId, GoalStack};
use super::world::{all_hold, apply_all, Condition, WorldState};
use crate::core::config::PriorityConfig;
use crate::core::types::Tick;

/// Score with its factors, for diagnostics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalScore {
    pub goal: GoalId,
    pub score: f32,
    pub base: f32,
    pub temporal: f32,
    pub dependency: f32,
    pub efficiency: f32,
    pub success: f32,
    pub risk: f32,
    pub seq: u64,
}

impl GoalScore {
    /// Total order: higher score first, then higher base, then older goal
    pub fn rank_cmp(&self, other: &GoalScore) -> Ordering {
        OrderedFloat(other.score)
            .cmp(&OrderedFloat(self.score))
            .then_with(|| OrderedFloat(other.base).cmp(&OrderedFloat(self.base)))
            .then_with(|| self.seq.cmp(&other.seq))
    }

    /// Does this score strictly outrank `other`?
    pub fn outranks(&self, other: &GoalScore) -> bool {
        self.rank_cmp(other) == Ordering::Less
    }
}

pub fn temporal_multiplier(deadline: Option<Tick>, now: Tick, config: &PriorityConfig) -> f32 {
    let Some(deadline) = deadline else {
        return 1.0;
    };
    if now >= deadline || config.temporal_horizon_ticks == 0 {
        return config.temporal_max;
    }
    let remaining = deadline - now;
    if remaining >= config.temporal_horizon_ticks {
        return 1.0;
    }
    let progress = 1.0 - remaining as f32 / config.temporal_horizon_ticks as f32;
    1.0 + (config.temporal_max - 1.0) * progress
}

pub fn dependency_multiplier(dependents: usize, config: &PriorityConfig) -> f32 {
    1.0 + config.dependency_weight * dependents as f32
}

pub fn efficiency_multiplier(estimated_actions: usize, config: &PriorityConfig) -> f32 {
    1.0 / (1.0 + config.efficiency_decay * estimated_actions as f32)
}

/// Fewest catalog actions that make `desired` hold, if found within bounds
///
/// Breadth-first over exact action effects; Navigate targets count as
/// reachable and every action costs one.
pub fn estimate_actions(
    desired: &[Condition],
    state: &WorldState,
    catalog: &ActionCatalog,
    max_depth: usize,
    max_expansions: usize,
) -> Option<usize> {
    let mut queue = VecDeque::from([(state.clone(), 0usize)]);
    let mut seen: AHashSet<WorldState> = AHashSet::new();
    seen.insert(state.clone());
    let mut expansions = 0;

    while let Some((current, depth)) = queue.pop_front() {
        if all_hold(desired, &current) {
            return Some(depth);
        }
        if depth >= max_depth {
            continue;
        }
        if expansions >= max_expansions {
            return None;
        }
        expansions += 1;

        for (_, spec) in catalog.iter() {
            if !all_hold(&spec.preconditions, &current) {
                continue;
            }
            let mut next = current.clone();
            apply_all(&spec.all_effects(), &mut next);
            if seen.insert(next.clone()) {
                queue.push_back((next, depth + 1));
            }
        }
    }
    None
}

/// Memoized action-count estimates for one world state
#[derive(Debug, Clone)]
pub struct StepEstimator {
    max_depth: usize,
    max_expansions: usize,
    world: Option<WorldState>,
    cache: AHashMap<Vec<Condition>, usize>,
}

impl StepEstimator {
    pub fn new(config: &PriorityConfig) -> Self {
        Self {
            max_depth: config.estimate_max_depth,
            max_expansions: config.estimate_max_expansions,
            world: None,
            cache: AHashMap::new(),
        }
    }

    /// Actions `goal` needs from `state`; unreachable goals get depth + 1
    pub fn estimate(&mut self, goal: &Goal, state: &WorldState, catalog: &ActionCatalog) -> usize {
        if self.world.as_ref() != Some(state) {
            self.cache.clear();
            self.world = Some(state.clone());
        }
        if let Some(&actions) = self.cache.get(&goal.desired) {
            return actions;
        }
        let actions = estimate_actions(
            &goal.desired,
            state,
            catalog,
            self.max_depth,
            self.max_expansions,
        )
        .unwrap_or(self.max_depth + 1);
        self.cache.insert(goal.desired.clone(), actions);
        actions
    }
}

pub fn success_multiplier(failures: u32, config: &PriorityConfig) -> f32 {
    let exponent = i32::try_from(failures).unwrap_or(i32::MAX);
    config.success_decay.powi(exponent).max(config.success_floor)
}

pub fn risk_penalty(last_harm: f32, config: &PriorityConfig) -> f32 {
    config.risk_weight * last_harm.max(0.0)
}

/// Score one goal given its estimated remaining action count
pub fn score_goal(
    goal: &Goal,
    stack: &GoalStack,
    estimated_actions: usize,
    now: Tick,
    config: &PriorityConfig,
) -> GoalScore {
    let temporal = temporal_multiplier(goal.deadline, now, config);
    let dependency = dependency_multiplier(stack.dependents_of(goal.id), config);
    let efficiency = efficiency_multiplier(estimated_actions, config);
    let success = success_multiplier(goal.failures, config);
    let risk = risk_penalty(goal.last_harm, config);

    GoalScore {
        goal: goal.id,
        score: goal.base_priority * temporal * dependency * efficiency * success - risk,
        base: goal.base_priority,
        temporal,
        dependency,
        efficiency,
        success,
        risk,
        seq: goal.seq,
    }
}

/// Scores of every selectable goal, best first
pub fn rank_goals(
    stack: &GoalStack,
    mut estimate: impl FnMut(&Goal) -> usize,
    now: Tick,
    config: &PriorityConfig,
) -> Vec<GoalScore> {
    let mut scores: Vec<GoalScore> = stack
        .iter()
        .filter(|g| g.is_selectable())
        .map(|g| score_goal(g, stack, estimate(g), now, config))
        .collect();
    scores.sort_by(GoalScore::rank_cmp);
    scores
}
