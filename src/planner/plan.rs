//! Plans: ordered steps for one goal plus a cursor

use serde::{Deserialize, Serialize};

use super::action::{Action, ActionSpec};
use super::goal::GoalId;
use super::world::{all_hold, Condition, Effect, WorldState};
use crate::core::types::Tick;

/// One step of a plan, copied from its catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedStep {
    pub catalog_index: usize,
    pub name: String,
    pub action: Action,
    pub preconditions: Vec<Condition>,
    pub effects: Vec<Effect>,
    /// Catalog cost plus route cost for navigation
    pub estimated_cost: f32,
    pub max_ticks: Tick,
}

impl PlannedStep {
    pub fn from_spec(index: usize, spec: &ActionSpec, estimated_cost: f32) -> Self {
        Self {
            catalog_index: index,
            name: spec.name.clone(),
            action: spec.action.clone(),
            preconditions: spec.preconditions.clone(),
            effects: spec.all_effects(),
            estimated_cost,
            max_ticks: spec.tick_budget(),
        }
    }

    pub fn preconditions_hold(&self, state: &WorldState) -> bool {
        all_hold(&self.preconditions, state)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub goal: GoalId,
    pub steps: Vec<PlannedStep>,
    /// Index of the next unexecuted step
    pub cursor: usize,
    pub created_tick: Tick,
}

impl Plan {
    pub fn new(goal: GoalId, steps: Vec<PlannedStep>, created_tick: Tick) -> Self {
        Self {
            goal,
            steps,
            cursor: 0,
            created_tick,
        }
    }

    pub fn current(&self) -> Option<&PlannedStep> {
        self.steps.get(self.cursor)
    }

    pub fn advance(&mut self) {
        if self.cursor < self.steps.len() {
            self.cursor += 1;
        }
    }

    pub fn is_complete(&self) -> bool {
        self.cursor >= self.steps.len()
    }

    pub fn remaining(&self) -> usize {
        self.steps.len().saturating_sub(self.cursor)
    }

    pub fn estimated_cost(&self) -> f32 {
        self.steps.iter().map(|s| s.estimated_cost).sum()
    }

    pub fn snapshot(&self) -> PlanSnapshot {
        PlanSnapshot {
            goal: self.goal,
            steps: self.steps.iter().map(|s| s.name.clone()).collect(),
            cursor: self.cursor,
            estimated_cost: self.estimated_cost(),
            created_tick: self.created_tick,
        }
    }
}

/// Read-only view of a plan for downstream consumers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanSnapshot {
    pub goal: GoalId,
    pub steps: Vec<String>,
    pub cursor: usize,
    pub estimated_cost: f32,
    pub created_tick: Tick,
}
