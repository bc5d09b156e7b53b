//! Goals and the goal stack
//!
//! Goals are pushed by strategic logic and owned by the planner. A goal
//! stays on the stack until it is satisfied; failing or being abandoned
//! only sends it back to the queue.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::world::{all_hold, Condition, WorldState};
use crate::core::error::GoalInfeasible;
use crate::core::types::{Capabilities, ItemId, Tick};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GoalId(pub u32);

impl fmt::Display for GoalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Resource a goal needs before it can be attempted
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Requirement {
    Money(u32),
    Badges(u8),
    Item { item: ItemId, count: u32 },
    Capability(Capabilities),
}

impl Requirement {
    /// The missing amount, if any
    pub fn shortfall(&self, state: &WorldState) -> Option<Shortfall> {
        match self {
            Requirement::Money(needed) if state.money < *needed => Some(Shortfall::Money {
                needed: *needed,
                available: state.money,
            }),
            Requirement::Badges(needed) if state.badges < *needed => Some(Shortfall::Badges {
                needed: *needed,
                available: state.badges,
            }),
            Requirement::Item { item, count } if state.item_count(item) < *count => {
                Some(Shortfall::Item {
                    item: item.clone(),
                    needed: *count,
                    available: state.item_count(item),
                })
            }
            Requirement::Capability(caps) if !state.capabilities.contains(*caps) => {
                Some(Shortfall::Capability(*caps - state.capabilities))
            }
            _ => None,
        }
    }
}

/// One unmet requirement with its missing delta
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shortfall {
    Money { needed: u32, available: u32 },
    Badges { needed: u8, available: u8 },
    Item { item: ItemId, needed: u32, available: u32 },
    /// Capabilities still missing
    Capability(Capabilities),
    /// A goal this one depends on is not satisfied yet
    Dependency(GoalId),
}

impl Shortfall {
    /// How much is missing (1 for capability and dependency gaps)
    pub fn delta(&self) -> u32 {
        match self {
            Shortfall::Money { needed, available } => needed.saturating_sub(*available),
            Shortfall::Badges { needed, available } => u32::from(needed.saturating_sub(*available)),
            Shortfall::Item {
                needed, available, ..
            } => needed.saturating_sub(*available),
            Shortfall::Capability(caps) => caps.bits().count_ones(),
            Shortfall::Dependency(_) => 1,
        }
    }
}

impl fmt::Display for Shortfall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shortfall::Money { needed, available } => {
                write!(f, "money {}/{}", available, needed)
            }
            Shortfall::Badges { needed, available } => {
                write!(f, "badges {}/{}", available, needed)
            }
            Shortfall::Item {
                item,
                needed,
                available,
            } => write!(f, "{} {}/{}", item, available, needed),
            Shortfall::Capability(caps) => write!(f, "missing {:?}", caps),
            Shortfall::Dependency(goal) => write!(f, "waiting on goal {}", goal),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    Queued,
    Active,
    Satisfied,
    /// Out of the running until the cooldown tick
    Abandoned { until: Tick },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: GoalId,
    pub name: String,
    pub base_priority: f32,
    /// Conditions that satisfy the goal
    pub desired: Vec<Condition>,
    pub requirements: Vec<Requirement>,
    pub depends_on: Vec<GoalId>,
    pub deadline: Option<Tick>,
    pub successes: u32,
    pub failures: u32,
    /// Fraction of party HP lost during the last attempt
    pub last_harm: f32,
    pub status: GoalStatus,
    /// Insertion order, used as the final ranking tie-break
    pub seq: u64,
}

impl Goal {
    pub fn new(name: impl Into<String>, base_priority: f32) -> Self {
        Self {
            id: GoalId(0),
            name: name.into(),
            base_priority,
            desired: Vec::new(),
            requirements: Vec::new(),
            depends_on: Vec::new(),
            deadline: None,
            successes: 0,
            failures: 0,
            last_harm: 0.0,
            status: GoalStatus::Queued,
            seq: 0,
        }
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.desired.push(condition);
        self
    }

    pub fn with_requirement(mut self, requirement: Requirement) -> Self {
        self.requirements.push(requirement);
        self
    }

    pub fn depends_on(mut self, goal: GoalId) -> Self {
        self.depends_on.push(goal);
        self
    }

    pub fn with_deadline(mut self, tick: Tick) -> Self {
        self.deadline = Some(tick);
        self
    }

    pub fn is_satisfied(&self, state: &WorldState) -> bool {
        all_hold(&self.desired, state)
    }

    /// Resource requirements only; dependencies are checked by the stack
    pub fn check_feasible(&self, state: &WorldState) -> Result<(), GoalInfeasible> {
        let shortfall: Vec<Shortfall> = self
            .requirements
            .iter()
            .filter_map(|r| r.shortfall(state))
            .collect();
        if shortfall.is_empty() {
            Ok(())
        } else {
            Err(GoalInfeasible {
                goal: self.id,
                shortfall,
            })
        }
    }

    pub fn is_selectable(&self) -> bool {
        matches!(self.status, GoalStatus::Queued | GoalStatus::Active)
    }
}

/// Goals owned by the planner, in insertion order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GoalStack {
    goals: Vec<Goal>,
    next_id: u32,
    next_seq: u64,
}

impl GoalStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a goal and return its id
    pub fn push(&mut self, mut goal: Goal) -> GoalId {
        self.next_id += 1;
        goal.id = GoalId(self.next_id);
        goal.seq = self.next_seq;
        goal.status = GoalStatus::Queued;
        self.next_seq += 1;
        let id = goal.id;
        tracing::debug!(goal = %id, name = %goal.name, "Goal pushed");
        self.goals.push(goal);
        id
    }

    pub fn get(&self, id: GoalId) -> Option<&Goal> {
        self.goals.iter().find(|g| g.id == id)
    }

    pub fn get_mut(&mut self, id: GoalId) -> Option<&mut Goal> {
        self.goals.iter_mut().find(|g| g.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Goal> {
        self.goals.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Goal> {
        self.goals.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.goals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.goals.is_empty()
    }

    pub fn active(&self) -> Option<&Goal> {
        self.goals.iter().find(|g| g.status == GoalStatus::Active)
    }

    /// Drop a goal from the stack entirely
    pub fn remove(&mut self, id: GoalId) -> Option<Goal> {
        let idx = self.goals.iter().position(|g| g.id == id)?;
        Some(self.goals.remove(idx))
    }

    /// Number of selectable goals that list `id` as a dependency
    pub fn dependents_of(&self, id: GoalId) -> usize {
        self.goals
            .iter()
            .filter(|g| g.is_selectable() && g.depends_on.contains(&id))
            .count()
    }

    /// Is `id` satisfied, or unknown to the stack?
    pub fn dependency_met(&self, id: GoalId) -> bool {
        self.get(id)
            .map_or(true, |g| g.status == GoalStatus::Satisfied)
    }

    /// Requirements plus dependencies
    pub fn check_feasible(&self, goal: &Goal, state: &WorldState) -> Result<(), GoalInfeasible> {
        let mut shortfall = match goal.check_feasible(state) {
            Ok(()) => Vec::new(),
            Err(err) => err.shortfall,
        };
        shortfall.extend(
            goal.depends_on
                .iter()
                .filter(|dep| !self.dependency_met(**dep))
                .map(|dep| Shortfall::Dependency(*dep)),
        );
        if shortfall.is_empty() {
            Ok(())
        } else {
            Err(GoalInfeasible {
                goal: goal.id,
                shortfall,
            })
        }
    }

    /// Return abandoned goals whose cooldown has passed to the queue
    pub fn release_cooldowns(&mut self, now: Tick) -> Vec<GoalId> {
        let mut released = Vec::new();
        for goal in &mut self.goals {
            if let GoalStatus::Abandoned { until } = goal.status {
                if now >= until {
                    goal.status = GoalStatus::Queued;
                    released.push(goal.id);
                }
            }
        }
        released
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_assigns_ids_and_order() {
        let mut stack = GoalStack::new();
        let a = stack.push(Goal::new("a", 1.0));
        let b = stack.push(Goal::new("b", 1.0));
        assert_ne!(a, b);
        assert!(stack.get(a).unwrap().seq < stack.get(b).unwrap().seq);
        assert_eq!(stack.get(b).unwrap().status, GoalStatus::Queued);
    }

    #[test]
    fn test_requirements_report_delta() {
        let goal = Goal::new("buy bike", 5.0)
            .with_requirement(Requirement::Money(1000))
            .with_requirement(Requirement::Capability(Capabilities::CUT | Capabilities::SURF));
        let state = WorldState::new()
            .with_money(400)
            .with_capabilities(Capabilities::CUT);

        let err = goal.check_feasible(&state).unwrap_err();
        assert_eq!(err.shortfall.len(), 2);
        assert_eq!(
            err.shortfall[0],
            Shortfall::Money {
                needed: 1000,
                available: 400
            }
        );
        assert_eq!(err.shortfall[0].delta(), 600);
        assert_eq!(err.shortfall[1], Shortfall::Capability(Capabilities::SURF));
    }

    #[test]
    fn test_dependencies_block_until_satisfied() {
        let mut stack = GoalStack::new();
        let first = stack.push(Goal::new("get pokedex", 3.0));
        let second = stack.push(Goal::new("first gym", 5.0).depends_on(first));
        let state = WorldState::new();

        let goal = stack.get(second).unwrap().clone();
        let err = stack.check_feasible(&goal, &state).unwrap_err();
        assert_eq!(err.shortfall, vec![Shortfall::Dependency(first)]);
        assert_eq!(stack.dependents_of(first), 1);

        stack.get_mut(first).unwrap().status = GoalStatus::Satisfied;
        assert!(stack.check_feasible(&goal, &state).is_ok());
    }

    #[test]
    fn test_cooldown_release() {
        let mut stack = GoalStack::new();
        let id = stack.push(Goal::new("stuck", 1.0));
        stack.get_mut(id).unwrap().status = GoalStatus::Abandoned { until: 600 };
        assert!(stack.release_cooldowns(599).is_empty());
        assert_eq!(stack.release_cooldowns(600), vec![id]);
        assert_eq!(stack.get(id).unwrap().status, GoalStatus::Queued);
    }
}
