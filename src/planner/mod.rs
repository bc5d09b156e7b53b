//! Goal-oriented action planning
//!
//! The planner owns the goal stack and the action catalog. Each tick it
//! picks the highest-ranked feasible goal, searches a plan for it when none
//! is active, and drives the step at the plan cursor until it completes or
//! fails. Failed steps and failed searches draw on a per-goal replan budget;
//! running out of it is reported as `PlannerEvent::PlanExhausted`.
//!
//! - `world`: symbolic world state, conditions and effects
//! - `goal`: goals, requirements and the goal stack
//! - `priority`: goal scoring and ranking
//! - `action`: the action catalog
//! - `search`: plan search over the catalog
//! - `plan`: plans and their cursor
//! - `executor`: per-step command generation

pub mod action;
pub mod executor;
pub mod goal;
pub mod plan;
pub mod priority;
pub mod search;
pub mod world;

pub use action::{Action, ActionCatalog, ActionSpec, DialogChoice, MenuCommand};
pub use executor::{ExecutionContext, StepExecution, StepFailure, StepStatus};
pub use goal::{Goal, GoalId, GoalStack, GoalStatus, Requirement, Shortfall};
pub use plan::{Plan, PlanSnapshot, PlannedStep};
pub use priority::{estimate_actions, rank_goals, score_goal, GoalScore, StepEstimator};
pub use search::{search_plan, SearchContext, SearchFailure, SearchLimits, SearchResult};
pub use world::{Condition, Effect, WorldState};

use serde::{Deserialize, Serialize};

use crate::combat::{BattleIntent, BattleKind, BattleState, CombatEngine};
use crate::core::config::{NavigationConfig, PilotConfig, PlannerConfig, PriorityConfig};
use crate::core::error::GoalInfeasible;
use crate::core::input::{Button, Command};
use crate::core::types::Tick;
use crate::navigation::WorldGraph;
use crate::state::{Mode, TransitionTable};

/// Plan searches allowed within one tick
const MAX_SEARCHES_PER_TICK: u32 = 2;

/// Observed inputs for one planner tick
pub struct PlannerContext<'a> {
    pub now: Tick,
    pub world: &'a WorldState,
    pub mode: Option<Mode>,
    pub battle: Option<&'a BattleState>,
    pub graph: &'a WorldGraph,
    pub combat: &'a CombatEngine,
    pub table: &'a TransitionTable,
    pub last_confirmed: Option<bool>,
    pub water_substitute: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PlannerEvent {
    GoalSelected { goal: GoalId, score: f32 },
    GoalSuperseded { previous: GoalId, by: GoalId },
    GoalSatisfied { goal: GoalId },
    GoalInfeasible { goal: GoalId, shortfall: Vec<Shortfall> },
    GoalReleased { goal: GoalId },
    GoalAbandoned { goal: GoalId, until: Tick },
    PlanCreated { goal: GoalId, steps: usize, cost: f32 },
    PlanDiscarded { goal: GoalId, reason: String, replans: u32 },
    StepCompleted { goal: GoalId, step: String },
    PlanExhausted { goal: GoalId, replans: u32 },
}

/// A goal that ran out of replans
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub goal: GoalId,
    pub tick: Tick,
    pub reason: String,
    pub replans: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlannerDiagnostics {
    /// Latest shortfall per infeasible goal
    pub infeasible: Vec<(GoalId, Vec<Shortfall>)>,
    pub failures: Vec<FailureRecord>,
    pub last_search: Option<SearchFailure>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannerSnapshot {
    pub active: Option<GoalId>,
    pub plan: Option<PlanSnapshot>,
    pub replans: u32,
    pub simplified: bool,
    pub ranking: Vec<GoalScore>,
    pub diagnostics: PlannerDiagnostics,
}

/// Result of one planner tick
#[derive(Debug, Clone, PartialEq)]
pub struct PlannerOutput {
    pub command: Command,
    pub rationale: String,
    pub score: f32,
    pub events: Vec<PlannerEvent>,
}

type Emitted = (Command, String, f32);

fn idle(reason: impl Into<String>) -> Emitted {
    (Command::Idle, reason.into(), 0.0)
}

pub struct Planner {
    config: PlannerConfig,
    priority: PriorityConfig,
    navigation: NavigationConfig,
    catalog: ActionCatalog,
    goals: GoalStack,
    active: Option<GoalId>,
    plan: Option<Plan>,
    execution: Option<StepExecution>,
    replans: u32,
    simplified: bool,
    /// Party health when the active goal was selected
    health_at_activation: u8,
    ranking: Vec<GoalScore>,
    estimator: StepEstimator,
    diagnostics: PlannerDiagnostics,
}

impl Planner {
    pub fn new(
        config: PlannerConfig,
        priority: PriorityConfig,
        navigation: NavigationConfig,
        catalog: ActionCatalog,
    ) -> Self {
        Self {
            estimator: StepEstimator::new(&priority),
            config,
            priority,
            navigation,
            catalog,
            goals: GoalStack::new(),
            active: None,
            plan: None,
            execution: None,
            replans: 0,
            simplified: false,
            health_at_activation: 100,
            ranking: Vec::new(),
            diagnostics: PlannerDiagnostics::default(),
        }
    }

    pub fn from_config(config: &PilotConfig, catalog: ActionCatalog) -> Self {
        Self::new(
            config.planner.clone(),
            config.priority.clone(),
            config.navigation.clone(),
            catalog,
        )
    }

    pub fn push_goal(&mut self, goal: Goal) -> GoalId {
        self.goals.push(goal)
    }

    pub fn goals(&self) -> &GoalStack {
        &self.goals
    }

    pub fn goals_mut(&mut self) -> &mut GoalStack {
        &mut self.goals
    }

    pub fn catalog(&self) -> &ActionCatalog {
        &self.catalog
    }

    pub fn active_goal(&self) -> Option<GoalId> {
        self.active
    }

    pub fn plan(&self) -> Option<&Plan> {
        self.plan.as_ref()
    }

    pub fn replans(&self) -> u32 {
        self.replans
    }

    pub fn is_simplified(&self) -> bool {
        self.simplified
    }

    pub fn diagnostics(&self) -> &PlannerDiagnostics {
        &self.diagnostics
    }

    fn depth_limit(&self) -> usize {
        if self.simplified {
            self.config.simplified_plan_depth
        } else {
            self.config.max_plan_depth
        }
    }

    /// Cap plan depth; plans longer than the cap are dropped without
    /// counting against the replan budget
    pub fn set_simplified(&mut self, simplified: bool) {
        if self.simplified == simplified {
            return;
        }
        self.simplified = simplified;
        tracing::info!(simplified, "Plan simplification changed");
        if simplified {
            let cap = self.config.simplified_plan_depth;
            if self.plan.as_ref().is_some_and(|p| p.remaining() > cap) {
                self.plan = None;
                self.execution = None;
            }
        }
    }

    /// Put the active goal on cooldown
    pub fn abandon_active(&mut self, now: Tick, world: &WorldState) -> Option<PlannerEvent> {
        let harm = self.harm_since_activation(world);
        let id = self.active.take()?;
        let until = now + self.config.abandon_cooldown_ticks;
        if let Some(goal) = self.goals.get_mut(id) {
            goal.status = GoalStatus::Abandoned { until };
            goal.last_harm = harm;
        }
        self.plan = None;
        self.execution = None;
        self.replans = 0;
        tracing::warn!(goal = %id, until, "Goal abandoned");
        Some(PlannerEvent::GoalAbandoned { goal: id, until })
    }

    pub fn snapshot(&self) -> PlannerSnapshot {
        PlannerSnapshot {
            active: self.active,
            plan: self.plan.as_ref().map(Plan::snapshot),
            replans: self.replans,
            simplified: self.simplified,
            ranking: self.ranking.clone(),
            diagnostics: self.diagnostics.clone(),
        }
    }

    /// Run one decision tick
    pub fn tick(&mut self, ctx: &PlannerContext<'_>) -> PlannerOutput {
        let mut events = Vec::new();
        for goal in self.goals.release_cooldowns(ctx.now) {
            tracing::debug!(goal = %goal, "Goal cooldown over");
            events.push(PlannerEvent::GoalReleased { goal });
        }

        self.mark_satisfied(ctx.world, &mut events);
        self.select_goal(ctx, &mut events);

        let (command, rationale, score) = match self.interrupt(ctx) {
            Some(emitted) => emitted,
            None => self.drive_plan(ctx, &mut events),
        };

        PlannerOutput {
            command,
            rationale,
            score,
            events,
        }
    }

    fn harm_since_activation(&self, world: &WorldState) -> f32 {
        f32::from(self.health_at_activation.saturating_sub(world.party_health)) / 100.0
    }

    fn mark_satisfied(&mut self, world: &WorldState, events: &mut Vec<PlannerEvent>) {
        let satisfied: Vec<GoalId> = self
            .goals
            .iter()
            .filter(|g| g.is_selectable() && g.is_satisfied(world))
            .map(|g| g.id)
            .collect();

        for id in satisfied {
            let harm = if self.active == Some(id) {
                self.active = None;
                self.plan = None;
                self.execution = None;
                self.replans = 0;
                Some(self.harm_since_activation(world))
            } else {
                None
            };
            if let Some(goal) = self.goals.get_mut(id) {
                goal.status = GoalStatus::Satisfied;
                goal.successes += 1;
                if let Some(harm) = harm {
                    goal.last_harm = harm;
                }
                tracing::info!(goal = %id, name = %goal.name, "Goal satisfied");
            }
            events.push(PlannerEvent::GoalSatisfied { goal: id });
        }
    }

    fn select_goal(&mut self, ctx: &PlannerContext<'_>, events: &mut Vec<PlannerEvent>) {
        let catalog = &self.catalog;
        let estimator = &mut self.estimator;
        let ranking = rank_goals(
            &self.goals,
            |goal| estimator.estimate(goal, ctx.world, catalog),
            ctx.now,
            &self.priority,
        );

        let mut feasible = Vec::with_capacity(ranking.len());
        let mut infeasible = Vec::new();
        for score in ranking {
            let Some(goal) = self.goals.get(score.goal) else {
                continue;
            };
            match self.goals.check_feasible(goal, ctx.world) {
                Ok(()) => feasible.push(score),
                Err(err) => infeasible.push(err),
            }
        }

        self.diagnostics
            .infeasible
            .retain(|(id, _)| !feasible.iter().any(|s| s.goal == *id));
        for err in infeasible {
            self.record_infeasible(err, events);
        }

        if let Some(active) = self.active {
            if !feasible.iter().any(|s| s.goal == active) {
                tracing::debug!(goal = %active, "Active goal became infeasible");
                self.requeue_active(ctx.world);
            }
        }

        if let Some(best) = feasible.first() {
            match self.active {
                Some(active) if active != best.goal => {
                    let outranks = feasible
                        .iter()
                        .find(|s| s.goal == active)
                        .map_or(true, |current| best.outranks(current));
                    if outranks {
                        tracing::info!(previous = %active, by = %best.goal, "Goal superseded");
                        events.push(PlannerEvent::GoalSuperseded {
                            previous: active,
                            by: best.goal,
                        });
                        self.requeue_active(ctx.world);
                        self.activate(best, ctx.world, events);
                    }
                }
                Some(_) => {}
                None => self.activate(best, ctx.world, events),
            }
        }

        self.ranking = feasible;
    }

    fn record_infeasible(&mut self, err: GoalInfeasible, events: &mut Vec<PlannerEvent>) {
        let entry = self
            .diagnostics
            .infeasible
            .iter_mut()
            .find(|(id, _)| *id == err.goal);
        let changed = match entry {
            Some((_, shortfall)) if *shortfall == err.shortfall => false,
            Some((_, shortfall)) => {
                *shortfall = err.shortfall.clone();
                true
            }
            None => {
                self.diagnostics
                    .infeasible
                    .push((err.goal, err.shortfall.clone()));
                true
            }
        };
        if changed {
            tracing::debug!(goal = %err.goal, unmet = err.shortfall.len(), "Goal infeasible");
            events.push(PlannerEvent::GoalInfeasible {
                goal: err.goal,
                shortfall: err.shortfall,
            });
        }
    }

    fn activate(&mut self, score: &GoalScore, world: &WorldState, events: &mut Vec<PlannerEvent>) {
        if let Some(goal) = self.goals.get_mut(score.goal) {
            goal.status = GoalStatus::Active;
        }
        self.active = Some(score.goal);
        self.plan = None;
        self.execution = None;
        self.replans = 0;
        self.health_at_activation = world.party_health;
        tracing::info!(goal = %score.goal, score = score.score, "Goal selected");
        events.push(PlannerEvent::GoalSelected {
            goal: score.goal,
            score: score.score,
        });
    }

    /// Send the active goal back to the queue without counting a failure
    fn requeue_active(&mut self, world: &WorldState) {
        let Some(id) = self.active.take() else {
            return;
        };
        let harm = self.harm_since_activation(world);
        if let Some(goal) = self.goals.get_mut(id) {
            goal.status = GoalStatus::Queued;
            goal.last_harm = harm;
        }
        self.plan = None;
        self.execution = None;
        self.replans = 0;
    }

    /// Handle a battle or dialog that the current step did not ask for
    fn interrupt(&mut self, ctx: &PlannerContext<'_>) -> Option<Emitted> {
        let mode = ctx.mode?;
        let current = self
            .plan
            .as_ref()
            .and_then(Plan::current)
            .map(|s| s.action.clone());

        let emitted = if mode.is_battle() && !matches!(current, Some(Action::Battle { .. })) {
            let intent = match (&current, ctx.battle) {
                (
                    Some(Action::Navigate {
                        avoid_encounters: true,
                        ..
                    }),
                    Some(battle),
                ) if battle.kind == BattleKind::Wild => BattleIntent::Flee,
                _ => BattleIntent::Fight,
            };
            match ctx.battle {
                Some(battle) if mode.awaits_battle_command() && !battle.is_over() => {
                    let decision = ctx.combat.decide(battle, intent);
                    (
                        Command::Battle {
                            choice: decision.choice,
                        },
                        format!("unplanned battle: {}", decision.rationale),
                        decision.score,
                    )
                }
                _ => (
                    Command::press(Button::A),
                    "unplanned battle: advancing text".to_string(),
                    0.0,
                ),
            }
        } else if mode.is_dialog()
            && !matches!(
                current,
                Some(Action::Dialog { .. }) | Some(Action::Menu { .. })
            )
        {
            (
                Command::press(Button::A),
                "unplanned dialog: advancing text".to_string(),
                0.0,
            )
        } else {
            return None;
        };

        if let Some(execution) = self.execution.as_mut() {
            execution.note_interrupt();
        }
        Some(emitted)
    }

    fn drive_plan(&mut self, ctx: &PlannerContext<'_>, events: &mut Vec<PlannerEvent>) -> Emitted {
        let mut searches = 0;
        loop {
            let Some(goal_id) = self.active else {
                return idle("no feasible goal");
            };

            if self.plan.is_none() {
                if searches >= MAX_SEARCHES_PER_TICK {
                    return idle(format!("replanning goal {} next tick", goal_id));
                }
                searches += 1;
                match self.replan(goal_id, ctx, events) {
                    Ok(()) => {}
                    Err(reason) => return idle(reason),
                }
            }

            let Some(step) = self.plan.as_ref().and_then(Plan::current).cloned() else {
                return match self.discard_plan("plan finished without satisfying goal", ctx, events) {
                    Some(reason) => idle(reason),
                    None => idle(format!("goal {} not satisfied after plan", goal_id)),
                };
            };

            if self.execution.is_none() {
                if !step.preconditions_hold(ctx.world) {
                    let reason = format!("'{}': {}", step.name, StepFailure::PreconditionBroken);
                    if let Some(reason) = self.discard_plan(&reason, ctx, events) {
                        return idle(reason);
                    }
                    continue;
                }
                self.execution = Some(StepExecution::new(ctx.now, ctx.world));
            }

            let exec_ctx = ExecutionContext {
                now: ctx.now,
                world: ctx.world,
                mode: ctx.mode,
                battle: ctx.battle,
                graph: ctx.graph,
                navigation: &self.navigation,
                water_substitute: ctx.water_substitute,
                combat: ctx.combat,
                table: ctx.table,
                last_confirmed: ctx.last_confirmed,
                actuation_failure_limit: self.config.actuation_failure_limit,
            };
            let Some(execution) = self.execution.as_mut() else {
                continue;
            };

            match execution.advance(&step, &exec_ctx) {
                StepStatus::Running {
                    command,
                    rationale,
                    score,
                } => return (command, format!("{}: {}", step.name, rationale), score),
                StepStatus::Completed => {
                    tracing::debug!(goal = %goal_id, step = %step.name, "Step completed");
                    events.push(PlannerEvent::StepCompleted {
                        goal: goal_id,
                        step: step.name.clone(),
                    });
                    self.execution = None;
                    self.replans = 0;
                    if let Some(plan) = self.plan.as_mut() {
                        plan.advance();
                        if plan.is_complete() {
                            return idle(format!("plan for goal {} complete", goal_id));
                        }
                    }
                }
                StepStatus::Failed(failure) => {
                    tracing::debug!(goal = %goal_id, step = %step.name, %failure, "Step failed");
                    let reason = format!("'{}': {}", step.name, failure);
                    if let Some(reason) = self.discard_plan(&reason, ctx, events) {
                        return idle(reason);
                    }
                }
            }
        }
    }

    fn replan(
        &mut self,
        goal_id: GoalId,
        ctx: &PlannerContext<'_>,
        events: &mut Vec<PlannerEvent>,
    ) -> Result<(), String> {
        let Some(goal) = self.goals.get(goal_id) else {
            self.active = None;
            return Err(format!("goal {} left the stack", goal_id));
        };

        let search_ctx = SearchContext {
            graph: ctx.graph,
            navigation: &self.navigation,
            water_substitute: ctx.water_substitute,
        };
        let limits = SearchLimits {
            max_depth: self.depth_limit(),
            max_expansions: self.config.max_expansions,
        };

        match search_plan(ctx.world, &goal.desired, &self.catalog, &search_ctx, limits) {
            Ok(result) => {
                let plan = Plan::new(goal_id, result.steps, ctx.now);
                tracing::debug!(
                    goal = %goal_id,
                    steps = plan.steps.len(),
                    expansions = result.expansions,
                    "Plan created"
                );
                events.push(PlannerEvent::PlanCreated {
                    goal: goal_id,
                    steps: plan.steps.len(),
                    cost: plan.estimated_cost(),
                });
                self.diagnostics.last_search = None;
                self.plan = Some(plan);
                Ok(())
            }
            Err(failure) => {
                tracing::debug!(goal = %goal_id, ?failure, "Plan search failed");
                self.diagnostics.last_search = Some(failure);
                let reason = format!("no plan for goal {}", goal_id);
                Err(self
                    .count_failed_replan(goal_id, &reason, ctx, events)
                    .unwrap_or(reason))
            }
        }
    }

    /// Drop the current plan as a failed replan. Returns the reason to report
    /// when the goal exhausted its budget.
    fn discard_plan(
        &mut self,
        reason: &str,
        ctx: &PlannerContext<'_>,
        events: &mut Vec<PlannerEvent>,
    ) -> Option<String> {
        let goal_id = self.active?;
        self.plan = None;
        self.execution = None;
        events.push(PlannerEvent::PlanDiscarded {
            goal: goal_id,
            reason: reason.to_string(),
            replans: self.replans + 1,
        });
        self.count_failed_replan(goal_id, reason, ctx, events)
    }

    fn count_failed_replan(
        &mut self,
        goal_id: GoalId,
        reason: &str,
        ctx: &PlannerContext<'_>,
        events: &mut Vec<PlannerEvent>,
    ) -> Option<String> {
        self.replans += 1;
        if self.replans < self.config.max_replans {
            return None;
        }

        let replans = self.replans;
        let harm = self.harm_since_activation(ctx.world);
        if let Some(goal) = self.goals.get_mut(goal_id) {
            goal.failures += 1;
            goal.status = GoalStatus::Queued;
            goal.last_harm = harm;
        }
        self.diagnostics.failures.push(FailureRecord {
            goal: goal_id,
            tick: ctx.now,
            reason: reason.to_string(),
            replans,
        });
        tracing::warn!(goal = %goal_id, replans, reason, "Plan exhausted");
        events.push(PlannerEvent::PlanExhausted {
            goal: goal_id,
            replans,
        });

        self.active = None;
        self.plan = None;
        self.execution = None;
        self.replans = 0;
        Some(format!("goal {} exhausted {} replans", goal_id, replans))
    }
}
