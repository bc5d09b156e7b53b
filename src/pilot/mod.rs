//! Tick orchestration
//!
//! A `Pilot` owns one complete decision core: mode machine, planner,
//! duration tracker with its profile store, world graph and combat engine.
//! Each call to `tick` consumes one observation and returns one decision.
//! Pilots share nothing, so a fleet simply runs one per emulator.

pub mod decision;
pub mod observation;

pub use decision::{Decision, PilotEvent, PilotSnapshot};
pub use observation::{ActuationReport, Observation};

use crate::anomaly::{DurationTracker, EscalationTier, ProfileStore};
use crate::combat::CombatEngine;
use crate::core::config::PilotConfig;
use crate::core::error::{PilotError, Result};
use crate::core::input::{Button, Command};
use crate::core::types::{InstanceId, Tick};
use crate::navigation::WorldGraph;
use crate::planner::{
    ActionCatalog, Goal, GoalId, Planner, PlannerContext, PlannerEvent, WorldState,
};
use crate::state::{Category, EmergencyKind, Mode, StateMachine, TransitionTrigger};

/// Buttons cycled while in an emergency mode
///
/// Backs out of menus and dialogs, then nudges the player in every
/// direction to break movement locks.
const RECOVERY_SEQUENCE: [Button; 9] = [
    Button::B,
    Button::B,
    Button::A,
    Button::Start,
    Button::B,
    Button::Up,
    Button::Down,
    Button::Left,
    Button::Right,
];

pub struct Pilot {
    id: InstanceId,
    config: PilotConfig,
    machine: StateMachine,
    planner: Planner,
    tracker: DurationTracker,
    profiles: ProfileStore,
    graph: WorldGraph,
    combat: CombatEngine,
    now: Tick,
    /// History records already fed to the tracker
    seen_history: usize,
    pending_emergency: Option<(EmergencyKind, TransitionTrigger, String)>,
    recovery_presses: u32,
    consecutive_exhaustions: u32,
    stalled: bool,
}

impl Pilot {
    pub fn new(config: PilotConfig, graph: WorldGraph, catalog: ActionCatalog) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            id: InstanceId::new(),
            machine: StateMachine::new(),
            planner: Planner::from_config(&config, catalog),
            tracker: DurationTracker::new(config.anomaly.clone()),
            profiles: ProfileStore::new(),
            graph,
            combat: CombatEngine::new(config.combat.clone()),
            config,
            now: 0,
            seen_history: 0,
            pending_emergency: None,
            recovery_presses: 0,
            consecutive_exhaustions: 0,
            stalled: false,
        })
    }

    /// Start from previously persisted dwell profiles
    pub fn with_profiles(mut self, profiles: ProfileStore) -> Self {
        self.profiles = profiles;
        self
    }

    pub fn with_combat(mut self, combat: CombatEngine) -> Self {
        self.combat = combat;
        self
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn config(&self) -> &PilotConfig {
        &self.config
    }

    pub fn machine(&self) -> &StateMachine {
        &self.machine
    }

    pub fn planner(&self) -> &Planner {
        &self.planner
    }

    pub fn planner_mut(&mut self) -> &mut Planner {
        &mut self.planner
    }

    pub fn tracker(&self) -> &DurationTracker {
        &self.tracker
    }

    /// Profiles to persist at shutdown
    pub fn profiles(&self) -> &ProfileStore {
        &self.profiles
    }

    pub fn graph(&self) -> &WorldGraph {
        &self.graph
    }

    pub fn push_goal(&mut self, goal: Goal) -> GoalId {
        self.planner.push_goal(goal)
    }

    /// A collaborator hit a fault; the next tick enters Exception
    pub fn report_fault(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::warn!(%reason, "Fault reported");
        self.pending_emergency = Some((
            EmergencyKind::Exception,
            TransitionTrigger::Fault(reason.clone()),
            reason,
        ));
    }

    /// Session-level stall, the one error surfaced to the operator
    pub fn stall(&self) -> Result<()> {
        if self.stalled {
            Err(PilotError::SessionStall {
                consecutive: self.consecutive_exhaustions,
            })
        } else {
            Ok(())
        }
    }

    /// Stall, or an anomaly at EmergencyProtocol or above still in force
    pub fn health(&self) -> Result<()> {
        self.stall()?;
        match self.tracker.last_event() {
            Some(event) if self.tracker.tier() >= EscalationTier::EmergencyProtocol => {
                Err(PilotError::AnomalyDetected(event.clone()))
            }
            _ => Ok(()),
        }
    }

    pub fn snapshot(&self) -> PilotSnapshot {
        PilotSnapshot {
            instance: self.id,
            tick: self.now,
            mode: self.machine.current(),
            tier: self.tracker.tier(),
            active_goal: self.planner.active_goal(),
            planner: self.planner.snapshot(),
            last_anomaly: self.tracker.last_event().cloned(),
            transitions: self.machine.history().len(),
            rejections: self.machine.total_rejections(),
            consecutive_exhaustions: self.consecutive_exhaustions,
        }
    }

    /// Consume one observation and produce exactly one decision
    pub fn tick(&mut self, observation: &Observation, report: &ActuationReport) -> Decision {
        self.now = report.tick;
        self.machine.sync_tick(report.tick);
        let mut events = Vec::new();

        if let Some((kind, trigger, reason)) = self.pending_emergency.take() {
            self.enter_emergency(kind, trigger, reason, &mut events);
        }

        if let Some(mode) = observation.mode {
            self.sync_mode(mode, &mut events);
        }

        if observation.party_fainted() && self.machine.category() != Some(Category::Emergency) {
            self.enter_emergency(
                EmergencyKind::PartyFainted,
                TransitionTrigger::PartyFainted,
                "whole party fainted".to_string(),
                &mut events,
            );
        }

        let world = observation.world_state(report.capabilities);
        self.feed_tracker(&mut events);
        if let Some(event) = self.tracker.observe(self.now) {
            let tier = event.tier;
            events.push(PilotEvent::Anomaly(event));
            self.apply_escalation(tier, &world, &mut events);
            self.feed_tracker(&mut events);
        }
        if self.tracker.tier() < EscalationTier::PlanSimplification {
            self.planner.set_simplified(false);
        }

        let (command, rationale, score) = if self.machine.is_terminated() {
            (Command::Idle, "pilot shut down".to_string(), 0.0)
        } else if self.machine.category() == Some(Category::Emergency) {
            self.recovery_command()
        } else {
            self.plan_command(observation, report, &world, &mut events)
        };

        tracing::debug!(tick = self.now, command = %command, %rationale, "Decision");
        Decision {
            tick: self.now,
            command,
            rationale,
            score,
            mode: self.machine.current(),
            tier: self.tracker.tier(),
            events,
        }
    }

    fn sync_mode(&mut self, observed: Mode, events: &mut Vec<PilotEvent>) {
        let current = self.machine.current();
        if current == Some(observed) {
            return;
        }

        if current.is_some_and(|m| m.is_emergency()) {
            // Emergency ends only once recovery has had a chance to act
            if observed == Mode::OverworldIdle && self.recovery_presses > 0 {
                match self
                    .machine
                    .walk_route(Mode::OverworldIdle, TransitionTrigger::Recovery)
                {
                    Ok(_) => {
                        tracing::info!(presses = self.recovery_presses, "Recovered to overworld");
                        events.push(PilotEvent::Recovered {
                            presses: self.recovery_presses,
                        });
                        self.recovery_presses = 0;
                    }
                    Err(err) => tracing::warn!(error = %PilotError::from(err), "Recovery route failed"),
                }
            }
            return;
        }

        match self.machine.apply_transition(observed, TransitionTrigger::Observed) {
            Ok(_) => {}
            Err(err) => {
                let consecutive = self.machine.consecutive_rejections();
                tracing::warn!(error = %err, consecutive, "Observed transition rejected");
                events.push(PilotEvent::TransitionRejected {
                    from: err.from,
                    to: err.to,
                    consecutive,
                });
                if consecutive >= self.config.session.rejection_limit {
                    self.enter_emergency(
                        EmergencyKind::Exception,
                        TransitionTrigger::Fault("perception disagrees with mode table".into()),
                        format!("{} rejected transitions in a row", consecutive),
                        events,
                    );
                }
            }
        }
    }

    fn enter_emergency(
        &mut self,
        kind: EmergencyKind,
        trigger: TransitionTrigger,
        reason: String,
        events: &mut Vec<PilotEvent>,
    ) {
        match self.machine.force_emergency(kind, trigger) {
            Ok(mode) => {
                tracing::warn!(mode = %mode, %reason, "Entered emergency");
                self.recovery_presses = 0;
                events.push(PilotEvent::EmergencyEntered { mode, reason });
            }
            Err(err) => tracing::warn!(error = %err, "Could not enter emergency"),
        }
    }

    /// Feed history records the tracker has not seen yet
    fn feed_tracker(&mut self, events: &mut Vec<PilotEvent>) {
        let fresh = self.machine.history()[self.seen_history..].to_vec();
        self.seen_history = self.machine.history().len();
        for record in fresh {
            if let Some(exit) = self.tracker.record_transition(&record, &mut self.profiles) {
                events.push(PilotEvent::DwellRecorded(exit));
            }
            events.push(PilotEvent::Transition(record));
        }
    }

    fn apply_escalation(
        &mut self,
        tier: EscalationTier,
        world: &WorldState,
        events: &mut Vec<PilotEvent>,
    ) {
        let trigger = TransitionTrigger::Escalation(tier);
        let in_emergency = self.machine.category() == Some(Category::Emergency);
        match tier {
            EscalationTier::None => return,
            EscalationTier::EnhancedMonitoring => {
                tracing::warn!(mode = ?self.machine.current(), "Enhanced monitoring");
            }
            EscalationTier::PlanSimplification => self.planner.set_simplified(true),
            EscalationTier::EmergencyProtocol => {
                self.planner.set_simplified(true);
                if !in_emergency {
                    self.enter_emergency(
                        EmergencyKind::Softlock,
                        trigger,
                        "dwell anomaly escalated".to_string(),
                        events,
                    );
                }
            }
            EscalationTier::ResetCondition => {
                if let Some(event) = self.planner.abandon_active(self.now, world) {
                    events.push(PilotEvent::Planner(event));
                }
                if !in_emergency {
                    self.enter_emergency(
                        EmergencyKind::Softlock,
                        trigger.clone(),
                        "dwell anomaly reset".to_string(),
                        events,
                    );
                }
                // Recovery finishes the route once the overworld is observed
                if self.machine.current() != Some(Mode::EmergencyRecovery) {
                    if let Err(err) = self.machine.apply_transition(Mode::EmergencyRecovery, trigger) {
                        tracing::warn!(error = %err, "Could not route toward recovery");
                    }
                }
            }
        }
        events.push(PilotEvent::EscalationApplied { tier });
    }

    fn recovery_command(&mut self) -> (Command, String, f32) {
        let idx = (self.recovery_presses as usize) % RECOVERY_SEQUENCE.len();
        self.recovery_presses += 1;
        let button = RECOVERY_SEQUENCE[idx];
        (
            Command::press(button),
            format!(
                "recovery press {} in {}",
                self.recovery_presses,
                self.machine.current().map(|m| m.name()).unwrap_or("none")
            ),
            0.0,
        )
    }

    fn plan_command(
        &mut self,
        observation: &Observation,
        report: &ActuationReport,
        world: &WorldState,
        events: &mut Vec<PilotEvent>,
    ) -> (Command, String, f32) {
        let ctx = PlannerContext {
            now: self.now,
            world,
            mode: self.machine.current(),
            battle: observation.battle.as_ref(),
            graph: &self.graph,
            combat: &self.combat,
            table: self.machine.table(),
            last_confirmed: report.last_command_executed,
            water_substitute: observation.water_substitute,
        };
        let output = self.planner.tick(&ctx);

        for event in output.events {
            match &event {
                PlannerEvent::PlanExhausted { goal, replans } => {
                    let err = PilotError::PlanExhausted {
                        goal: *goal,
                        replans: *replans,
                    };
                    tracing::warn!(error = %err, "Forcing emergency next tick");
                    self.pending_emergency = Some((
                        EmergencyKind::Softlock,
                        TransitionTrigger::PlanExhausted,
                        err.to_string(),
                    ));
                    self.consecutive_exhaustions += 1;
                    if self.consecutive_exhaustions >= self.config.session.stall_threshold {
                        let stall = PilotError::SessionStall {
                            consecutive: self.consecutive_exhaustions,
                        };
                        tracing::error!(error = %stall, "Session stalled");
                        self.stalled = true;
                        events.push(PilotEvent::SessionStalled {
                            consecutive: self.consecutive_exhaustions,
                        });
                    }
                }
                PlannerEvent::GoalSatisfied { .. } => {
                    self.consecutive_exhaustions = 0;
                    self.stalled = false;
                }
                _ => {}
            }
            events.push(PilotEvent::Planner(event));
        }

        (output.command, output.rationale, output.score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::TilePos;
    use crate::navigation::{GraphDefinition, MapLayout};
    use crate::planner::{ActionSpec, Condition};

    fn pilot() -> Pilot {
        let graph = WorldGraph::from_definition(&GraphDefinition {
            maps: vec![MapLayout::new(1, &["....", "...."])],
            warps: vec![],
        })
        .unwrap();
        Pilot::new(PilotConfig::default(), graph, ActionCatalog::new()).unwrap()
    }

    fn idle_at(tick: Tick) -> (Observation, ActuationReport) {
        let mut obs = Observation::in_mode(Mode::OverworldIdle);
        obs.position = Some(TilePos::new(1, 0, 0));
        (obs, ActuationReport::at(tick))
    }

    #[test]
    fn test_first_observation_sets_mode() {
        let mut pilot = pilot();
        let (obs, report) = idle_at(0);
        let decision = pilot.tick(&obs, &report);
        assert_eq!(decision.mode, Some(Mode::OverworldIdle));
        assert!(decision.command.is_idle());
        assert!(decision.has_event(|e| matches!(e, PilotEvent::Transition(_))));
    }

    #[test]
    fn test_illegal_observations_escalate_to_exception() {
        let mut pilot = pilot();
        let (obs, report) = idle_at(0);
        pilot.tick(&obs, &report);

        let title = Observation::in_mode(Mode::TitleOptions);
        let mut last = None;
        for tick in 1..=5 {
            last = Some(pilot.tick(&title, &ActuationReport::at(tick)));
        }
        let decision = last.unwrap();
        assert_eq!(decision.mode, Some(Mode::EmergencyException));
        assert!(matches!(decision.command, Command::Press { .. }));
    }

    #[test]
    fn test_party_faint_forces_emergency_then_recovers() {
        let mut pilot = pilot();
        let (obs, report) = idle_at(0);
        pilot.tick(&obs, &report);

        let mut fainted = obs.clone();
        fainted.party_hp = vec![0.0, 0.0];
        let decision = pilot.tick(&fainted, &ActuationReport::at(1));
        assert_eq!(decision.mode, Some(Mode::EmergencyPartyFainted));
        assert_eq!(decision.command, Command::press(Button::B));

        let (obs, _) = idle_at(2);
        let decision = pilot.tick(&obs, &ActuationReport::at(2));
        assert_eq!(decision.mode, Some(Mode::OverworldIdle));
        assert!(decision.has_event(|e| matches!(e, PilotEvent::Recovered { presses: 1 })));
    }

    #[test]
    fn test_dialog_stall_climbs_to_emergency() {
        let mut pilot = pilot();
        let dialog = Observation::in_mode(Mode::DialogNpc);
        let mut tiers = Vec::new();
        for tick in 0..=130 {
            let decision = pilot.tick(&dialog, &ActuationReport::at(tick));
            if decision.has_event(|e| matches!(e, PilotEvent::EscalationApplied { .. })) {
                tiers.push((tick, decision.tier));
            }
        }
        assert_eq!(
            tiers,
            vec![
                (61, EscalationTier::EnhancedMonitoring),
                (91, EscalationTier::PlanSimplification),
                (121, EscalationTier::EmergencyProtocol),
            ]
        );
        assert_eq!(pilot.machine().current(), Some(Mode::EmergencySoftlock));
        assert!(pilot.planner().is_simplified());
        assert!(matches!(pilot.health(), Err(PilotError::AnomalyDetected(_))));
    }

    #[test]
    fn test_stall_after_repeated_exhaustion() {
        let mut config = PilotConfig::default();
        config.planner.max_replans = 1;
        let graph = WorldGraph::from_definition(&GraphDefinition {
            maps: vec![MapLayout::new(1, &["....", "...."])],
            warps: vec![],
        })
        .unwrap();
        let unreachable = TilePos::new(7, 0, 0);
        let catalog = ActionCatalog::new().with(ActionSpec::navigate("nowhere", unreachable));
        let mut pilot = Pilot::new(config, graph, catalog).unwrap();
        pilot.push_goal(Goal::new("go", 1.0).with_condition(Condition::At(unreachable)));

        let mut tick = 0;
        let mut stalled = false;
        while tick < 60 && !stalled {
            let (obs, report) = idle_at(tick);
            let decision = pilot.tick(&obs, &report);
            stalled = decision.has_event(|e| matches!(e, PilotEvent::SessionStalled { .. }));
            tick += 1;
        }
        assert!(stalled);
        assert!(matches!(
            pilot.stall(),
            Err(PilotError::SessionStall { consecutive: 3 })
        ));
    }
}
