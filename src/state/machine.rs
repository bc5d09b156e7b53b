//! Hierarchical state machine tracking the current game mode
//!
//! Exactly one mode is current at any time (or none before the first
//! observation). Every accepted change is appended to the transition
//! history; rejected changes leave the machine untouched.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::mode::{Category, EmergencyKind, Mode};
use super::transitions::TransitionTable;
use crate::anomaly::EscalationTier;
use crate::core::error::InvalidTransition;
use crate::core::types::Tick;

/// Why a transition was requested
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TransitionTrigger {
    /// Perception reported the new mode
    Observed,
    /// The anomaly ladder forced the change
    Escalation(EscalationTier),
    /// A goal exhausted its replan budget
    PlanExhausted,
    /// Every party member fainted
    PartyFainted,
    /// A collaborator reported a fault
    Fault(String),
    /// Part of a recovery route
    Recovery,
}

impl fmt::Display for TransitionTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionTrigger::Observed => write!(f, "observed"),
            TransitionTrigger::Escalation(tier) => write!(f, "escalation:{}", tier),
            TransitionTrigger::PlanExhausted => write!(f, "plan_exhausted"),
            TransitionTrigger::PartyFainted => write!(f, "party_fainted"),
            TransitionTrigger::Fault(reason) => write!(f, "fault:{}", reason),
            TransitionTrigger::Recovery => write!(f, "recovery"),
        }
    }
}

/// One accepted mode change; never modified after it is recorded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: Option<Mode>,
    pub to: Mode,
    pub tick: Tick,
    pub trigger: TransitionTrigger,
}

/// The mode tracker
#[derive(Debug, Clone)]
pub struct StateMachine {
    table: TransitionTable,
    current: Option<Mode>,
    entered_at: Tick,
    now: Tick,
    history: Vec<TransitionRecord>,
    consecutive_rejections: u32,
    total_rejections: u64,
}

impl StateMachine {
    pub fn new() -> Self {
        Self::with_table(TransitionTable::standard())
    }

    pub fn with_table(table: TransitionTable) -> Self {
        Self {
            table,
            current: None,
            entered_at: 0,
            now: 0,
            history: Vec::new(),
            consecutive_rejections: 0,
            total_rejections: 0,
        }
    }

    /// Update the machine's notion of the current tick
    pub fn sync_tick(&mut self, tick: Tick) {
        self.now = tick;
    }

    pub fn current(&self) -> Option<Mode> {
        self.current
    }

    pub fn category(&self) -> Option<Category> {
        self.current.map(|m| m.category())
    }

    /// Tick at which the current mode was entered
    pub fn entered_at(&self) -> Tick {
        self.entered_at
    }

    pub fn table(&self) -> &TransitionTable {
        &self.table
    }

    pub fn is_terminated(&self) -> bool {
        self.current.is_some_and(|m| m.is_terminal())
    }

    /// Legality check; the initial "none" state accepts any first mode
    pub fn can_transition(&self, from: Option<Mode>, to: Mode) -> bool {
        match from {
            None => true,
            Some(from) => self.table.is_legal(from, to),
        }
    }

    /// Move to `to` if legal, recording the change
    pub fn apply_transition(
        &mut self,
        to: Mode,
        trigger: TransitionTrigger,
    ) -> Result<Mode, InvalidTransition> {
        let from = self.current;
        if !self.can_transition(from, to) {
            self.consecutive_rejections += 1;
            self.total_rejections += 1;
            tracing::debug!(
                from = from.map(|m| m.name()).unwrap_or("none"),
                to = to.name(),
                "Rejected illegal transition"
            );
            return Err(InvalidTransition { from, to });
        }

        self.current = Some(to);
        self.entered_at = self.now;
        self.consecutive_rejections = 0;
        tracing::debug!(
            from = from.map(|m| m.name()).unwrap_or("none"),
            to = to.name(),
            trigger = %trigger,
            "Mode transition"
        );
        self.history.push(TransitionRecord {
            from,
            to,
            tick: self.now,
            trigger,
        });
        Ok(to)
    }

    /// Enter the Emergency category from wherever the machine is
    ///
    /// Fails only once the machine has shut down. Already being in the
    /// requested emergency mode is not an error.
    pub fn force_emergency(
        &mut self,
        kind: EmergencyKind,
        trigger: TransitionTrigger,
    ) -> Result<Mode, InvalidTransition> {
        let target = kind.mode();
        if self.current == Some(target) {
            return Ok(target);
        }
        self.apply_transition(target, trigger)
    }

    /// Walk the shortest legal route to `target`, recording each hop
    pub fn walk_route(
        &mut self,
        target: Mode,
        trigger: TransitionTrigger,
    ) -> Result<Mode, InvalidTransition> {
        let Some(from) = self.current else {
            return self.apply_transition(target, trigger);
        };
        let route = self
            .table
            .route(from, target)
            .ok_or(InvalidTransition {
                from: Some(from),
                to: target,
            })?;
        for hop in route {
            self.apply_transition(hop, trigger.clone())?;
        }
        Ok(target)
    }

    /// Shut the machine down; only legal from an emergency mode
    pub fn shutdown(&mut self, trigger: TransitionTrigger) -> Result<Mode, InvalidTransition> {
        self.apply_transition(Mode::EmergencyShutdown, trigger)
    }

    /// Append-only transition history
    pub fn history(&self) -> &[TransitionRecord] {
        &self.history
    }

    pub fn last_transition(&self) -> Option<&TransitionRecord> {
        self.history.last()
    }

    /// Rejections since the last accepted transition
    pub fn consecutive_rejections(&self) -> u32 {
        self.consecutive_rejections
    }

    pub fn total_rejections(&self) -> u64 {
        self.total_rejections
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_accepts_any_mode() {
        let mut machine = StateMachine::new();
        assert_eq!(machine.current(), None);
        assert!(machine.can_transition(None, Mode::BattleMoveSelect));
        let mode = machine
            .apply_transition(Mode::BattleMoveSelect, TransitionTrigger::Observed)
            .unwrap();
        assert_eq!(mode, Mode::BattleMoveSelect);
        assert_eq!(machine.history().len(), 1);
        assert_eq!(machine.history()[0].from, None);
    }

    #[test]
    fn test_illegal_transition_leaves_state_unchanged() {
        let mut machine = StateMachine::new();
        machine
            .apply_transition(Mode::BattleMoveSelect, TransitionTrigger::Observed)
            .unwrap();

        let err = machine
            .apply_transition(Mode::MenuBag, TransitionTrigger::Observed)
            .unwrap_err();

        assert_eq!(err.from, Some(Mode::BattleMoveSelect));
        assert_eq!(err.to, Mode::MenuBag);
        assert_eq!(machine.current(), Some(Mode::BattleMoveSelect));
        assert_eq!(machine.history().len(), 1);
        assert_eq!(machine.consecutive_rejections(), 1);
    }

    #[test]
    fn test_records_tick_and_entry() {
        let mut machine = StateMachine::new();
        machine.sync_tick(5);
        machine
            .apply_transition(Mode::OverworldIdle, TransitionTrigger::Observed)
            .unwrap();
        machine.sync_tick(9);
        machine
            .apply_transition(Mode::OverworldWalking, TransitionTrigger::Observed)
            .unwrap();

        assert_eq!(machine.entered_at(), 9);
        let last = machine.last_transition().unwrap();
        assert_eq!(last.from, Some(Mode::OverworldIdle));
        assert_eq!(last.tick, 9);
    }

    #[test]
    fn test_force_emergency_from_anywhere() {
        for &start in Mode::ALL.iter().filter(|m| !m.is_terminal()) {
            let mut machine = StateMachine::new();
            machine
                .apply_transition(start, TransitionTrigger::Observed)
                .unwrap();
            let mode = machine
                .force_emergency(EmergencyKind::Softlock, TransitionTrigger::PlanExhausted)
                .unwrap();
            assert_eq!(mode, Mode::EmergencySoftlock);
        }
    }

    #[test]
    fn test_shutdown_is_terminal() {
        let mut machine = StateMachine::new();
        machine
            .apply_transition(Mode::EmergencyException, TransitionTrigger::Observed)
            .unwrap();
        machine.shutdown(TransitionTrigger::Recovery).unwrap();
        assert!(machine.is_terminated());

        for &mode in Mode::ALL {
            assert!(machine
                .apply_transition(mode, TransitionTrigger::Observed)
                .is_err());
        }
        assert!(machine
            .force_emergency(EmergencyKind::Softlock, TransitionTrigger::Recovery)
            .is_err());
    }

    #[test]
    fn test_walk_route_records_every_hop() {
        let mut machine = StateMachine::new();
        machine
            .apply_transition(Mode::EmergencySoftlock, TransitionTrigger::Observed)
            .unwrap();
        machine
            .walk_route(Mode::OverworldIdle, TransitionTrigger::Recovery)
            .unwrap();
        assert_eq!(machine.current(), Some(Mode::OverworldIdle));
        assert_eq!(machine.history().len(), 2);
    }
}
