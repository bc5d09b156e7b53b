//! Turning the current plan step into one command per tick
//!
//! A `StepExecution` holds the progress of the step at the plan cursor:
//! when it started, the world snapshot taken at that moment, how far a
//! button script got, and how many commands went unconfirmed. Each call to
//! `advance` either emits the next command, reports the step complete, or
//! reports why it failed.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::action::{Action, DialogChoice, MenuCommand};
use super::plan::PlannedStep;
use super::world::WorldState;
use crate::combat::{BattleIntent, BattleState, CombatEngine};
use crate::core::config::NavigationConfig;
use crate::core::error::PathNotFound;
use crate::core::input::{Button, Command};
use crate::core::types::{Tick, TilePos};
use crate::navigation::{find_path, NavigationContext, WorldGraph};
use crate::state::{Category, Mode, TransitionTable};

/// Everything a step needs to look at for one tick
pub struct ExecutionContext<'a> {
    pub now: Tick,
    pub world: &'a WorldState,
    pub mode: Option<Mode>,
    pub battle: Option<&'a BattleState>,
    pub graph: &'a WorldGraph,
    pub navigation: &'a NavigationConfig,
    pub water_substitute: bool,
    pub combat: &'a CombatEngine,
    pub table: &'a TransitionTable,
    /// Whether actuation confirmed the previous tick's command
    pub last_confirmed: Option<bool>,
    pub actuation_failure_limit: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum StepFailure {
    PathNotFound { from: TilePos, to: TilePos },
    TimedOut { elapsed: Tick, budget: Tick },
    ActuationFailed { attempts: u32 },
    PartyWiped,
    PreconditionBroken,
    /// The step's entry mode cannot be reached from the current mode
    IllegalEntry { from: Option<Mode>, to: Category },
}

impl From<PathNotFound> for StepFailure {
    fn from(err: PathNotFound) -> Self {
        StepFailure::PathNotFound {
            from: err.from,
            to: err.to,
        }
    }
}

impl fmt::Display for StepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepFailure::PathNotFound { from, to } => write!(f, "no path from {} to {}", from, to),
            StepFailure::TimedOut { elapsed, budget } => {
                write!(f, "timed out after {} of {} ticks", elapsed, budget)
            }
            StepFailure::ActuationFailed { attempts } => {
                write!(f, "{} commands in a row went unconfirmed", attempts)
            }
            StepFailure::PartyWiped => write!(f, "party wiped"),
            StepFailure::PreconditionBroken => write!(f, "preconditions no longer hold"),
            StepFailure::IllegalEntry { from, to } => write!(
                f,
                "cannot enter {} from {}",
                to,
                from.map(|m| m.name()).unwrap_or("no mode")
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepStatus {
    Running {
        command: Command,
        rationale: String,
        score: f32,
    },
    Completed,
    Failed(StepFailure),
}

impl StepStatus {
    fn running(command: Command, rationale: impl Into<String>) -> Self {
        StepStatus::Running {
            command,
            rationale: rationale.into(),
            score: 0.0,
        }
    }

    fn idle(rationale: impl Into<String>) -> Self {
        Self::running(Command::Idle, rationale)
    }
}

/// What the last emitted command was meant to achieve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    Opener,
    ScriptButton,
    CursorMove,
    Other,
}

/// Progress of the step at the plan cursor
#[derive(Debug, Clone)]
pub struct StepExecution {
    started_at: Tick,
    snapshot: WorldState,
    interrupt_ticks: Tick,
    pending: Option<Pending>,
    unconfirmed: u32,
    opener_sent: bool,
    entered: bool,
    script_pos: usize,
    cursor_moves: u8,
}

impl StepExecution {
    pub fn new(now: Tick, world: &WorldState) -> Self {
        Self {
            started_at: now,
            snapshot: world.clone(),
            interrupt_ticks: 0,
            pending: None,
            unconfirmed: 0,
            opener_sent: false,
            entered: false,
            script_pos: 0,
            cursor_moves: 0,
        }
    }

    pub fn started_at(&self) -> Tick {
        self.started_at
    }

    /// World as it was when the step started
    pub fn snapshot(&self) -> &WorldState {
        &self.snapshot
    }

    /// A tick spent on an interrupt does not count against the budget
    pub fn note_interrupt(&mut self) {
        self.interrupt_ticks += 1;
        self.pending = None;
    }

    pub fn elapsed(&self, now: Tick) -> Tick {
        now.saturating_sub(self.started_at)
            .saturating_sub(self.interrupt_ticks)
    }

    /// Produce this tick's command for `step`
    pub fn advance(&mut self, step: &PlannedStep, ctx: &ExecutionContext<'_>) -> StepStatus {
        if let Some(pending) = self.pending.take() {
            match ctx.last_confirmed {
                Some(false) => {
                    self.unconfirmed += 1;
                    if self.unconfirmed >= ctx.actuation_failure_limit {
                        return StepStatus::Failed(StepFailure::ActuationFailed {
                            attempts: self.unconfirmed,
                        });
                    }
                }
                _ => {
                    self.unconfirmed = 0;
                    match pending {
                        Pending::Opener => self.opener_sent = true,
                        Pending::ScriptButton => self.script_pos += 1,
                        Pending::CursorMove => self.cursor_moves += 1,
                        Pending::Other => {}
                    }
                }
            }
        }

        let elapsed = self.elapsed(ctx.now);
        if elapsed > step.max_ticks {
            return StepStatus::Failed(StepFailure::TimedOut {
                elapsed,
                budget: step.max_ticks,
            });
        }

        let status = match &step.action {
            Action::Navigate {
                target,
                avoid_encounters,
            } => self.navigate(*target, *avoid_encounters, ctx),
            Action::Battle { intent } => self.battle(*intent, ctx),
            Action::Menu { command } => self.menu(command, step, ctx),
            Action::Dialog { choice } => self.dialog(*choice, ctx),
        };

        if let StepStatus::Running { command, .. } = &status {
            if !command.is_idle() && self.pending.is_none() {
                self.pending = Some(Pending::Other);
            }
        }
        status
    }

    fn navigate(&mut self, target: TilePos, avoid: bool, ctx: &ExecutionContext<'_>) -> StepStatus {
        let Some(position) = ctx.world.position else {
            return StepStatus::idle("position unknown");
        };
        if position == target {
            return StepStatus::Completed;
        }
        if ctx.mode.is_some_and(|m| !m.accepts_movement()) {
            return StepStatus::idle("waiting for overworld control");
        }

        let nav = NavigationContext::new(ctx.world.capabilities, ctx.navigation.clone())
            .avoiding_encounters(avoid)
            .with_water_substitute(ctx.water_substitute);
        let path = match find_path(ctx.graph, position, target, &nav) {
            Ok(path) => path,
            Err(err) => return StepStatus::Failed(err.into()),
        };

        match path.first() {
            Some(step) => match step.direction {
                Some(direction) => StepStatus::Running {
                    command: Command::walk(direction),
                    rationale: format!("{} tiles to {}", path.len(), target),
                    score: path.cost,
                },
                None => StepStatus::idle(format!("waiting for warp to {}", step.to)),
            },
            None => StepStatus::Completed,
        }
    }

    fn battle(&mut self, intent: BattleIntent, ctx: &ExecutionContext<'_>) -> StepStatus {
        let in_battle = ctx.mode.is_some_and(|m| m.is_battle());

        if let Some(battle) = ctx.battle {
            if battle.is_over() {
                return StepStatus::Completed;
            }
            if battle.party_wiped() {
                return StepStatus::Failed(StepFailure::PartyWiped);
            }
            self.entered = true;
            if ctx.mode.is_some_and(|m| m.awaits_battle_command()) {
                let decision = ctx.combat.decide(battle, intent);
                return StepStatus::Running {
                    command: Command::Battle {
                        choice: decision.choice,
                    },
                    rationale: decision.rationale,
                    score: decision.score,
                };
            }
            return StepStatus::running(Command::press(Button::A), "advancing battle text");
        }

        if in_battle {
            self.entered = true;
            return StepStatus::running(Command::press(Button::A), "advancing battle text");
        }
        if self.entered {
            return StepStatus::Completed;
        }
        StepStatus::idle("waiting for battle to start")
    }

    fn menu(
        &mut self,
        command: &MenuCommand,
        step: &PlannedStep,
        ctx: &ExecutionContext<'_>,
    ) -> StepStatus {
        let entry = command.entry_mode();

        if !self.entered {
            if ctx.mode == Some(entry) {
                self.entered = true;
            } else if self.opener_sent {
                return StepStatus::idle(format!("waiting for {}", entry));
            } else if entry_reachable(ctx.table, ctx.mode, |m| m == entry) {
                self.pending = Some(Pending::Opener);
                let button = command.opener().unwrap_or(Button::A);
                return StepStatus::running(Command::press(button), format!("opening {}", entry));
            } else {
                return StepStatus::Failed(StepFailure::IllegalEntry {
                    from: ctx.mode,
                    to: entry.category(),
                });
            }
        }

        let script = command.script();
        if let Some(button) = script.get(self.script_pos) {
            self.pending = Some(Pending::ScriptButton);
            return StepStatus::running(
                Command::press(*button),
                format!("menu script {}/{}", self.script_pos + 1, script.len()),
            );
        }

        if step
            .effects
            .iter()
            .all(|e| e.observed(&self.snapshot, ctx.world))
        {
            StepStatus::Completed
        } else {
            StepStatus::idle("waiting for menu effects")
        }
    }

    fn dialog(&mut self, choice: DialogChoice, ctx: &ExecutionContext<'_>) -> StepStatus {
        match ctx.mode {
            Some(mode) if mode.is_dialog() => {
                self.entered = true;
                let button = choice.button_for(mode, self.cursor_moves);
                self.pending = Some(if button == Button::Down {
                    Pending::CursorMove
                } else {
                    Pending::Other
                });
                StepStatus::running(Command::press(button), format!("dialog {:?}", choice))
            }
            _ if self.entered => StepStatus::Completed,
            _ if self.opener_sent => StepStatus::idle("waiting for dialog"),
            mode if entry_reachable(ctx.table, mode, |m| m.is_dialog()) => {
                self.pending = Some(Pending::Opener);
                StepStatus::running(Command::press(Button::A), "starting dialog")
            }
            mode => StepStatus::Failed(StepFailure::IllegalEntry {
                from: mode,
                to: Category::Dialog,
            }),
        }
    }
}

/// Can a mode matching `target` be entered within two legal hops?
fn entry_reachable(
    table: &TransitionTable,
    from: Option<Mode>,
    target: impl Fn(Mode) -> bool,
) -> bool {
    let Some(from) = from else {
        return false;
    };
    if target(from) {
        return true;
    }
    table.successors(from).iter().any(|&next| {
        !next.is_emergency()
            && (target(next) || table.successors(next).iter().any(|&after| target(after)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::{BattleChoice, BattleKind, Move, Pokemon, PokemonType};
    use crate::core::config::CombatConfig;
    use crate::navigation::{GraphDefinition, MapLayout};
    use crate::planner::action::ActionSpec;
    use crate::planner::world::Effect;

    struct Fixture {
        graph: WorldGraph,
        nav: NavigationConfig,
        combat: CombatEngine,
        table: TransitionTable,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                graph: WorldGraph::from_definition(&GraphDefinition {
                    maps: vec![MapLayout::new(1, &["....", "...."])],
                    warps: vec![],
                })
                .unwrap(),
                nav: NavigationConfig::default(),
                combat: CombatEngine::new(CombatConfig::default()),
                table: TransitionTable::standard(),
            }
        }

        fn ctx<'a>(
            &'a self,
            now: Tick,
            world: &'a WorldState,
            mode: Mode,
            battle: Option<&'a BattleState>,
            confirmed: Option<bool>,
        ) -> ExecutionContext<'a> {
            ExecutionContext {
                now,
                world,
                mode: Some(mode),
                battle,
                graph: &self.graph,
                navigation: &self.nav,
                water_substitute: false,
                combat: &self.combat,
                table: &self.table,
                last_confirmed: confirmed,
                actuation_failure_limit: 5,
            }
        }
    }

    fn step_for(spec: ActionSpec) -> PlannedStep {
        PlannedStep::from_spec(0, &spec, spec.cost)
    }

    #[test]
    fn test_navigate_walks_then_completes() {
        let fx = Fixture::new();
        let step = step_for(ActionSpec::navigate("go", TilePos::new(1, 2, 0)));
        let start = WorldState::new().at(TilePos::new(1, 0, 0));
        let mut exec = StepExecution::new(0, &start);

        let status = exec.advance(&step, &fx.ctx(0, &start, Mode::OverworldIdle, None, None));
        match status {
            StepStatus::Running { command, .. } => {
                assert_eq!(command, Command::walk(crate::core::types::Direction::Right))
            }
            other => panic!("unexpected {:?}", other),
        }

        let arrived = WorldState::new().at(TilePos::new(1, 2, 0));
        let status = exec.advance(&step, &fx.ctx(2, &arrived, Mode::OverworldIdle, None, Some(true)));
        assert_eq!(status, StepStatus::Completed);
    }

    #[test]
    fn test_navigate_waits_outside_overworld() {
        let fx = Fixture::new();
        let step = step_for(ActionSpec::navigate("go", TilePos::new(1, 2, 0)));
        let world = WorldState::new().at(TilePos::new(1, 0, 0));
        let mut exec = StepExecution::new(0, &world);
        let status = exec.advance(&step, &fx.ctx(0, &world, Mode::DialogNpc, None, None));
        assert!(matches!(status, StepStatus::Running { command: Command::Idle, .. }));
    }

    #[test]
    fn test_navigate_unknown_target_fails() {
        let fx = Fixture::new();
        let step = step_for(ActionSpec::navigate("go", TilePos::new(9, 0, 0)));
        let world = WorldState::new().at(TilePos::new(1, 0, 0));
        let mut exec = StepExecution::new(0, &world);
        let status = exec.advance(&step, &fx.ctx(0, &world, Mode::OverworldIdle, None, None));
        assert!(matches!(
            status,
            StepStatus::Failed(StepFailure::PathNotFound { .. })
        ));
    }

    #[test]
    fn test_timeout_excludes_interrupts() {
        let fx = Fixture::new();
        let step = step_for(ActionSpec::navigate("go", TilePos::new(1, 3, 1)).with_max_ticks(10));
        let world = WorldState::new().at(TilePos::new(1, 0, 0));
        let mut exec = StepExecution::new(0, &world);
        for _ in 0..5 {
            exec.note_interrupt();
        }
        let status = exec.advance(&step, &fx.ctx(14, &world, Mode::OverworldIdle, None, None));
        assert!(matches!(status, StepStatus::Running { .. }));

        let status = exec.advance(&step, &fx.ctx(16, &world, Mode::OverworldIdle, None, None));
        assert_eq!(
            status,
            StepStatus::Failed(StepFailure::TimedOut {
                elapsed: 11,
                budget: 10
            })
        );
    }

    #[test]
    fn test_unconfirmed_commands_fail_step() {
        let fx = Fixture::new();
        let step = step_for(ActionSpec::navigate("go", TilePos::new(1, 3, 1)));
        let world = WorldState::new().at(TilePos::new(1, 0, 0));
        let mut exec = StepExecution::new(0, &world);
        let mut last = exec.advance(&step, &fx.ctx(0, &world, Mode::OverworldIdle, None, None));
        for tick in 1..=5 {
            last = exec.advance(&step, &fx.ctx(tick, &world, Mode::OverworldIdle, None, Some(false)));
        }
        assert_eq!(
            last,
            StepStatus::Failed(StepFailure::ActuationFailed { attempts: 5 })
        );
    }

    #[test]
    fn test_menu_script_then_effects() {
        let fx = Fixture::new();
        let potion = crate::core::types::ItemId::new("potion");
        let spec = ActionSpec::new(
            "use potion",
            Action::Menu {
                command: MenuCommand::UseItem { slot: 0 },
            },
        )
        .with_effect(Effect::RemoveItem {
            item: potion.clone(),
            count: 1,
        });
        let step = step_for(spec);
        let before = WorldState::new().with_item(potion.clone(), 2);
        let mut exec = StepExecution::new(0, &before);

        let status = exec.advance(&step, &fx.ctx(0, &before, Mode::OverworldIdle, None, None));
        assert!(matches!(
            status,
            StepStatus::Running { command: Command::Press { button: Button::Start }, .. }
        ));

        let script_len = MenuCommand::UseItem { slot: 0 }.script().len();
        let mut tick = 1;
        for _ in 0..script_len {
            let status = exec.advance(&step, &fx.ctx(tick, &before, Mode::MenuStart, None, Some(true)));
            assert!(matches!(status, StepStatus::Running { command: Command::Press { .. }, .. }));
            tick += 1;
        }

        let status = exec.advance(&step, &fx.ctx(tick, &before, Mode::MenuBag, None, Some(true)));
        assert!(matches!(status, StepStatus::Running { command: Command::Idle, .. }));

        let after = WorldState::new().with_item(potion, 1);
        let status = exec.advance(&step, &fx.ctx(tick + 1, &after, Mode::OverworldIdle, None, None));
        assert_eq!(status, StepStatus::Completed);
    }

    #[test]
    fn test_menu_illegal_entry() {
        let fx = Fixture::new();
        let step = step_for(ActionSpec::new(
            "save",
            Action::Menu {
                command: MenuCommand::Save,
            },
        ));
        let world = WorldState::new();
        let mut exec = StepExecution::new(0, &world);
        let status = exec.advance(&step, &fx.ctx(0, &world, Mode::BattleActionMenu, None, None));
        assert_eq!(
            status,
            StepStatus::Failed(StepFailure::IllegalEntry {
                from: Some(Mode::BattleActionMenu),
                to: Category::Menu
            })
        );
    }

    #[test]
    fn test_dialog_decline_and_close() {
        let fx = Fixture::new();
        let step = step_for(ActionSpec::new(
            "refuse",
            Action::Dialog {
                choice: DialogChoice::Decline,
            },
        ));
        let world = WorldState::new();
        let mut exec = StepExecution::new(0, &world);

        let status = exec.advance(&step, &fx.ctx(0, &world, Mode::OverworldIdle, None, None));
        assert!(matches!(
            status,
            StepStatus::Running { command: Command::Press { button: Button::A }, .. }
        ));
        let status = exec.advance(&step, &fx.ctx(1, &world, Mode::DialogYesNo, None, Some(true)));
        assert!(matches!(
            status,
            StepStatus::Running { command: Command::Press { button: Button::B }, .. }
        ));
        let status = exec.advance(&step, &fx.ctx(2, &world, Mode::OverworldIdle, None, Some(true)));
        assert_eq!(status, StepStatus::Completed);
    }

    #[test]
    fn test_battle_uses_combat_engine() {
        let fx = Fixture::new();
        let step = step_for(ActionSpec::new(
            "fight",
            Action::Battle {
                intent: BattleIntent::Fight,
            },
        ));
        let battle = BattleState {
            kind: BattleKind::Trainer,
            party: vec![Pokemon::new("Charmander", 10, vec![PokemonType::Fire])
                .with_moves(vec![Move::new("Ember", PokemonType::Fire, 40, 100)])],
            active: 0,
            opponent: Pokemon::new("Oddish", 10, vec![PokemonType::Grass]),
            revealed: vec![],
            opponent_items: 0,
            balls: vec![],
            turn: 1,
            outcome: None,
        };
        let world = WorldState::new();
        let mut exec = StepExecution::new(0, &world);
        let status = exec.advance(&step, &fx.ctx(0, &world, Mode::BattleActionMenu, Some(&battle), None));
        match status {
            StepStatus::Running { command, .. } => assert_eq!(
                command,
                Command::Battle {
                    choice: BattleChoice::UseMove { index: Some(0) }
                }
            ),
            other => panic!("unexpected {:?}", other),
        }

        let mut won = battle.clone();
        won.outcome = Some(crate::combat::BattleOutcome::Won);
        let status = exec.advance(&step, &fx.ctx(1, &world, Mode::BattleEnded, Some(&won), Some(true)));
        assert_eq!(status, StepStatus::Completed);
    }
}
