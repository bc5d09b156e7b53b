//! Mode legality table
//!
//! Successor sets are precomputed once per table and never change during a
//! session. Emergency modes are successors of every non-terminal mode.

use ahash::AHashMap;
use std::collections::VecDeque;

use super::mode::{Category, Mode};

/// Mapping from a mode to the modes it may legally move to
#[derive(Debug, Clone)]
pub struct TransitionTable {
    successors: AHashMap<Mode, Vec<Mode>>,
}

impl TransitionTable {
    /// Table with no legal transitions at all
    pub fn empty() -> Self {
        Self {
            successors: AHashMap::new(),
        }
    }

    /// The standard game-mode graph
    pub fn standard() -> Self {
        use Mode::*;

        let mut t = Self::empty();

        // Boot
        t.allow(BootPowerOn, &[BootCopyright]);
        t.allow(BootCopyright, &[BootIntroCutscene, TitleSplash]);
        t.allow(BootIntroCutscene, &[TitleSplash]);
        t.allow(BootLoadingSave, &[BootReady]);
        t.allow(BootReady, &[OverworldIdle, TransitionFade]);
        t.allow(BootSoftReset, &[BootCopyright, BootPowerOn]);

        // Title
        t.allow(TitleSplash, &[TitleMainMenu, BootIntroCutscene, BootSoftReset]);
        t.allow(
            TitleMainMenu,
            &[
                TitleContinueSummary,
                TitleNewGameIntro,
                TitleOptions,
                TitleSplash,
                BootSoftReset,
            ],
        );
        t.allow(TitleOptions, &[TitleMainMenu]);
        t.allow(TitleContinueSummary, &[BootLoadingSave, TitleMainMenu]);
        t.allow(TitleNewGameIntro, &[TitleNameEntry, TransitionFade]);
        t.allow(TitleNameEntry, &[TitleNewGameIntro, TransitionFade]);

        // Overworld movement modes flow freely into each other
        t.allow_group(&[
            OverworldIdle,
            OverworldWalking,
            OverworldBiking,
            OverworldSurfing,
            OverworldTallGrass,
            OverworldLedgeJump,
        ]);
        for field_move in [OverworldCutting, OverworldStrength] {
            t.allow(OverworldIdle, &[field_move]);
            t.allow(OverworldWalking, &[field_move]);
            t.allow(field_move, &[OverworldIdle, OverworldWalking, DialogScrolling]);
        }
        t.allow(OverworldIdle, &[OverworldFishing, OverworldInteracting]);
        t.allow(OverworldSurfing, &[OverworldFishing, OverworldInteracting]);
        t.allow(OverworldFishing, &[OverworldIdle, DialogScrolling, TransitionBattleIntro]);
        t.allow(
            OverworldInteracting,
            &[
                OverworldIdle,
                DialogScrolling,
                DialogNpc,
                DialogSign,
                DialogItemReceived,
                DialogHealing,
                MenuPcBox,
                MenuShopBuy,
            ],
        );
        for mover in [OverworldIdle, OverworldWalking, OverworldBiking, OverworldSurfing] {
            t.allow(mover, &[OverworldWarping, MenuStart]);
        }
        t.allow(OverworldWarping, &[TransitionMapLoad, TransitionFade]);
        for spotted_from in [
            OverworldIdle,
            OverworldWalking,
            OverworldBiking,
            OverworldSurfing,
            OverworldTallGrass,
        ] {
            t.allow(spotted_from, &[OverworldTrainerSpotted]);
        }
        t.allow(OverworldTrainerSpotted, &[DialogNpc, TransitionBattleIntro]);
        for encounter_from in [
            OverworldWalking,
            OverworldSurfing,
            OverworldTallGrass,
            OverworldBiking,
        ] {
            t.allow(encounter_from, &[TransitionBattleIntro]);
        }
        t.allow(OverworldIdle, &[DialogNpc, DialogSign, DialogScrolling, DialogCutscene]);
        t.allow(OverworldWalking, &[DialogScrolling, DialogCutscene]);

        // Menus
        t.allow(
            MenuStart,
            &[
                MenuParty,
                MenuBag,
                MenuPokedex,
                MenuTrainerCard,
                MenuSave,
                MenuOptions,
                OverworldIdle,
            ],
        );
        t.allow(
            MenuParty,
            &[
                MenuPartySummary,
                MenuStart,
                MenuItemUse,
                OverworldCutting,
                OverworldSurfing,
                OverworldStrength,
                TransitionMapLoad,
                DialogScrolling,
            ],
        );
        t.allow(MenuPartySummary, &[MenuParty]);
        t.allow(MenuBag, &[MenuItemUse, MenuStart, OverworldFishing, OverworldBiking]);
        t.allow(MenuItemUse, &[MenuBag, MenuParty, DialogScrolling]);
        t.allow(MenuPokedex, &[MenuPokedexEntry, MenuStart]);
        t.allow(MenuPokedexEntry, &[MenuPokedex]);
        t.allow(MenuTrainerCard, &[MenuStart]);
        t.allow(MenuSave, &[MenuSaveConfirm, MenuStart]);
        t.allow(MenuSaveConfirm, &[DialogScrolling, MenuStart]);
        t.allow(MenuOptions, &[MenuStart]);
        t.allow(MenuPcBox, &[DialogScrolling, OverworldIdle]);
        t.allow(MenuShopBuy, &[MenuShopSell, DialogYesNo, DialogScrolling, OverworldIdle]);
        t.allow(MenuShopSell, &[MenuShopBuy, DialogYesNo, DialogScrolling, OverworldIdle]);

        // Dialog
        t.allow(DialogScrolling, &[DialogAwaitingInput, OverworldIdle]);
        t.allow(
            DialogAwaitingInput,
            &[
                DialogScrolling,
                DialogYesNo,
                DialogMultipleChoice,
                DialogItemReceived,
                OverworldIdle,
                MenuStart,
                MenuShopBuy,
                MenuPcBox,
                TransitionBattleIntro,
                TransitionFade,
            ],
        );
        t.allow(
            DialogYesNo,
            &[DialogScrolling, DialogAwaitingInput, OverworldIdle, MenuShopBuy, MenuParty],
        );
        t.allow(
            DialogMultipleChoice,
            &[DialogScrolling, MenuShopBuy, MenuShopSell, OverworldIdle],
        );
        t.allow(
            DialogNpc,
            &[
                DialogScrolling,
                DialogAwaitingInput,
                DialogYesNo,
                DialogItemReceived,
                OverworldIdle,
                TransitionBattleIntro,
            ],
        );
        t.allow(DialogSign, &[OverworldIdle, DialogAwaitingInput]);
        t.allow(DialogItemReceived, &[DialogScrolling, DialogAwaitingInput, OverworldIdle]);
        t.allow(
            DialogHealing,
            &[DialogScrolling, DialogAwaitingInput, DialogYesNo, OverworldIdle],
        );
        t.allow(
            DialogCutscene,
            &[
                DialogScrolling,
                DialogAwaitingInput,
                OverworldIdle,
                OverworldWalking,
                TransitionFade,
                TransitionBattleIntro,
            ],
        );

        // Screen transitions
        t.allow(
            TransitionFade,
            &[OverworldIdle, TransitionMapLoad, DialogCutscene, DialogHealing],
        );
        t.allow(
            TransitionMapLoad,
            &[OverworldIdle, OverworldWalking, TransitionFade, DialogCutscene],
        );
        t.allow(TransitionBattleIntro, &[BattleWildIntro, BattleTrainerIntro]);

        // Battle
        t.allow(BattleWildIntro, &[BattleActionMenu, BattleMessage]);
        t.allow(BattleTrainerIntro, &[BattleActionMenu, BattleMessage]);
        t.allow(
            BattleActionMenu,
            &[
                BattleMoveSelect,
                BattleBag,
                BattlePartySwitch,
                BattleFleeing,
                BattleTurnResolution,
            ],
        );
        t.allow(BattleMoveSelect, &[BattleActionMenu, BattleTurnResolution]);
        t.allow(
            BattleBag,
            &[
                BattleActionMenu,
                BattleCatching,
                BattleTurnResolution,
                BattlePartySwitch,
            ],
        );
        t.allow(
            BattlePartySwitch,
            &[BattleActionMenu, BattleTurnResolution, BattleMessage],
        );
        t.allow(
            BattleForcedSwitch,
            &[BattleMessage, BattleTurnResolution, BattleActionMenu],
        );
        t.allow(
            BattleTurnResolution,
            &[
                BattleMessage,
                BattleActionMenu,
                BattleForcedSwitch,
                BattleExperience,
                BattleEnded,
            ],
        );
        t.allow(
            BattleMessage,
            &[
                BattleTurnResolution,
                BattleActionMenu,
                BattleForcedSwitch,
                BattleExperience,
                BattleMoveLearn,
                BattleEnded,
            ],
        );
        t.allow(
            BattleCatching,
            &[BattleMessage, BattleTurnResolution, BattleEnded],
        );
        t.allow(
            BattleFleeing,
            &[BattleMessage, BattleTurnResolution, BattleEnded],
        );
        t.allow(
            BattleExperience,
            &[BattleMessage, BattleMoveLearn, BattleActionMenu, BattleEnded],
        );
        t.allow(BattleMoveLearn, &[BattleMessage, BattleExperience, BattleEnded]);
        t.allow(
            BattleEnded,
            &[OverworldIdle, TransitionFade, DialogScrolling, DialogNpc],
        );

        // Emergency: reachable from every non-terminal mode, routes back to
        // the overworld or down to Shutdown
        let signalled = [
            EmergencySoftlock,
            EmergencyException,
            EmergencyPartyFainted,
            EmergencyRecovery,
        ];
        for &mode in Mode::ALL {
            if mode.is_terminal() {
                continue;
            }
            t.allow(mode, &signalled);
        }
        for emergency in signalled {
            t.allow(emergency, &[EmergencyShutdown, OverworldIdle]);
        }

        t
    }

    /// Declare `from -> each of to` legal
    pub fn allow(&mut self, from: Mode, to: &[Mode]) {
        let successors = self.successors.entry(from).or_default();
        for &target in to {
            if target == from {
                continue;
            }
            if let Err(idx) = successors.binary_search(&target) {
                successors.insert(idx, target);
            }
        }
    }

    /// Declare every ordered pair within `modes` legal
    pub fn allow_group(&mut self, modes: &[Mode]) {
        for &from in modes {
            self.allow(from, modes);
        }
    }

    pub fn is_legal(&self, from: Mode, to: Mode) -> bool {
        self.successors
            .get(&from)
            .is_some_and(|s| s.binary_search(&to).is_ok())
    }

    /// Successors of `from` in catalog order
    pub fn successors(&self, from: Mode) -> &[Mode] {
        self.successors.get(&from).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Shortest legal sequence of modes leading from `from` to `to`
    ///
    /// The returned path excludes `from` and ends with `to`. Ties are broken
    /// by catalog order, so the route is stable across runs.
    pub fn route(&self, from: Mode, to: Mode) -> Option<Vec<Mode>> {
        if from == to {
            return Some(Vec::new());
        }

        let mut came_from: AHashMap<Mode, Mode> = AHashMap::new();
        let mut queue = VecDeque::from([from]);

        while let Some(current) = queue.pop_front() {
            for &next in self.successors(current) {
                if next == from || came_from.contains_key(&next) {
                    continue;
                }
                came_from.insert(next, current);
                if next == to {
                    let mut path = vec![to];
                    let mut cursor = to;
                    while let Some(&prev) = came_from.get(&cursor) {
                        if prev == from {
                            break;
                        }
                        path.push(prev);
                        cursor = prev;
                    }
                    path.reverse();
                    return Some(path);
                }
                queue.push_back(next);
            }
        }

        None
    }

    /// Route that stays inside the Emergency category until the final hop
    pub fn emergency_route(&self, from: Mode, to: Mode) -> Option<Vec<Mode>> {
        let route = self.route(from, to)?;
        let (last, hops) = route.split_last()?;
        let stays_in_emergency = hops.iter().all(|m| m.category() == Category::Emergency);
        if *last == to && stays_in_emergency {
            Some(route)
        } else {
            None
        }
    }
}

impl Default for TransitionTable {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_mode_has_a_successor_except_shutdown() {
        let table = TransitionTable::standard();
        for &mode in Mode::ALL {
            if mode.is_terminal() {
                assert!(table.successors(mode).is_empty());
            } else {
                assert!(!table.successors(mode).is_empty(), "{} is a dead end", mode);
            }
        }
    }

    #[test]
    fn test_no_self_transitions() {
        let table = TransitionTable::standard();
        for &mode in Mode::ALL {
            assert!(!table.is_legal(mode, mode));
        }
    }

    #[test]
    fn test_emergency_reachable_from_every_category() {
        let table = TransitionTable::standard();
        for &mode in Mode::ALL.iter().filter(|m| !m.is_terminal()) {
            assert!(table.is_legal(mode, Mode::EmergencySoftlock) || mode == Mode::EmergencySoftlock);
            assert!(
                table.is_legal(mode, Mode::EmergencyPartyFainted)
                    || mode == Mode::EmergencyPartyFainted
            );
        }
    }

    #[test]
    fn test_emergency_routes_only_to_overworld_or_emergency() {
        let table = TransitionTable::standard();
        for mode in Category::Emergency.modes() {
            for next in table.successors(mode) {
                assert!(
                    next.is_emergency() || *next == Mode::OverworldIdle,
                    "{} -> {} leaves emergency illegally",
                    mode,
                    next
                );
            }
        }
    }

    #[test]
    fn test_shutdown_only_from_emergency() {
        let table = TransitionTable::standard();
        for &mode in Mode::ALL {
            if table.is_legal(mode, Mode::EmergencyShutdown) {
                assert!(mode.is_emergency());
            }
        }
    }

    #[test]
    fn test_every_mode_reaches_overworld_idle() {
        let table = TransitionTable::standard();
        for &mode in Mode::ALL.iter().filter(|m| !m.is_terminal()) {
            assert!(table.route(mode, Mode::OverworldIdle).is_some(), "{} is stranded", mode);
        }
    }

    #[test]
    fn test_route_is_shortest() {
        let table = TransitionTable::standard();
        let route = table.route(Mode::MenuPokedexEntry, Mode::OverworldIdle).unwrap();
        // Any mode is two hops away through an emergency mode, and the
        // direct menu path is longer, so the BFS must find a 2-hop route
        assert_eq!(route.len(), 2);
        assert_eq!(route.last(), Some(&Mode::OverworldIdle));
    }

    #[test]
    fn test_emergency_route_from_softlock() {
        let table = TransitionTable::standard();
        let route = table
            .emergency_route(Mode::EmergencySoftlock, Mode::OverworldIdle)
            .unwrap();
        assert_eq!(route, vec![Mode::OverworldIdle]);
    }

    #[test]
    fn test_battle_cannot_jump_to_menu() {
        let table = TransitionTable::standard();
        assert!(!table.is_legal(Mode::BattleMoveSelect, Mode::MenuStart));
        assert!(table.is_legal(Mode::BattleActionMenu, Mode::BattleMoveSelect));
    }
}
