//! Game mode catalog
//!
//! Modes form a flat tag set. The category a mode belongs to is metadata
//! on the tag, not a level in a type hierarchy.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Top-level grouping of modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Boot,
    Title,
    Menu,
    Dialog,
    Overworld,
    Battle,
    Emergency,
    Transition,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Boot,
        Category::Title,
        Category::Menu,
        Category::Dialog,
        Category::Overworld,
        Category::Battle,
        Category::Emergency,
        Category::Transition,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Category::Boot => "boot",
            Category::Title => "title",
            Category::Menu => "menu",
            Category::Dialog => "dialog",
            Category::Overworld => "overworld",
            Category::Battle => "battle",
            Category::Emergency => "emergency",
            Category::Transition => "transition",
        }
    }

    /// Modes that belong to this category, in catalog order
    pub fn modes(&self) -> impl Iterator<Item = Mode> + '_ {
        Mode::ALL.iter().copied().filter(move |m| m.category() == *self)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

macro_rules! define_modes {
    ($( $category:ident { $( $variant:ident => $name:literal ),* $(,)? } )*) => {
        /// One concrete game mode
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum Mode {
            $( $(
                #[serde(rename = $name)]
                $variant,
            )* )*
        }

        impl Mode {
            /// Every mode in declaration order
            pub const ALL: &'static [Mode] = &[ $( $( Mode::$variant, )* )* ];

            /// Stable dotted name, used as profile key and in logs
            pub fn name(&self) -> &'static str {
                match self {
                    $( $( Mode::$variant => $name, )* )*
                }
            }

            pub fn category(&self) -> Category {
                match self {
                    $( $( Mode::$variant => Category::$category, )* )*
                }
            }
        }
    };
}

define_modes! {
    Boot {
        BootPowerOn => "boot.power_on",
        BootCopyright => "boot.copyright",
        BootIntroCutscene => "boot.intro_cutscene",
        BootLoadingSave => "boot.loading_save",
        BootReady => "boot.ready",
        BootSoftReset => "boot.soft_reset",
    }
    Title {
        TitleSplash => "title.splash",
        TitleMainMenu => "title.main_menu",
        TitleContinueSummary => "title.continue_summary",
        TitleOptions => "title.options",
        TitleNewGameIntro => "title.new_game_intro",
        TitleNameEntry => "title.name_entry",
    }
    Menu {
        MenuStart => "menu.start",
        MenuParty => "menu.party",
        MenuPartySummary => "menu.party_summary",
        MenuBag => "menu.bag",
        MenuItemUse => "menu.item_use",
        MenuPokedex => "menu.pokedex",
        MenuPokedexEntry => "menu.pokedex_entry",
        MenuTrainerCard => "menu.trainer_card",
        MenuSave => "menu.save",
        MenuSaveConfirm => "menu.save_confirm",
        MenuOptions => "menu.options",
        MenuPcBox => "menu.pc_box",
        MenuShopBuy => "menu.shop_buy",
        MenuShopSell => "menu.shop_sell",
    }
    Dialog {
        DialogScrolling => "dialog.scrolling",
        DialogAwaitingInput => "dialog.awaiting_input",
        DialogYesNo => "dialog.yes_no",
        DialogMultipleChoice => "dialog.multiple_choice",
        DialogNpc => "dialog.npc",
        DialogSign => "dialog.sign",
        DialogItemReceived => "dialog.item_received",
        DialogHealing => "dialog.healing",
        DialogCutscene => "dialog.cutscene",
    }
    Overworld {
        OverworldIdle => "overworld.idle",
        OverworldWalking => "overworld.walking",
        OverworldBiking => "overworld.biking",
        OverworldSurfing => "overworld.surfing",
        OverworldCutting => "overworld.cutting",
        OverworldStrength => "overworld.strength",
        OverworldLedgeJump => "overworld.ledge_jump",
        OverworldWarping => "overworld.warping",
        OverworldTallGrass => "overworld.tall_grass",
        OverworldTrainerSpotted => "overworld.trainer_spotted",
        OverworldFishing => "overworld.fishing",
        OverworldInteracting => "overworld.interacting",
    }
    Battle {
        BattleWildIntro => "battle.wild_intro",
        BattleTrainerIntro => "battle.trainer_intro",
        BattleActionMenu => "battle.action_menu",
        BattleMoveSelect => "battle.move_select",
        BattleBag => "battle.bag",
        BattlePartySwitch => "battle.party_switch",
        BattleForcedSwitch => "battle.forced_switch",
        BattleTurnResolution => "battle.turn_resolution",
        BattleMessage => "battle.message",
        BattleCatching => "battle.catching",
        BattleFleeing => "battle.fleeing",
        BattleExperience => "battle.experience",
        BattleMoveLearn => "battle.move_learn",
        BattleEnded => "battle.ended",
    }
    Emergency {
        EmergencySoftlock => "emergency.softlock",
        EmergencyException => "emergency.exception",
        EmergencyPartyFainted => "emergency.party_fainted",
        EmergencyRecovery => "emergency.recovery",
        EmergencyShutdown => "emergency.shutdown",
    }
    Transition {
        TransitionFade => "transition.fade",
        TransitionMapLoad => "transition.map_load",
        TransitionBattleIntro => "transition.battle_intro",
    }
}

impl Mode {
    /// Look a mode up by its dotted name
    pub fn from_name(name: &str) -> Option<Mode> {
        Mode::ALL.iter().copied().find(|m| m.name() == name)
    }

    /// Shutdown accepts no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, Mode::EmergencyShutdown)
    }

    pub fn is_emergency(&self) -> bool {
        self.category() == Category::Emergency
    }

    pub fn is_battle(&self) -> bool {
        self.category() == Category::Battle
    }

    pub fn is_dialog(&self) -> bool {
        self.category() == Category::Dialog
    }

    /// Overworld modes in which the player can be steered tile by tile
    pub fn accepts_movement(&self) -> bool {
        matches!(
            self,
            Mode::OverworldIdle
                | Mode::OverworldWalking
                | Mode::OverworldBiking
                | Mode::OverworldSurfing
                | Mode::OverworldTallGrass
        )
    }

    /// Battle modes waiting for the player's command
    pub fn awaits_battle_command(&self) -> bool {
        matches!(
            self,
            Mode::BattleActionMenu
                | Mode::BattleMoveSelect
                | Mode::BattleForcedSwitch
                | Mode::BattlePartySwitch
                | Mode::BattleBag
        )
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Emergency conditions that may be signalled from anywhere
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmergencyKind {
    Softlock,
    Exception,
    PartyFainted,
}

impl EmergencyKind {
    pub fn mode(&self) -> Mode {
        match self {
            EmergencyKind::Softlock => Mode::EmergencySoftlock,
            EmergencyKind::Exception => Mode::EmergencyException,
            EmergencyKind::PartyFainted => Mode::EmergencyPartyFainted,
        }
    }
}
