//! Action catalog
//!
//! Actions are a closed set of variants, each carrying its own parameters.
//! Catalog entries add the precondition/effect pair used by plan search,
//! an estimated cost and a tick budget. Catalogs can be loaded from TOML or
//! JSON files.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

use super::world::{Condition, Effect};
use crate::combat::BattleIntent;
use crate::core::error::{PilotError, Result};
use crate::core::input::Button;
use crate::core::types::{Hm, Tick, TilePos};
use crate::state::{Category, Mode};

/// Menu operations, driven by fixed button scripts
///
/// Scripts assume the game resets menu cursors to the top entry on open.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MenuCommand {
    Save,
    /// Use the bag item in `slot` on the lead Pokémon
    UseItem { slot: u8 },
    /// Buy `count` of the shop item in `slot`
    Buy { slot: u8, count: u8 },
    /// Use a field move of the party member in `slot`
    FieldMove { hm: Hm, slot: u8 },
}

impl MenuCommand {
    /// Mode the script starts from
    pub fn entry_mode(&self) -> Mode {
        match self {
            MenuCommand::Buy { .. } => Mode::MenuShopBuy,
            _ => Mode::MenuStart,
        }
    }

    /// Buttons pressed after entering `entry_mode`, in order
    pub fn script(&self) -> Vec<Button> {
        let mut buttons = Vec::new();
        let down = |buttons: &mut Vec<Button>, n: u8| {
            buttons.extend(std::iter::repeat(Button::Down).take(usize::from(n)));
        };
        match self {
            MenuCommand::Save => {
                down(&mut buttons, 4);
                buttons.extend([Button::A, Button::A, Button::A, Button::B]);
            }
            MenuCommand::UseItem { slot } => {
                down(&mut buttons, 2);
                buttons.push(Button::A);
                down(&mut buttons, *slot);
                buttons.extend([Button::A, Button::A, Button::A, Button::B, Button::B]);
            }
            MenuCommand::Buy { slot, count } => {
                down(&mut buttons, *slot);
                buttons.push(Button::A);
                buttons.extend(
                    std::iter::repeat(Button::Up).take(usize::from(count.saturating_sub(1))),
                );
                buttons.extend([Button::A, Button::A, Button::B]);
            }
            MenuCommand::FieldMove { slot, .. } => {
                down(&mut buttons, 1);
                buttons.push(Button::A);
                down(&mut buttons, *slot);
                buttons.extend([Button::A, Button::A]);
            }
        }
        buttons
    }

    /// Button that opens the entry mode from the overworld, if any
    pub fn opener(&self) -> Option<Button> {
        match self.entry_mode() {
            Mode::MenuStart => Some(Button::Start),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogChoice {
    /// Read through to the end
    Advance,
    /// Answer yes
    Confirm,
    /// Answer no
    Decline,
    /// Pick an entry of a multiple-choice box
    Select(u8),
}

impl DialogChoice {
    /// Button for the current dialog mode; `moved` counts cursor moves made
    pub fn button_for(&self, mode: Mode, moved: u8) -> Button {
        match (self, mode) {
            (DialogChoice::Decline, Mode::DialogYesNo) => Button::B,
            (DialogChoice::Select(n), Mode::DialogMultipleChoice) if moved < *n => Button::Down,
            _ => Button::A,
        }
    }
}

/// One executable step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    Navigate {
        target: TilePos,
        #[serde(default)]
        avoid_encounters: bool,
    },
    Battle {
        #[serde(default)]
        intent: BattleIntent,
    },
    Menu {
        command: MenuCommand,
    },
    Dialog {
        choice: DialogChoice,
    },
}

impl Action {
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Navigate { .. } => "navigate",
            Action::Battle { .. } => "battle",
            Action::Menu { .. } => "menu",
            Action::Dialog { .. } => "dialog",
        }
    }

    /// Tick budget used when a catalog entry does not set one
    pub fn default_max_ticks(&self) -> Tick {
        match self {
            Action::Navigate { .. } => 600,
            Action::Battle { .. } => 1200,
            Action::Menu { .. } => 120,
            Action::Dialog { .. } => 120,
        }
    }

    /// Category the HSM must allow entering before the step can run
    pub fn entry_category(&self) -> Option<Category> {
        match self {
            Action::Menu { command } => Some(command.entry_mode().category()),
            Action::Dialog { .. } => Some(Category::Dialog),
            _ => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Navigate { target, .. } => write!(f, "navigate to {}", target),
            Action::Battle { intent } => write!(f, "battle ({:?})", intent),
            Action::Menu { command } => write!(f, "menu {:?}", command),
            Action::Dialog { choice } => write!(f, "dialog {:?}", choice),
        }
    }
}

/// Catalog entry: an action with its planning metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionSpec {
    pub name: String,
    pub action: Action,
    #[serde(default)]
    pub preconditions: Vec<Condition>,
    #[serde(default)]
    pub effects: Vec<Effect>,
    #[serde(default = "default_cost")]
    pub cost: f32,
    /// Tick budget; the action's default when absent
    #[serde(default)]
    pub max_ticks: Option<Tick>,
}

fn default_cost() -> f32 {
    1.0
}

impl ActionSpec {
    pub fn new(name: impl Into<String>, action: Action) -> Self {
        let mut effects = Vec::new();
        if let Action::Navigate { target, .. } = &action {
            effects.push(Effect::MoveTo(*target));
        }
        Self {
            name: name.into(),
            action,
            preconditions: Vec::new(),
            effects,
            cost: default_cost(),
            max_ticks: None,
        }
    }

    pub fn navigate(name: impl Into<String>, target: TilePos) -> Self {
        Self::new(
            name,
            Action::Navigate {
                target,
                avoid_encounters: false,
            },
        )
    }

    pub fn with_precondition(mut self, condition: Condition) -> Self {
        self.preconditions.push(condition);
        self
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_cost(mut self, cost: f32) -> Self {
        self.cost = cost;
        self
    }

    pub fn with_max_ticks(mut self, ticks: Tick) -> Self {
        self.max_ticks = Some(ticks);
        self
    }

    pub fn tick_budget(&self) -> Tick {
        self.max_ticks
            .unwrap_or_else(|| self.action.default_max_ticks())
    }

    /// Effects including the implicit move of a navigation step
    pub fn all_effects(&self) -> Vec<Effect> {
        let mut effects = self.effects.clone();
        if let Action::Navigate { target, .. } = &self.action {
            let implicit = Effect::MoveTo(*target);
            if !effects.contains(&implicit) {
                effects.insert(0, implicit);
            }
        }
        effects
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    actions: Vec<ActionSpec>,
}

/// Ordered list of available actions; order is the final search tie-break
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionCatalog {
    specs: Vec<ActionSpec>,
}

impl ActionCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, spec: ActionSpec) -> usize {
        self.specs.push(spec);
        self.specs.len() - 1
    }

    pub fn with(mut self, spec: ActionSpec) -> Self {
        self.push(spec);
        self
    }

    pub fn get(&self, index: usize) -> Option<&ActionSpec> {
        self.specs.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &ActionSpec)> {
        self.specs.iter().enumerate()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    fn validated(specs: Vec<ActionSpec>) -> Result<Self> {
        for spec in &specs {
            if !(spec.cost >= 0.0) {
                return Err(PilotError::Config(format!(
                    "action '{}' has invalid cost {}",
                    spec.name, spec.cost
                )));
            }
        }
        Ok(Self { specs })
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let file: CatalogFile = toml::from_str(content)?;
        Self::validated(file.actions)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let file: CatalogFile = serde_json::from_str(content)?;
        Self::validated(file.actions)
    }

    /// Load a catalog from disk (TOML or JSON by extension)
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let catalog = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&content)?,
            _ => Self::from_toml(&content)?,
        };
        tracing::info!(path = %path.display(), actions = catalog.len(), "Loaded action catalog");
        Ok(catalog)
    }
}
