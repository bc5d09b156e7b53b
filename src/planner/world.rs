//! Planning world state with conditions and effects over it
//!
//! The state is a value type: search clones it, applies action effects and
//! hashes it to detect repeated states, so every field is ordered.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::core::types::{Capabilities, ItemId, TilePos};
use crate::state::{Category, Mode};

/// Facts about the game the planner reasons over
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorldState {
    pub position: Option<TilePos>,
    pub mode: Option<Mode>,
    pub capabilities: Capabilities,
    pub money: u32,
    pub badges: u8,
    /// Average party HP in percent
    pub party_health: u8,
    pub items: BTreeMap<ItemId, u32>,
    pub flags: BTreeSet<String>,
}

impl WorldState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(mut self, pos: TilePos) -> Self {
        self.position = Some(pos);
        self
    }

    pub fn in_mode(mut self, mode: Mode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_flag(mut self, flag: impl Into<String>) -> Self {
        self.flags.insert(flag.into());
        self
    }

    pub fn with_item(mut self, item: ItemId, count: u32) -> Self {
        self.items.insert(item, count);
        self
    }

    pub fn with_money(mut self, money: u32) -> Self {
        self.money = money;
        self
    }

    pub fn with_capabilities(mut self, caps: Capabilities) -> Self {
        self.capabilities = caps;
        self
    }

    pub fn item_count(&self, item: &ItemId) -> u32 {
        self.items.get(item).copied().unwrap_or(0)
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.contains(flag)
    }

    pub fn category(&self) -> Option<Category> {
        self.mode.map(|m| m.category())
    }
}

/// A predicate over the world state
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    At(TilePos),
    Flag(String),
    NotFlag(String),
    HasItem { item: ItemId, count: u32 },
    MoneyAtLeast(u32),
    BadgesAtLeast(u8),
    HasCapability(Capabilities),
    PartyHealthAtLeast(u8),
    InCategory(Category),
    NotInCategory(Category),
}

impl Condition {
    pub fn holds(&self, state: &WorldState) -> bool {
        match self {
            Condition::At(pos) => state.position == Some(*pos),
            Condition::Flag(flag) => state.has_flag(flag),
            Condition::NotFlag(flag) => !state.has_flag(flag),
            Condition::HasItem { item, count } => state.item_count(item) >= *count,
            Condition::MoneyAtLeast(amount) => state.money >= *amount,
            Condition::BadgesAtLeast(n) => state.badges >= *n,
            Condition::HasCapability(caps) => state.capabilities.contains(*caps),
            Condition::PartyHealthAtLeast(pct) => state.party_health >= *pct,
            Condition::InCategory(cat) => state.category() == Some(*cat),
            Condition::NotInCategory(cat) => state.category() != Some(*cat),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::At(pos) => write!(f, "at {}", pos),
            Condition::Flag(flag) => write!(f, "flag {}", flag),
            Condition::NotFlag(flag) => write!(f, "not flag {}", flag),
            Condition::HasItem { item, count } => write!(f, "{} x{}", item, count),
            Condition::MoneyAtLeast(amount) => write!(f, "money >= {}", amount),
            Condition::BadgesAtLeast(n) => write!(f, "badges >= {}", n),
            Condition::HasCapability(caps) => write!(f, "capability {:?}", caps),
            Condition::PartyHealthAtLeast(pct) => write!(f, "party hp >= {}%", pct),
            Condition::InCategory(cat) => write!(f, "in {}", cat),
            Condition::NotInCategory(cat) => write!(f, "not in {}", cat),
        }
    }
}

/// All conditions hold
pub fn all_hold(conditions: &[Condition], state: &WorldState) -> bool {
    conditions.iter().all(|c| c.holds(state))
}

/// Number of conditions that do not hold yet
pub fn unsatisfied_count(conditions: &[Condition], state: &WorldState) -> usize {
    conditions.iter().filter(|c| !c.holds(state)).count()
}

/// A change an action makes to the world state
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    MoveTo(TilePos),
    SetFlag(String),
    ClearFlag(String),
    AddItem { item: ItemId, count: u32 },
    RemoveItem { item: ItemId, count: u32 },
    GainMoney(u32),
    SpendMoney(u32),
    GainBadge,
    GrantCapability(Capabilities),
    RestoreParty,
    EnterMode(Mode),
}

impl Effect {
    pub fn apply(&self, state: &mut WorldState) {
        match self {
            Effect::MoveTo(pos) => state.position = Some(*pos),
            Effect::SetFlag(flag) => {
                state.flags.insert(flag.clone());
            }
            Effect::ClearFlag(flag) => {
                state.flags.remove(flag);
            }
            Effect::AddItem { item, count } => {
                *state.items.entry(item.clone()).or_insert(0) += count;
            }
            Effect::RemoveItem { item, count } => {
                let remaining = state.item_count(item).saturating_sub(*count);
                if remaining == 0 {
                    state.items.remove(item);
                } else {
                    state.items.insert(item.clone(), remaining);
                }
            }
            Effect::GainMoney(amount) => state.money = state.money.saturating_add(*amount),
            Effect::SpendMoney(amount) => state.money = state.money.saturating_sub(*amount),
            Effect::GainBadge => state.badges = state.badges.saturating_add(1),
            Effect::GrantCapability(caps) => state.capabilities |= *caps,
            Effect::RestoreParty => state.party_health = 100,
            Effect::EnterMode(mode) => state.mode = Some(*mode),
        }
    }

    /// Has this effect visibly happened between `before` and `now`?
    pub fn observed(&self, before: &WorldState, now: &WorldState) -> bool {
        match self {
            Effect::MoveTo(pos) => now.position == Some(*pos),
            Effect::SetFlag(flag) => now.has_flag(flag),
            Effect::ClearFlag(flag) => !now.has_flag(flag),
            Effect::AddItem { item, count } => {
                now.item_count(item) >= before.item_count(item).saturating_add(*count)
            }
            Effect::RemoveItem { item, count } => {
                now.item_count(item) <= before.item_count(item).saturating_sub(*count)
            }
            Effect::GainMoney(amount) => now.money >= before.money.saturating_add(*amount),
            Effect::SpendMoney(amount) => now.money <= before.money.saturating_sub(*amount),
            Effect::GainBadge => now.badges > before.badges,
            Effect::GrantCapability(caps) => now.capabilities.contains(*caps),
            Effect::RestoreParty => now.party_health >= 100,
            // Mode changes are confirmed by the state machine, not the world
            Effect::EnterMode(_) => true,
        }
    }
}

pub fn apply_all(effects: &[Effect], state: &mut WorldState) {
    for effect in effects {
        effect.apply(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conditions() {
        let potion = ItemId::new("potion");
        let state = WorldState::new()
            .at(TilePos::new(1, 2, 3))
            .with_flag("has_pokedex")
            .with_item(potion.clone(), 2)
            .with_money(500)
            .in_mode(Mode::OverworldIdle);

        assert!(Condition::At(TilePos::new(1, 2, 3)).holds(&state));
        assert!(Condition::Flag("has_pokedex".into()).holds(&state));
        assert!(!Condition::NotFlag("has_pokedex".into()).holds(&state));
        assert!(Condition::HasItem { item: potion.clone(), count: 2 }.holds(&state));
        assert!(!Condition::HasItem { item: potion, count: 3 }.holds(&state));
        assert!(Condition::MoneyAtLeast(500).holds(&state));
        assert!(Condition::InCategory(Category::Overworld).holds(&state));
        assert!(Condition::NotInCategory(Category::Battle).holds(&state));
    }

    #[test]
    fn test_effects_apply() {
        let ball = ItemId::new("poke_ball");
        let mut state = WorldState::new().with_money(300);
        apply_all(
            &[
                Effect::SpendMoney(200),
                Effect::AddItem { item: ball.clone(), count: 1 },
                Effect::GainBadge,
                Effect::GrantCapability(Capabilities::CUT),
            ],
            &mut state,
        );
        assert_eq!(state.money, 100);
        assert_eq!(state.item_count(&ball), 1);
        assert_eq!(state.badges, 1);
        assert!(state.capabilities.contains(Capabilities::CUT));

        Effect::RemoveItem { item: ball.clone(), count: 5 }.apply(&mut state);
        assert_eq!(state.item_count(&ball), 0);
        assert!(!state.items.contains_key(&ball));
    }

    #[test]
    fn test_effect_observation_is_relative() {
        let potion = ItemId::new("potion");
        let before = WorldState::new().with_item(potion.clone(), 1);
        let same = before.clone();
        let after = WorldState::new().with_item(potion.clone(), 2);
        let effect = Effect::AddItem { item: potion, count: 1 };
        assert!(!effect.observed(&before, &same));
        assert!(effect.observed(&before, &after));
    }

    #[test]
    fn test_state_hash_is_structural() {
        use std::collections::HashSet;
        let a = WorldState::new().with_flag("x").with_flag("y");
        let b = WorldState::new().with_flag("y").with_flag("x");
        let mut set = HashSet::new();
        set.insert(a);
        assert!(!set.insert(b));
    }
}
