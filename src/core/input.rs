//! Primitive inputs handed to the actuation collaborator

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::combat::BattleChoice;
use crate::core::types::Direction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Button {
    A,
    B,
    Start,
    Select,
    Up,
    Down,
    Left,
    Right,
}

impl From<Direction> for Button {
    fn from(dir: Direction) -> Self {
        match dir {
            Direction::Up => Button::Up,
            Direction::Down => Button::Down,
            Direction::Left => Button::Left,
            Direction::Right => Button::Right,
        }
    }
}

/// Exactly one of these is produced per tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Command {
    /// Press and release one button
    Press { button: Button },
    /// Take one tile step
    Walk { direction: Direction },
    /// Enter a battle command through the battle menus
    Battle { choice: BattleChoice },
    /// Do nothing this tick
    Idle,
}

impl Command {
    pub fn press(button: Button) -> Self {
        Command::Press { button }
    }

    pub fn walk(direction: Direction) -> Self {
        Command::Walk { direction }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Command::Idle)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Press { button } => write!(f, "press {:?}", button),
            Command::Walk { direction } => write!(f, "walk {:?}", direction),
            Command::Battle { choice } => write!(f, "battle {:?}", choice),
            Command::Idle => write!(f, "idle"),
        }
    }
}
