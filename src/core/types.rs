//! Core type definitions used throughout the codebase

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Decision tick counter (the core's only unit of time)
pub type Tick = u64;

/// Identifier of one pilot instance (fleet mode runs several side by side)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceId(pub Uuid);

impl InstanceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Map (location) identifier as reported by perception
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MapId(pub u16);

/// A tile on a specific map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TilePos {
    pub map: MapId,
    pub x: i32,
    pub y: i32,
}

impl TilePos {
    pub fn new(map: u16, x: i32, y: i32) -> Self {
        Self { map: MapId(map), x, y }
    }

    /// Manhattan distance, or None when the tiles are on different maps
    pub fn manhattan(&self, other: &TilePos) -> Option<u32> {
        if self.map != other.map {
            return None;
        }
        Some(self.x.abs_diff(other.x) + self.y.abs_diff(other.y))
    }

    /// Neighbouring tile one step in `dir` on the same map
    pub fn step(&self, dir: Direction) -> TilePos {
        let (dx, dy) = dir.delta();
        TilePos {
            map: self.map,
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

impl fmt::Display for TilePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:({},{})", self.map.0, self.x, self.y)
    }
}

/// Cardinal direction on the tile grid (y grows downward)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn delta(&self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    pub fn opposite(&self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }
}

/// Field abilities that gate traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Hm {
    Cut,
    Fly,
    Surf,
    Strength,
    Flash,
}

impl Hm {
    pub fn capability(&self) -> Capabilities {
        match self {
            Hm::Cut => Capabilities::CUT,
            Hm::Fly => Capabilities::FLY,
            Hm::Surf => Capabilities::SURF,
            Hm::Strength => Capabilities::STRENGTH,
            Hm::Flash => Capabilities::FLASH,
        }
    }
}

bitflags! {
    /// Capability flags reported by actuation (which HMs are usable right now)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    pub struct Capabilities: u8 {
        const CUT = 1 << 0;
        const FLY = 1 << 1;
        const SURF = 1 << 2;
        const STRENGTH = 1 << 3;
        const FLASH = 1 << 4;
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Capabilities::empty()
    }
}

/// Item identifier (perception reports item names)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub String);

impl ItemId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
