//! Tile terrain kinds and their movement rules
//!
//! Capability-gated terrain is excluded from a search outright when the
//! capability is missing; it never shows up as a merely expensive step.

use serde::{Deserialize, Serialize};

use crate::core::config::NavigationConfig;
use crate::core::types::{Capabilities, Direction, Hm};

/// Terrain of one tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Terrain {
    #[default]
    Floor,
    Blocking,
    /// One-way drop; the direction is the way the player falls
    Ledge(Direction),
    Water,
    HmGated(Hm),
    Warp,
    TallGrass,
    TrainerVision,
}

impl Terrain {
    /// Parse one character of an ASCII map layout
    pub fn from_char(c: char) -> Option<Terrain> {
        let terrain = match c {
            '.' => Terrain::Floor,
            '#' => Terrain::Blocking,
            'v' => Terrain::Ledge(Direction::Down),
            '^' => Terrain::Ledge(Direction::Up),
            '<' => Terrain::Ledge(Direction::Left),
            '>' => Terrain::Ledge(Direction::Right),
            '~' => Terrain::Water,
            'C' => Terrain::HmGated(Hm::Cut),
            'S' => Terrain::HmGated(Hm::Strength),
            'F' => Terrain::HmGated(Hm::Flash),
            'W' => Terrain::Warp,
            'g' => Terrain::TallGrass,
            't' => Terrain::TrainerVision,
            _ => return None,
        };
        Some(terrain)
    }

    pub fn is_blocking(&self) -> bool {
        matches!(self, Terrain::Blocking)
    }

    /// Can wild or trainer battles start on this tile?
    pub fn triggers_encounters(&self) -> bool {
        matches!(self, Terrain::TallGrass | Terrain::TrainerVision | Terrain::Water)
    }

    /// Capability needed to enter this tile, if any
    pub fn required_capability(&self) -> Option<Capabilities> {
        match self {
            Terrain::Water => Some(Capabilities::SURF),
            Terrain::HmGated(hm) => Some(hm.capability()),
            _ => None,
        }
    }
}

/// Per-search traversal context
#[derive(Debug, Clone, Default)]
pub struct NavigationContext {
    pub capabilities: Capabilities,
    /// Price encounter tiles so the route skirts them
    pub avoid_encounters: bool,
    /// Scripted water access (ferries, cutscene boats) standing in for SURF
    pub water_substitute: bool,
    pub costs: NavigationConfig,
}

impl NavigationContext {
    pub fn new(capabilities: Capabilities, costs: NavigationConfig) -> Self {
        Self {
            capabilities,
            avoid_encounters: false,
            water_substitute: false,
            costs,
        }
    }

    pub fn avoiding_encounters(mut self, avoid: bool) -> Self {
        self.avoid_encounters = avoid;
        self
    }

    pub fn with_water_substitute(mut self, substitute: bool) -> Self {
        self.water_substitute = substitute;
        self
    }

    /// Cost of stepping onto a tile of `terrain` while moving in `direction`
    ///
    /// Returns None when the step is excluded under this context. Warp edges
    /// without a direction only check capability gates.
    pub fn step_cost(
        &self,
        terrain: Terrain,
        direction: Option<Direction>,
        base_cost: f32,
    ) -> Option<f32> {
        let costs = &self.costs;
        let multiplier = match terrain {
            Terrain::Blocking => return None,
            Terrain::Floor | Terrain::Warp => 1.0,
            Terrain::TallGrass => {
                if self.avoid_encounters {
                    costs.tall_grass_avoid_multiplier
                } else {
                    costs.tall_grass_multiplier
                }
            }
            Terrain::TrainerVision => {
                if self.avoid_encounters {
                    costs.trainer_vision_avoid_multiplier
                } else {
                    costs.trainer_vision_multiplier
                }
            }
            Terrain::Ledge(fall) => match direction {
                Some(d) if d == fall => costs.ledge_with_fall_multiplier,
                Some(d) if d == fall.opposite() => return None,
                Some(_) => costs.ledge_lateral_multiplier,
                None => 1.0,
            },
            Terrain::Water => {
                if self.capabilities.contains(Capabilities::SURF) || self.water_substitute {
                    1.0
                } else {
                    return None;
                }
            }
            Terrain::HmGated(hm) => {
                if self.capabilities.contains(hm.capability()) {
                    costs.hm_multiplier
                } else {
                    return None;
                }
            }
        };
        Some(base_cost * multiplier)
    }
}
