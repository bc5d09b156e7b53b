//! Navigation graph and pathfinder
//!
//! The world is a set of tile graphs (one per map) joined by warps. Search
//! runs under a `NavigationContext` that carries the currently usable field
//! abilities and the encounter-avoidance preference.

pub mod graph;
pub mod pathfinding;
pub mod terrain;

pub use graph::{Edge, EdgeKind, GraphDefinition, MapLayout, WarpLink, WorldGraph};
pub use pathfinding::{find_path, missing_capabilities, path_cost, Path, Step};
pub use terrain::{NavigationContext, Terrain};
