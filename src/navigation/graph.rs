//! Tile graph of the game world
//!
//! Built once by the loader (ASCII layouts plus warp links) and read-only
//! while searching. Step edges connect 4-neighbours on the same map; warp
//! edges connect arbitrary tiles, usually across maps.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::terrain::Terrain;
use crate::core::error::{PilotError, Result};
use crate::core::types::{Direction, MapId, TilePos};

/// Base cost of one tile step
pub const STEP_COST: f32 = 1.0;

/// Default cost of taking a warp
pub const WARP_COST: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeKind {
    Step,
    Warp,
}

/// Directed connection between two tiles
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub to: TilePos,
    /// Button direction needed to take the edge; None for automatic warps
    pub direction: Option<Direction>,
    pub base_cost: f32,
    pub kind: EdgeKind,
}

/// Tiles and edges of every known map
#[derive(Debug, Clone, Default)]
pub struct WorldGraph {
    tiles: AHashMap<TilePos, Terrain>,
    edges: AHashMap<TilePos, Vec<Edge>>,
    /// Warp source tiles per map, sorted
    warp_sources: AHashMap<MapId, Vec<TilePos>>,
    min_warp_cost: Option<f32>,
}

impl WorldGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_tile(&mut self, pos: TilePos, terrain: Terrain) {
        self.tiles.insert(pos, terrain);
    }

    /// Create step edges between all adjacent non-blocking tiles
    pub fn connect_grid(&mut self) {
        let mut positions: Vec<TilePos> = self
            .tiles
            .iter()
            .filter(|(_, t)| !t.is_blocking())
            .map(|(p, _)| *p)
            .collect();
        // Deterministic edge order regardless of hash iteration
        positions.sort();

        for from in positions {
            for dir in Direction::ALL {
                let to = from.step(dir);
                let Some(terrain) = self.tiles.get(&to) else {
                    continue;
                };
                if terrain.is_blocking() {
                    continue;
                }
                let edges = self.edges.entry(from).or_default();
                if edges.iter().any(|e| e.to == to && e.kind == EdgeKind::Step) {
                    continue;
                }
                edges.push(Edge {
                    to,
                    direction: Some(dir),
                    base_cost: STEP_COST,
                    kind: EdgeKind::Step,
                });
            }
        }
    }

    /// Add a one-way warp edge
    pub fn add_warp(
        &mut self,
        from: TilePos,
        to: TilePos,
        direction: Option<Direction>,
        cost: f32,
    ) -> Result<()> {
        if !self.tiles.contains_key(&from) || !self.tiles.contains_key(&to) {
            return Err(PilotError::Config(format!(
                "warp {} -> {} references an unknown tile",
                from, to
            )));
        }
        if cost < 0.0 {
            return Err(PilotError::Config(format!(
                "warp {} -> {} has negative cost",
                from, to
            )));
        }
        let sources = self.warp_sources.entry(from.map).or_default();
        if let Err(idx) = sources.binary_search(&from) {
            sources.insert(idx, from);
        }
        self.min_warp_cost = Some(self.min_warp_cost.map_or(cost, |c| c.min(cost)));
        self.edges.entry(from).or_default().push(Edge {
            to,
            direction,
            base_cost: cost,
            kind: EdgeKind::Warp,
        });
        Ok(())
    }

    pub fn terrain(&self, pos: TilePos) -> Option<Terrain> {
        self.tiles.get(&pos).copied()
    }

    pub fn contains(&self, pos: TilePos) -> bool {
        self.tiles.contains_key(&pos)
    }

    /// Outgoing edges of a tile
    pub fn edges(&self, pos: TilePos) -> &[Edge] {
        self.edges.get(&pos).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Tiles on `map` with an outgoing warp
    pub fn warp_sources(&self, map: MapId) -> &[TilePos] {
        self.warp_sources
            .get(&map)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Cheapest base cost of any warp edge, None when the graph has no warps
    pub fn min_warp_cost(&self) -> Option<f32> {
        self.min_warp_cost
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(Vec::len).sum()
    }

    /// Build a graph from a parsed definition
    pub fn from_definition(def: &GraphDefinition) -> Result<Self> {
        let mut graph = Self::new();

        for layout in &def.maps {
            for (y, row) in layout.rows.iter().enumerate() {
                for (x, c) in row.chars().enumerate() {
                    let terrain = Terrain::from_char(c).ok_or_else(|| {
                        PilotError::Config(format!(
                            "map {} row {} col {}: unknown tile '{}'",
                            layout.id, y, x, c
                        ))
                    })?;
                    let pos = TilePos {
                        map: MapId(layout.id),
                        x: x as i32,
                        y: y as i32,
                    };
                    graph.add_tile(pos, terrain);
                }
            }
        }

        graph.connect_grid();

        for warp in &def.warps {
            graph.add_warp(warp.from, warp.to, warp.direction, warp.cost)?;
        }

        tracing::debug!(
            tiles = graph.tile_count(),
            edges = graph.edge_count(),
            "Loaded world graph"
        );

        Ok(graph)
    }

    /// Parse a JSON graph definition
    pub fn from_json(json: &str) -> Result<Self> {
        let def: GraphDefinition = serde_json::from_str(json)?;
        Self::from_definition(&def)
    }

    /// Parse a TOML graph definition
    pub fn from_toml(content: &str) -> Result<Self> {
        let def: GraphDefinition = toml::from_str(content)?;
        Self::from_definition(&def)
    }

    /// Load a graph definition from disk (JSON or TOML by extension)
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml(&content),
            _ => Self::from_json(&content),
        }
    }
}

/// Serialized form of a world graph
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphDefinition {
    #[serde(default)]
    pub maps: Vec<MapLayout>,
    #[serde(default)]
    pub warps: Vec<WarpLink>,
}

/// ASCII layout of one map; row 0 is the top edge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapLayout {
    pub id: u16,
    pub rows: Vec<String>,
}

impl MapLayout {
    pub fn new(id: u16, rows: &[&str]) -> Self {
        Self {
            id,
            rows: rows.iter().map(|r| r.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarpLink {
    pub from: TilePos,
    pub to: TilePos,
    #[serde(default)]
    pub direction: Option<Direction>,
    #[serde(default = "default_warp_cost")]
    pub cost: f32,
}

fn default_warp_cost() -> f32 {
    WARP_COST
}
