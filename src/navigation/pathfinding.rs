//! A* pathfinding over the world graph
//!
//! Respects terrain costs and capability gates. The heuristic is the
//! Manhattan distance scaled by the cheapest step multiplier, bounded by the
//! cheapest way off the map through a warp, so it stays admissible even when
//! warps shortcut the grid.

use ahash::AHashMap;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::graph::{EdgeKind, WorldGraph};
use super::terrain::NavigationContext;
use crate::core::error::PathNotFound;
use crate::core::types::{Capabilities, Direction, TilePos};

/// One tile move of a path
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub from: TilePos,
    pub to: TilePos,
    /// Button to press; None when the move happens on its own (warps)
    pub direction: Option<Direction>,
    pub cost: f32,
}

/// Ordered tile moves from start to goal
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Path {
    pub steps: Vec<Step>,
    pub cost: f32,
}

impl Path {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn first(&self) -> Option<&Step> {
        self.steps.first()
    }

    /// Tiles visited, start included
    pub fn tiles(&self) -> Vec<TilePos> {
        let mut tiles = Vec::with_capacity(self.steps.len() + 1);
        if let Some(first) = self.steps.first() {
            tiles.push(first.from);
        }
        tiles.extend(self.steps.iter().map(|s| s.to));
        tiles
    }
}

/// Entry in the A* open set
#[derive(Debug, Clone, Copy)]
struct OpenEntry {
    f: OrderedFloat<f32>,
    /// Insertion sequence; earlier entries win ties
    seq: u64,
    g: f32,
    pos: TilePos,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.f == other.f && self.seq == other.seq
    }
}

impl Eq for OpenEntry {}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap
        other.f.cmp(&self.f).then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Admissible lower bound on the cost from `pos` to `goal`
fn heuristic(graph: &WorldGraph, pos: TilePos, goal: TilePos, ctx: &NavigationContext) -> f32 {
    let scale = ctx.costs.min_step_multiplier();

    let direct = pos
        .manhattan(&goal)
        .map(|d| d as f32 * scale)
        .unwrap_or(f32::INFINITY);

    // Any route through a warp walks to a warp source on this map first
    let escape = match graph.min_warp_cost() {
        Some(warp_cost) => graph
            .warp_sources(pos.map)
            .iter()
            .filter_map(|src| pos.manhattan(src))
            .map(|d| (d as f32 + warp_cost) * scale)
            .fold(f32::INFINITY, f32::min),
        None => f32::INFINITY,
    };

    let h = direct.min(escape);
    if h.is_finite() {
        h
    } else {
        0.0
    }
}

/// Find the cheapest path using A*
///
/// Returns `PathNotFound` when no route exists under the context's
/// capabilities. Start equal to goal yields an empty path.
pub fn find_path(
    graph: &WorldGraph,
    start: TilePos,
    goal: TilePos,
    ctx: &NavigationContext,
) -> Result<Path, PathNotFound> {
    let not_found = PathNotFound {
        from: start,
        to: goal,
    };
    if !graph.contains(start) || !graph.contains(goal) {
        return Err(not_found);
    }
    if start == goal {
        return Ok(Path::default());
    }

    let mut open_set = BinaryHeap::new();
    let mut came_from: AHashMap<TilePos, Step> = AHashMap::new();
    let mut g_scores: AHashMap<TilePos, f32> = AHashMap::new();
    let mut seq = 0u64;

    g_scores.insert(start, 0.0);
    open_set.push(OpenEntry {
        f: OrderedFloat(heuristic(graph, start, goal, ctx)),
        seq,
        g: 0.0,
        pos: start,
    });

    while let Some(current) = open_set.pop() {
        let best_g = g_scores.get(&current.pos).copied().unwrap_or(f32::INFINITY);
        if current.g > best_g {
            // Stale entry superseded by a cheaper one
            continue;
        }
        if current.pos == goal {
            return Ok(reconstruct_path(&came_from, goal, current.g));
        }

        for edge in graph.edges(current.pos) {
            let Some(terrain) = graph.terrain(edge.to) else {
                continue;
            };
            let Some(move_cost) = ctx.step_cost(terrain, edge.direction, edge.base_cost) else {
                continue;
            };

            let tentative_g = current.g + move_cost;
            let neighbor_g = g_scores.get(&edge.to).copied().unwrap_or(f32::INFINITY);

            if tentative_g < neighbor_g {
                came_from.insert(
                    edge.to,
                    Step {
                        from: current.pos,
                        to: edge.to,
                        direction: edge.direction,
                        cost: move_cost,
                    },
                );
                g_scores.insert(edge.to, tentative_g);

                seq += 1;
                open_set.push(OpenEntry {
                    f: OrderedFloat(tentative_g + heuristic(graph, edge.to, goal, ctx)),
                    seq,
                    g: tentative_g,
                    pos: edge.to,
                });
            }
        }
    }

    Err(not_found)
}

/// Reconstruct the step list from the came_from map
fn reconstruct_path(came_from: &AHashMap<TilePos, Step>, goal: TilePos, cost: f32) -> Path {
    let mut steps = Vec::new();
    let mut current = goal;
    while let Some(step) = came_from.get(&current) {
        steps.push(*step);
        current = step.from;
    }
    steps.reverse();
    Path { steps, cost }
}

/// Re-price an existing path under a (possibly different) context
///
/// Returns None if any step became impassable, e.g. after losing an HM.
pub fn path_cost(graph: &WorldGraph, path: &Path, ctx: &NavigationContext) -> Option<f32> {
    path.steps.iter().try_fold(0.0, |total, step| {
        let terrain = graph.terrain(step.to)?;
        let base = graph
            .edges(step.from)
            .iter()
            .find(|e| e.to == step.to && e.direction == step.direction)
            .map(|e| e.base_cost)?;
        Some(total + ctx.step_cost(terrain, step.direction, base)?)
    })
}

/// Capabilities the context lacks to reach `goal`
///
/// Searches again with every capability granted. Returns None when the goal
/// stays unreachable, an empty set when the current context already
/// suffices.
pub fn missing_capabilities(
    graph: &WorldGraph,
    start: TilePos,
    goal: TilePos,
    ctx: &NavigationContext,
) -> Option<Capabilities> {
    if find_path(graph, start, goal, ctx).is_ok() {
        return Some(Capabilities::empty());
    }

    let mut unlocked = ctx.clone();
    unlocked.capabilities = Capabilities::all();
    let path = find_path(graph, start, goal, &unlocked).ok()?;

    let mut needed = Capabilities::empty();
    for step in &path.steps {
        let Some(required) = graph.terrain(step.to).and_then(|t| t.required_capability()) else {
            continue;
        };
        if required == Capabilities::SURF && ctx.water_substitute {
            continue;
        }
        needed |= required;
    }
    Some(needed - ctx.capabilities)
}

/// Count warp hops on a path
pub fn warp_count(graph: &WorldGraph, path: &Path) -> usize {
    path.steps
        .iter()
        .filter(|step| {
            graph
                .edges(step.from)
                .iter()
                .any(|e| e.to == step.to && e.kind == EdgeKind::Warp)
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::NavigationConfig;
    use crate::navigation::graph::{GraphDefinition, MapLayout, WarpLink};

    fn graph(rows: &[&str]) -> WorldGraph {
        let def = GraphDefinition {
            maps: vec![MapLayout::new(1, rows)],
            warps: vec![],
        };
        WorldGraph::from_definition(&def).unwrap()
    }

    fn ctx(caps: Capabilities) -> NavigationContext {
        NavigationContext::new(caps, NavigationConfig::default())
    }

    #[test]
    fn test_straight_line() {
        let g = graph(&["....."]);
        let path = find_path(&g, TilePos::new(1, 0, 0), TilePos::new(1, 4, 0), &ctx(Capabilities::empty()))
            .unwrap();
        assert_eq!(path.len(), 4);
        assert!((path.cost - 4.0).abs() < 1e-5);
        assert!(path.steps.iter().all(|s| s.direction == Some(Direction::Right)));
    }

    #[test]
    fn test_start_is_goal() {
        let g = graph(&["..."]);
        let here = TilePos::new(1, 1, 0);
        let path = find_path(&g, here, here, &ctx(Capabilities::empty())).unwrap();
        assert!(path.is_empty());
        assert_eq!(path.cost, 0.0);
    }

    #[test]
    fn test_routes_around_walls() {
        let g = graph(&[
            "...",
            "##.",
            "...",
        ]);
        let path = find_path(&g, TilePos::new(1, 0, 0), TilePos::new(1, 0, 2), &ctx(Capabilities::empty()))
            .unwrap();
        assert_eq!(path.len(), 6);
        assert_eq!(path.tiles().last(), Some(&TilePos::new(1, 0, 2)));
    }

    #[test]
    fn test_prefers_floor_over_grass() {
        let g = graph(&[
            ".g.",
            "...",
        ]);
        let start = TilePos::new(1, 0, 0);
        let goal = TilePos::new(1, 2, 0);
        let path = find_path(&g, start, goal, &ctx(Capabilities::empty())).unwrap();
        // Through the grass: 2.0 + 1.0 = 3.0. Around it: 4 floor steps.
        assert!((path.cost - 3.0).abs() < 1e-5);

        let avoiding = ctx(Capabilities::empty()).avoiding_encounters(true);
        let path = find_path(&g, start, goal, &avoiding).unwrap();
        assert!((path.cost - 4.0).abs() < 1e-5);
        assert!(path.tiles().iter().all(|t| *t != TilePos::new(1, 1, 0)));
    }

    #[test]
    fn test_ledge_is_one_way() {
        let g = graph(&[
            ".",
            "v",
            ".",
        ]);
        let top = TilePos::new(1, 0, 0);
        let bottom = TilePos::new(1, 0, 2);
        let down = find_path(&g, top, bottom, &ctx(Capabilities::empty())).unwrap();
        assert!((down.cost - 1.9).abs() < 1e-5);
        assert!(find_path(&g, bottom, top, &ctx(Capabilities::empty())).is_err());
    }

    #[test]
    fn test_hm_gate_excluded_not_costly() {
        let g = graph(&[".C."]);
        let start = TilePos::new(1, 0, 0);
        let goal = TilePos::new(1, 2, 0);

        let err = find_path(&g, start, goal, &ctx(Capabilities::empty())).unwrap_err();
        assert_eq!(err.from, start);
        assert_eq!(err.to, goal);

        let path = find_path(&g, start, goal, &ctx(Capabilities::CUT)).unwrap();
        assert!((path.cost - 2.5).abs() < 1e-5);
    }

    #[test]
    fn test_missing_capabilities_reports_hm() {
        let g = graph(&[".C~."]);
        let start = TilePos::new(1, 0, 0);
        let goal = TilePos::new(1, 3, 0);

        let missing = missing_capabilities(&g, start, goal, &ctx(Capabilities::CUT)).unwrap();
        assert_eq!(missing, Capabilities::SURF);

        let missing = missing_capabilities(&g, start, goal, &ctx(Capabilities::empty())).unwrap();
        assert_eq!(missing, Capabilities::CUT | Capabilities::SURF);

        let ferry = ctx(Capabilities::CUT).with_water_substitute(true);
        assert_eq!(missing_capabilities(&g, start, goal, &ferry), Some(Capabilities::empty()));
    }

    #[test]
    fn test_unreachable_even_with_everything() {
        let g = graph(&[".#."]);
        let result = missing_capabilities(
            &g,
            TilePos::new(1, 0, 0),
            TilePos::new(1, 2, 0),
            &ctx(Capabilities::empty()),
        );
        assert_eq!(result, None);
    }

    #[test]
    fn test_path_cost_detects_lost_capability() {
        let g = graph(&[".C."]);
        let with_cut = ctx(Capabilities::CUT);
        let path = find_path(&g, TilePos::new(1, 0, 0), TilePos::new(1, 2, 0), &with_cut).unwrap();
        assert_eq!(path_cost(&g, &path, &with_cut), Some(path.cost));
        assert_eq!(path_cost(&g, &path, &ctx(Capabilities::empty())), None);
    }

    #[test]
    fn test_warp_across_maps() {
        let def = GraphDefinition {
            maps: vec![MapLayout::new(1, &["..W"]), MapLayout::new(2, &["W.."])],
            warps: vec![WarpLink {
                from: TilePos::new(1, 2, 0),
                to: TilePos::new(2, 0, 0),
                direction: None,
                cost: 1.0,
            }],
        };
        let g = WorldGraph::from_definition(&def).unwrap();
        let path = find_path(&g, TilePos::new(1, 0, 0), TilePos::new(2, 2, 0), &ctx(Capabilities::empty()))
            .unwrap();
        assert_eq!(path.len(), 5);
        assert_eq!(warp_count(&g, &path), 1);
        assert_eq!(path.steps[2].direction, None);
    }

    #[test]
    fn test_same_map_warp_shortcut_found() {
        let def = GraphDefinition {
            maps: vec![MapLayout::new(1, &["W.......W"])],
            warps: vec![WarpLink {
                from: TilePos::new(1, 0, 0),
                to: TilePos::new(1, 8, 0),
                direction: None,
                cost: 1.0,
            }],
        };
        let g = WorldGraph::from_definition(&def).unwrap();
        let path = find_path(&g, TilePos::new(1, 0, 0), TilePos::new(1, 8, 0), &ctx(Capabilities::empty()))
            .unwrap();
        assert_eq!(path.len(), 1);
        assert!((path.cost - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_ties_resolved_deterministically() {
        let g = graph(&[
            "...",
            "...",
        ]);
        let start = TilePos::new(1, 0, 0);
        let goal = TilePos::new(1, 1, 1);
        let first = find_path(&g, start, goal, &ctx(Capabilities::empty())).unwrap();
        for _ in 0..10 {
            let again = find_path(&g, start, goal, &ctx(Capabilities::empty())).unwrap();
            assert_eq!(again, first);
        }
    }
}
