//! Property tests for the A* pathfinder against a plain Dijkstra search

use ahash::AHashMap;
use proptest::prelude::*;

use pokepilot::core::config::NavigationConfig;
use pokepilot::core::types::{Capabilities, TilePos};
use pokepilot::navigation::{
    find_path, missing_capabilities, path_cost, GraphDefinition, MapLayout, NavigationContext,
    WorldGraph,
};

const TILES: &[char] = &['.', '.', '.', '#', 'g', 't', 'C', '~', 'v', '>'];

fn build(rows: &[String]) -> WorldGraph {
    let borrowed: Vec<&str> = rows.iter().map(String::as_str).collect();
    WorldGraph::from_definition(&GraphDefinition {
        maps: vec![MapLayout::new(1, &borrowed)],
        warps: vec![],
    })
    .unwrap()
}

/// Exhaustive shortest-path cost, no heuristic
fn dijkstra(graph: &WorldGraph, start: TilePos, goal: TilePos, ctx: &NavigationContext) -> Option<f32> {
    let mut dist: AHashMap<TilePos, f32> = AHashMap::new();
    let mut done: AHashMap<TilePos, bool> = AHashMap::new();
    dist.insert(start, 0.0);

    loop {
        let next = dist
            .iter()
            .filter(|(pos, _)| !done.contains_key(*pos))
            .min_by(|a, b| a.1.total_cmp(b.1))
            .map(|(pos, d)| (*pos, *d));
        let (pos, d) = next?;
        if pos == goal {
            return Some(d);
        }
        done.insert(pos, true);

        for edge in graph.edges(pos) {
            let Some(terrain) = graph.terrain(edge.to) else {
                continue;
            };
            let Some(cost) = ctx.step_cost(terrain, edge.direction, edge.base_cost) else {
                continue;
            };
            let candidate = d + cost;
            let entry = dist.entry(edge.to).or_insert(f32::INFINITY);
            if candidate < *entry {
                *entry = candidate;
            }
        }
    }
}

fn grid_strategy() -> impl Strategy<Value = Vec<String>> {
    (2usize..7, 2usize..7).prop_flat_map(|(w, h)| {
        prop::collection::vec(prop::collection::vec(prop::sample::select(TILES), w), h).prop_map(
            |rows| {
                let h = rows.len();
                rows.into_iter()
                    .enumerate()
                    .map(|(y, row)| {
                        let w = row.len();
                        row.into_iter()
                            .enumerate()
                            .map(|(x, c)| {
                                // Start and goal corners are always open floor
                                if (x == 0 && y == 0) || (x == w - 1 && y == h - 1) {
                                    '.'
                                } else {
                                    c
                                }
                            })
                            .collect()
                    })
                    .collect()
            },
        )
    })
}

fn capabilities_strategy() -> impl Strategy<Value = Capabilities> {
    any::<bool>().prop_map(|cut| if cut { Capabilities::CUT } else { Capabilities::empty() })
}

proptest! {
    #[test]
    fn test_astar_matches_dijkstra(
        rows in grid_strategy(),
        caps in capabilities_strategy(),
        avoid in any::<bool>(),
    ) {
        let graph = build(&rows);
        let start = TilePos::new(1, 0, 0);
        let goal = TilePos::new(1, rows[0].len() as i32 - 1, rows.len() as i32 - 1);
        let ctx = NavigationContext::new(caps, NavigationConfig::default()).avoiding_encounters(avoid);

        let astar = find_path(&graph, start, goal, &ctx);
        let exhaustive = dijkstra(&graph, start, goal, &ctx);

        match (astar, exhaustive) {
            (Ok(path), Some(best)) => {
                prop_assert!((path.cost - best).abs() < 1e-3, "astar {} vs dijkstra {}", path.cost, best);
                let repriced = path_cost(&graph, &path, &ctx);
                prop_assert!(repriced.is_some());
                prop_assert!((repriced.unwrap_or(f32::NAN) - path.cost).abs() < 1e-3);
            }
            (Err(_), None) => {}
            (astar, exhaustive) => {
                prop_assert!(false, "disagreement: astar {:?}, dijkstra {:?}", astar.map(|p| p.cost), exhaustive);
            }
        }
    }

    #[test]
    fn test_path_steps_are_contiguous(rows in grid_strategy()) {
        let graph = build(&rows);
        let start = TilePos::new(1, 0, 0);
        let goal = TilePos::new(1, rows[0].len() as i32 - 1, rows.len() as i32 - 1);
        let ctx = NavigationContext::new(Capabilities::all(), NavigationConfig::default());

        if let Ok(path) = find_path(&graph, start, goal, &ctx) {
            let mut at = start;
            for step in &path.steps {
                prop_assert_eq!(step.from, at);
                at = step.to;
            }
            prop_assert_eq!(at, goal);
        }
    }
}

#[test]
fn test_losing_cut_closes_gated_route() {
    let graph = build(&[
        "#####".to_string(),
        "..C..".to_string(),
        "#####".to_string(),
    ]);
    let start = TilePos::new(1, 0, 1);
    let goal = TilePos::new(1, 4, 1);

    let with_cut = NavigationContext::new(Capabilities::CUT, NavigationConfig::default());
    let path = find_path(&graph, start, goal, &with_cut).unwrap();
    assert_eq!(path.len(), 4);

    let without = NavigationContext::new(Capabilities::empty(), NavigationConfig::default());
    assert!(find_path(&graph, start, goal, &without).is_err());
    assert_eq!(path_cost(&graph, &path, &without), None);
    assert_eq!(
        missing_capabilities(&graph, start, goal, &without),
        Some(Capabilities::CUT)
    );
}

#[test]
fn test_water_substitute_opens_water() {
    let graph = build(&[".~~.".to_string()]);
    let start = TilePos::new(1, 0, 0);
    let goal = TilePos::new(1, 3, 0);

    let dry = NavigationContext::new(Capabilities::empty(), NavigationConfig::default());
    assert!(find_path(&graph, start, goal, &dry).is_err());

    let substitute = dry.clone().with_water_substitute(true);
    assert!(find_path(&graph, start, goal, &substitute).is_ok());
    assert_eq!(
        missing_capabilities(&graph, start, goal, &substitute),
        Some(Capabilities::empty())
    );
}
