//! Forward plan search over the action catalog
//!
//! Best-first over world states ordered by (plan length, estimated cost,
//! catalog indices): the shortest sequence wins, ties go to the cheaper one
//! and then to catalog declaration order. Navigation steps are priced by
//! the pathfinder under the hypothetical state's capabilities.

use ahash::{AHashMap, AHashSet};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

use super::action::{Action, ActionCatalog};
use super::plan::PlannedStep;
use super::world::{all_hold, apply_all, Condition, WorldState};
use crate::core::config::NavigationConfig;
use crate::core::types::{Capabilities, TilePos};
use crate::navigation::{find_path, NavigationContext, WorldGraph};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLimits {
    pub max_depth: usize,
    pub max_expansions: usize,
}

/// Collaborators the search consults
pub struct SearchContext<'a> {
    pub graph: &'a WorldGraph,
    pub navigation: &'a NavigationConfig,
    pub water_substitute: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub steps: Vec<PlannedStep>,
    pub expansions: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchFailure {
    /// Every reachable state within the depth bound was explored
    NoPlan { expansions: usize },
    /// The expansion budget ran out first
    BudgetExhausted { expansions: usize },
}

struct SearchNode {
    state: WorldState,
    parent: Option<usize>,
    /// (catalog index, step cost) that produced this node
    via: Option<(usize, f32)>,
    depth: usize,
    cost: f32,
    indices: Vec<usize>,
}

type QueueKey = Reverse<(usize, OrderedFloat<f32>, Vec<usize>, usize)>;

type RouteKey = (TilePos, TilePos, Capabilities, bool);

/// Prices navigation edges, memoizing pathfinder calls within one search
struct RoutePricer<'a> {
    ctx: &'a SearchContext<'a>,
    cache: AHashMap<RouteKey, Option<f32>>,
}

impl<'a> RoutePricer<'a> {
    fn new(ctx: &'a SearchContext<'a>) -> Self {
        Self {
            ctx,
            cache: AHashMap::new(),
        }
    }

    fn price(&mut self, from: TilePos, to: TilePos, caps: Capabilities, avoid: bool) -> Option<f32> {
        let ctx = self.ctx;
        *self.cache.entry((from, to, caps, avoid)).or_insert_with(|| {
            let nav = NavigationContext::new(caps, ctx.navigation.clone())
                .avoiding_encounters(avoid)
                .with_water_substitute(ctx.water_substitute);
            find_path(ctx.graph, from, to, &nav).ok().map(|p| p.cost)
        })
    }
}

/// Find the shortest action sequence that makes every `desired` condition hold
///
/// An empty step list means the start state already satisfies the goal.
pub fn search_plan(
    start: &WorldState,
    desired: &[Condition],
    catalog: &ActionCatalog,
    ctx: &SearchContext<'_>,
    limits: SearchLimits,
) -> Result<SearchResult, SearchFailure> {
    let mut nodes = vec![SearchNode {
        state: start.clone(),
        parent: None,
        via: None,
        depth: 0,
        cost: 0.0,
        indices: Vec::new(),
    }];
    let mut open: BinaryHeap<QueueKey> = BinaryHeap::new();
    let mut closed: AHashSet<WorldState> = AHashSet::new();
    let mut pricer = RoutePricer::new(ctx);
    let mut expansions = 0usize;

    open.push(Reverse((0, OrderedFloat(0.0), Vec::new(), 0)));

    while let Some(Reverse((_, _, _, node_idx))) = open.pop() {
        let node = &nodes[node_idx];
        if closed.contains(&node.state) {
            continue;
        }
        if all_hold(desired, &node.state) {
            return Ok(SearchResult {
                steps: reconstruct(&nodes, node_idx, catalog),
                expansions,
            });
        }
        closed.insert(node.state.clone());

        if node.depth >= limits.max_depth {
            continue;
        }
        if expansions >= limits.max_expansions {
            return Err(SearchFailure::BudgetExhausted { expansions });
        }
        expansions += 1;

        let mut children = Vec::new();
        for (index, spec) in catalog.iter() {
            if !all_hold(&spec.preconditions, &node.state) {
                continue;
            }

            let step_cost = match &spec.action {
                Action::Navigate {
                    target,
                    avoid_encounters,
                } => {
                    let Some(from) = node.state.position else {
                        continue;
                    };
                    if from == *target {
                        continue;
                    }
                    match pricer.price(from, *target, node.state.capabilities, *avoid_encounters) {
                        Some(route) => spec.cost + route,
                        None => continue,
                    }
                }
                _ => spec.cost,
            };

            let mut next = node.state.clone();
            apply_all(&spec.all_effects(), &mut next);
            if next == node.state || closed.contains(&next) {
                continue;
            }

            let mut indices = node.indices.clone();
            indices.push(index);
            children.push(SearchNode {
                state: next,
                parent: Some(node_idx),
                via: Some((index, step_cost)),
                depth: node.depth + 1,
                cost: node.cost + step_cost,
                indices,
            });
        }

        for child in children {
            let key = (
                child.depth,
                OrderedFloat(child.cost),
                child.indices.clone(),
                nodes.len(),
            );
            nodes.push(child);
            open.push(Reverse(key));
        }
    }

    Err(SearchFailure::NoPlan { expansions })
}

fn reconstruct(nodes: &[SearchNode], mut idx: usize, catalog: &ActionCatalog) -> Vec<PlannedStep> {
    let mut steps = Vec::new();
    while let Some(parent) = nodes[idx].parent {
        if let Some((index, cost)) = nodes[idx].via {
            if let Some(spec) = catalog.get(index) {
                steps.push(PlannedStep::from_spec(index, spec, cost));
            }
        }
        idx = parent;
    }
    steps.reverse();
    steps
}
