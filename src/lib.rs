//! Pokepilot - decision and planning core for autonomous turn-based RPG play
//!
//! One `pilot::Pilot` turns each classified screen state into exactly one
//! input command. Inside it:
//!
//! - `state`: hierarchical state machine over the game-mode catalog
//! - `planner`: goal-oriented action planning and step execution
//! - `navigation`: tile graph and A* pathfinder
//! - `combat`: type chart, damage model and battle decisions
//! - `anomaly`: mode dwell tracking and the escalation ladder

pub mod anomaly;
pub mod combat;
pub mod core;
pub mod navigation;
pub mod pilot;
pub mod planner;
pub mod state;
