//! Hierarchical state machine over the game-mode catalog
//!
//! - `mode`: the 69 modes and their 8 categories
//! - `transitions`: the precomputed legality table
//! - `machine`: the tracker holding the current mode and history

pub mod machine;
pub mod mode;
pub mod transitions;

pub use machine::{StateMachine, TransitionRecord, TransitionTrigger};
pub use mode::{Category, EmergencyKind, Mode};
pub use transitions::TransitionTable;
