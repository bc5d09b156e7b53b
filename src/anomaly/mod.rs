//! Mode-duration anomaly detection
//!
//! - `profile`: learned dwell times per mode and their JSON store
//! - `escalation`: the five-tier ladder and anomaly events
//! - `tracker`: dwell counting, threshold checks and tier changes

pub mod escalation;
pub mod profile;
pub mod tracker;

pub use escalation::{AnomalyEvent, EscalationTier};
pub use profile::{DurationProfile, ProfileStore};
pub use tracker::{DurationTracker, DwellExit};
