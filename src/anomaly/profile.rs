//! Learned dwell-time profiles
//!
//! Profiles are keyed by the stable mode name and serialized as a plain
//! `mode-name -> profile` JSON object. Names the current catalog does not
//! know are carried through untouched.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::core::error::Result;
use crate::state::Mode;

/// Exponentially smoothed dwell time of one mode, in ticks
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DurationProfile {
    pub mean: f64,
    pub variance: f64,
    pub samples: u64,
}

impl DurationProfile {
    /// Fold one observed dwell into the profile
    ///
    /// The first sample seeds the mean; later ones follow
    /// `mean' = α·x + (1−α)·mean` with the variance smoothed alongside.
    pub fn update(&mut self, observed: f64, alpha: f64) {
        if self.samples == 0 {
            self.mean = observed;
            self.variance = 0.0;
        } else {
            let delta = observed - self.mean;
            self.mean += alpha * delta;
            self.variance = (1.0 - alpha) * (self.variance + alpha * delta * delta);
        }
        self.samples += 1;
    }

    pub fn std_dev(&self) -> f64 {
        self.variance.max(0.0).sqrt()
    }

    pub fn is_learned(&self) -> bool {
        self.samples > 0
    }
}

/// All profiles of one pilot instance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileStore {
    profiles: BTreeMap<String, DurationProfile>,
}

impl ProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, mode: Mode) -> Option<&DurationProfile> {
        self.profiles.get(mode.name())
    }

    /// Record one completed dwell and return the updated profile
    pub fn record(&mut self, mode: Mode, observed: f64, alpha: f64) -> DurationProfile {
        let profile = self.profiles.entry(mode.name().to_string()).or_default();
        profile.update(observed, alpha);
        *profile
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DurationProfile)> {
        self.profiles.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load persisted profiles; a missing file yields an empty store
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "No profile file, starting empty");
            return Ok(Self::new());
        }
        let store = Self::from_json(&fs::read_to_string(path)?)?;
        tracing::info!(path = %path.display(), profiles = store.len(), "Loaded duration profiles");
        Ok(store)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        tracing::debug!(path = %path.display(), profiles = self.len(), "Saved duration profiles");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_sample_seeds_mean() {
        let mut profile = DurationProfile::default();
        profile.update(40.0, 0.3);
        assert_eq!(profile.mean, 40.0);
        assert_eq!(profile.samples, 1);
    }

    #[test]
    fn test_smoothing_formula() {
        let mut profile = DurationProfile::default();
        profile.update(10.0, 0.3);
        profile.update(20.0, 0.3);
        // 0.3 * 20 + 0.7 * 10
        assert!((profile.mean - 13.0).abs() < 1e-9);
        assert!(profile.variance > 0.0);
    }

    #[test]
    fn test_store_json_keys_are_mode_names() {
        let mut store = ProfileStore::new();
        store.record(Mode::BattleActionMenu, 12.0, 0.3);
        let json = store.to_json().unwrap();
        assert!(json.contains("\"battle.action_menu\""));

        let restored = ProfileStore::from_json(&json).unwrap();
        assert_eq!(restored, store);
        assert_eq!(restored.get(Mode::BattleActionMenu).unwrap().mean, 12.0);
    }

    #[test]
    fn test_unknown_names_survive() {
        let store = ProfileStore::from_json(
            r#"{ "legacy.mode": { "mean": 3.0, "variance": 0.0, "samples": 2 } }"#,
        )
        .unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.to_json().unwrap().contains("legacy.mode"));
    }
}
