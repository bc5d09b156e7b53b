//! Mode dwell tracking and escalation
//!
//! The tracker follows the mode history: every entry starts a dwell
//! counter and every exit folds the finished dwell into the mode's profile.
//! While a mode is current its dwell is compared with
//! `max(mean × threshold_factor, category default)`. The first breach of a
//! dwell raises the ladder one tier and every further
//! `escalation_step_ticks` of sustained breach raises it again.

use serde::{Deserialize, Serialize};

use super::escalation::{AnomalyEvent, EscalationTier};
use super::profile::ProfileStore;
use crate::core::config::{AnomalyConfig, DeescalationPolicy};
use crate::core::types::Tick;
use crate::state::{Mode, TransitionRecord};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct Dwell {
    mode: Mode,
    entered_at: Tick,
    /// Threshold fixed at entry so a profile update mid-dwell cannot move it
    threshold: f64,
    breach: Option<Breach>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct Breach {
    since: Tick,
    /// Tier reached by the first breach of this dwell
    base: EscalationTier,
}

/// Summary of a finished dwell
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DwellExit {
    pub mode: Mode,
    pub dwell: Tick,
    pub threshold: f64,
    pub within_threshold: bool,
}

#[derive(Debug, Clone)]
pub struct DurationTracker {
    config: AnomalyConfig,
    dwell: Option<Dwell>,
    tier: EscalationTier,
    last_event: Option<AnomalyEvent>,
}

impl DurationTracker {
    pub fn new(config: AnomalyConfig) -> Self {
        Self {
            config,
            dwell: None,
            tier: EscalationTier::None,
            last_event: None,
        }
    }

    pub fn tier(&self) -> EscalationTier {
        self.tier
    }

    pub fn last_event(&self) -> Option<&AnomalyEvent> {
        self.last_event.as_ref()
    }

    pub fn current_mode(&self) -> Option<Mode> {
        self.dwell.map(|d| d.mode)
    }

    pub fn dwell(&self, now: Tick) -> Option<Tick> {
        self.dwell.map(|d| now.saturating_sub(d.entered_at))
    }

    /// Dwell threshold for `mode` in ticks
    pub fn threshold_ticks(&self, mode: Mode, store: &ProfileStore) -> f64 {
        let default = self.config.default_threshold_ticks(mode.category());
        match store.get(mode) {
            Some(profile) if profile.is_learned() => {
                (profile.mean * self.config.threshold_factor).max(default)
            }
            _ => default,
        }
    }

    /// Feed one accepted transition
    pub fn record_transition(
        &mut self,
        record: &TransitionRecord,
        store: &mut ProfileStore,
    ) -> Option<DwellExit> {
        self.enter(record.to, record.tick, store)
    }

    /// Close the current dwell (if any) and start one for `mode`
    pub fn enter(&mut self, mode: Mode, tick: Tick, store: &mut ProfileStore) -> Option<DwellExit> {
        let exit = self.dwell.take().map(|dwell| {
            let length = tick.saturating_sub(dwell.entered_at);
            let profile = store.record(dwell.mode, length as f64, self.config.smoothing_alpha);
            tracing::debug!(
                mode = %dwell.mode,
                dwell = length,
                mean = profile.mean,
                "Mode exit recorded"
            );
            DwellExit {
                mode: dwell.mode,
                dwell: length,
                threshold: dwell.threshold,
                within_threshold: (length as f64) <= dwell.threshold,
            }
        });

        if let Some(exit) = &exit {
            let reset = match self.config.deescalation {
                DeescalationPolicy::OnModeExit => exit.within_threshold,
                DeescalationPolicy::OnAnyExit => true,
            };
            if reset && self.tier != EscalationTier::None {
                tracing::info!(from = %self.tier, mode = %exit.mode, "Escalation reset");
                self.tier = EscalationTier::None;
            }
        }

        self.dwell = Some(Dwell {
            mode,
            entered_at: tick,
            threshold: self.threshold_ticks(mode, store),
            breach: None,
        });
        exit
    }

    /// Check the current dwell; returns an event whenever the tier rises
    pub fn observe(&mut self, now: Tick) -> Option<AnomalyEvent> {
        let dwell = self.dwell.as_mut()?;
        let elapsed = now.saturating_sub(dwell.entered_at);
        if (elapsed as f64) <= dwell.threshold {
            return None;
        }

        let target = match dwell.breach {
            None => {
                let base = self.tier.next();
                dwell.breach = Some(Breach { since: now, base });
                base
            }
            Some(breach) => {
                let step = self.config.escalation_step_ticks.max(1);
                let steps = now.saturating_sub(breach.since) / step;
                EscalationTier::from_level(u64::from(breach.base.level()) + steps)
            }
        };

        if target <= self.tier {
            return None;
        }
        self.tier = target;

        let event = AnomalyEvent {
            mode: dwell.mode,
            observed: elapsed,
            threshold: dwell.threshold,
            tier: target,
            tick: now,
        };
        tracing::warn!(%event, "Dwell anomaly");
        self.last_event = Some(event.clone());
        Some(event)
    }

    /// Drop back to None without touching the dwell
    pub fn reset(&mut self) {
        self.tier = EscalationTier::None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Category;

    fn tracker() -> DurationTracker {
        DurationTracker::new(AnomalyConfig::default())
    }

    #[test]
    fn test_default_thresholds() {
        let t = tracker();
        let store = ProfileStore::new();
        assert_eq!(t.threshold_ticks(Mode::BattleActionMenu, &store), 300.0);
        assert_eq!(t.threshold_ticks(Mode::DialogNpc, &store), 60.0);
        assert_eq!(t.threshold_ticks(Mode::OverworldWalking, &store), 300.0);
    }

    #[test]
    fn test_learned_mean_can_raise_threshold() {
        let t = tracker();
        let mut store = ProfileStore::new();
        store.record(Mode::DialogCutscene, 50.0, 0.3);
        assert_eq!(t.threshold_ticks(Mode::DialogCutscene, &store), 100.0);
        store.record(Mode::DialogNpc, 5.0, 0.3);
        assert_eq!(t.threshold_ticks(Mode::DialogNpc, &store), 60.0);
    }

    #[test]
    fn test_breach_climbs_ladder() {
        let mut t = tracker();
        let mut store = ProfileStore::new();
        t.enter(Mode::DialogNpc, 0, &mut store);

        assert!(t.observe(60).is_none());
        let first = t.observe(61).unwrap();
        assert_eq!(first.tier, EscalationTier::EnhancedMonitoring);
        assert_eq!(first.observed, 61);

        assert!(t.observe(90).is_none());
        assert_eq!(t.observe(91).unwrap().tier, EscalationTier::PlanSimplification);
        assert_eq!(t.observe(121).unwrap().tier, EscalationTier::EmergencyProtocol);
        assert_eq!(t.observe(151).unwrap().tier, EscalationTier::ResetCondition);
        assert!(t.observe(500).is_none());
        assert_eq!(t.tier(), EscalationTier::ResetCondition);
    }

    #[test]
    fn test_exit_within_threshold_resets() {
        let mut t = tracker();
        let mut store = ProfileStore::new();
        t.enter(Mode::DialogNpc, 0, &mut store);
        t.observe(70);
        assert_eq!(t.tier(), EscalationTier::EnhancedMonitoring);

        // Late exit keeps the tier under the default policy
        let exit = t.enter(Mode::OverworldIdle, 80, &mut store).unwrap();
        assert!(!exit.within_threshold);
        assert_eq!(t.tier(), EscalationTier::EnhancedMonitoring);
        assert_eq!(store.get(Mode::DialogNpc).unwrap().mean, 80.0);

        let exit = t.enter(Mode::OverworldWalking, 100, &mut store).unwrap();
        assert!(exit.within_threshold);
        assert_eq!(t.tier(), EscalationTier::None);
    }

    #[test]
    fn test_any_exit_policy() {
        let mut config = AnomalyConfig::default();
        config.deescalation = DeescalationPolicy::OnAnyExit;
        let mut t = DurationTracker::new(config);
        let mut store = ProfileStore::new();
        t.enter(Mode::DialogNpc, 0, &mut store);
        t.observe(70);
        t.enter(Mode::OverworldIdle, 80, &mut store);
        assert_eq!(t.tier(), EscalationTier::None);
    }

    #[test]
    fn test_second_breach_starts_above_current_tier() {
        let mut t = tracker();
        let mut store = ProfileStore::new();
        t.enter(Mode::DialogNpc, 0, &mut store);
        t.observe(61);
        t.enter(Mode::DialogSign, 100, &mut store);
        let event = t.observe(161).unwrap();
        assert_eq!(event.tier, EscalationTier::PlanSimplification);
        assert_eq!(event.mode.category(), Category::Dialog);
    }
}
