//! Combat heuristic constants - all tunable values in one place
//!
//! Scoring bonuses are ADDITIVE on top of the multiplicative move score.
//! Everything the engine weighs is named here; nothing is learned.

// Damage model
pub const STAB_MULTIPLIER: f32 = 1.5;
pub const CRITICAL_MULTIPLIER: f32 = 2.0;
pub const MIN_RANDOM_FACTOR: f32 = 0.85;
pub const MAX_RANDOM_FACTOR: f32 = 1.0;
pub const MEAN_RANDOM_FACTOR: f32 = (MIN_RANDOM_FACTOR + MAX_RANDOM_FACTOR) / 2.0;

// Stat estimation when perception only reports level
pub const ESTIMATED_BASE_STAT: u32 = 70;
pub const ESTIMATED_STAT_BONUS: u32 = 5;
pub const ESTIMATED_HP_BONUS: u32 = 10;

// Move scoring (ADDITIVE bonuses)
pub const POWER_SCALE: f32 = 10.0;
pub const STAB_BONUS: f32 = 2.0;
pub const KNOCKOUT_BONUS: f32 = 5.0;
pub const PRIORITY_BONUS: f32 = 1.0;
pub const COVERAGE_BONUS_PER_TARGET: f32 = 0.1;

// Struggle: used when no move has PP left
pub const STRUGGLE_POWER: u16 = 50;

// Switch evaluation
pub const DEFENSIVE_WEIGHT: f32 = 10.0;
/// Power assumed for each of an opponent's types when its moves are unknown
pub const ASSUMED_MOVE_POWER: u16 = 60;

// Trainer prediction
pub const TRAINER_ITEM_HP_THRESHOLD: f32 = 0.25;

// Capture
pub const CATCH_RATE_DIVISOR: f32 = 255.0;
pub const DEFAULT_CATCH_RATE: u8 = 45;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_range_reasonable() {
        assert!(MIN_RANDOM_FACTOR > 0.0 && MIN_RANDOM_FACTOR < MAX_RANDOM_FACTOR);
        assert!(MEAN_RANDOM_FACTOR > MIN_RANDOM_FACTOR && MEAN_RANDOM_FACTOR < MAX_RANDOM_FACTOR);
    }

    #[test]
    fn test_bonuses_positive() {
        assert!(STAB_BONUS > 0.0);
        assert!(KNOCKOUT_BONUS > STAB_BONUS);
        assert!(PRIORITY_BONUS > 0.0);
        assert!(COVERAGE_BONUS_PER_TARGET > 0.0 && COVERAGE_BONUS_PER_TARGET < 1.0);
    }

    #[test]
    fn test_item_threshold_is_fraction() {
        assert!(TRAINER_ITEM_HP_THRESHOLD > 0.0 && TRAINER_ITEM_HP_THRESHOLD < 1.0);
    }
}
