//! Catch probability
//!
//! p = min(1, (1 − ⅔·hp) · catch_rate · ball · status / 255)

use serde::{Deserialize, Serialize};

use super::constants::{CATCH_RATE_DIVISOR, DEFAULT_CATCH_RATE};
use super::pokemon::{Pokemon, StatusCondition};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ball {
    Poke,
    Great,
    Ultra,
    Master,
}

impl Ball {
    pub const ALL: [Ball; 4] = [Ball::Poke, Ball::Great, Ball::Ultra, Ball::Master];

    pub fn multiplier(&self) -> f32 {
        match self {
            Ball::Poke => 1.0,
            Ball::Great => 1.5,
            Ball::Ultra => 2.0,
            Ball::Master => f32::INFINITY,
        }
    }

    /// Bag item name
    pub fn item_name(&self) -> &'static str {
        match self {
            Ball::Poke => "poke_ball",
            Ball::Great => "great_ball",
            Ball::Ultra => "ultra_ball",
            Ball::Master => "master_ball",
        }
    }
}

pub fn status_multiplier(status: StatusCondition) -> f32 {
    match status {
        StatusCondition::Sleep | StatusCondition::Freeze => 2.0,
        StatusCondition::Paralysis | StatusCondition::Poison | StatusCondition::Burn => 1.5,
        StatusCondition::None => 1.0,
    }
}

/// Probability that one throw of `ball` catches `target`
pub fn catch_probability(target: &Pokemon, ball: Ball) -> f32 {
    if ball == Ball::Master {
        return 1.0;
    }
    let hp = target.hp.clamp(0.0, 1.0);
    let rate = f32::from(target.catch_rate.unwrap_or(DEFAULT_CATCH_RATE));
    let p = (1.0 - 2.0 / 3.0 * hp) * rate * ball.multiplier() * status_multiplier(target.status)
        / CATCH_RATE_DIVISOR;
    p.clamp(0.0, 1.0)
}

/// Strongest ball with a non-zero count; Master balls are saved
pub fn best_ball(balls: &[(Ball, u32)]) -> Option<Ball> {
    balls
        .iter()
        .filter(|(ball, count)| *count > 0 && *ball != Ball::Master)
        .map(|(ball, _)| *ball)
        .max()
}
