//! Immutable per-session game parameters

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BOARD_WIDTH: i32 = 100;
pub const DEFAULT_BOARD_HEIGHT: i32 = 60;
pub const DEFAULT_DESIRED_APPLES: usize = 10;
pub const DEFAULT_OBSTACLE_COUNT: usize = 5;
pub const DEFAULT_MIN_SNAKES: usize = 2;
pub const DEFAULT_START_SIZE: usize = 4;
pub const DEFAULT_GROWTH_BONUS: usize = 4;
pub const DEFAULT_TICK_MS: u64 = 250;
pub const DEFAULT_BOT_STRAIGHT_PROBABILITY: f64 = 0.1;

/// Obstacles are 2 cells wide and 3 tall.
pub const OBSTACLE_WIDTH: i32 = 2;
pub const OBSTACLE_HEIGHT: i32 = 3;

const MIN_BOARD_SIDE: i32 = 8;

/// Fixed rules for one session. The authority ships this in every snapshot
/// so a replica steps with exactly the same parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    pub width: i32,
    pub height: i32,
    /// Apples are topped back up to this count every turn.
    pub desired_apples: usize,
    pub obstacle_count: usize,
    /// Bots are added while fewer snakes than this are alive.
    pub min_snakes: usize,
    pub start_size: usize,
    pub growth_bonus: usize,
    pub tick_duration_ms: u64,
    /// Chance that a bot ignores apples for a turn and keeps going straight.
    pub bot_straight_probability: f64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_BOARD_WIDTH,
            height: DEFAULT_BOARD_HEIGHT,
            desired_apples: DEFAULT_DESIRED_APPLES,
            obstacle_count: DEFAULT_OBSTACLE_COUNT,
            min_snakes: DEFAULT_MIN_SNAKES,
            start_size: DEFAULT_START_SIZE,
            growth_bonus: DEFAULT_GROWTH_BONUS,
            tick_duration_ms: DEFAULT_TICK_MS,
            bot_straight_probability: DEFAULT_BOT_STRAIGHT_PROBABILITY,
        }
    }
}

impl GameConfig {
    pub fn tick_duration(&self) -> Duration {
        Duration::from_millis(self.tick_duration_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width < MIN_BOARD_SIDE || self.height < MIN_BOARD_SIDE {
            return Err(ConfigError::BoardTooSmall {
                width: self.width,
                height: self.height,
                min: MIN_BOARD_SIDE,
            });
        }
        if self.start_size < 2 {
            return Err(ConfigError::StartSizeTooSmall(self.start_size));
        }
        if self.start_size as i32 > self.width.min(self.height) {
            return Err(ConfigError::StartSizeTooLarge {
                start_size: self.start_size,
                width: self.width,
                height: self.height,
            });
        }
        // Each obstacle gets its own vertical zone and needs room to be placed in it.
        if self.obstacle_count > 0 && self.width / (self.obstacle_count as i32) <= OBSTACLE_WIDTH {
            return Err(ConfigError::TooManyObstacles {
                count: self.obstacle_count,
                width: self.width,
            });
        }
        if !(0.0..=1.0).contains(&self.bot_straight_probability) {
            return Err(ConfigError::InvalidProbability(
                self.bot_straight_probability,
            ));
        }
        if self.tick_duration_ms == 0 {
            return Err(ConfigError::ZeroTickDuration);
        }
        Ok(())
    }
}
