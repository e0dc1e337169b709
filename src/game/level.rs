//! Per-level difficulty configuration.
//!
//! 20 levels with a non-decreasing difficulty curve: more colors, more rows,
//! faster descent, then obstacles, power-ups, and one timed level.

use super::cell::{GRID_COLUMNS, GridCell};

/// The final level of the game.
pub const LAST_LEVEL: u32 = 20;

/// Immutable parameters for a single level.
#[derive(Debug, Clone, Copy)]
pub struct LevelConfig {
    /// Number of distinct playable hues (2..=8).
    pub colors: usize,
    /// Descent speed in pixels per descent tick; 0 means a static grid.
    pub speed: f32,
    /// Number of initially populated rows.
    pub rows: i32,
    /// Whether gray obstacle bubbles are seeded into the grid.
    pub has_obstacles: bool,
    /// Whether rainbow/bomb/freeze bubbles appear (in the grid and the queue).
    pub has_power_ups: bool,
    /// Optional time limit in seconds.
    pub time_limit: Option<f32>,
    /// Difficulty marker only; descent speed already captures the motion.
    pub moving_rows: bool,
}

/// A level configuration that cannot produce a playable board.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LevelConfigError {
    /// No rows to populate, so the win condition would fire at init.
    NoInitialBubbles,
    /// Palette size outside the supported 2..=8 range.
    PaletteSize(usize),
    /// Descent cannot run backwards.
    NegativeSpeed(f32),
    /// A configured time limit must leave time to play.
    NonPositiveTimeLimit(f32),
}

impl std::fmt::Display for LevelConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoInitialBubbles => write!(f, "level starts with zero bubbles"),
            Self::PaletteSize(n) => write!(f, "palette size {n} outside 2..=8"),
            Self::NegativeSpeed(s) => write!(f, "negative descent speed {s}"),
            Self::NonPositiveTimeLimit(t) => write!(f, "non-positive time limit {t}"),
        }
    }
}

impl std::error::Error for LevelConfigError {}

impl LevelConfig {
    /// Look up the config for a 1-based level number, clamped to the table.
    pub fn get(level: u32) -> &'static LevelConfig {
        let index = (level.clamp(1, LAST_LEVEL) - 1) as usize;
        &LEVELS[index]
    }

    /// Nominal bubble total for star scoring: rows times full grid width.
    pub fn nominal_total(&self) -> u32 {
        (self.rows * GRID_COLUMNS).max(0) as u32
    }

    /// Actual number of bubbles placed at init (odd rows are one short).
    pub fn initial_bubble_count(&self) -> u32 {
        (0..self.rows.max(0))
            .map(|row| GridCell::columns_in_row(row) as u32)
            .sum()
    }

    /// Check the config before building a board from it.
    pub fn validate(&self) -> Result<(), LevelConfigError> {
        if self.initial_bubble_count() == 0 {
            return Err(LevelConfigError::NoInitialBubbles);
        }
        if !(2..=8).contains(&self.colors) {
            return Err(LevelConfigError::PaletteSize(self.colors));
        }
        if self.speed < 0.0 {
            return Err(LevelConfigError::NegativeSpeed(self.speed));
        }
        if let Some(limit) = self.time_limit
            && limit <= 0.0
        {
            return Err(LevelConfigError::NonPositiveTimeLimit(limit));
        }
        Ok(())
    }
}

/// Shorthand for the table below.
const fn level(
    colors: usize,
    speed: f32,
    rows: i32,
    has_obstacles: bool,
    has_power_ups: bool,
    time_limit: Option<f32>,
    moving_rows: bool,
) -> LevelConfig {
    LevelConfig {
        colors,
        speed,
        rows,
        has_obstacles,
        has_power_ups,
        time_limit,
        moving_rows,
    }
}

/// All 20 level configs, easiest to hardest.
pub const LEVELS: [LevelConfig; 20] = [
    level(3, 0.0, 4, false, false, None, false),
    level(4, 0.0, 5, false, false, None, false),
    level(4, 0.0, 5, false, false, None, false),
    level(5, 0.1, 6, false, false, None, false),
    level(5, 0.2, 6, false, false, None, true),
    level(5, 0.2, 7, false, false, None, false),
    level(6, 0.3, 7, false, true, None, false),
    level(6, 0.4, 7, false, true, None, false),
    level(6, 0.4, 8, true, true, None, false),
    level(6, 0.5, 8, true, true, None, false),
    level(7, 0.5, 8, true, true, None, false),
    level(7, 0.6, 9, true, true, None, false),
    level(7, 0.6, 9, true, true, None, true),
    level(7, 0.7, 9, true, true, Some(120.0), false),
    level(8, 0.7, 10, true, true, None, false),
    level(8, 0.8, 10, true, true, None, false),
    level(8, 0.8, 10, true, true, None, true),
    level(8, 0.9, 11, true, true, None, true),
    level(8, 0.9, 11, true, true, None, true),
    level(8, 1.0, 12, true, true, None, true),
];
