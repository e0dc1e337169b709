//! Staggered grid coordinates for the bubble field.
//!
//! The field uses offset coordinates: row 0 is the ceiling (the anchor row),
//! rows increase downward, and odd rows are shifted right by one bubble
//! radius, producing the classic bubble-shooter packing. Even rows hold
//! [`GRID_COLUMNS`] bubbles, odd rows one fewer.
//!
//! Playfield space is y-down (origin at the top-left corner of the field);
//! the view layer converts to world coordinates for rendering.

use bevy::prelude::*;
use serde::Serialize;

use super::session::GamePhase;

pub(super) fn plugin(app: &mut App) {
    app.register_type::<GridCell>();
    app.register_type::<DescentOffset>();
    app.init_resource::<DescentOffset>();
    app.add_systems(OnEnter(GamePhase::Playing), reset_descent_offset);
}

/// Radius of a bubble in pixels.
pub const BUBBLE_RADIUS: f32 = 20.0;

/// Diameter of a bubble in pixels (one grid step in both axes).
pub const BUBBLE_DIAMETER: f32 = BUBBLE_RADIUS * 2.0;

/// Number of columns in an even (unshifted) row. Odd rows hold one fewer.
pub const GRID_COLUMNS: i32 = 11;

/// Width of the playfield in pixels.
pub const FIELD_WIDTH: f32 = 600.0;

/// Height of the playfield in pixels.
pub const FIELD_HEIGHT: f32 = 800.0;

/// Resource tracking how far the whole grid has descended, in pixels.
///
/// Cells are authoritative; descent only shifts derived pixel positions.
#[derive(Resource, Debug, Clone, Default, Reflect)]
#[reflect(Resource)]
pub struct DescentOffset {
    pub y: f32,
}

/// Reset the descent when a level starts.
fn reset_descent_offset(mut offset: ResMut<DescentOffset>) {
    offset.y = 0.0;
    info!("Descent offset reset");
}

/// A cell on the staggered bubble grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Component, Reflect, Serialize)]
#[reflect(Component)]
pub struct GridCell {
    /// Row, 0 at the ceiling, increasing downward.
    pub row: i32,
    /// Column within the row.
    pub col: i32,
}

impl GridCell {
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// Number of columns in the given row (odd rows are one short).
    pub const fn columns_in_row(row: i32) -> i32 {
        if row % 2 == 0 {
            GRID_COLUMNS
        } else {
            GRID_COLUMNS - 1
        }
    }

    /// Whether this cell is a valid resting position on the field.
    pub fn in_bounds(&self) -> bool {
        self.row >= 0 && self.col >= 0 && self.col < Self::columns_in_row(self.row)
    }

    /// Horizontal stagger for this cell's row: odd rows shift right by one radius.
    fn row_offset(row: i32) -> f32 {
        if row % 2 == 0 { 0.0 } else { BUBBLE_RADIUS }
    }

    /// Convert to the bubble's center in playfield pixels (before descent).
    pub fn to_pixel(&self) -> Vec2 {
        Vec2::new(
            self.col as f32 * BUBBLE_DIAMETER + BUBBLE_RADIUS + Self::row_offset(self.row),
            self.row as f32 * BUBBLE_DIAMETER + BUBBLE_RADIUS,
        )
    }

    /// Convert to pixels with the current descent applied.
    pub fn to_pixel_with_offset(&self, descent_y: f32) -> Vec2 {
        self.to_pixel() + Vec2::new(0.0, descent_y)
    }

    /// Nearest cell to a playfield position (before descent).
    ///
    /// Rounding is deterministic and idempotent: mapping a cell to pixels and
    /// back always yields the same cell.
    pub fn from_pixel(pos: Vec2) -> Self {
        let row = ((pos.y - BUBBLE_RADIUS) / BUBBLE_DIAMETER).round() as i32;
        let col =
            ((pos.x - BUBBLE_RADIUS - Self::row_offset(row)) / BUBBLE_DIAMETER).round() as i32;
        Self { row, col }
    }

    /// Nearest cell to a playfield position with the current descent applied.
    pub fn from_pixel_with_offset(pos: Vec2, descent_y: f32) -> Self {
        Self::from_pixel(pos - Vec2::new(0.0, descent_y))
    }

    /// The 6 neighboring cells in the staggered packing.
    ///
    /// Offsets depend on row parity: odd rows are shifted right, so their
    /// diagonal neighbors sit at different column offsets.
    pub fn neighbors(&self) -> [GridCell; 6] {
        let offsets: [(i32, i32); 6] = if self.row % 2 == 0 {
            [(-1, -1), (-1, 0), (0, -1), (0, 1), (1, -1), (1, 0)]
        } else {
            [(-1, 0), (-1, 1), (0, -1), (0, 1), (1, 0), (1, 1)]
        };
        offsets.map(|(dr, dc)| GridCell::new(self.row + dr, self.col + dc))
    }
}

impl std::fmt::Display for GridCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}
