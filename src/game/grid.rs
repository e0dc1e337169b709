//! The staggered grid that holds all resting bubbles.
//!
//! Uses a HashMap for sparse storage - only occupied cells are stored.
//! Each slot keeps the bubble's color alongside its entity so the
//! connectivity traversals can run as pure functions over the grid.

use bevy::prelude::*;
use std::collections::{HashMap, HashSet};

use super::{
    bubble::BubbleColor,
    cell::{BUBBLE_DIAMETER, GridCell},
};

pub(super) fn plugin(app: &mut App) {
    app.init_resource::<BubbleGrid>();
    app.register_type::<BubbleGrid>();
}

/// One occupied cell: the resting bubble's entity and color.
#[derive(Debug, Clone, Copy)]
pub struct BubbleSlot {
    pub entity: Entity,
    pub color: BubbleColor,
}

/// The main grid resource holding all resting bubbles.
#[derive(Resource, Debug, Default, Reflect)]
#[reflect(Resource)]
pub struct BubbleGrid {
    #[reflect(ignore)]
    cells: HashMap<GridCell, BubbleSlot>,
}

impl BubbleGrid {
    #[allow(dead_code)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if a cell is occupied.
    pub fn is_occupied(&self, cell: GridCell) -> bool {
        self.cells.contains_key(&cell)
    }

    /// Get the slot at a cell, if any.
    pub fn get(&self, cell: GridCell) -> Option<BubbleSlot> {
        self.cells.get(&cell).copied()
    }

    /// Get just the color at a cell, if any.
    pub fn color_at(&self, cell: GridCell) -> Option<BubbleColor> {
        self.cells.get(&cell).map(|slot| slot.color)
    }

    /// Insert a bubble at a cell.
    ///
    /// Returns the previous slot if the cell was occupied; landing always goes
    /// through [`Self::closest_empty_cell`], so that should never happen.
    pub fn insert(&mut self, cell: GridCell, entity: Entity, color: BubbleColor) -> Option<BubbleSlot> {
        self.cells.insert(cell, BubbleSlot { entity, color })
    }

    /// Remove a bubble from a cell, returning its slot if it existed.
    pub fn remove(&mut self, cell: GridCell) -> Option<BubbleSlot> {
        self.cells.remove(&cell)
    }

    /// Re-color the bubble at a cell in place (rainbow resolution).
    pub fn recolor(&mut self, cell: GridCell, color: BubbleColor) {
        if let Some(slot) = self.cells.get_mut(&cell) {
            slot.color = color;
        }
    }

    /// Clear all bubbles from the grid.
    pub fn clear(&mut self) {
        self.cells.clear();
    }

    /// Number of bubbles in the grid.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Check if the grid is empty.
    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Iterate over all occupied cells.
    pub fn iter(&self) -> impl Iterator<Item = (GridCell, BubbleSlot)> + '_ {
        self.cells.iter().map(|(cell, slot)| (*cell, *slot))
    }

    /// All occupied cell coordinates.
    pub fn coords(&self) -> impl Iterator<Item = GridCell> + '_ {
        self.cells.keys().copied()
    }

    /// Number of bubbles a match could still clear (everything but gray).
    pub fn remaining_colored(&self) -> usize {
        self.cells
            .values()
            .filter(|slot| !slot.color.is_obstacle())
            .count()
    }

    /// All cells in the anchor row (row 0).
    pub fn anchor_row(&self) -> Vec<GridCell> {
        self.cells.keys().filter(|c| c.row == 0).copied().collect()
    }

    /// Lowest occupied row, if any bubble remains.
    pub fn lowest_row(&self) -> Option<i32> {
        self.cells.keys().map(|c| c.row).max()
    }

    /// Bottom edge of the lowest bubble in playfield pixels, descent applied.
    pub fn lowest_bottom_edge(&self, descent_y: f32) -> Option<f32> {
        self.lowest_row()
            .map(|row| row as f32 * BUBBLE_DIAMETER + BUBBLE_DIAMETER + descent_y)
    }

    /// Find the closest empty cell to a playfield position.
    ///
    /// Used to snap a landing projectile onto the lattice. The target cell is
    /// taken if it is free and in bounds; otherwise the search expands outward
    /// through neighbor rings until a free in-bounds cell turns up. Guarantees
    /// a landing never overwrites a resting bubble.
    pub fn closest_empty_cell(&self, pos: Vec2, descent_y: f32) -> Option<GridCell> {
        let target = GridCell::from_pixel_with_offset(pos, descent_y);

        if target.in_bounds() && !self.is_occupied(target) {
            return Some(target);
        }

        let mut checked = HashSet::new();
        let mut to_check = vec![target];

        while !to_check.is_empty() {
            let mut next_ring = Vec::new();

            for cell in to_check {
                if !checked.insert(cell) {
                    continue;
                }

                if cell.in_bounds() && !self.is_occupied(cell) {
                    return Some(cell);
                }

                for neighbor in cell.neighbors() {
                    if !checked.contains(&neighbor) {
                        next_ring.push(neighbor);
                    }
                }
            }

            to_check = next_ring;

            // Safety limit to prevent unbounded ring growth on a full field.
            if checked.len() > 1000 {
                break;
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_with(cells: &[(i32, i32, BubbleColor)]) -> BubbleGrid {
        let mut grid = BubbleGrid::new();
        for &(row, col, color) in cells {
            grid.insert(GridCell::new(row, col), Entity::PLACEHOLDER, color);
        }
        grid
    }

    #[test]
    fn snap_prefers_the_nearest_free_cell() {
        let grid = grid_with(&[]);
        let cell = GridCell::new(3, 4);
        let snapped = grid.closest_empty_cell(cell.to_pixel(), 0.0);
        assert_eq!(snapped, Some(cell));
    }

    #[test]
    fn snap_never_lands_on_an_occupied_cell() {
        let grid = grid_with(&[(0, 5, BubbleColor::Red)]);
        let taken = GridCell::new(0, 5);
        let snapped = grid.closest_empty_cell(taken.to_pixel(), 0.0);
        assert!(snapped.is_some());
        assert_ne!(snapped, Some(taken));
        // Snapping is still adjacent to the contact point.
        assert!(taken.neighbors().contains(&snapped.unwrap()));
    }

    #[test]
    fn snap_accounts_for_descent() {
        let grid = grid_with(&[]);
        let cell = GridCell::new(2, 2);
        let snapped = grid.closest_empty_cell(cell.to_pixel_with_offset(80.0), 80.0);
        assert_eq!(snapped, Some(cell));
    }

    #[test]
    fn lowest_bottom_edge_tracks_descent() {
        let grid = grid_with(&[(0, 0, BubbleColor::Red), (4, 2, BubbleColor::Blue)]);
        // Row 4 center y = 180, bottom edge = 200.
        assert_eq!(grid.lowest_bottom_edge(0.0), Some(200.0));
        assert_eq!(grid.lowest_bottom_edge(50.0), Some(250.0));
        assert_eq!(BubbleGrid::new().lowest_bottom_edge(0.0), None);
    }

    #[test]
    fn remaining_colored_ignores_gray() {
        let grid = grid_with(&[
            (0, 0, BubbleColor::Red),
            (0, 1, BubbleColor::Gray),
            (0, 2, BubbleColor::Blue),
        ]);
        assert_eq!(grid.remaining_colored(), 2);
        assert_eq!(grid.len(), 3);
    }
}
