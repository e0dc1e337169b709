//! Cluster detection - finding matching and floating bubbles.
//!
//! Uses flood fill (BFS) to find connected groups of same-colored bubbles and
//! to find bubbles with no path to the ceiling after a removal. Both
//! traversals are explicit worklist algorithms over the grid; nothing here
//! touches the ECS, so the resolution pipeline and the tests share one code
//! path.

use std::collections::{HashSet, VecDeque};

use super::{bubble::BubbleColor, cell::GridCell, grid::BubbleGrid};

/// Minimum cluster size to pop (match-3).
pub const MIN_CLUSTER_SIZE: usize = 3;

/// Find all connected bubbles matching `color`, starting from `start`.
///
/// The start cell is always part of the cluster; its color is taken from the
/// landing event rather than the grid. Gray obstacles never match and never
/// propagate, and gaps do not connect through.
pub fn find_cluster(grid: &BubbleGrid, start: GridCell, color: BubbleColor) -> Vec<GridCell> {
    let mut cluster = vec![start];
    let mut visited = HashSet::from([start]);
    let mut queue = VecDeque::new();

    for neighbor in start.neighbors() {
        if visited.insert(neighbor) {
            queue.push_back(neighbor);
        }
    }

    while let Some(cell) = queue.pop_front() {
        let Some(occupant) = grid.color_at(cell) else {
            continue;
        };
        if !occupant.matches(color) {
            continue;
        }

        cluster.push(cell);
        for neighbor in cell.neighbors() {
            if visited.insert(neighbor) {
                queue.push_back(neighbor);
            }
        }
    }

    cluster
}

/// Find all bubbles connected to the anchor row (row 0) through any adjacency.
///
/// Color is irrelevant here; a gray obstacle anchors its neighbors just as
/// well as a playable hue.
pub fn find_anchored(grid: &BubbleGrid) -> HashSet<GridCell> {
    let mut anchored: HashSet<GridCell> = grid.anchor_row().into_iter().collect();
    let mut queue: VecDeque<GridCell> = anchored.iter().copied().collect();

    while let Some(cell) = queue.pop_front() {
        for neighbor in cell.neighbors() {
            if grid.is_occupied(neighbor) && anchored.insert(neighbor) {
                queue.push_back(neighbor);
            }
        }
    }

    anchored
}

/// Find all bubbles with no path to the anchor row. Must run after every
/// removal batch; anything returned has to be removed too.
pub fn find_floating(grid: &BubbleGrid) -> Vec<GridCell> {
    let anchored = find_anchored(grid);
    grid.coords().filter(|c| !anchored.contains(c)).collect()
}

#[cfg(test)]
mod tests {
    use bevy::prelude::Entity;
    use proptest::prelude::*;

    use super::*;

    fn grid_with(cells: &[(i32, i32, BubbleColor)]) -> BubbleGrid {
        let mut grid = BubbleGrid::new();
        for &(row, col, color) in cells {
            grid.insert(GridCell::new(row, col), Entity::PLACEHOLDER, color);
        }
        grid
    }

    #[test]
    fn cluster_spans_connected_same_color() {
        use BubbleColor::{Blue, Red};
        // Row 0: R R B, row 1: R B.
        let grid = grid_with(&[
            (0, 0, Red),
            (0, 1, Red),
            (0, 2, Blue),
            (1, 0, Red),
            (1, 1, Blue),
        ]);

        let cluster = find_cluster(&grid, GridCell::new(0, 0), Red);
        let cells: HashSet<_> = cluster.into_iter().collect();
        assert_eq!(
            cells,
            HashSet::from([GridCell::new(0, 0), GridCell::new(0, 1), GridCell::new(1, 0)])
        );
    }

    #[test]
    fn cluster_never_crosses_a_color_boundary() {
        use BubbleColor::{Blue, Red};
        // Red at both ends, blue in the middle: the far red is unreachable.
        let grid = grid_with(&[(0, 0, Red), (0, 1, Blue), (0, 2, Red)]);
        let cluster = find_cluster(&grid, GridCell::new(0, 0), Red);
        assert_eq!(cluster, vec![GridCell::new(0, 0)]);
    }

    #[test]
    fn gray_never_joins_a_cluster() {
        use BubbleColor::{Gray, Red};
        let grid = grid_with(&[(0, 0, Red), (0, 1, Gray), (0, 2, Gray), (1, 0, Red)]);

        // Gray does not match red...
        let cluster = find_cluster(&grid, GridCell::new(0, 0), Red);
        assert!(!cluster.contains(&GridCell::new(0, 1)));

        // ...and a gray start never recruits other grays.
        let from_gray = find_cluster(&grid, GridCell::new(0, 1), Gray);
        assert_eq!(from_gray, vec![GridCell::new(0, 1)]);
    }

    #[test]
    fn anchored_walks_through_any_color() {
        use BubbleColor::{Blue, Gray, Red};
        // Chain from the ceiling: red - gray - blue. All anchored.
        let grid = grid_with(&[(0, 3, Red), (1, 3, Gray), (2, 3, Blue)]);
        let anchored = find_anchored(&grid);
        assert_eq!(anchored.len(), 3);
        assert!(find_floating(&grid).is_empty());
    }

    #[test]
    fn detached_bubbles_are_floating() {
        use BubbleColor::{Blue, Red};
        // An island at rows 3-4 with nothing above it.
        let grid = grid_with(&[(0, 0, Red), (3, 5, Blue), (4, 5, Blue)]);
        let floating: HashSet<_> = find_floating(&grid).into_iter().collect();
        assert_eq!(
            floating,
            HashSet::from([GridCell::new(3, 5), GridCell::new(4, 5)])
        );
    }

    proptest! {
        /// Anchored and floating partition the grid: disjoint, and their
        /// union is exactly the occupied set.
        #[test]
        fn anchored_and_floating_partition_the_grid(
            cells in proptest::collection::hash_set((0i32..8, 0i32..8), 0..40)
        ) {
            let placed: Vec<_> = cells
                .into_iter()
                .filter(|&(row, col)| col < GridCell::columns_in_row(row))
                .map(|(row, col)| (row, col, BubbleColor::Red))
                .collect();
            let grid = grid_with(&placed);

            let anchored = find_anchored(&grid);
            let floating: HashSet<_> = find_floating(&grid).into_iter().collect();

            prop_assert!(anchored.is_disjoint(&floating));
            let mut union: HashSet<_> = anchored.clone();
            union.extend(&floating);
            let occupied: HashSet<_> = grid.coords().collect();
            prop_assert_eq!(union, occupied);
            // Every anchored cell really is occupied and reachable sets
            // never invent cells.
            prop_assert!(anchored.iter().all(|c| grid.is_occupied(*c)));
        }
    }
}
