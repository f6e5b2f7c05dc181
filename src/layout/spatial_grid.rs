// Spatial hash grid for neighbour queries during collision resolution.
//
// Instead of checking every node against every other node, nodes are bucketed
// into square cells and a query only looks at the 3x3 block of cells around a
// point. With a cell size equal to the minimum separation, every pair that can
// overlap shares that block.

use std::collections::HashMap;

use crate::model::Point;

/// A spatial hash grid over point-like entries, keyed by the caller's index.
#[derive(Debug, Clone)]
pub struct SpatialGrid {
    /// Size of each cell in the grid.
    cell_size: f64,
    /// Map from cell coordinates to the entries inside that cell, in insertion order.
    cells: HashMap<(i64, i64), Vec<usize>>,
}

impl SpatialGrid {
    /// Create a new spatial grid with the given cell size.
    /// Non-positive or non-finite sizes fall back to 1.0.
    pub fn new(cell_size: f64) -> Self {
        let cell_size = if cell_size.is_finite() && cell_size > 0.0 {
            cell_size
        } else {
            1.0
        };
        Self {
            cell_size,
            cells: HashMap::new(),
        }
    }

    /// Build a grid with every point inserted under its slice index.
    pub fn from_points(cell_size: f64, points: &[Point]) -> Self {
        let mut grid = Self::new(cell_size);
        for (idx, p) in points.iter().enumerate() {
            grid.insert(idx, *p);
        }
        grid
    }

    /// Cell coordinate containing a point. Far-off coordinates saturate at the
    /// i64 bounds.
    pub fn cell_of(&self, p: Point) -> (i64, i64) {
        (
            (p.x / self.cell_size).floor() as i64,
            (p.y / self.cell_size).floor() as i64,
        )
    }

    pub fn insert(&mut self, idx: usize, p: Point) {
        let cell = self.cell_of(p);
        self.cells.entry(cell).or_default().push(idx);
    }

    /// Entries in the cell of `p` and its eight neighbours.
    /// The result is sorted so callers see a stable order.
    pub fn neighbors(&self, p: Point) -> Vec<usize> {
        let (cx, cy) = self.cell_of(p);
        let mut result = Vec::new();
        for dx in -1..=1 {
            for dy in -1..=1 {
                // Cells past the i64 range do not exist.
                let (Some(x), Some(y)) = (cx.checked_add(dx), cy.checked_add(dy)) else {
                    continue;
                };
                if let Some(entries) = self.cells.get(&(x, y)) {
                    result.extend_from_slice(entries);
                }
            }
        }
        result.sort_unstable();
        result
    }

    /// Number of occupied cells.
    pub fn occupied_cells(&self) -> usize {
        self.cells.len()
    }
}
