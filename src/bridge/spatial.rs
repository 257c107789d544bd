//! Uniform-grid spatial index over one tick's vehicle positions.

use crate::geom::Point;
use std::collections::HashMap;

/// Hash grid with square cells. With the cell size set to the radio range,
/// every point within range of a query point lies in the 3×3 cell
/// neighbourhood around it.
///
/// Indices are the positions' offsets in the slice the grid was built
/// from; neighbour lists are returned sorted ascending so sweeps that
/// consume them stay deterministic.
#[derive(Debug)]
pub struct UniformGrid {
    cell_size: f64,
    cells: HashMap<(i64, i64), Vec<usize>>,
}

impl UniformGrid {
    /// Builds the index for one tick.
    ///
    /// # Arguments
    /// * `cell_size` - Cell edge length, metres; clamped to at least 1 m.
    /// * `positions` - Positions in snapshot order.
    pub fn build(cell_size: f64, positions: &[Point]) -> Self {
        let cell_size = cell_size.max(1.0);
        let mut cells: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
        for (index, position) in positions.iter().enumerate() {
            cells
                .entry(Self::cell_of(cell_size, position))
                .or_default()
                .push(index);
        }
        UniformGrid { cell_size, cells }
    }

    fn cell_of(cell_size: f64, position: &Point) -> (i64, i64) {
        (
            (position.x / cell_size).floor() as i64,
            (position.y / cell_size).floor() as i64,
        )
    }

    /// Candidate indices within one cell of the query point, sorted
    /// ascending. Callers still need the exact distance check.
    pub fn neighbors(&self, position: &Point) -> Vec<usize> {
        let (cx, cy) = Self::cell_of(self.cell_size, position);
        let mut result = Vec::new();
        for dx in -1..=1 {
            for dy in -1..=1 {
                if let Some(indices) = self.cells.get(&(cx + dx, cy + dy)) {
                    result.extend_from_slice(indices);
                }
            }
        }
        result.sort_unstable();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::new_point;

    #[test]
    fn test_neighbors_cover_range() {
        let positions = vec![
            new_point(0.0, 0.0),
            new_point(250.0, 0.0),
            new_point(299.0, 0.0),
            new_point(900.0, 900.0),
        ];
        let grid = UniformGrid::build(300.0, &positions);
        let neighbors = grid.neighbors(&positions[0]);
        assert!(neighbors.contains(&0));
        assert!(neighbors.contains(&1));
        assert!(neighbors.contains(&2));
        assert!(!neighbors.contains(&3));
    }

    #[test]
    fn test_neighbors_sorted() {
        let positions = vec![
            new_point(10.0, 10.0),
            new_point(20.0, 10.0),
            new_point(-10.0, 10.0),
            new_point(10.0, -20.0),
        ];
        let grid = UniformGrid::build(100.0, &positions);
        let neighbors = grid.neighbors(&positions[0]);
        let mut sorted = neighbors.clone();
        sorted.sort_unstable();
        assert_eq!(neighbors, sorted);
        assert_eq!(neighbors.len(), 4);
    }

    #[test]
    fn test_negative_coordinates() {
        let positions = vec![new_point(-450.0, -450.0), new_point(-460.0, -440.0)];
        let grid = UniformGrid::build(300.0, &positions);
        assert_eq!(grid.neighbors(&positions[0]), vec![0, 1]);
    }
}
