//! Bresenham grid traversal for line of sight

use crate::core::types::GridPos;
use crate::world::grid::NavGrid;

/// Cells on the Bresenham line from `from` to `to`, both endpoints included
pub fn bresenham_line(from: GridPos, to: GridPos) -> Vec<GridPos> {
    let dx = (to.x - from.x).abs();
    let dy = -(to.y - from.y).abs();
    let sx = if from.x < to.x { 1 } else { -1 };
    let sy = if from.y < to.y { 1 } else { -1 };
    let mut err = dx + dy;

    let mut cells = Vec::with_capacity((dx.max(-dy) + 1) as usize);
    let (mut x, mut y) = (from.x, from.y);
    loop {
        cells.push(GridPos::new(x, y));
        if x == to.x && y == to.y {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
    cells
}

/// Whether nothing between the two cells blocks sight
///
/// Only intervening cells are checked: the observer may stand in tall grass
/// and still see out, and a wall-mounted target is still visible.
pub fn has_line_of_sight(grid: &NavGrid, from: GridPos, to: GridPos) -> bool {
    let line = bresenham_line(from, to);
    if line.len() <= 2 {
        return true;
    }
    line[1..line.len() - 1].iter().all(|p| !grid.blocks_sight(*p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_endpoints_and_length() {
        let line = bresenham_line(GridPos::new(0, 0), GridPos::new(5, 2));
        assert_eq!(line.first(), Some(&GridPos::new(0, 0)));
        assert_eq!(line.last(), Some(&GridPos::new(5, 2)));
        assert_eq!(line.len(), 6);
        for w in line.windows(2) {
            assert_eq!(w[0].chebyshev(&w[1]), 1);
        }
    }

    #[test]
    fn test_line_reversed_direction() {
        let line = bresenham_line(GridPos::new(3, 3), GridPos::new(0, 0));
        assert_eq!(line, vec![
            GridPos::new(3, 3),
            GridPos::new(2, 2),
            GridPos::new(1, 1),
            GridPos::new(0, 0),
        ]);
    }

    #[test]
    fn test_line_of_sight_open() {
        let grid = NavGrid::new(10, 10);
        assert!(has_line_of_sight(&grid, GridPos::new(0, 0), GridPos::new(9, 4)));
    }

    #[test]
    fn test_line_of_sight_blocked_by_wall() {
        let grid = NavGrid::from_ascii(&[".....", "..#..", "....."]);
        assert!(!has_line_of_sight(&grid, GridPos::new(0, 1), GridPos::new(4, 1)));
        assert!(has_line_of_sight(&grid, GridPos::new(0, 0), GridPos::new(4, 0)));
    }

    #[test]
    fn test_endpoints_do_not_block() {
        let grid = NavGrid::from_ascii(&["#.#"]);
        assert!(has_line_of_sight(&grid, GridPos::new(0, 0), GridPos::new(2, 0)));
    }
}
