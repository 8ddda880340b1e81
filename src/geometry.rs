use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub row: i32,
    pub col: i32,
}

impl Position {
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    pub fn distance_to(self, other: Position) -> f64 {
        let dr = f64::from(self.row - other.row);
        let dc = f64::from(self.col - other.col);
        (dr * dr + dc * dc).sqrt()
    }

    pub fn within(self, other: Position, radius: f64) -> bool {
        self.distance_to(other) <= radius
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Grid dimensions; every entity position lies in `[0, rows) x [0, cols)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridBounds {
    pub rows: i32,
    pub cols: i32,
}

impl GridBounds {
    pub const fn new(rows: i32, cols: i32) -> Self {
        Self { rows, cols }
    }

    pub fn contains(self, pos: Position) -> bool {
        (0..self.rows).contains(&pos.row) && (0..self.cols).contains(&pos.col)
    }

    pub fn clamp(self, pos: Position) -> Position {
        Position {
            row: pos.row.clamp(0, self.rows - 1),
            col: pos.col.clamp(0, self.cols - 1),
        }
    }

    pub fn cell_count(self) -> usize {
        (self.rows.max(0) as usize) * (self.cols.max(0) as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_euclidean() {
        let a = Position::new(0, 0);
        let b = Position::new(3, 4);
        assert_eq!(a.distance_to(b), 5.0);
        assert_eq!(b.distance_to(a), 5.0);
        assert!(a.within(b, 5.0));
        assert!(!a.within(b, 4.99));
    }

    #[test]
    fn clamp_keeps_positions_on_grid() {
        let bounds = GridBounds::new(20, 10);
        assert_eq!(bounds.clamp(Position::new(-3, 12)), Position::new(0, 9));
        assert_eq!(bounds.clamp(Position::new(25, -1)), Position::new(19, 0));
        assert!(bounds.contains(Position::new(19, 9)));
        assert!(!bounds.contains(Position::new(20, 9)));
        assert_eq!(bounds.cell_count(), 200);
    }
}
