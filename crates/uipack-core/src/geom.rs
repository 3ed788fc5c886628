use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Set of grid cells, ordered for deterministic iteration.
pub type CellSet = BTreeSet<(i32, i32)>;

/// Axis-aligned rectangle in grid cells. Corners are inclusive; a rectangle is
/// stored as two opposite corners and normalized on demand.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl Rect {
    pub fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Returns the same rectangle with `x0 <= x1` and `y0 <= y1`.
    pub fn normalized(&self) -> Rect {
        Rect {
            x0: self.x0.min(self.x1),
            y0: self.y0.min(self.y1),
            x1: self.x0.max(self.x1),
            y1: self.y0.max(self.y1),
        }
    }

    /// Inclusive width in cells.
    pub fn width(&self) -> u32 {
        let r = self.normalized();
        (r.x1 - r.x0 + 1) as u32
    }

    /// Inclusive height in cells.
    pub fn height(&self) -> u32 {
        let r = self.normalized();
        (r.y1 - r.y0 + 1) as u32
    }

    /// Iterates every covered cell in row-major order.
    pub fn cells(self) -> impl Iterator<Item = (i32, i32)> {
        let r = self.normalized();
        (r.y0..=r.y1).flat_map(move |y| (r.x0..=r.x1).map(move |x| (x, y)))
    }

    pub fn cell_set(self) -> CellSet {
        self.cells().collect()
    }

    pub fn contains_cell(&self, x: i32, y: i32) -> bool {
        let r = self.normalized();
        x >= r.x0 && x <= r.x1 && y >= r.y0 && y <= r.y1
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        let a = self.normalized();
        let b = other.normalized();
        !(a.x1 < b.x0 || b.x1 < a.x0 || a.y1 < b.y0 || b.y1 < a.y0)
    }
}

/// Square boolean grid of painted background cells. `n` is 16 or 32 in
/// practice; the codec itself only requires a square grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    n: usize,
    cells: Vec<bool>,
}

impl Grid {
    pub fn new(n: usize) -> Self {
        Self {
            n,
            cells: vec![false; n * n],
        }
    }

    pub fn n(&self) -> usize {
        self.n
    }

    /// Out-of-bounds coordinates read as unset.
    pub fn is_set(&self, x: i32, y: i32) -> bool {
        if x < 0 || y < 0 || x as usize >= self.n || y as usize >= self.n {
            return false;
        }
        self.cells[y as usize * self.n + x as usize]
    }

    /// Out-of-bounds coordinates are ignored.
    pub fn set(&mut self, x: i32, y: i32, v: bool) {
        if x < 0 || y < 0 || x as usize >= self.n || y as usize >= self.n {
            return;
        }
        self.cells[y as usize * self.n + x as usize] = v;
    }

    pub fn painted_cells(&self) -> CellSet {
        let mut out = CellSet::new();
        for y in 0..self.n {
            for x in 0..self.n {
                if self.cells[y * self.n + x] {
                    out.insert((x as i32, y as i32));
                }
            }
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        !self.cells.iter().any(|&c| c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_normalizes_swapped_corners() {
        let r = Rect::new(5, 7, 2, 3).normalized();
        assert_eq!((r.x0, r.y0, r.x1, r.y1), (2, 3, 5, 7));
        assert_eq!(r.width(), 4);
        assert_eq!(r.height(), 5);
    }

    #[test]
    fn rect_cells_row_major_inclusive() {
        let cells: Vec<_> = Rect::new(1, 1, 2, 2).cells().collect();
        assert_eq!(cells, vec![(1, 1), (2, 1), (1, 2), (2, 2)]);
    }

    #[test]
    fn grid_bounds_are_safe() {
        let mut g = Grid::new(16);
        g.set(-1, 0, true);
        g.set(16, 16, true);
        assert!(g.is_empty());
        g.set(3, 4, true);
        assert!(g.is_set(3, 4));
        assert!(!g.is_set(-1, 0));
    }
}
