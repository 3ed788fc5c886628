use crate::geom::{Grid, Rect};

/// Compress a painted background grid into disjoint rectangles whose union is
/// exactly the set cells. Greedy row-major maximal growth: widen first, then
/// grow height while the whole next row segment is available. The result is
/// not guaranteed minimal, only exact and disjoint.
pub fn compress_background(grid: &Grid) -> Vec<Rect> {
    let n = grid.n() as i32;
    let mut visited = Grid::new(grid.n());
    let mut rects = Vec::new();

    for y in 0..n {
        for x in 0..n {
            if !grid.is_set(x, y) || visited.is_set(x, y) {
                continue;
            }

            let mut w = 1;
            while x + w < n && grid.is_set(x + w, y) && !visited.is_set(x + w, y) {
                w += 1;
            }

            let mut h = 1;
            'grow: while y + h < n {
                for xx in x..x + w {
                    if !grid.is_set(xx, y + h) || visited.is_set(xx, y + h) {
                        break 'grow;
                    }
                }
                h += 1;
            }

            for yy in y..y + h {
                for xx in x..x + w {
                    visited.set(xx, yy, true);
                }
            }

            rects.push(Rect::new(x, y, x + w - 1, y + h - 1));
        }
    }

    rects
}

/// Rebuild an `n`x`n` grid from rectangles. Rectangles are normalized and
/// clipped to the grid; cells outside every rectangle stay unset.
pub fn decompress_background(rects: &[Rect], n: usize) -> Grid {
    let mut grid = Grid::new(n);
    for r in rects {
        for (x, y) in r.normalized().cells() {
            grid.set(x, y, true);
        }
    }
    grid
}
