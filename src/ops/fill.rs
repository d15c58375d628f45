use crate::canvas::{Cell, Grid};

/// Flood fill: replace the 4-connected region around `(x, y)` that shares the
/// seed cell's color with `replacement`, returning a new grid.
///
/// `target` is the color the caller saw under the pointer. The traversal always
/// compares against the seed cell's color captured once before any write, so a
/// stale `target` cannot cause an under- or over-fill. When the seed color
/// already equals `replacement` (or `target == replacement`) the input grid is
/// returned unchanged. Off-grid seeds are a no-op.
pub fn flood_fill(grid: &Grid, x: i32, y: i32, target: Cell, replacement: Cell) -> Grid {
    if target == replacement {
        return grid.clone();
    }
    let Some(seed_color) = grid.get(x, y) else {
        return grid.clone();
    };
    if seed_color != target {
        log::debug!(
            "flood_fill: target {:?} differs from seed cell {:?}, using seed",
            target,
            seed_color
        );
    }
    if seed_color == replacement {
        return grid.clone();
    }

    let region = fill_region(grid, x as u32, y as u32);
    let mut next = grid.clone();
    let cells = next.cells_mut();
    for idx in region {
        cells[idx as usize] = replacement;
    }
    next
}

/// Convenience for callers that have not read the seed color themselves.
pub fn fill_at(grid: &Grid, x: i32, y: i32, replacement: Cell) -> Grid {
    match grid.get(x, y) {
        Some(target) => flood_fill(grid, x, y, target, replacement),
        None => grid.clone(),
    }
}

/// Flat indices of the connected same-color region containing `(start_x, start_y)`.
///
/// DFS on a `Vec` stack with a visited mask marked on push, so each cell is
/// pushed at most once and the work is proportional to the region (plus the
/// one-off mask allocation).
pub fn fill_region(grid: &Grid, start_x: u32, start_y: u32) -> Vec<u32> {
    let w = grid.width();
    let h = grid.height();
    if start_x >= w || start_y >= h {
        return Vec::new();
    }

    let wu = w as usize;
    let cells = grid.cells();
    let seed_idx = start_y as usize * wu + start_x as usize;
    let original = cells[seed_idx];

    let mut visited = vec![false; cells.len()];
    let mut stack: Vec<u32> = Vec::with_capacity(256);
    let mut region: Vec<u32> = Vec::new();

    visited[seed_idx] = true;
    stack.push(seed_idx as u32);

    while let Some(idx) = stack.pop() {
        region.push(idx);
        let x = (idx as usize % wu) as u32;
        let y = (idx as usize / wu) as u32;

        let mut visit = |ni: usize| {
            if !visited[ni] && cells[ni] == original {
                visited[ni] = true;
                stack.push(ni as u32);
            }
        };

        // Left, right, up, down; no wraparound
        if x > 0 {
            visit(idx as usize - 1);
        }
        if x + 1 < w {
            visit(idx as usize + 1);
        }
        if y > 0 {
            visit(idx as usize - wu);
        }
        if y + 1 < h {
            visit(idx as usize + wu);
        }
    }

    region
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Rgb;
    use proptest::prelude::*;

    const RED: Rgb = Rgb::new(0xff, 0, 0);
    const GREEN: Rgb = Rgb::new(0, 0xff, 0);
    const BLUE: Rgb = Rgb::new(0, 0, 0xff);

    /// 4x4 grid whose outer border is red, enclosing the empty block (1,1)-(2,2).
    fn ringed_4x4() -> Grid {
        let mut grid = Grid::blank(4, 4);
        for i in 0..4 {
            grid.set(i, 0, Some(RED));
            grid.set(i, 3, Some(RED));
            grid.set(0, i, Some(RED));
            grid.set(3, i, Some(RED));
        }
        grid
    }

    #[test]
    fn fills_uniform_grid_completely() {
        let grid = Grid::blank(3, 3);
        let filled = flood_fill(&grid, 1, 1, None, Some(BLUE));
        assert!(filled.cells().iter().all(|&c| c == Some(BLUE)));
        assert!(grid.is_blank(), "input must not be mutated");
    }

    #[test]
    fn fill_is_contained_by_a_boundary() {
        let grid = ringed_4x4();
        let filled = flood_fill(&grid, 1, 1, None, Some(GREEN));

        let changed: Vec<usize> = (0..grid.len())
            .filter(|&i| grid.cells()[i] != filled.cells()[i])
            .collect();
        assert_eq!(changed, vec![5, 6, 9, 10]);
        for &i in &changed {
            assert_eq!(filled.cells()[i], Some(GREEN));
        }
    }

    #[test]
    fn fill_does_not_leak_past_a_wall_into_the_exterior() {
        // 6x6: red ring occupying (1..=4, 1..=4) border, exterior empty, interior empty
        let mut grid = Grid::blank(6, 6);
        for i in 1..=4 {
            grid.set(i, 1, Some(RED));
            grid.set(i, 4, Some(RED));
            grid.set(1, i, Some(RED));
            grid.set(4, i, Some(RED));
        }
        let filled = flood_fill(&grid, 2, 2, None, Some(GREEN));
        assert_eq!(filled.cells().iter().filter(|&&c| c == Some(GREEN)).count(), 4);
        assert_eq!(filled.get(0, 0), Some(None));
        assert_eq!(filled.get(5, 5), Some(None));
        assert_eq!(filled.get(1, 1), Some(Some(RED)));
    }

    #[test]
    fn diagonal_neighbours_are_not_connected() {
        let grid = Grid::blank(2, 2)
            .with_cell(1, 0, Some(RED))
            .with_cell(0, 1, Some(RED));
        let filled = flood_fill(&grid, 0, 0, None, Some(BLUE));
        assert_eq!(filled.get(0, 0), Some(Some(BLUE)));
        assert_eq!(filled.get(1, 1), Some(None));
    }

    #[test]
    fn same_color_is_a_no_op() {
        let grid = Grid::blank(3, 3).with_cell(1, 1, Some(RED));
        let out = flood_fill(&grid, 1, 1, Some(RED), Some(RED));
        assert!(out.shares_storage(&grid));
    }

    #[test]
    fn off_grid_seed_is_a_no_op() {
        let grid = Grid::blank(3, 3);
        assert!(flood_fill(&grid, -1, 0, None, Some(RED)).shares_storage(&grid));
        assert!(flood_fill(&grid, 3, 0, None, Some(RED)).shares_storage(&grid));
        assert!(fill_at(&grid, 0, 9, Some(RED)).shares_storage(&grid));
    }

    #[test]
    fn stale_target_uses_seed_color() {
        let grid = Grid::blank(3, 1).with_cell(0, 0, Some(RED));
        // Caller believes the seed is empty; the seed is actually red.
        let filled = flood_fill(&grid, 0, 0, None, Some(BLUE));
        assert_eq!(filled.get(0, 0), Some(Some(BLUE)));
        assert_eq!(filled.get(1, 0), Some(None));
    }

    #[test]
    fn fill_can_erase_a_region() {
        let grid = Grid::blank(2, 2).with_cell(0, 0, Some(RED)).with_cell(1, 0, Some(RED));
        let erased = fill_at(&grid, 0, 0, None);
        assert!(erased.is_blank());
    }

    #[test]
    fn region_size_matches_connected_component() {
        let grid = ringed_4x4();
        assert_eq!(fill_region(&grid, 0, 0).len(), 12);
        assert_eq!(fill_region(&grid, 2, 2).len(), 4);
        assert!(fill_region(&grid, 4, 0).is_empty());
    }

    fn arb_grid() -> impl Strategy<Value = Grid> {
        (1u32..8, 1u32..8).prop_flat_map(|(w, h)| {
            prop::collection::vec(prop::option::of(0u8..3), (w * h) as usize).prop_map(move |raw| {
                let cells = raw.into_iter().map(|c| c.map(|v| Rgb::new(v * 100, 0, 0))).collect();
                Grid::from_cells(w, h, cells).unwrap()
            })
        })
    }

    proptest! {
        #[test]
        fn filling_twice_equals_filling_once(grid in arb_grid(), sx in 0i32..8, sy in 0i32..8) {
            let once = fill_at(&grid, sx, sy, Some(GREEN));
            let twice = fill_at(&once, sx, sy, Some(GREEN));
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn fill_only_touches_seed_colored_cells(grid in arb_grid(), sx in 0i32..8, sy in 0i32..8) {
            let filled = fill_at(&grid, sx, sy, Some(GREEN));
            if let Some(seed) = grid.get(sx, sy) {
                for (before, after) in grid.cells().iter().zip(filled.cells()) {
                    if before != after {
                        prop_assert_eq!(*before, seed);
                        prop_assert_eq!(*after, Some(GREEN));
                    }
                }
            } else {
                prop_assert_eq!(filled, grid);
            }
        }
    }
}
