//! Selection module - the in-progress chain state machine
//!
//! A selection is either idle (no chain) or active (non-empty chain). The
//! chain is an ordered, duplicate-free path of occupied cells; consecutive
//! elements are king-adjacent and every non-wildcard element shares the
//! chain color. Extension applies backtrack, repeat, adjacency, and color
//! rules in that order.

use crate::grid::Grid;
use crate::types::{GridPos, TileColor};

/// The active chain, if any
///
/// The chain color is derived from the path on demand rather than cached:
/// backtracking can pop the very cell that established it.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    path: Vec<GridPos>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a chain is in progress
    pub fn is_active(&self) -> bool {
        !self.path.is_empty()
    }

    /// Current chain length
    pub fn len(&self) -> usize {
        self.path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    /// The chain path, in selection order
    pub fn path(&self) -> &[GridPos] {
        &self.path
    }

    /// The chain color: the first non-wildcard face along the path
    ///
    /// `None` while the chain is empty or entirely wildcards, in which case
    /// any color is still admissible.
    pub fn chain_color(&self, grid: &Grid) -> Option<TileColor> {
        self.path
            .iter()
            .find_map(|&pos| grid.tile(pos).and_then(|t| t.face.base_color()))
    }

    /// Begin a chain at `pos`
    ///
    /// Rejected unless the selection is idle and the target cell is occupied.
    pub fn start(&mut self, grid: &Grid, pos: GridPos) -> bool {
        if self.is_active() || grid.tile(pos).is_none() {
            return false;
        }
        self.path.push(pos);
        true
    }

    /// Extend the chain to `pos`, applying the rules in order:
    ///
    /// 1. Backtrack: `pos` equals the second-to-last element, pop the last
    /// 2. Repeat: `pos` already anywhere in the chain, ignore
    /// 3. Adjacency: reject unless king-adjacent to the last element
    /// 4. Color: wildcards always accepted; otherwise the chain color must be
    ///    undefined or equal to the target cell's color
    ///
    /// Returns `true` when the chain changed (append or backtrack pop).
    pub fn extend(&mut self, grid: &Grid, pos: GridPos) -> bool {
        if self.path.is_empty() {
            return false;
        }

        if self.path.len() >= 2 && self.path[self.path.len() - 2] == pos {
            self.path.pop();
            return true;
        }

        if self.path.contains(&pos) {
            return false;
        }

        let last = self.path[self.path.len() - 1];
        if !last.king_adjacent(pos) {
            return false;
        }

        let Some(tile) = grid.tile(pos) else {
            return false;
        };
        if let Some(target_color) = tile.face.base_color() {
            if let Some(established) = self.chain_color(grid) {
                if established != target_color {
                    return false;
                }
            }
        }

        self.path.push(pos);
        true
    }

    /// Consume the chain, returning the path and leaving the selection idle
    pub fn take_path(&mut self) -> Vec<GridPos> {
        std::mem::take(&mut self.path)
    }

    /// Discard the chain without committing
    pub fn clear(&mut self) {
        self.path.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PowerupKind, Tile, TileFace};

    fn uniform_grid(rows: u8, cols: u8, color: TileColor) -> Grid {
        let mut grid = Grid::empty(rows, cols);
        let mut id = 1u32;
        for row in 0..rows {
            for col in 0..cols {
                grid.set(
                    GridPos::new(row, col),
                    Some(Tile {
                        face: TileFace::Color(color),
                        powerup: None,
                        id,
                    }),
                );
                id += 1;
            }
        }
        grid
    }

    fn put(grid: &mut Grid, row: u8, col: u8, face: TileFace) {
        grid.set(
            GridPos::new(row, col),
            Some(Tile {
                face,
                powerup: None,
                id: 999,
            }),
        );
    }

    #[test]
    fn test_start_requires_idle_and_occupied() {
        let grid = uniform_grid(4, 4, TileColor::Red);
        let mut sel = Selection::new();

        assert!(sel.start(&grid, GridPos::new(1, 1)));
        assert!(sel.is_active());
        assert_eq!(sel.path(), &[GridPos::new(1, 1)]);

        // Already active
        assert!(!sel.start(&grid, GridPos::new(2, 2)));
        assert_eq!(sel.len(), 1);

        // Out of bounds
        let mut idle = Selection::new();
        assert!(!idle.start(&grid, GridPos::new(9, 9)));
        assert!(!idle.is_active());
    }

    #[test]
    fn test_start_rejects_empty_cell() {
        let mut grid = uniform_grid(4, 4, TileColor::Red);
        grid.clear_cell(GridPos::new(0, 0));

        let mut sel = Selection::new();
        assert!(!sel.start(&grid, GridPos::new(0, 0)));
    }

    #[test]
    fn test_extend_appends_adjacent_same_color() {
        let grid = uniform_grid(4, 4, TileColor::Blue);
        let mut sel = Selection::new();
        sel.start(&grid, GridPos::new(0, 0));

        assert!(sel.extend(&grid, GridPos::new(0, 1)));
        assert!(sel.extend(&grid, GridPos::new(1, 2)));
        assert_eq!(sel.len(), 3);
        assert_eq!(sel.chain_color(&grid), Some(TileColor::Blue));
    }

    #[test]
    fn test_extend_rejects_non_adjacent() {
        let grid = uniform_grid(4, 4, TileColor::Blue);
        let mut sel = Selection::new();
        sel.start(&grid, GridPos::new(0, 0));

        assert!(!sel.extend(&grid, GridPos::new(0, 2)));
        assert!(!sel.extend(&grid, GridPos::new(2, 2)));
        assert_eq!(sel.len(), 1);
    }

    #[test]
    fn test_extend_rejects_color_mismatch() {
        let mut grid = uniform_grid(4, 4, TileColor::Blue);
        put(&mut grid, 0, 1, TileFace::Color(TileColor::Red));

        let mut sel = Selection::new();
        sel.start(&grid, GridPos::new(0, 0));
        assert!(!sel.extend(&grid, GridPos::new(0, 1)));
        assert_eq!(sel.len(), 1);
    }

    #[test]
    fn test_extend_accepts_wildcards_any_color() {
        let mut grid = uniform_grid(4, 4, TileColor::Blue);
        put(&mut grid, 0, 1, TileFace::Rainbow);
        put(&mut grid, 0, 2, TileFace::Special);

        let mut sel = Selection::new();
        sel.start(&grid, GridPos::new(0, 0));
        assert!(sel.extend(&grid, GridPos::new(0, 1)));
        assert!(sel.extend(&grid, GridPos::new(0, 2)));
        assert_eq!(sel.len(), 3);
        assert_eq!(sel.chain_color(&grid), Some(TileColor::Blue));
    }

    #[test]
    fn test_wildcard_prefix_leaves_color_open() {
        let mut grid = uniform_grid(4, 4, TileColor::Blue);
        put(&mut grid, 0, 0, TileFace::Rainbow);
        put(&mut grid, 0, 1, TileFace::Special);
        put(&mut grid, 0, 2, TileFace::Color(TileColor::Green));

        let mut sel = Selection::new();
        sel.start(&grid, GridPos::new(0, 0));
        assert_eq!(sel.chain_color(&grid), None);

        assert!(sel.extend(&grid, GridPos::new(0, 1)));
        assert_eq!(sel.chain_color(&grid), None);

        // First base color binds the chain
        assert!(sel.extend(&grid, GridPos::new(0, 2)));
        assert_eq!(sel.chain_color(&grid), Some(TileColor::Green));
        assert!(!sel.extend(&grid, GridPos::new(0, 3)));
    }

    #[test]
    fn test_backtrack_pops_last() {
        let grid = uniform_grid(4, 4, TileColor::Blue);
        let mut sel = Selection::new();
        sel.start(&grid, GridPos::new(0, 0));
        sel.extend(&grid, GridPos::new(0, 1));
        sel.extend(&grid, GridPos::new(0, 2));

        // Sliding back onto the second-to-last retracts the head
        assert!(sel.extend(&grid, GridPos::new(0, 1)));
        assert_eq!(sel.path(), &[GridPos::new(0, 0), GridPos::new(0, 1)]);
    }

    #[test]
    fn test_backtrack_recomputes_chain_color() {
        let mut grid = uniform_grid(4, 4, TileColor::Blue);
        put(&mut grid, 0, 0, TileFace::Rainbow);
        put(&mut grid, 0, 1, TileFace::Color(TileColor::Green));

        let mut sel = Selection::new();
        sel.start(&grid, GridPos::new(0, 0));
        sel.extend(&grid, GridPos::new(0, 1));
        assert_eq!(sel.chain_color(&grid), Some(TileColor::Green));

        // Popping the only base-color cell reopens the chain
        assert!(sel.extend(&grid, GridPos::new(0, 0)));
        assert_eq!(sel.chain_color(&grid), None);
        assert!(sel.extend(&grid, GridPos::new(1, 1)));
        assert_eq!(sel.chain_color(&grid), Some(TileColor::Blue));
    }

    #[test]
    fn test_repeat_is_ignored() {
        let grid = uniform_grid(4, 4, TileColor::Blue);
        let mut sel = Selection::new();
        sel.start(&grid, GridPos::new(0, 0));
        sel.extend(&grid, GridPos::new(0, 1));
        sel.extend(&grid, GridPos::new(0, 2));

        // Re-entering the last cell or the first cell changes nothing
        assert!(!sel.extend(&grid, GridPos::new(0, 2)));
        assert!(!sel.extend(&grid, GridPos::new(0, 0)));
        assert_eq!(sel.len(), 3);
    }

    #[test]
    fn test_extend_requires_active() {
        let grid = uniform_grid(4, 4, TileColor::Blue);
        let mut sel = Selection::new();
        assert!(!sel.extend(&grid, GridPos::new(0, 0)));
    }

    #[test]
    fn test_take_path_leaves_idle() {
        let grid = uniform_grid(4, 4, TileColor::Blue);
        let mut sel = Selection::new();
        sel.start(&grid, GridPos::new(0, 0));
        sel.extend(&grid, GridPos::new(1, 1));

        let path = sel.take_path();
        assert_eq!(path.len(), 2);
        assert!(!sel.is_active());
    }

    #[test]
    fn test_accepted_chains_hold_invariants() {
        // Drive a mixed-acceptance sequence, then check the path invariants
        let mut grid = uniform_grid(5, 5, TileColor::Yellow);
        put(&mut grid, 2, 2, TileFace::Color(TileColor::Red));
        put(&mut grid, 3, 3, TileFace::Rainbow);
        grid.set(
            GridPos::new(4, 4),
            Some(Tile {
                face: TileFace::Color(TileColor::Yellow),
                powerup: Some(PowerupKind::AreaBomb),
                id: 77,
            }),
        );

        let mut sel = Selection::new();
        sel.start(&grid, GridPos::new(1, 1));
        for target in [
            GridPos::new(2, 2), // red, rejected
            GridPos::new(2, 1),
            GridPos::new(3, 2),
            GridPos::new(3, 3), // rainbow, accepted
            GridPos::new(4, 4), // yellow with powerup, accepted
            GridPos::new(0, 0), // far away, rejected
        ] {
            sel.extend(&grid, target);
        }

        let path = sel.path();
        assert_eq!(path.len(), 5);
        for pair in path.windows(2) {
            assert!(pair[0].king_adjacent(pair[1]));
        }
        for &pos in path {
            let face = grid.tile(pos).unwrap().face;
            if let Some(color) = face.base_color() {
                assert_eq!(color, TileColor::Yellow);
            }
        }
    }
}
