//! Grid module - the 2D tile field with generation, gravity, and refill
//!
//! The grid is a row-major array of cells, row 0 at the top. Dimensions are
//! fixed per game. Outside of an in-flight resolution the grid is always
//! full; gravity and refill restore fullness before a commit completes.

use crate::rng::TileGen;
use crate::types::{Cell, GridPos, Tile, TileColor};

/// The tile field
#[derive(Debug, Clone)]
pub struct Grid {
    rows: u8,
    cols: u8,
    /// Row-major cells, `rows * cols` long
    cells: Vec<Cell>,
}

impl Grid {
    /// Create an empty grid (every cell `None`)
    ///
    /// Dimensions are clamped to at least 1x1.
    pub fn empty(rows: u8, cols: u8) -> Self {
        let rows = rows.max(1);
        let cols = cols.max(1);
        Self {
            rows,
            cols,
            cells: vec![None; rows as usize * cols as usize],
        }
    }

    /// Create a fully populated grid from the generator
    ///
    /// Every cell gets a uniformly random base color; powerups attach per the
    /// generator's fixed chance. No wildcards are ever generated.
    pub fn generate(rows: u8, cols: u8, gen: &mut TileGen) -> Self {
        let mut grid = Self::empty(rows, cols);
        for cell in &mut grid.cells {
            *cell = Some(gen.next_tile());
        }
        grid
    }

    /// Grid height in rows
    pub fn rows(&self) -> u8 {
        self.rows
    }

    /// Grid width in columns
    pub fn cols(&self) -> u8 {
        self.cols
    }

    /// Whether a position is on the grid
    pub fn in_bounds(&self, pos: GridPos) -> bool {
        pos.row < self.rows && pos.col < self.cols
    }

    fn idx(&self, pos: GridPos) -> usize {
        pos.row as usize * self.cols as usize + pos.col as usize
    }

    /// Get the cell at a position
    ///
    /// Returns `None` when out of bounds; `Some(None)` is an in-bounds empty
    /// cell.
    pub fn get(&self, pos: GridPos) -> Option<Cell> {
        if !self.in_bounds(pos) {
            return None;
        }
        Some(self.cells[self.idx(pos)])
    }

    /// Get the tile at a position, flattening empties and out-of-bounds
    pub fn tile(&self, pos: GridPos) -> Option<Tile> {
        self.get(pos).flatten()
    }

    /// Set the cell at a position
    ///
    /// Returns `false` when out of bounds (grid unchanged).
    pub fn set(&mut self, pos: GridPos, cell: Cell) -> bool {
        if !self.in_bounds(pos) {
            return false;
        }
        let idx = self.idx(pos);
        self.cells[idx] = cell;
        true
    }

    /// Empty the cell at a position
    pub fn clear_cell(&mut self, pos: GridPos) -> bool {
        self.set(pos, None)
    }

    /// Whether no cell is empty
    pub fn is_full(&self) -> bool {
        self.cells.iter().all(|c| c.is_some())
    }

    /// Collect every position currently holding the given base color
    ///
    /// Wildcard faces never match a base color and are not included.
    pub fn positions_of_color(&self, color: TileColor) -> Vec<GridPos> {
        let mut out = Vec::new();
        for row in 0..self.rows {
            for col in 0..self.cols {
                let pos = GridPos::new(row, col);
                if let Some(tile) = self.tile(pos) {
                    if tile.face.base_color() == Some(color) {
                        out.push(pos);
                    }
                }
            }
        }
        out
    }

    /// Compact each column downward and refill the vacated top cells
    ///
    /// Compaction is stable: occupied cells keep their relative order within
    /// the column. Refill tiles come from the generator (base colors only).
    /// Runs to a fully stable grid in one pass; landed tiles never re-trigger
    /// anything. Returns the number of freshly spawned tiles.
    pub fn collapse_and_refill(&mut self, gen: &mut TileGen) -> u32 {
        let mut spawned = 0u32;
        for col in 0..self.cols {
            // Move occupied cells to the bottom, preserving order
            let mut write_row = self.rows as i32 - 1;
            for read_row in (0..self.rows as i32).rev() {
                let read_pos = GridPos::new(read_row as u8, col);
                let read_idx = self.idx(read_pos);
                if let Some(tile) = self.cells[read_idx] {
                    if read_row != write_row {
                        let write_idx = self.idx(GridPos::new(write_row as u8, col));
                        self.cells[write_idx] = Some(tile);
                        self.cells[read_idx] = None;
                    }
                    write_row -= 1;
                }
            }
            // Fill the vacated rows from the top down
            for row in 0..=write_row {
                let idx = self.idx(GridPos::new(row as u8, col));
                self.cells[idx] = Some(gen.next_tile());
                spawned += 1;
            }
        }
        spawned
    }
}
