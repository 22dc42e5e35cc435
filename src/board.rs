//! Square grid of integer cells and the placement rules that apply to it.
//!
//! Cell values: `0` is water, `k > 0` is an intact segment of vessel type `k`,
//! `-k` is a hit segment of type `k` and [`MISS`] marks water that was fired
//! upon. Cells only move `0 -> k`, `k -> -k` or `0 -> MISS`.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::common::BoardError;
use crate::config::{BOARD_SIZE, EMPTY, MISS};
use crate::vessel::{footprint, footprint_end, Orientation};

/// Interpretation of a raw cell value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellState {
    Empty,
    Vessel(u32),
    Hit(u32),
    Miss,
}

impl From<i32> for CellState {
    fn from(value: i32) -> Self {
        match value {
            EMPTY => CellState::Empty,
            MISS => CellState::Miss,
            v if v < 0 => CellState::Hit(v.unsigned_abs()),
            v => CellState::Vessel(v as u32),
        }
    }
}

impl CellState {
    /// Already fired upon, either way.
    pub fn is_resolved(self) -> bool {
        matches!(self, CellState::Hit(_) | CellState::Miss)
    }
}

/// Always square: decoding rejects ragged or rectangular matrices.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<i32>>", into = "Vec<Vec<i32>>")]
pub struct Board {
    cells: Vec<Vec<i32>>,
}

impl TryFrom<Vec<Vec<i32>>> for Board {
    type Error = BoardError;

    fn try_from(cells: Vec<Vec<i32>>) -> Result<Self, Self::Error> {
        let n = cells.len();
        if cells.iter().any(|row| row.len() != n) {
            return Err(BoardError::NotSquare);
        }
        Ok(Board { cells })
    }
}

impl From<Board> for Vec<Vec<i32>> {
    fn from(board: Board) -> Self {
        board.cells
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    /// Empty board of the standard size.
    pub fn new() -> Self {
        Self::empty(BOARD_SIZE)
    }

    /// Empty `n`×`n` board.
    pub fn empty(n: usize) -> Self {
        Board {
            cells: vec![vec![EMPTY; n]; n],
        }
    }

    pub fn size(&self) -> usize {
        self.cells.len()
    }

    pub fn in_bounds(&self, row: usize, col: usize) -> bool {
        row < self.size() && col < self.size()
    }

    /// Raw value at (`row`, `col`), `None` outside the grid.
    pub fn cell(&self, row: usize, col: usize) -> Option<i32> {
        self.cells.get(row).and_then(|r| r.get(col)).copied()
    }

    pub fn state(&self, row: usize, col: usize) -> Option<CellState> {
        self.cell(row, col).map(CellState::from)
    }

    pub fn rows(&self) -> &[Vec<i32>] {
        &self.cells
    }

    /// Check that a vessel fits at (`row`, `col`) without touching anything.
    pub fn check_placement(
        &self,
        row: usize,
        col: usize,
        size: usize,
        orientation: Orientation,
    ) -> Result<(), BoardError> {
        if size == 0 || size > self.size() || !self.in_bounds(row, col) {
            return Err(BoardError::OutOfBounds);
        }
        let (row_end, col_end) = footprint_end(row, col, size, orientation);
        if !self.in_bounds(row_end, col_end) {
            return Err(BoardError::OutOfBounds);
        }
        if footprint(row, col, size, orientation).any(|(r, c)| self.cells[r][c] != EMPTY) {
            return Err(BoardError::Overlaps);
        }
        Ok(())
    }

    pub fn is_valid_placement(
        &self,
        row: usize,
        col: usize,
        size: usize,
        orientation: Orientation,
    ) -> bool {
        self.check_placement(row, col, size, orientation).is_ok()
    }

    /// Write `vessel_type` into every covered cell.
    ///
    /// The caller must have validated the placement first; out-of-bounds
    /// footprints panic.
    pub fn place(
        &mut self,
        row: usize,
        col: usize,
        size: usize,
        orientation: Orientation,
        vessel_type: u32,
    ) {
        debug_assert!(
            self.is_valid_placement(row, col, size, orientation),
            "place called without a valid placement"
        );
        for (r, c) in footprint(row, col, size, orientation) {
            self.cells[r][c] = vessel_type as i32;
        }
    }

    /// Mark an intact vessel segment as hit. Returns `false` if the cell
    /// held no intact segment.
    pub fn mark_hit(&mut self, row: usize, col: usize) -> bool {
        match self.state(row, col) {
            Some(CellState::Vessel(_)) => {
                self.cells[row][col] = -self.cells[row][col];
                true
            }
            _ => false,
        }
    }

    /// Mark water as fired upon. Returns `false` if the cell was not water.
    pub fn mark_miss(&mut self, row: usize, col: usize) -> bool {
        match self.state(row, col) {
            Some(CellState::Empty) => {
                self.cells[row][col] = MISS;
                true
            }
            _ => false,
        }
    }

    /// Cells that have not been fired upon yet.
    pub fn unresolved_cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.cells.iter().enumerate().flat_map(|(r, row)| {
            row.iter()
                .enumerate()
                .filter(|&(_, &v)| !CellState::from(v).is_resolved())
                .map(move |(c, _)| (r, c))
        })
    }

    /// Number of cells holding an intact or hit segment of `vessel_type`.
    pub fn count_vessel_cells(&self, vessel_type: u32) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|&&v| matches!(CellState::from(v), CellState::Vessel(t) | CellState::Hit(t) if t == vessel_type))
            .count()
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Board {}x{} {{", self.size(), self.size())?;
        for row in &self.cells {
            write!(f, " ")?;
            for v in row {
                write!(f, " {:>3}", v)?;
            }
            writeln!(f)?;
        }
        write!(f, "}}")
    }
}
