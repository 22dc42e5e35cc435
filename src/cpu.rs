//! Placement and targeting for the CPU side.
//!
//! Both policies are rejection samplers over uniformly random cells. The
//! random source is always passed in so games can be replayed from a seed.

use rand::Rng;

use crate::board::Board;
use crate::common::BoardError;
use crate::config::{MAX_PLACEMENT_ATTEMPTS, VESSEL_ORDER};
use crate::vessel::{Orientation, Vessel};

/// Stateless CPU opponent.
#[derive(Debug, Clone, Copy)]
pub struct CpuStrategy {
    max_attempts: usize,
}

impl Default for CpuStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuStrategy {
    pub fn new() -> Self {
        Self {
            max_attempts: MAX_PLACEMENT_ATTEMPTS,
        }
    }

    /// Cap the number of samples tried per vessel.
    pub fn with_max_attempts(max_attempts: usize) -> Self {
        Self { max_attempts }
    }

    /// Vessels from `available` in the order the CPU places them. Types
    /// missing from `available` are skipped.
    pub fn fleet_order(available: &[Vessel]) -> Vec<Vessel> {
        VESSEL_ORDER
            .iter()
            .filter_map(|t| available.iter().find(|v| v.vessel_type == *t).copied())
            .collect()
    }

    /// Sample anchors and orientations until one fits on `board`.
    pub fn choose_placement<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        board: &Board,
        size: usize,
    ) -> Result<(usize, usize, Orientation), BoardError> {
        let n = board.size();
        if n == 0 {
            return Err(BoardError::UnableToPlaceVessel);
        }
        for _ in 0..self.max_attempts {
            let row = rng.random_range(0..n);
            let col = rng.random_range(0..n);
            let orientation = if rng.random_bool(0.5) {
                Orientation::Vertical
            } else {
                Orientation::Horizontal
            };
            if board.is_valid_placement(row, col, size, orientation) {
                return Ok((row, col, orientation));
            }
        }
        Err(BoardError::UnableToPlaceVessel)
    }

    /// Sample cells until one that has not been fired upon turns up.
    /// `None` once every cell is resolved.
    pub fn choose_target<R: Rng + ?Sized>(&self, rng: &mut R, board: &Board) -> Option<(usize, usize)> {
        let n = board.size();
        if board.unresolved_cells().next().is_none() {
            return None;
        }
        loop {
            let row = rng.random_range(0..n);
            let col = rng.random_range(0..n);
            if board.state(row, col).is_some_and(|s| !s.is_resolved()) {
                return Some((row, col));
            }
        }
    }
}
