//! Error types shared by the board, the CPU and the match session.

use core::fmt;

use crate::domain::Phase;

/// Errors returned by placement checks on a [`Board`](crate::Board).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardError {
    /// Footprint leaves the grid.
    OutOfBounds,
    /// Footprint covers a non-empty cell.
    Overlaps,
    /// Random placement gave up after too many attempts.
    UnableToPlaceVessel,
    /// Cell matrix rows differ in length from the row count.
    NotSquare,
}

impl fmt::Display for BoardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoardError::OutOfBounds => write!(f, "Vessel placement is out of bounds"),
            BoardError::Overlaps => write!(f, "Vessel placement overlaps with another vessel"),
            BoardError::UnableToPlaceVessel => write!(f, "Unable to place vessel"),
            BoardError::NotSquare => write!(f, "Board is not square"),
        }
    }
}

impl std::error::Error for BoardError {}

/// Why a vessel of our own could not be placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementError {
    WrongPhase(Phase),
    NoVesselSelected,
    Invalid(BoardError),
}

impl fmt::Display for PlacementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlacementError::WrongPhase(phase) => {
                write!(f, "Vessels can only be placed during placement (phase: {})", phase)
            }
            PlacementError::NoVesselSelected => write!(f, "No vessel selected"),
            PlacementError::Invalid(e) => write!(f, "{}", e),
        }
    }
}

/// Why a shot was refused before reaching the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShotError {
    WrongPhase(Phase),
    InFlight,
    OutOfBounds { row: usize, col: usize },
    AlreadyHit,
    AlreadyMissed,
}

impl fmt::Display for ShotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShotError::WrongPhase(phase) => {
                write!(f, "Shots are only allowed while playing (phase: {})", phase)
            }
            ShotError::InFlight => write!(f, "A shot is already in flight"),
            ShotError::OutOfBounds { row, col } => {
                write!(f, "Coordinates ({}, {}) are out of bounds", row, col)
            }
            ShotError::AlreadyHit => write!(f, "Already hit!"),
            ShotError::AlreadyMissed => write!(f, "Already missed!"),
        }
    }
}

/// Which participant could not be found in the participant list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Own,
    Cpu,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Own => write!(f, "own participant"),
            Role::Cpu => write!(f, "CPU participant"),
        }
    }
}

/// Errors surfaced by [`MatchSession`](crate::MatchSession) actions.
#[derive(Debug)]
pub enum SessionError {
    /// No match has been created or resumed yet.
    NoActiveMatch,
    MissingParticipant(Role),
    Placement(PlacementError),
    Shot(ShotError),
    Board(BoardError),
    /// Transport, HTTP or authorization failure.
    Remote(anyhow::Error),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::NoActiveMatch => write!(f, "No active match"),
            SessionError::MissingParticipant(role) => write!(f, "{} not found", role),
            SessionError::Placement(e) => write!(f, "{}", e),
            SessionError::Shot(e) => write!(f, "{}", e),
            SessionError::Board(e) => write!(f, "{}", e),
            SessionError::Remote(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::Board(e) => Some(e),
            SessionError::Remote(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for SessionError {
    fn from(err: anyhow::Error) -> Self {
        SessionError::Remote(err)
    }
}

impl From<BoardError> for SessionError {
    fn from(err: BoardError) -> Self {
        SessionError::Board(err)
    }
}

impl From<PlacementError> for SessionError {
    fn from(err: PlacementError) -> Self {
        SessionError::Placement(err)
    }
}

impl From<ShotError> for SessionError {
    fn from(err: ShotError) -> Self {
        SessionError::Shot(err)
    }
}
