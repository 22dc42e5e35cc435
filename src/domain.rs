//! Wire types exchanged with the remote match service.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::vessel::{PlacedVessel, Vessel};

/// Identifier of a participant (a player profile on the server).
pub type ParticipantId = u64;

/// Identifier of a match.
pub type MatchId = u64;

/// Match phase. Advances `waiting -> placement -> playing -> gameOver`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    #[default]
    Waiting,
    Placement,
    Playing,
    GameOver,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Waiting => "waiting",
            Phase::Placement => "placement",
            Phase::Playing => "playing",
            Phase::GameOver => "gameOver",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub nickname: String,
}

/// One side's projection of a match, as reported by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideStatus {
    pub id: ParticipantId,
    pub username: String,
    pub board: Board,
    #[serde(rename = "placedShips", default)]
    pub placed_vessels: Vec<PlacedVessel>,
    #[serde(rename = "availableShips", default)]
    pub available_vessels: Vec<Vessel>,
    #[serde(default)]
    pub prepared: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtendedStatus {
    pub player: SideStatus,
    #[serde(default)]
    pub opponent: Option<SideStatus>,
}

/// Full match state as served by `GET /games/{id}/` and in match listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSnapshot {
    pub id: MatchId,
    pub phase: Phase,
    /// Participant whose turn it is.
    #[serde(default)]
    pub turn: Option<ParticipantId>,
    #[serde(default)]
    pub winner: Option<ParticipantId>,
    /// Username of the account that created the match.
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default = "default_dimension")]
    pub width: usize,
    #[serde(default = "default_dimension")]
    pub height: usize,
    #[serde(default)]
    pub multiplayer: bool,
    pub extended_status: ExtendedStatus,
}

fn default_dimension() -> usize {
    crate::config::BOARD_SIZE
}

impl MatchSnapshot {
    /// Nickname of the winner, resolved against the embedded projections.
    pub fn winner_nickname(&self) -> Option<&str> {
        let winner = self.winner?;
        self.sides()
            .find(|side| side.id == winner)
            .map(|side| side.username.as_str())
    }

    pub fn sides(&self) -> impl Iterator<Item = &SideStatus> {
        core::iter::once(&self.extended_status.player).chain(self.extended_status.opponent.as_ref())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMatch {
    pub width: usize,
    pub height: usize,
    pub multiplayer: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedMatch {
    pub id: MatchId,
}

/// Placement report: anchor, end cell and vessel type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VesselPlacement {
    #[serde(rename = "ri")]
    pub anchor_row: usize,
    #[serde(rename = "ci")]
    pub anchor_col: usize,
    #[serde(rename = "rf")]
    pub end_row: usize,
    #[serde(rename = "cf")]
    pub end_col: usize,
    #[serde(rename = "vessel")]
    pub vessel_type: u32,
}

impl From<&PlacedVessel> for VesselPlacement {
    fn from(placed: &PlacedVessel) -> Self {
        let (end_row, end_col) = placed.end();
        VesselPlacement {
            anchor_row: placed.position.row,
            anchor_col: placed.position.col,
            end_row,
            end_col,
            vessel_type: placed.vessel.vessel_type,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShotRequest {
    pub row: usize,
    pub col: usize,
}

/// Result of a shot. The server sends `1` for a hit and `0` for a miss;
/// `"hit"` / `"miss"` labels are accepted too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ShotResultRepr", into = "i64")]
pub enum ShotResult {
    Hit,
    Miss,
}

impl ShotResult {
    pub fn is_hit(self) -> bool {
        self == ShotResult::Hit
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ShotResultRepr {
    Code(i64),
    Label(String),
}

impl From<ShotResultRepr> for ShotResult {
    fn from(repr: ShotResultRepr) -> Self {
        match repr {
            ShotResultRepr::Code(1) => ShotResult::Hit,
            ShotResultRepr::Label(label) if label.eq_ignore_ascii_case("hit") => ShotResult::Hit,
            _ => ShotResult::Miss,
        }
    }
}

impl From<ShotResult> for i64 {
    fn from(result: ShotResult) -> Self {
        match result {
            ShotResult::Hit => 1,
            ShotResult::Miss => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShotOutcome {
    pub result: ShotResult,
}
