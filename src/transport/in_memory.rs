//! In-process match server.
//!
//! Plays the part of the remote source of truth for tests, the `local`
//! command and the `sim` binary, enforcing the rules a real server would.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, bail};

use crate::board::Board;
use crate::config::CPU_NICKNAME;
use crate::domain::{
    ExtendedStatus, MatchId, MatchSnapshot, NewMatch, Participant, ParticipantId, Phase,
    ShotRequest, ShotResult, SideStatus, VesselPlacement,
};
use crate::protocol::MatchService;
use crate::vessel::{Orientation, PlacedVessel, Vessel, VesselKind};

/// The five-vessel catalog used by default.
pub fn standard_catalog() -> Vec<VesselKind> {
    [
        (1, 5, "Carrier"),
        (2, 4, "Battleship"),
        (3, 3, "Cruiser"),
        (4, 3, "Submarine"),
        (5, 2, "Destroyer"),
    ]
    .into_iter()
    .map(|(id, size, name)| VesselKind {
        id,
        size,
        name: Some(name.to_string()),
    })
    .collect()
}

struct Side {
    participant: Participant,
    vessels: Vec<PlacedVessel>,
    shots: Vec<(usize, usize, ShotResult)>,
    prepared: bool,
}

impl Side {
    fn new(participant: Participant) -> Self {
        Self {
            participant,
            vessels: Vec::new(),
            shots: Vec::new(),
            prepared: false,
        }
    }

    fn vessel_at(&self, row: usize, col: usize) -> Option<&PlacedVessel> {
        self.vessels.iter().find(|v| v.contains(row, col))
    }

    fn all_sunk(&self) -> bool {
        !self.vessels.is_empty()
            && self.vessels.iter().all(|v| {
                v.cells().all(|(r, c)| {
                    self.shots
                        .iter()
                        .any(|&(sr, sc, res)| sr == r && sc == c && res.is_hit())
                })
            })
    }

    fn board(&self, size: usize) -> Board {
        let mut board = Board::empty(size);
        for v in &self.vessels {
            let (row, col) = v.anchor();
            board.place(row, col, v.vessel.size, v.vessel.orientation, v.vessel.vessel_type);
        }
        for &(row, col, result) in &self.shots {
            match result {
                ShotResult::Hit => board.mark_hit(row, col),
                ShotResult::Miss => board.mark_miss(row, col),
            };
        }
        board
    }
}

struct Match {
    id: MatchId,
    size: usize,
    multiplayer: bool,
    phase: Phase,
    turn: Option<ParticipantId>,
    winner: Option<ParticipantId>,
    /// `sides[0]` belongs to the owner.
    sides: [Side; 2],
}

impl Match {
    fn side_index(&self, participant_id: ParticipantId) -> anyhow::Result<usize> {
        self.sides
            .iter()
            .position(|s| s.participant.id == participant_id)
            .ok_or_else(|| anyhow!("Participant {} is not in match {}", participant_id, self.id))
    }
}

struct ServerState {
    owner: Participant,
    cpu: Participant,
    catalog: Vec<VesselKind>,
    next_match_id: MatchId,
    matches: BTreeMap<MatchId, Match>,
}

/// Authoritative match server living in the same process.
pub struct InMemoryMatchService {
    state: Mutex<ServerState>,
    shots_fired: AtomicUsize,
    reject_placements: AtomicBool,
    offline: AtomicBool,
}

impl InMemoryMatchService {
    /// Server whose single account is `owner_nickname`, playing against the
    /// CPU with the standard catalog.
    pub fn new(owner_nickname: &str) -> Self {
        Self::with_catalog(owner_nickname, standard_catalog())
    }

    pub fn with_catalog(owner_nickname: &str, catalog: Vec<VesselKind>) -> Self {
        Self {
            state: Mutex::new(ServerState {
                owner: Participant {
                    id: 1,
                    nickname: owner_nickname.to_string(),
                },
                cpu: Participant {
                    id: 2,
                    nickname: CPU_NICKNAME.to_string(),
                },
                catalog,
                next_match_id: 1,
                matches: BTreeMap::new(),
            }),
            shots_fired: AtomicUsize::new(0),
            reject_placements: AtomicBool::new(false),
            offline: AtomicBool::new(false),
        }
    }

    pub fn owner(&self) -> Participant {
        self.lock().owner.clone()
    }

    pub fn cpu(&self) -> Participant {
        self.lock().cpu.clone()
    }

    /// Number of shot requests received, legal or not.
    pub fn shots_fired(&self) -> usize {
        self.shots_fired.load(Ordering::SeqCst)
    }

    /// Make every placement request fail while set.
    pub fn set_reject_placements(&self, reject: bool) {
        self.reject_placements.store(reject, Ordering::SeqCst);
    }

    /// Make every request fail while set.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn lock(&self) -> MutexGuard<'_, ServerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn ensure_online(&self) -> anyhow::Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            bail!("Service unavailable");
        }
        Ok(())
    }

    fn snapshot(state: &ServerState, m: &Match) -> MatchSnapshot {
        let side_status = |side: &Side| {
            let placed: Vec<u32> = side.vessels.iter().map(|v| v.vessel.vessel_type).collect();
            SideStatus {
                id: side.participant.id,
                username: side.participant.nickname.clone(),
                board: side.board(m.size),
                placed_vessels: side.vessels.clone(),
                available_vessels: state
                    .catalog
                    .iter()
                    .filter(|k| !placed.contains(&k.id))
                    .map(Vessel::from)
                    .collect(),
                prepared: side.prepared,
            }
        };
        MatchSnapshot {
            id: m.id,
            phase: m.phase,
            turn: m.turn,
            winner: m.winner,
            owner: Some(state.owner.nickname.clone()),
            width: m.size,
            height: m.size,
            multiplayer: m.multiplayer,
            extended_status: ExtendedStatus {
                player: side_status(&m.sides[0]),
                opponent: Some(side_status(&m.sides[1])),
            },
        }
    }
}

fn placed_from_request(placement: &VesselPlacement, kind: &VesselKind) -> anyhow::Result<PlacedVessel> {
    let orientation = if placement.anchor_col == placement.end_col {
        Orientation::Vertical
    } else if placement.anchor_row == placement.end_row {
        Orientation::Horizontal
    } else {
        bail!("Vessel must be placed in a straight line");
    };
    let placed = Vessel::new(kind.id, kind.size, orientation)
        .anchored(placement.anchor_row, placement.anchor_col);
    if placed.end() != (placement.end_row, placement.end_col) {
        bail!("Vessel {} must cover exactly {} cells", kind.id, kind.size);
    }
    Ok(placed)
}

#[async_trait::async_trait]
impl MatchService for InMemoryMatchService {
    async fn create_match(&self, request: NewMatch) -> anyhow::Result<MatchId> {
        self.ensure_online()?;
        if request.width != request.height {
            bail!("Only square boards are supported");
        }
        if !(5..=200).contains(&request.width) {
            bail!("Board dimension must be between 5 and 200");
        }
        let mut state = self.lock();
        let id = state.next_match_id;
        state.next_match_id += 1;
        let m = Match {
            id,
            size: request.width,
            multiplayer: request.multiplayer,
            phase: Phase::Placement,
            turn: None,
            winner: None,
            sides: [Side::new(state.owner.clone()), Side::new(state.cpu.clone())],
        };
        state.matches.insert(id, m);
        Ok(id)
    }

    async fn match_state(&self, match_id: MatchId) -> anyhow::Result<MatchSnapshot> {
        self.ensure_online()?;
        let state = self.lock();
        let m = state
            .matches
            .get(&match_id)
            .ok_or_else(|| anyhow!("Match {} not found", match_id))?;
        Ok(Self::snapshot(&state, m))
    }

    async fn participants(&self, match_id: MatchId) -> anyhow::Result<Vec<Participant>> {
        self.ensure_online()?;
        let state = self.lock();
        let m = state
            .matches
            .get(&match_id)
            .ok_or_else(|| anyhow!("Match {} not found", match_id))?;
        Ok(m.sides.iter().map(|s| s.participant.clone()).collect())
    }

    async fn place_vessel(
        &self,
        match_id: MatchId,
        participant_id: ParticipantId,
        placement: VesselPlacement,
    ) -> anyhow::Result<()> {
        self.ensure_online()?;
        if self.reject_placements.load(Ordering::SeqCst) {
            bail!("Placement rejected");
        }
        let mut state = self.lock();
        let catalog = state.catalog.clone();
        let m = state
            .matches
            .get_mut(&match_id)
            .ok_or_else(|| anyhow!("Match {} not found", match_id))?;
        if m.phase != Phase::Placement {
            bail!("Vessels can only be placed during placement");
        }
        let idx = m.side_index(participant_id)?;
        let kind = catalog
            .iter()
            .find(|k| k.id == placement.vessel_type)
            .ok_or_else(|| anyhow!("Unknown vessel {}", placement.vessel_type))?;
        let side = &mut m.sides[idx];
        if side.vessels.iter().any(|v| v.vessel.vessel_type == kind.id) {
            bail!("Vessel {} already placed", kind.id);
        }
        let placed = placed_from_request(&placement, kind)?;
        let (row, col) = placed.anchor();
        side.board(m.size)
            .check_placement(row, col, kind.size, placed.vessel.orientation)
            .map_err(|e| anyhow!(e))?;
        side.vessels.push(placed);
        side.prepared = side.vessels.len() == catalog.len();
        if m.sides.iter().all(|s| s.prepared) {
            m.phase = Phase::Playing;
            m.turn = Some(m.sides[0].participant.id);
        }
        Ok(())
    }

    async fn fire_shot(
        &self,
        match_id: MatchId,
        participant_id: ParticipantId,
        shot: ShotRequest,
    ) -> anyhow::Result<ShotResult> {
        self.shots_fired.fetch_add(1, Ordering::SeqCst);
        self.ensure_online()?;
        let mut state = self.lock();
        let m = state
            .matches
            .get_mut(&match_id)
            .ok_or_else(|| anyhow!("Match {} not found", match_id))?;
        if m.phase != Phase::Playing {
            bail!("Shots are only allowed while playing");
        }
        if m.turn != Some(participant_id) {
            bail!("Not your turn");
        }
        let shooter = m.side_index(participant_id)?;
        let target = &mut m.sides[1 - shooter];
        if shot.row >= m.size || shot.col >= m.size {
            bail!("Shot ({}, {}) is out of bounds", shot.row, shot.col);
        }
        if target.shots.iter().any(|&(r, c, _)| r == shot.row && c == shot.col) {
            bail!("Cell ({}, {}) was already fired upon", shot.row, shot.col);
        }
        let result = if target.vessel_at(shot.row, shot.col).is_some() {
            ShotResult::Hit
        } else {
            ShotResult::Miss
        };
        target.shots.push((shot.row, shot.col, result));
        let target_id = target.participant.id;
        if target.all_sunk() {
            m.phase = Phase::GameOver;
            m.winner = Some(participant_id);
            m.turn = None;
        } else if result == ShotResult::Miss {
            m.turn = Some(target_id);
        }
        Ok(result)
    }

    async fn list_matches(&self) -> anyhow::Result<Vec<MatchSnapshot>> {
        self.ensure_online()?;
        let state = self.lock();
        Ok(state
            .matches
            .values()
            .map(|m| Self::snapshot(&state, m))
            .collect())
    }

    async fn delete_match(&self, match_id: MatchId) -> anyhow::Result<()> {
        self.ensure_online()?;
        self.lock()
            .matches
            .remove(&match_id)
            .map(|_| ())
            .ok_or_else(|| anyhow!("Match {} not found", match_id))
    }

    async fn vessel_catalog(&self) -> anyhow::Result<Vec<VesselKind>> {
        self.ensure_online()?;
        Ok(self.lock().catalog.clone())
    }
}

impl Default for InMemoryMatchService {
    fn default() -> Self {
        Self::new("player")
    }
}
