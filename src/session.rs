//! Client-side match state machine.
//!
//! [`MatchSession`] caches one match. The server is the source of truth:
//! every [`MatchSession::fetch_state`] overwrites boards, vessels, phase and
//! turn unconditionally. The only local phase change is the `placement`
//! phase set when a new match is started, before the first fetch.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, error, info, warn};
use rand::rngs::SmallRng;

use crate::board::{Board, CellState};
use crate::common::{PlacementError, Role, SessionError, ShotError};
use crate::config::{BOARD_SIZE, CPU_NICKNAME};
use crate::cpu::CpuStrategy;
use crate::domain::{
    MatchId, NewMatch, Participant, ParticipantId, Phase, ShotRequest, ShotResult,
    VesselPlacement,
};
use crate::protocol::MatchService;
use crate::vessel::{PlacedVessel, Vessel};

/// What the caller should do after a state fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// Nothing to wait for.
    Settled,
    /// Our fleet is placed but the match has not started; poll again.
    AwaitingOpponent,
    /// The match is over.
    Finished,
}

/// Result of placing one of our vessels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementOutcome {
    Placed,
    /// That was the last vessel; state was re-fetched.
    FleetComplete(SyncStatus),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuShot {
    pub row: usize,
    pub col: usize,
    pub result: ShotResult,
}

/// Our shot plus the CPU's reply, if it got the turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShotReport {
    pub result: ShotResult,
    pub cpu_shots: Vec<CpuShot>,
    pub sync: SyncStatus,
}

/// The acting user, as known to the identity layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub nickname: String,
}

impl Identity {
    pub fn new(nickname: impl Into<String>) -> Self {
        Self {
            nickname: nickname.into(),
        }
    }
}

/// Holds the single-flight shot flag until dropped.
struct InFlight(Arc<AtomicBool>);

impl InFlight {
    fn claim(flag: &Arc<AtomicBool>) -> Self {
        flag.store(true, Ordering::SeqCst);
        InFlight(Arc::clone(flag))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Cached state of one match plus the actions that drive it.
pub struct MatchSession {
    service: Arc<dyn MatchService>,
    identity: Identity,
    rng: SmallRng,
    cpu: CpuStrategy,

    match_id: Option<MatchId>,
    phase: Phase,
    status: String,
    player_board: Board,
    opponent_board: Board,
    player_placed: Vec<PlacedVessel>,
    opponent_placed: Vec<PlacedVessel>,
    available: Vec<Vessel>,
    selected: Option<Vessel>,
    participants: Vec<Participant>,
    own_prepared: bool,
    turn: Option<ParticipantId>,
    winner: Option<ParticipantId>,
    winner_nickname: Option<String>,
    shot_in_flight: Arc<AtomicBool>,
    cpu_placement_failures: Vec<u32>,
}

impl MatchSession {
    pub fn new(service: Arc<dyn MatchService>, identity: Identity, rng: SmallRng) -> Self {
        Self {
            service,
            identity,
            rng,
            cpu: CpuStrategy::new(),
            match_id: None,
            phase: Phase::Waiting,
            status: "Waiting for players".to_string(),
            player_board: Board::new(),
            opponent_board: Board::new(),
            player_placed: Vec::new(),
            opponent_placed: Vec::new(),
            available: Vec::new(),
            selected: None,
            participants: Vec::new(),
            own_prepared: false,
            turn: None,
            winner: None,
            winner_nickname: None,
            shot_in_flight: Arc::new(AtomicBool::new(false)),
            cpu_placement_failures: Vec::new(),
        }
    }

    pub fn with_cpu(mut self, cpu: CpuStrategy) -> Self {
        self.cpu = cpu;
        self
    }

    pub fn match_id(&self) -> Option<MatchId> {
        self.match_id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Human-readable status line for the UI.
    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn player_board(&self) -> &Board {
        &self.player_board
    }

    pub fn opponent_board(&self) -> &Board {
        &self.opponent_board
    }

    pub fn player_placed(&self) -> &[PlacedVessel] {
        &self.player_placed
    }

    pub fn opponent_placed(&self) -> &[PlacedVessel] {
        &self.opponent_placed
    }

    /// Vessels of ours still waiting to be placed.
    pub fn available_vessels(&self) -> &[Vessel] {
        &self.available
    }

    pub fn selected_vessel(&self) -> Option<&Vessel> {
        self.selected.as_ref()
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn own_prepared(&self) -> bool {
        self.own_prepared
    }

    pub fn turn(&self) -> Option<ParticipantId> {
        self.turn
    }

    pub fn winner(&self) -> Option<ParticipantId> {
        self.winner
    }

    pub fn winner_nickname(&self) -> Option<&str> {
        self.winner_nickname.as_deref()
    }

    pub fn shot_in_flight(&self) -> bool {
        self.shot_in_flight.load(Ordering::SeqCst)
    }

    /// Vessel types whose CPU placement report the server did not accept.
    pub fn cpu_placement_failures(&self) -> &[u32] {
        &self.cpu_placement_failures
    }

    pub fn is_my_turn(&self) -> bool {
        match (self.turn, self.own_participant()) {
            (Some(turn), Some(me)) => turn == me.id,
            _ => false,
        }
    }

    fn own_participant(&self) -> Option<&Participant> {
        self.participants
            .iter()
            .find(|p| p.nickname == self.identity.nickname)
    }

    fn cpu_participant(&self) -> Option<&Participant> {
        self.participants.iter().find(|p| p.nickname == CPU_NICKNAME)
    }

    fn active_match(&self) -> Result<MatchId, SessionError> {
        self.match_id.ok_or(SessionError::NoActiveMatch)
    }

    fn reset(&mut self) {
        self.match_id = None;
        self.player_board = Board::new();
        self.opponent_board = Board::new();
        self.player_placed.clear();
        self.opponent_placed.clear();
        self.available.clear();
        self.selected = None;
        self.participants.clear();
        self.own_prepared = false;
        self.turn = None;
        self.winner = None;
        self.winner_nickname = None;
        self.cpu_placement_failures.clear();
    }

    /// Record a remote failure as the status line and wrap it.
    fn remote_failure(&mut self, context: &str, err: anyhow::Error) -> SessionError {
        error!("{}: {:#}", context, err);
        self.status = format!("{}", err);
        SessionError::Remote(err)
    }

    async fn load_participants(&mut self, match_id: MatchId) -> Result<(), SessionError> {
        match self.service.participants(match_id).await {
            Ok(participants) => {
                debug!("Participants in match {}: {:?}", match_id, participants);
                self.participants = participants;
                Ok(())
            }
            Err(e) => Err(self.remote_failure("Error loading participants", e)),
        }
    }

    /// Create a match, place the CPU fleet and load the resulting state.
    pub async fn start_new_game(&mut self) -> Result<SyncStatus, SessionError> {
        self.reset();
        self.phase = Phase::Placement;
        self.status = "Place your ships".to_string();

        let request = NewMatch {
            width: BOARD_SIZE,
            height: BOARD_SIZE,
            multiplayer: false,
        };
        let match_id = match self.service.create_match(request).await {
            Ok(id) => id,
            Err(e) => return Err(self.remote_failure("Error creating match", e)),
        };
        self.match_id = Some(match_id);
        info!("Match {} created", match_id);

        self.load_participants(match_id).await?;
        let catalog = match self.service.vessel_catalog().await {
            Ok(catalog) => catalog,
            Err(e) => return Err(self.remote_failure("Error loading vessel catalog", e)),
        };
        self.available = catalog.iter().map(Vessel::from).collect();

        if let Err(e) = self.place_cpu_fleet().await {
            error!("CPU placement aborted: {}", e);
            self.status = e.to_string();
            return Err(e);
        }
        self.fetch_state(match_id).await
    }

    /// Reset the cache and load an existing match.
    pub async fn resume_match(&mut self, match_id: MatchId) -> Result<SyncStatus, SessionError> {
        self.reset();
        info!("Resuming match {}", match_id);
        self.fetch_state(match_id).await
    }

    /// Place every catalog vessel for the CPU and report each one upstream
    /// before moving on. A refused report is logged and remembered; the
    /// local placement stands and the next fetch replaces it with the
    /// server's board.
    async fn place_cpu_fleet(&mut self) -> Result<(), SessionError> {
        let match_id = self.active_match()?;
        let Some(cpu) = self.cpu_participant().cloned() else {
            warn!("CPU participant not found in match {}", match_id);
            return Ok(());
        };
        debug!("Placing CPU fleet for participant {}", cpu.id);

        for vessel in CpuStrategy::fleet_order(&self.available) {
            let (row, col, orientation) =
                self.cpu
                    .choose_placement(&mut self.rng, &self.opponent_board, vessel.size)?;
            self.opponent_board
                .place(row, col, vessel.size, orientation, vessel.vessel_type);
            let placed = Vessel::new(vessel.vessel_type, vessel.size, orientation).anchored(row, col);
            self.opponent_placed.push(placed);

            let report = VesselPlacement::from(&placed);
            if let Err(e) = self.service.place_vessel(match_id, cpu.id, report).await {
                warn!(
                    "Error saving CPU vessel {} (local placement kept): {:#}",
                    vessel.vessel_type, e
                );
                self.cpu_placement_failures.push(vessel.vessel_type);
            }
        }
        Ok(())
    }

    /// Replace the cached state with the server's view of `match_id`.
    pub async fn fetch_state(&mut self, match_id: MatchId) -> Result<SyncStatus, SessionError> {
        self.match_id = Some(match_id);
        let snapshot = match self.service.match_state(match_id).await {
            Ok(snapshot) => snapshot,
            Err(e) => return Err(self.remote_failure("Error fetching match state", e)),
        };
        debug!("Match {} snapshot: {:?}", match_id, snapshot);

        let player = snapshot.extended_status.player;
        let size = player.board.size();
        self.player_board = player.board;
        self.player_placed = player.placed_vessels;
        self.available = player.available_vessels;
        self.own_prepared = player.prepared;
        if let Some(selected) = self.selected {
            if !self.available.iter().any(|v| v.vessel_type == selected.vessel_type) {
                self.selected = None;
            }
        }

        match snapshot.extended_status.opponent {
            Some(opponent) => {
                self.opponent_board = opponent.board;
                self.opponent_placed = opponent.placed_vessels;
            }
            None => {
                self.opponent_board = Board::empty(size);
                self.opponent_placed.clear();
            }
        }
        self.phase = snapshot.phase;
        self.turn = snapshot.turn;
        self.winner = snapshot.winner;

        self.load_participants(match_id).await?;

        match self.phase {
            Phase::GameOver => {
                self.winner_nickname = self
                    .winner
                    .and_then(|w| self.participants.iter().find(|p| p.id == w))
                    .map(|p| p.nickname.clone());
                self.status = format!(
                    "Game Over - Winner: {}",
                    self.winner_nickname.as_deref().unwrap_or("None")
                );
                info!("Match {} is over: {}", match_id, self.status);
                return Ok(SyncStatus::Finished);
            }
            Phase::Playing => {
                self.status = if self.turn == Some(player.id) {
                    "Your turn".to_string()
                } else {
                    "Opponent's turn".to_string()
                };
            }
            Phase::Placement => self.status = "Place your ships".to_string(),
            Phase::Waiting => self.status = "Waiting for players".to_string(),
        }

        if self.own_prepared && self.phase != Phase::Playing {
            debug!("Waiting for the opponent to get ready");
            Ok(SyncStatus::AwaitingOpponent)
        } else {
            Ok(SyncStatus::Settled)
        }
    }

    /// Pick one of the available vessels for placement.
    pub fn select_vessel(&mut self, vessel_type: u32) -> Option<&Vessel> {
        self.selected = self
            .available
            .iter()
            .find(|v| v.vessel_type == vessel_type)
            .copied();
        self.selected.as_ref()
    }

    pub fn rotate_selected(&mut self) {
        if let Some(vessel) = self.selected.as_mut() {
            vessel.orientation = vessel.orientation.toggled();
        }
    }

    /// Anchor the selected vessel at (`row`, `col`) on our board.
    ///
    /// Invalid placements are refused without touching any state. The
    /// server is told first; the local board only changes once it accepts.
    pub async fn place_own_vessel(&mut self, row: usize, col: usize) -> Result<PlacementOutcome, SessionError> {
        if self.phase != Phase::Placement {
            return Err(PlacementError::WrongPhase(self.phase).into());
        }
        let vessel = self.selected.ok_or(PlacementError::NoVesselSelected)?;
        self.player_board
            .check_placement(row, col, vessel.size, vessel.orientation)
            .map_err(PlacementError::Invalid)?;
        let match_id = self.active_match()?;
        let Some(me) = self.own_participant().cloned() else {
            warn!("Own participant '{}' not found", self.identity.nickname);
            return Err(SessionError::MissingParticipant(Role::Own));
        };

        let placed = vessel.anchored(row, col);
        if let Err(e) = self
            .service
            .place_vessel(match_id, me.id, VesselPlacement::from(&placed))
            .await
        {
            return Err(self.remote_failure("Error placing vessel", e));
        }
        debug!("Vessel {} placed at ({}, {})", vessel.vessel_type, row, col);

        self.player_board
            .place(row, col, vessel.size, vessel.orientation, vessel.vessel_type);
        self.player_placed.push(placed);
        self.available.retain(|v| v.vessel_type != vessel.vessel_type);
        self.selected = None;

        if self.available.is_empty() {
            let sync = self.fetch_state(match_id).await?;
            Ok(PlacementOutcome::FleetComplete(sync))
        } else {
            Ok(PlacementOutcome::Placed)
        }
    }

    /// Fire at (`row`, `col`) on the opponent's board, then let the CPU
    /// take its turn if it has one.
    pub async fn fire_at_opponent(&mut self, row: usize, col: usize) -> Result<ShotReport, SessionError> {
        if self.phase != Phase::Playing {
            return Err(ShotError::WrongPhase(self.phase).into());
        }
        if self.shot_in_flight() {
            return Err(ShotError::InFlight.into());
        }
        let refused = match self.opponent_board.state(row, col) {
            None => Some(ShotError::OutOfBounds { row, col }),
            Some(CellState::Hit(_)) => Some(ShotError::AlreadyHit),
            Some(CellState::Miss) => Some(ShotError::AlreadyMissed),
            Some(_) => None,
        };
        if let Some(err) = refused {
            self.status = err.to_string();
            return Err(err.into());
        }
        let match_id = self.active_match()?;
        let Some(me) = self.own_participant().cloned() else {
            warn!("Own participant '{}' not found", self.identity.nickname);
            return Err(SessionError::MissingParticipant(Role::Own));
        };

        // Released on drop, including when this future is cancelled.
        let _in_flight = InFlight::claim(&self.shot_in_flight);
        self.exchange_fire(match_id, me.id, row, col).await
    }

    async fn exchange_fire(
        &mut self,
        match_id: MatchId,
        shooter: ParticipantId,
        row: usize,
        col: usize,
    ) -> Result<ShotReport, SessionError> {
        debug!("Firing at ({}, {})", row, col);
        let result = match self.service.fire_shot(match_id, shooter, ShotRequest { row, col }).await {
            Ok(result) => result,
            Err(e) => return Err(self.remote_failure("Error firing", e)),
        };
        match result {
            ShotResult::Hit => {
                self.opponent_board.mark_hit(row, col);
                self.status = "Hit!".to_string();
            }
            ShotResult::Miss => {
                self.opponent_board.mark_miss(row, col);
                self.status = "Miss!".to_string();
            }
        }

        let mut sync = self.fetch_state(match_id).await?;
        let cpu_shots = if sync == SyncStatus::Finished {
            Vec::new()
        } else {
            let shots = self.cpu_turn().await?;
            if self.phase == Phase::GameOver {
                sync = SyncStatus::Finished;
            }
            shots
        };
        Ok(ShotReport {
            result,
            cpu_shots,
            sync,
        })
    }

    /// Fire for the CPU while it holds the turn. A hit earns another shot;
    /// a miss, a finished match or a turn change ends the loop. State is
    /// re-fetched after every shot so each iteration checks fresh turn and
    /// phase.
    pub async fn cpu_turn(&mut self) -> Result<Vec<CpuShot>, SessionError> {
        let match_id = self.active_match()?;
        let Some(cpu) = self.cpu_participant().cloned() else {
            warn!("CPU participant not found in match {}", match_id);
            return Ok(Vec::new());
        };

        let mut shots = Vec::new();
        while self.phase == Phase::Playing && self.turn == Some(cpu.id) {
            let Some((row, col)) = self.cpu.choose_target(&mut self.rng, &self.player_board) else {
                warn!("CPU has no cell left to fire at");
                break;
            };
            let request = ShotRequest { row, col };
            let result = match self.service.fire_shot(match_id, cpu.id, request).await {
                Ok(result) => result,
                Err(e) => return Err(self.remote_failure("Error during CPU turn", e)),
            };
            debug!("CPU fired at ({}, {}): {:?}", row, col, result);
            match result {
                ShotResult::Hit => self.player_board.mark_hit(row, col),
                ShotResult::Miss => self.player_board.mark_miss(row, col),
            };
            shots.push(CpuShot { row, col, result });

            self.fetch_state(match_id).await?;
            if result == ShotResult::Miss {
                break;
            }
        }

        if self.phase == Phase::Playing && shots.iter().any(|s| s.result.is_hit()) {
            self.status = "CPU hit your ship! - Your turn".to_string();
        }
        Ok(shots)
    }
}
