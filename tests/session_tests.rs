use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use battleship_client::{
    BoardError, CellState, CpuStrategy, Identity, InMemoryMatchService, MatchId, MatchService,
    MatchSession, MatchSnapshot, NewMatch, Participant, ParticipantId, Phase, PlacementError,
    PlacementOutcome, SessionError, ShotError, ShotRequest, ShotResult, SyncStatus,
    VesselKind, VesselPlacement, MISS,
};
use rand::{rngs::SmallRng, SeedableRng};
use tokio::time::{sleep, timeout, Duration};

const ME: &str = "alice";

fn setup(seed: u64) -> (Arc<InMemoryMatchService>, MatchSession) {
    let service = Arc::new(InMemoryMatchService::new(ME));
    let session = MatchSession::new(service.clone(), Identity::new(ME), SmallRng::seed_from_u64(seed));
    (service, session)
}

/// Place our fleet vertically in columns 0, 2, 4, ...
async fn place_fleet(session: &mut MatchSession) -> PlacementOutcome {
    let mut last = PlacementOutcome::Placed;
    let types: Vec<u32> = session.available_vessels().iter().map(|v| v.vessel_type).collect();
    for (i, vessel_type) in types.into_iter().enumerate() {
        assert!(session.select_vessel(vessel_type).is_some());
        last = session.place_own_vessel(0, i * 2).await.unwrap();
    }
    last
}

async fn playing(seed: u64) -> (Arc<InMemoryMatchService>, MatchSession) {
    let (service, mut session) = setup(seed);
    session.start_new_game().await.unwrap();
    place_fleet(&mut session).await;
    assert_eq!(session.phase(), Phase::Playing);
    (service, session)
}

fn find_cell(session: &MatchSession, wanted: impl Fn(CellState) -> bool) -> (usize, usize) {
    let board = session.opponent_board();
    (0..board.size())
        .flat_map(|r| (0..board.size()).map(move |c| (r, c)))
        .find(|&(r, c)| board.state(r, c).is_some_and(&wanted))
        .expect("no matching cell")
}

#[tokio::test]
async fn new_game_places_cpu_fleet_and_stays_in_placement() {
    let (service, mut session) = setup(1);
    let status = session.start_new_game().await.unwrap();

    assert_eq!(status, SyncStatus::Settled);
    assert_eq!(session.phase(), Phase::Placement);
    assert_eq!(session.status(), "Place your ships");
    assert_eq!(session.available_vessels().len(), 5);
    assert!(session.cpu_placement_failures().is_empty());
    assert_eq!(session.opponent_placed().len(), 5);
    for kind in battleship_client::standard_catalog() {
        assert_eq!(session.opponent_board().count_vessel_cells(kind.id), kind.size);
    }
    assert_eq!(session.participants().len(), 2);
    assert_eq!(service.shots_fired(), 0);
}

#[tokio::test]
async fn last_vessel_triggers_fetch_and_starts_play() {
    let (_service, mut session) = setup(2);
    session.start_new_game().await.unwrap();

    let outcome = place_fleet(&mut session).await;
    assert_eq!(outcome, PlacementOutcome::FleetComplete(SyncStatus::Settled));
    assert!(session.available_vessels().is_empty());
    assert!(session.own_prepared());
    assert_eq!(session.phase(), Phase::Playing);
    assert!(session.is_my_turn());
    assert_eq!(session.status(), "Your turn");
    assert_eq!(session.player_board().count_vessel_cells(1), 5);
}

#[tokio::test]
async fn hit_negates_cell_and_repeat_is_refused_locally() {
    let (service, mut session) = playing(3).await;
    let (row, col) = find_cell(&session, |s| s == CellState::Vessel(2));

    let report = session.fire_at_opponent(row, col).await.unwrap();
    assert_eq!(report.result, ShotResult::Hit);
    assert!(report.cpu_shots.is_empty());
    assert_eq!(session.opponent_board().cell(row, col), Some(-2));
    assert_eq!(session.status(), "Your turn");

    let fired = service.shots_fired();
    let err = session.fire_at_opponent(row, col).await.unwrap_err();
    assert!(matches!(err, SessionError::Shot(ShotError::AlreadyHit)));
    assert_eq!(session.status(), "Already hit!");
    assert_eq!(service.shots_fired(), fired);
}

#[tokio::test]
async fn miss_marks_sentinel_and_hands_turn_to_cpu() {
    let (service, mut session) = playing(4).await;
    let (row, col) = find_cell(&session, |s| s == CellState::Empty);

    let report = session.fire_at_opponent(row, col).await.unwrap();
    assert_eq!(report.result, ShotResult::Miss);
    assert_eq!(session.opponent_board().cell(row, col), Some(MISS));
    assert!(!report.cpu_shots.is_empty());
    assert_eq!(service.shots_fired(), 1 + report.cpu_shots.len());
    assert!(session.is_my_turn());

    let fired = service.shots_fired();
    let err = session.fire_at_opponent(row, col).await.unwrap_err();
    assert!(matches!(err, SessionError::Shot(ShotError::AlreadyMissed)));
    assert_eq!(session.status(), "Already missed!");
    assert_eq!(service.shots_fired(), fired);
}

#[tokio::test]
async fn cpu_keeps_firing_only_while_hitting() {
    let (_service, mut session) = playing(5).await;
    let cpu = CpuStrategy::new();
    let mut rng = SmallRng::seed_from_u64(55);

    while session.phase() == Phase::Playing {
        let (row, col) = cpu.choose_target(&mut rng, session.opponent_board()).unwrap();
        let report = session.fire_at_opponent(row, col).await.unwrap();
        if let Some((last, earlier)) = report.cpu_shots.split_last() {
            assert_eq!(report.result, ShotResult::Miss);
            assert!(earlier.iter().all(|s| s.result == ShotResult::Hit));
            if last.result == ShotResult::Hit {
                assert_eq!(session.phase(), Phase::GameOver);
            }
        }
        if session.phase() == Phase::Playing {
            assert!(session.is_my_turn());
        }
    }

    assert_eq!(session.phase(), Phase::GameOver);
    let winner = session.winner_nickname().expect("winner resolved");
    assert!(winner == ME || winner == "cpu");
    assert_eq!(session.status(), format!("Game Over - Winner: {}", winner));
    assert!(matches!(
        session.fire_at_opponent(0, 0).await,
        Err(SessionError::Shot(ShotError::WrongPhase(Phase::GameOver)))
    ));
}

#[tokio::test]
async fn shots_outside_the_grid_are_refused() {
    let (service, mut session) = playing(6).await;
    let err = session.fire_at_opponent(10, 0).await.unwrap_err();
    assert!(matches!(err, SessionError::Shot(ShotError::OutOfBounds { row: 10, col: 0 })));
    assert_eq!(service.shots_fired(), 0);
}

#[tokio::test]
async fn shot_flag_is_released_after_remote_failure() {
    let (service, mut session) = playing(7).await;
    let (row, col) = find_cell(&session, |s| s == CellState::Vessel(1));

    service.set_offline(true);
    let err = session.fire_at_opponent(row, col).await.unwrap_err();
    assert!(matches!(err, SessionError::Remote(_)));
    assert_eq!(session.status(), "Service unavailable");
    assert!(!session.shot_in_flight());
    assert_eq!(session.opponent_board().state(row, col), Some(CellState::Vessel(1)));

    service.set_offline(false);
    let report = session.fire_at_opponent(row, col).await.unwrap();
    assert_eq!(report.result, ShotResult::Hit);
}

#[tokio::test]
async fn refused_cpu_placement_is_recorded_and_overwritten_by_server() {
    let (service, mut session) = setup(8);
    service.set_reject_placements(true);

    session.start_new_game().await.unwrap();
    assert_eq!(session.cpu_placement_failures(), &[1, 2, 3, 4, 5]);
    assert_eq!(session.phase(), Phase::Placement);
    // The server never recorded the CPU fleet, so neither does the cache.
    assert!(session.opponent_placed().is_empty());
    assert_eq!(session.opponent_board().count_vessel_cells(1), 0);
}

#[tokio::test]
async fn invalid_own_placement_changes_nothing() {
    let (_service, mut session) = setup(9);
    session.start_new_game().await.unwrap();

    let err = session.place_own_vessel(0, 0).await.unwrap_err();
    assert!(matches!(err, SessionError::Placement(PlacementError::NoVesselSelected)));

    session.select_vessel(1);
    let err = session.place_own_vessel(7, 0).await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Placement(PlacementError::Invalid(BoardError::OutOfBounds))
    ));

    session.rotate_selected();
    session.place_own_vessel(7, 0).await.unwrap();
    session.select_vessel(2);
    let err = session.place_own_vessel(5, 2).await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Placement(PlacementError::Invalid(BoardError::Overlaps))
    ));
    assert_eq!(session.available_vessels().len(), 4);
    assert_eq!(session.player_board().count_vessel_cells(2), 0);
}

#[tokio::test]
async fn rejected_own_placement_leaves_board_untouched() {
    let (service, mut session) = setup(10);
    session.start_new_game().await.unwrap();
    service.set_reject_placements(true);

    session.select_vessel(3);
    let err = session.place_own_vessel(0, 0).await.unwrap_err();
    assert!(matches!(err, SessionError::Remote(_)));
    assert_eq!(session.status(), "Placement rejected");
    assert_eq!(session.available_vessels().len(), 5);
    assert!(session.player_placed().is_empty());
    assert_eq!(session.player_board().count_vessel_cells(3), 0);
}

#[tokio::test]
async fn unknown_identity_cannot_place() {
    let service = Arc::new(InMemoryMatchService::new("bob"));
    let mut session = MatchSession::new(service, Identity::new("mallory"), SmallRng::seed_from_u64(11));
    session.start_new_game().await.unwrap();

    session.select_vessel(1);
    let err = session.place_own_vessel(0, 0).await.unwrap_err();
    assert!(matches!(err, SessionError::MissingParticipant(_)));
    assert_eq!(session.available_vessels().len(), 5);
}

#[tokio::test]
async fn offline_server_surfaces_status() {
    let (service, mut session) = setup(12);
    service.set_offline(true);

    let err = session.start_new_game().await.unwrap_err();
    assert!(matches!(err, SessionError::Remote(_)));
    assert_eq!(session.status(), "Service unavailable");
    assert_eq!(session.match_id(), None);
}

#[tokio::test]
async fn resume_restores_server_state() {
    let (service, mut first) = playing(13).await;
    let id = first.match_id().unwrap();
    let (row, col) = find_cell(&first, |s| s == CellState::Vessel(5));
    first.fire_at_opponent(row, col).await.unwrap();

    let mut second = MatchSession::new(service, Identity::new(ME), SmallRng::seed_from_u64(14));
    let status = second.resume_match(id).await.unwrap();
    assert_eq!(status, SyncStatus::Settled);
    assert_eq!(second.phase(), Phase::Playing);
    assert_eq!(second.opponent_board().cell(row, col), Some(-5));
    assert_eq!(second.player_board(), first.player_board());
}

/// In-memory server whose shots can be made to hang.
struct StallingService {
    inner: InMemoryMatchService,
    stall_shots: AtomicBool,
}

#[async_trait]
impl MatchService for StallingService {
    async fn create_match(&self, request: NewMatch) -> anyhow::Result<MatchId> {
        self.inner.create_match(request).await
    }

    async fn match_state(&self, match_id: MatchId) -> anyhow::Result<MatchSnapshot> {
        self.inner.match_state(match_id).await
    }

    async fn participants(&self, match_id: MatchId) -> anyhow::Result<Vec<Participant>> {
        self.inner.participants(match_id).await
    }

    async fn place_vessel(
        &self,
        match_id: MatchId,
        participant_id: ParticipantId,
        placement: VesselPlacement,
    ) -> anyhow::Result<()> {
        self.inner.place_vessel(match_id, participant_id, placement).await
    }

    async fn fire_shot(
        &self,
        match_id: MatchId,
        participant_id: ParticipantId,
        shot: ShotRequest,
    ) -> anyhow::Result<ShotResult> {
        if self.stall_shots.load(Ordering::SeqCst) {
            sleep(Duration::from_secs(60)).await;
        }
        self.inner.fire_shot(match_id, participant_id, shot).await
    }

    async fn list_matches(&self) -> anyhow::Result<Vec<MatchSnapshot>> {
        self.inner.list_matches().await
    }

    async fn delete_match(&self, match_id: MatchId) -> anyhow::Result<()> {
        self.inner.delete_match(match_id).await
    }

    async fn vessel_catalog(&self) -> anyhow::Result<Vec<VesselKind>> {
        self.inner.vessel_catalog().await
    }
}

#[tokio::test(start_paused = true)]
async fn cancelled_shot_releases_the_flag() {
    let service = Arc::new(StallingService {
        inner: InMemoryMatchService::new(ME),
        stall_shots: AtomicBool::new(false),
    });
    let mut session = MatchSession::new(service.clone(), Identity::new(ME), SmallRng::seed_from_u64(15));
    session.start_new_game().await.unwrap();
    place_fleet(&mut session).await;
    assert_eq!(session.phase(), Phase::Playing);
    let (row, col) = find_cell(&session, |s| s == CellState::Vessel(3));

    service.stall_shots.store(true, Ordering::SeqCst);
    let cancelled = timeout(Duration::from_secs(1), session.fire_at_opponent(row, col)).await;
    assert!(cancelled.is_err());
    assert!(!session.shot_in_flight());

    service.stall_shots.store(false, Ordering::SeqCst);
    let report = session.fire_at_opponent(row, col).await.unwrap();
    assert_eq!(report.result, ShotResult::Hit);
    assert!(!session.shot_in_flight());
}
