use std::sync::Arc;

use battleship_client::{
    CpuStrategy, Identity, InMemoryMatchService, MatchDirectory, MatchService, MatchSession, Phase,
};
use rand::{rngs::SmallRng, SeedableRng};

const ME: &str = "alice";

/// Play a full match against the CPU, firing at random.
async fn play_out(service: Arc<InMemoryMatchService>, seed: u64) {
    let mut session = MatchSession::new(service, Identity::new(ME), SmallRng::seed_from_u64(seed));
    session.start_new_game().await.unwrap();
    let types: Vec<u32> = session.available_vessels().iter().map(|v| v.vessel_type).collect();
    for (i, vessel_type) in types.into_iter().enumerate() {
        session.select_vessel(vessel_type);
        session.place_own_vessel(0, i * 2).await.unwrap();
    }
    let cpu = CpuStrategy::new();
    let mut rng = SmallRng::seed_from_u64(seed + 100);
    while session.phase() == Phase::Playing {
        let (row, col) = cpu.choose_target(&mut rng, session.opponent_board()).unwrap();
        session.fire_at_opponent(row, col).await.unwrap();
    }
}

#[tokio::test]
async fn refresh_delete_and_resume_listing() {
    let service = Arc::new(InMemoryMatchService::new(ME));
    let mut directory = MatchDirectory::new(service.clone());
    assert!(directory.refresh().await.unwrap().is_empty());

    play_out(service.clone(), 1).await;
    let mut pending = MatchSession::new(service.clone(), Identity::new(ME), SmallRng::seed_from_u64(2));
    pending.start_new_game().await.unwrap();
    let pending_id = pending.match_id().unwrap();

    assert_eq!(directory.refresh().await.unwrap().len(), 2);
    let resumable: Vec<u64> = directory.resumable(ME).map(|m| m.id).collect();
    assert_eq!(resumable, vec![pending_id]);
    assert_eq!(directory.resumable("bob").count(), 0);

    let remaining = directory.delete(pending_id).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].phase, Phase::GameOver);
    assert!(directory.delete(pending_id).await.is_err());
    assert_eq!(directory.matches().len(), 1);
}

#[tokio::test]
async fn leaderboard_counts_owner_games() {
    let service = Arc::new(InMemoryMatchService::new(ME));
    for seed in 0..3 {
        play_out(service.clone(), seed).await;
    }
    let cpu_wins = service
        .list_matches()
        .await
        .unwrap()
        .iter()
        .filter(|m| m.winner_nickname() == Some("cpu"))
        .count() as u32;

    let mut directory = MatchDirectory::new(service);
    let table = directory.leaderboard().await.unwrap();
    assert_eq!(table.len(), 1);
    assert_eq!(table[0].nickname, ME);
    assert_eq!(table[0].total_games, 3);
    assert_eq!(table[0].won_games, 3 - cpu_wins);
    assert_eq!(directory.matches().len(), 3);
}
