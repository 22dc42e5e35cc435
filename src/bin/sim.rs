use std::sync::Arc;

use battleship_client::{
    CpuStrategy, Identity, InMemoryMatchService, MatchSession, Phase, PlacementOutcome,
};
use rand::{rngs::SmallRng, SeedableRng};
use serde_json::json;

const NICKNAME: &str = "sim";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    battleship_client::init_logging();
    let args: Vec<String> = std::env::args().collect();
    if args.len() > 2 {
        eprintln!("Usage: {} [seed]", args[0]);
        std::process::exit(1);
    }
    let seed: u64 = match args.get(1) {
        Some(s) => s.parse()?,
        None => 1,
    };

    let service = Arc::new(InMemoryMatchService::new(NICKNAME));
    let mut session = MatchSession::new(
        service.clone(),
        Identity::new(NICKNAME),
        SmallRng::seed_from_u64(seed),
    );
    // The simulated human uses the CPU policies with its own stream.
    let mut rng = SmallRng::seed_from_u64(seed.wrapping_add(1));
    let strategy = CpuStrategy::new();

    session.start_new_game().await?;
    for vessel in CpuStrategy::fleet_order(session.available_vessels()) {
        let (row, col, orientation) = strategy.choose_placement(&mut rng, session.player_board(), vessel.size)?;
        session.select_vessel(vessel.vessel_type);
        if vessel.orientation != orientation {
            session.rotate_selected();
        }
        if let PlacementOutcome::FleetComplete(status) = session.place_own_vessel(row, col).await? {
            log::debug!("Fleet complete: {:?}", status);
        }
    }

    let mut player_shots = 0usize;
    let mut cpu_shots = 0usize;
    let mut player_hits = 0usize;
    while session.phase() == Phase::Playing {
        let Some((row, col)) = strategy.choose_target(&mut rng, session.opponent_board()) else {
            break;
        };
        let report = session.fire_at_opponent(row, col).await?;
        player_shots += 1;
        player_hits += usize::from(report.result.is_hit());
        cpu_shots += report.cpu_shots.len();
    }

    let winner = session.winner_nickname().map(str::to_string);
    let result = json!({
        "match": session.match_id(),
        "phase": session.phase(),
        "winner": winner,
        "player": {"shots": player_shots, "hits": player_hits},
        "cpu": {"shots": cpu_shots},
        "shotsFired": service.shots_fired(),
        "cpuPlacementFailures": session.cpu_placement_failures(),
    });

    println!("{}", serde_json::to_string(&result)?);
    Ok(())
}
