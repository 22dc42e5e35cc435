use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{anyhow, bail};
use battleship_client::cli::{Command, HELP};
use battleship_client::ui::{coord_to_string, render_session};
use battleship_client::{
    init_logging, seeded_rng, ClientConfig, Identity, InMemoryMatchService, MatchController,
    MatchDirectory, MatchId, MatchService, Phase, PlacementOutcome, SyncStatus,
};
#[cfg(feature = "http")]
use battleship_client::{HttpMatchService, Tokens};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Base URL of the match server.
    #[arg(long, global = true, env = "BATTLESHIP_API_URL")]
    api_url: Option<String>,
    /// Nickname of the logged-in user.
    #[arg(long, global = true, env = "BATTLESHIP_USER")]
    user: Option<String>,
    #[arg(long, global = true, help = "Fix RNG seed for reproducible games (e.g., --seed 12345)")]
    seed: Option<u64>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play against the CPU on the match server.
    Play {
        /// Resume this match instead of starting a new one.
        #[arg(long)]
        game: Option<MatchId>,
    },
    /// Play against the CPU with an in-process server.
    Local,
    /// List matches on the server.
    List,
    /// Delete a match.
    Delete { id: MatchId },
    /// Show the top players.
    Leaderboard,
    /// Exchange credentials for tokens and print them as environment exports.
    Login { username: String, password: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();
    let mut config = ClientConfig::from_env();
    if let Some(url) = cli.api_url {
        config.api_url = url;
    }
    if cli.user.is_some() {
        config.username = cli.user;
    }
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }

    match cli.command {
        Commands::Local => {
            if let Some(s) = config.seed {
                println!("Using fixed seed: {} (game will be reproducible)", s);
            }
            let nickname = config.username.clone().unwrap_or_else(|| "player".to_string());
            let service: Arc<dyn MatchService> = Arc::new(InMemoryMatchService::new(&nickname));
            play(service, &config, nickname, None).await
        }
        Commands::Play { game } => {
            let nickname = config
                .username
                .clone()
                .ok_or_else(|| anyhow!("--user (or BATTLESHIP_USER) is required to play"))?;
            let service = remote(&config)?;
            play(service, &config, nickname, game).await
        }
        Commands::List => {
            let mut directory = MatchDirectory::new(remote(&config)?);
            let matches = directory.refresh().await?;
            if matches.is_empty() {
                println!("No matches.");
            }
            for m in matches {
                println!(
                    "#{:<5} {:<10} owner={:<12} winner={}",
                    m.id,
                    m.phase.to_string(),
                    m.owner.as_deref().unwrap_or("-"),
                    m.winner_nickname().unwrap_or("-"),
                );
            }
            if let Some(user) = config.username.as_deref() {
                let resumable: Vec<String> = directory.resumable(user).map(|m| m.id.to_string()).collect();
                if !resumable.is_empty() {
                    println!("Resume with `play --game ID`: {}", resumable.join(", "));
                }
            }
            Ok(())
        }
        Commands::Delete { id } => {
            let mut directory = MatchDirectory::new(remote(&config)?);
            let remaining = directory.delete(id).await?.len();
            println!("Deleted match {} ({} remaining)", id, remaining);
            Ok(())
        }
        Commands::Leaderboard => {
            let mut directory = MatchDirectory::new(remote(&config)?);
            let standings = directory.leaderboard().await?;
            println!("{:<4} {:<16} {:>6} {:>6} {:>7}", "#", "Player", "Games", "Won", "Score");
            for (i, s) in standings.iter().enumerate() {
                println!(
                    "{:<4} {:<16} {:>6} {:>6} {:>7.2}",
                    i + 1,
                    s.nickname,
                    s.total_games,
                    s.won_games,
                    s.score
                );
            }
            Ok(())
        }
        Commands::Login { username, password } => login(&config, &username, &password).await,
    }
}

#[cfg(feature = "http")]
fn remote(config: &ClientConfig) -> anyhow::Result<Arc<dyn MatchService>> {
    let tokens = Tokens {
        access: config.access_token.clone(),
        refresh: config.refresh_token.clone(),
    };
    Ok(Arc::new(HttpMatchService::new(config.api_url.clone(), tokens)))
}

#[cfg(not(feature = "http"))]
fn remote(_config: &ClientConfig) -> anyhow::Result<Arc<dyn MatchService>> {
    bail!("built without the `http` feature; only `local` is available")
}

#[cfg(feature = "http")]
async fn login(config: &ClientConfig, username: &str, password: &str) -> anyhow::Result<()> {
    let service = HttpMatchService::login(config.api_url.clone(), username, password).await?;
    let tokens = service.current_tokens();
    println!("export BATTLESHIP_USER={}", username);
    if let Some(access) = tokens.access {
        println!("export BATTLESHIP_ACCESS_TOKEN={}", access);
    }
    if let Some(refresh) = tokens.refresh {
        println!("export BATTLESHIP_REFRESH_TOKEN={}", refresh);
    }
    Ok(())
}

#[cfg(not(feature = "http"))]
async fn login(_config: &ClientConfig, _username: &str, _password: &str) -> anyhow::Result<()> {
    bail!("built without the `http` feature")
}

/// Read one line from stdin without stalling the poll task.
async fn read_line() -> anyhow::Result<Option<String>> {
    tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        let read = io::stdin().lock().read_line(&mut line)?;
        Ok::<_, io::Error>((read > 0).then_some(line))
    })
    .await?
    .map_err(Into::into)
}

async fn play(
    service: Arc<dyn MatchService>,
    config: &ClientConfig,
    nickname: String,
    resume: Option<MatchId>,
) -> anyhow::Result<()> {
    let rng = seeded_rng(config.seed);
    let mut controller = MatchController::new(service, Identity::new(nickname), rng, config.poll_interval);

    let started = match resume {
        Some(id) => controller.resume(id).await,
        None => controller.new_game().await,
    };
    if let Err(e) = started {
        bail!("could not start the match: {}", e);
    }
    println!("{}", render_session(&*controller.session().await));
    println!("Type 'help' for commands.");

    loop {
        print!("> ");
        io::stdout().flush()?;
        let Some(line) = read_line().await? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }
        let size = controller.session().await.player_board().size();
        let command = match Command::parse(&line, size) {
            Ok(command) => command,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };

        let outcome = match command {
            Command::Quit => break,
            Command::Help => {
                println!("{}", HELP);
                continue;
            }
            Command::Show => Ok(()),
            Command::Select(vessel_type) => {
                if !controller.select_vessel(vessel_type).await {
                    println!("Vessel {} is not available", vessel_type);
                }
                Ok(())
            }
            Command::Rotate => {
                controller.rotate().await;
                Ok(())
            }
            Command::Refresh => controller.refresh().await.map(|_| ()),
            Command::Place { row, col } => controller.place_vessel(row, col).await.map(|outcome| {
                if outcome == PlacementOutcome::FleetComplete(SyncStatus::AwaitingOpponent) {
                    println!("Fleet placed. Waiting for the opponent...");
                }
            }),
            Command::Fire { row, col } => controller.fire(row, col).await.map(|report| {
                println!("{}: {:?}", coord_to_string(row, col), report.result);
                for shot in &report.cpu_shots {
                    println!("CPU fires at {}: {:?}", coord_to_string(shot.row, shot.col), shot.result);
                }
            }),
        };
        if let Err(e) = outcome {
            println!("{}", e);
        }

        let session = controller.session().await;
        println!("{}", render_session(&session));
        if session.phase() == Phase::GameOver {
            break;
        }
    }
    Ok(())
}
