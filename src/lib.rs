mod board;
pub mod cli;
mod common;
mod config;
pub mod controller;
pub mod cpu;
pub mod directory;
pub mod domain;
pub mod leaderboard;
mod logging;
pub mod protocol;
pub mod session;
pub mod sync;
pub mod transport;
pub mod ui;
mod vessel;

pub use board::*;
pub use common::*;
pub use config::*;
pub use controller::MatchController;
pub use cpu::CpuStrategy;
pub use directory::MatchDirectory;
pub use domain::*;
pub use leaderboard::{leaderboard, Standing};
pub use logging::init_logging;
pub use protocol::MatchService;
pub use session::{
    CpuShot, Identity, MatchSession, PlacementOutcome, ShotReport, SyncStatus,
};
pub use sync::{SharedSession, SyncLoop};
pub use transport::in_memory::{standard_catalog, InMemoryMatchService};
#[cfg(feature = "http")]
pub use transport::http::{HttpMatchService, Tokens};
pub use vessel::*;
