//! UI-facing handle over a shared [`MatchSession`].

use std::sync::Arc;

use log::debug;
use rand::rngs::SmallRng;
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::Duration;

use crate::common::SessionError;
use crate::domain::MatchId;
use crate::protocol::MatchService;
use crate::session::{Identity, MatchSession, PlacementOutcome, ShotReport, SyncStatus};
use crate::sync::{SharedSession, SyncLoop};

/// Runs session actions and keeps the poll loop armed whenever the
/// session is waiting on the opponent.
pub struct MatchController {
    session: SharedSession,
    sync: SyncLoop,
}

impl MatchController {
    pub fn new(
        service: Arc<dyn MatchService>,
        identity: Identity,
        rng: SmallRng,
        poll_interval: Duration,
    ) -> Self {
        Self::from_session(MatchSession::new(service, identity, rng), poll_interval)
    }

    pub fn from_session(session: MatchSession, poll_interval: Duration) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            sync: SyncLoop::new(poll_interval),
        }
    }

    /// Lock the session for reading or direct use.
    pub async fn session(&self) -> MutexGuard<'_, MatchSession> {
        self.session.lock().await
    }

    pub fn shared(&self) -> SharedSession {
        Arc::clone(&self.session)
    }

    pub fn sync_loop(&self) -> &SyncLoop {
        &self.sync
    }

    fn follow(&mut self, status: SyncStatus, match_id: Option<MatchId>) {
        match (status, match_id) {
            (SyncStatus::AwaitingOpponent, Some(id)) => {
                debug!("Arming poll for match {}", id);
                self.sync.arm(self.shared(), id);
            }
            _ => self.sync.cancel(),
        }
    }

    pub async fn new_game(&mut self) -> Result<SyncStatus, SessionError> {
        self.sync.cancel();
        let (result, match_id) = {
            let mut session = self.session.lock().await;
            let result = session.start_new_game().await;
            (result, session.match_id())
        };
        let status = result?;
        self.follow(status, match_id);
        Ok(status)
    }

    pub async fn resume(&mut self, match_id: MatchId) -> Result<SyncStatus, SessionError> {
        self.sync.cancel();
        let status = self.session.lock().await.resume_match(match_id).await?;
        self.follow(status, Some(match_id));
        Ok(status)
    }

    /// Fetch the current match again.
    pub async fn refresh(&mut self) -> Result<SyncStatus, SessionError> {
        let (status, match_id) = {
            let mut session = self.session.lock().await;
            let match_id = session.match_id().ok_or(SessionError::NoActiveMatch)?;
            (session.fetch_state(match_id).await?, match_id)
        };
        self.follow(status, Some(match_id));
        Ok(status)
    }

    pub async fn select_vessel(&self, vessel_type: u32) -> bool {
        self.session.lock().await.select_vessel(vessel_type).is_some()
    }

    pub async fn rotate(&self) {
        self.session.lock().await.rotate_selected();
    }

    pub async fn place_vessel(&mut self, row: usize, col: usize) -> Result<PlacementOutcome, SessionError> {
        let (outcome, match_id) = {
            let mut session = self.session.lock().await;
            let outcome = session.place_own_vessel(row, col).await?;
            (outcome, session.match_id())
        };
        if let PlacementOutcome::FleetComplete(status) = outcome {
            self.follow(status, match_id);
        }
        Ok(outcome)
    }

    pub async fn fire(&mut self, row: usize, col: usize) -> Result<ShotReport, SessionError> {
        let (report, match_id) = {
            let mut session = self.session.lock().await;
            let report = session.fire_at_opponent(row, col).await?;
            (report, session.match_id())
        };
        self.follow(report.sync, match_id);
        Ok(report)
    }
}
