//! Background polling while we wait for the opponent.
//!
//! At most one poll task is alive per [`SyncLoop`]. Arming again aborts
//! the previous task and bumps a generation counter so a task that is
//! already past its sleep notices it has been superseded before touching
//! the session.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use log::{debug, warn};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Duration;

use crate::domain::MatchId;
use crate::session::{MatchSession, SyncStatus};

/// Session shared between the UI and the poll task.
pub type SharedSession = Arc<Mutex<MatchSession>>;

pub struct SyncLoop {
    interval: Duration,
    handle: Option<JoinHandle<()>>,
    generation: Arc<AtomicU64>,
    polls: Arc<AtomicUsize>,
}

impl SyncLoop {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            handle: None,
            generation: Arc::new(AtomicU64::new(0)),
            polls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start polling `match_id` every interval until the fetch stops
    /// reporting [`SyncStatus::AwaitingOpponent`]. Replaces any running poll.
    pub fn arm(&mut self, session: SharedSession, match_id: MatchId) {
        self.cancel();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let current = Arc::clone(&self.generation);
        let polls = Arc::clone(&self.polls);
        let interval = self.interval;
        debug!("Polling match {} every {:?}", match_id, interval);

        self.handle = Some(tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                let mut session = session.lock().await;
                if current.load(Ordering::SeqCst) != generation {
                    break;
                }
                polls.fetch_add(1, Ordering::SeqCst);
                match session.fetch_state(match_id).await {
                    Ok(SyncStatus::AwaitingOpponent) => continue,
                    Ok(status) => {
                        debug!("Polling match {} finished: {:?}", match_id, status);
                        break;
                    }
                    Err(e) => {
                        warn!("Polling match {} stopped: {}", match_id, e);
                        break;
                    }
                }
            }
        }));
    }

    /// Stop the running poll, if any.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.generation.fetch_add(1, Ordering::SeqCst);
            handle.abort();
        }
    }

    /// Whether a poll task is still running.
    pub fn is_armed(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Number of fetches performed by poll tasks so far.
    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

impl Drop for SyncLoop {
    fn drop(&mut self) {
        self.cancel();
    }
}
