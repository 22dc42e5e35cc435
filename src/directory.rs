//! Cached list of matches feeding the resume view.

use std::sync::Arc;

use log::{debug, info};

use crate::domain::{MatchId, MatchSnapshot, Phase};
use crate::leaderboard::{leaderboard, Standing};
use crate::protocol::MatchService;

pub struct MatchDirectory {
    service: Arc<dyn MatchService>,
    matches: Vec<MatchSnapshot>,
}

impl MatchDirectory {
    pub fn new(service: Arc<dyn MatchService>) -> Self {
        Self {
            service,
            matches: Vec::new(),
        }
    }

    /// Reload the cached list from the server.
    pub async fn refresh(&mut self) -> anyhow::Result<&[MatchSnapshot]> {
        self.matches = self.service.list_matches().await?;
        debug!("{} matches listed", self.matches.len());
        Ok(&self.matches)
    }

    /// Delete a match and reload the list.
    pub async fn delete(&mut self, match_id: MatchId) -> anyhow::Result<&[MatchSnapshot]> {
        self.service.delete_match(match_id).await?;
        info!("Match {} deleted", match_id);
        self.refresh().await
    }

    pub fn matches(&self) -> &[MatchSnapshot] {
        &self.matches
    }

    /// Cached matches owned by `owner` that are not over yet.
    pub fn resumable<'a>(&'a self, owner: &'a str) -> impl Iterator<Item = &'a MatchSnapshot> + 'a {
        self.matches
            .iter()
            .filter(move |m| m.owner.as_deref() == Some(owner) && m.phase != Phase::GameOver)
    }

    /// Leaderboard over a freshly fetched match list.
    pub async fn leaderboard(&mut self) -> anyhow::Result<Vec<Standing>> {
        let matches = self.refresh().await?;
        Ok(leaderboard(matches))
    }
}
