use crate::domain::{
    MatchId, MatchSnapshot, NewMatch, Participant, ParticipantId, ShotRequest, ShotResult,
    VesselPlacement,
};
use crate::vessel::VesselKind;

/// Remote source of truth for matches.
///
/// Implementations carry their own authentication; any failure, including
/// an authorization failure after retry, surfaces as an error.
#[async_trait::async_trait]
pub trait MatchService: Send + Sync {
    /// Create a match and return its id.
    async fn create_match(&self, request: NewMatch) -> anyhow::Result<MatchId>;

    async fn match_state(&self, match_id: MatchId) -> anyhow::Result<MatchSnapshot>;

    /// Participants of a match, in server order.
    async fn participants(&self, match_id: MatchId) -> anyhow::Result<Vec<Participant>>;

    async fn place_vessel(
        &self,
        match_id: MatchId,
        participant_id: ParticipantId,
        placement: VesselPlacement,
    ) -> anyhow::Result<()>;

    async fn fire_shot(
        &self,
        match_id: MatchId,
        participant_id: ParticipantId,
        shot: ShotRequest,
    ) -> anyhow::Result<ShotResult>;

    async fn list_matches(&self) -> anyhow::Result<Vec<MatchSnapshot>>;

    async fn delete_match(&self, match_id: MatchId) -> anyhow::Result<()>;

    async fn vessel_catalog(&self) -> anyhow::Result<Vec<VesselKind>>;
}
