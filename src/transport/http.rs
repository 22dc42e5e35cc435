//! REST client for the match server.

use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, bail, Context};
use log::{debug, info, warn};
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::domain::{
    CreatedMatch, MatchId, MatchSnapshot, NewMatch, Participant, ParticipantId, ShotOutcome,
    ShotRequest, ShotResult, VesselPlacement,
};
use crate::protocol::MatchService;
use crate::vessel::VesselKind;

/// Access and refresh tokens for bearer authentication.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Tokens {
    pub access: Option<String>,
    pub refresh: Option<String>,
}

/// [`MatchService`] backed by the server's JSON API.
///
/// A `401` triggers one token refresh and a retry; if the refresh is
/// refused the tokens are dropped and the call fails.
pub struct HttpMatchService {
    base_url: String,
    client: reqwest::Client,
    tokens: Mutex<Tokens>,
}

impl HttpMatchService {
    pub fn new(base_url: impl Into<String>, tokens: Tokens) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            tokens: Mutex::new(tokens),
        }
    }

    /// Exchange credentials for tokens and build a client around them.
    pub async fn login(base_url: impl Into<String>, username: &str, password: &str) -> anyhow::Result<Self> {
        let service = Self::new(base_url, Tokens::default());
        let response = service
            .client
            .post(service.url("/api/token/"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .context("login request failed")?;
        let tokens: Tokens = expect_success(response).await?.json().await?;
        info!("Logged in as {}", username);
        *service.tokens() = tokens;
        Ok(service)
    }

    /// Current tokens, e.g. to persist them between runs.
    pub fn current_tokens(&self) -> Tokens {
        self.tokens().clone()
    }

    fn tokens(&self) -> MutexGuard<'_, Tokens> {
        self.tokens.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    async fn send_once(&self, method: &Method, path: &str, body: Option<&Value>) -> anyhow::Result<Response> {
        let mut request = self.client.request(method.clone(), self.url(path));
        let access = self.tokens().access.clone();
        if let Some(access) = access {
            request = request.bearer_auth(access);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }

    /// Ask for a new access token. Drops both tokens if refused.
    async fn refresh_access(&self) -> anyhow::Result<()> {
        let refresh = self
            .tokens()
            .refresh
            .clone()
            .ok_or_else(|| anyhow!("not logged in"))?;
        let response = self
            .client
            .post(self.url("/api/token/refresh/"))
            .json(&json!({ "refresh": refresh }))
            .send()
            .await?;
        match expect_success(response).await {
            Ok(response) => {
                let renewed: Tokens = response.json().await?;
                let access = renewed
                    .access
                    .ok_or_else(|| anyhow!("refresh response carried no access token"))?;
                self.tokens().access = Some(access);
                debug!("Access token refreshed");
                Ok(())
            }
            Err(e) => {
                warn!("Token refresh refused, logging out: {}", e);
                *self.tokens() = Tokens::default();
                Err(e)
            }
        }
    }

    async fn execute(&self, method: Method, path: &str, body: Option<Value>) -> anyhow::Result<Response> {
        debug!("{} {}", method, path);
        let mut response = self.send_once(&method, path, body.as_ref()).await?;
        let can_refresh = self.tokens().refresh.is_some();
        if response.status() == StatusCode::UNAUTHORIZED && can_refresh {
            self.refresh_access()
                .await
                .context("authorization failed")?;
            response = self.send_once(&method, path, body.as_ref()).await?;
        }
        expect_success(response).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> anyhow::Result<T> {
        Ok(self.execute(Method::GET, path, None).await?.json().await?)
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: Value) -> anyhow::Result<T> {
        Ok(self.execute(Method::POST, path, Some(body)).await?.json().await?)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Pass successful responses through; turn the rest into errors carrying
/// the server's explanation.
async fn expect_success(response: Response) -> anyhow::Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    bail!("{}", error_message(status, &body))
}

/// `detail` field of a JSON error body, the raw body, or the status line.
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        if let Some(detail) = value.get("detail").and_then(Value::as_str) {
            return detail.to_string();
        }
    }
    let body = body.trim();
    if body.is_empty() {
        format!("HTTP {}", status)
    } else {
        body.to_string()
    }
}

#[async_trait::async_trait]
impl MatchService for HttpMatchService {
    async fn create_match(&self, request: NewMatch) -> anyhow::Result<MatchId> {
        let created: CreatedMatch = self.post("/api/v1/games/", serde_json::to_value(request)?).await?;
        Ok(created.id)
    }

    async fn match_state(&self, match_id: MatchId) -> anyhow::Result<MatchSnapshot> {
        self.get(&format!("/api/v1/games/{}/", match_id)).await
    }

    async fn participants(&self, match_id: MatchId) -> anyhow::Result<Vec<Participant>> {
        self.get(&format!("/api/v1/games/{}/players/", match_id)).await
    }

    async fn place_vessel(
        &self,
        match_id: MatchId,
        participant_id: ParticipantId,
        placement: VesselPlacement,
    ) -> anyhow::Result<()> {
        let path = format!("/api/v1/games/{}/players/{}/vessels/", match_id, participant_id);
        debug!("Placing vessel {:?}", placement);
        self.execute(Method::POST, &path, Some(serde_json::to_value(placement)?))
            .await?;
        Ok(())
    }

    async fn fire_shot(
        &self,
        match_id: MatchId,
        participant_id: ParticipantId,
        shot: ShotRequest,
    ) -> anyhow::Result<ShotResult> {
        let path = format!("/api/v1/games/{}/players/{}/shots/", match_id, participant_id);
        let outcome: ShotOutcome = self.post(&path, serde_json::to_value(shot)?).await?;
        Ok(outcome.result)
    }

    async fn list_matches(&self) -> anyhow::Result<Vec<MatchSnapshot>> {
        self.get("/api/v1/games/").await
    }

    async fn delete_match(&self, match_id: MatchId) -> anyhow::Result<()> {
        self.execute(Method::DELETE, &format!("/api/v1/games/{}/", match_id), None)
            .await?;
        Ok(())
    }

    async fn vessel_catalog(&self) -> anyhow::Result<Vec<VesselKind>> {
        self.get("/api/v1/vessels/").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_without_double_slashes() {
        assert_eq!(join_url("http://h:8000/", "/api/v1/games/"), "http://h:8000/api/v1/games/");
        assert_eq!(join_url("http://h", "api/token/"), "http://h/api/token/");
        let service = HttpMatchService::new("http://h/", Tokens::default());
        assert_eq!(service.url("/api/v1/vessels/"), "http://h/api/v1/vessels/");
    }

    #[test]
    fn error_prefers_detail() {
        assert_eq!(
            error_message(StatusCode::BAD_REQUEST, r#"{"detail": "Not your turn"}"#),
            "Not your turn"
        );
        assert_eq!(
            error_message(StatusCode::BAD_REQUEST, r#"{"row": ["required"]}"#),
            r#"{"row": ["required"]}"#
        );
        assert_eq!(error_message(StatusCode::NOT_FOUND, "  "), "HTTP 404 Not Found");
    }

    #[test]
    fn tokens_decode_from_login_response() {
        let tokens: Tokens = serde_json::from_str(r#"{"access": "a", "refresh": "r"}"#).unwrap();
        assert_eq!(tokens.access.as_deref(), Some("a"));
        let renewed: Tokens = serde_json::from_str(r#"{"access": "b"}"#).unwrap();
        assert!(renewed.refresh.is_none());
    }
}
