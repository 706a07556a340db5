//! Scoreboard REST client
//!
//! Talks to the CRUD backend (`/teams/`, `/leaderboard/`, `/stats/`).
//! Payloads may be wrapped in a `{ "data": ... }` envelope or returned bare.

use async_trait::async_trait;
use reqwest::{Client, Method, Response, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use super::ScoreboardApi;
use crate::config::{RetryPolicy, TrackerConfig};
use crate::error::{ScoreboardError, ScoreboardResult};
use crate::types::{Team, TeamDraft, TeamPatch};

/// HTTP client for the scoreboard backend
#[derive(Clone)]
pub struct ScoreboardClient {
    client: Client,
    base_url: Url,
    retry: RetryPolicy,
}

impl ScoreboardClient {
    pub fn new(config: &TrackerConfig) -> ScoreboardResult<Self> {
        let client = Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| ScoreboardError::Network(format!("Failed to build HTTP client: {}", e)))?;

        let base_url = Url::parse(config.api_url.trim_end_matches('/'))
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| ScoreboardError::Network(format!("Invalid API URL: {}", config.api_url)))?;

        Ok(Self {
            client,
            base_url,
            retry: config.retry,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    /// `<base>/<segments>/`, each segment percent-encoded
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments).push("");
        }
        url
    }

    /// Send a request, retrying transport failures per the retry policy.
    /// HTTP error statuses are never retried.
    async fn send(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&serde_json::Value>,
    ) -> ScoreboardResult<Response> {
        let url = self.url(segments);
        let mut attempt = 0u32;

        loop {
            debug!(%method, %url, attempt, "Scoreboard request");
            let mut request = self.client.request(method.clone(), url.clone());
            if let Some(body) = body {
                request = request.json(body);
            }

            match request.send().await {
                Ok(resp) => return check_status(resp).await,
                Err(err) if is_transient(&err) && attempt < self.retry.max_retries => {
                    attempt += 1;
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        %url,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Retrying scoreboard request"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&serde_json::Value>,
    ) -> ScoreboardResult<T> {
        let resp = self.send(method, segments, body).await?;
        let value: serde_json::Value = resp.json().await?;
        unwrap_payload(value)
    }
}

fn to_body<T: Serialize>(value: &T) -> ScoreboardResult<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| ScoreboardError::Decode(e.to_string()))
}

fn is_transient(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}

async fn check_status(resp: Response) -> ScoreboardResult<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(ScoreboardError::Api {
        status: status.as_u16(),
        message: error_message(&body)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("Request failed").to_string()),
    })
}

/// Pull a human-readable message out of an error body
pub(crate) fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["message", "detail", "error"]
        .iter()
        .find_map(|key| value.get(key).and_then(|v| v.as_str()))
        .map(str::to_string)
}

/// Accept both `{ "data": payload }` and a bare payload
pub(crate) fn unwrap_payload<T: DeserializeOwned>(value: serde_json::Value) -> ScoreboardResult<T> {
    let payload = match value {
        serde_json::Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or_default()
        }
        other => other,
    };
    serde_json::from_value(payload).map_err(|e| ScoreboardError::Decode(e.to_string()))
}

#[async_trait]
impl ScoreboardApi for ScoreboardClient {
    /// GET /leaderboard/
    async fn get_leaderboard(&self) -> ScoreboardResult<Vec<Team>> {
        let teams: Vec<Team> = self.fetch(Method::GET, &["leaderboard"], None).await?;
        debug!(count = teams.len(), "Leaderboard fetched");
        Ok(teams)
    }

    /// GET /teams/
    async fn get_teams(&self) -> ScoreboardResult<Vec<Team>> {
        let teams: Vec<Team> = self.fetch(Method::GET, &["teams"], None).await?;
        debug!(count = teams.len(), "Teams fetched");
        Ok(teams)
    }

    async fn get_team(&self, id: &str) -> ScoreboardResult<Team> {
        self.fetch(Method::GET, &["teams", id], None).await
    }

    async fn create_team(&self, draft: &TeamDraft) -> ScoreboardResult<Team> {
        self.fetch(Method::POST, &["teams"], Some(&to_body(draft)?)).await
    }

    async fn update_team(&self, id: &str, draft: &TeamDraft) -> ScoreboardResult<Team> {
        self.fetch(Method::PUT, &["teams", id], Some(&to_body(draft)?))
            .await
    }

    async fn patch_team(&self, id: &str, patch: &TeamPatch) -> ScoreboardResult<Team> {
        self.fetch(Method::PATCH, &["teams", id], Some(&to_body(patch)?))
            .await
    }

    async fn delete_team(&self, id: &str) -> ScoreboardResult<()> {
        self.send(Method::DELETE, &["teams", id], None).await?;
        Ok(())
    }

    async fn get_stats(&self) -> ScoreboardResult<serde_json::Value> {
        self.fetch(Method::GET, &["stats"], None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unwrap_payload_envelope_and_bare() {
        let wrapped = serde_json::json!({ "data": [{ "id": 1, "name": "Owls" }] });
        let teams: Vec<Team> = unwrap_payload(wrapped).unwrap();
        assert_eq!(teams.len(), 1);
        assert_eq!(teams[0].id, "1");

        let bare = serde_json::json!([{ "id": "B", "name": "Bats", "score": 5 }]);
        let teams: Vec<Team> = unwrap_payload(bare).unwrap();
        assert_eq!(teams[0].score, 5);
    }

    #[test]
    fn test_unwrap_payload_rejects_wrong_shape() {
        let result: ScoreboardResult<Vec<Team>> = unwrap_payload(serde_json::json!({ "teams": [] }));
        assert!(matches!(result, Err(ScoreboardError::Decode(_))));
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            error_message(r#"{"message": "Team not found"}"#).as_deref(),
            Some("Team not found")
        );
        assert_eq!(error_message(r#"{"detail": "Nope"}"#).as_deref(), Some("Nope"));
        assert_eq!(error_message("<html>"), None);
    }

    #[test]
    fn test_url_joining() {
        let config = TrackerConfig {
            api_url: "http://localhost:8000/api/".into(),
            ..TrackerConfig::default()
        };
        let client = ScoreboardClient::new(&config).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000/api");
        assert_eq!(client.url(&["teams"]).as_str(), "http://localhost:8000/api/teams/");
        assert_eq!(
            client.url(&["teams", "7"]).as_str(),
            "http://localhost:8000/api/teams/7/"
        );
    }

    #[test]
    fn test_team_id_is_percent_encoded() {
        let client = ScoreboardClient::new(&TrackerConfig::default()).unwrap();
        assert_eq!(
            client.url(&["teams", "a/b?c#d"]).as_str(),
            "http://localhost:8000/api/teams/a%2Fb%3Fc%23d/"
        );
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let config = TrackerConfig {
            api_url: "not a url".into(),
            ..TrackerConfig::default()
        };
        assert!(ScoreboardClient::new(&config).is_err());
    }
}
