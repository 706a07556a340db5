//! Scoreboard backend access

pub mod scoreboard;

pub use scoreboard::ScoreboardClient;

use crate::error::ScoreboardResult;
use crate::types::{Team, TeamDraft, TeamPatch};
use async_trait::async_trait;

/// Operations the tracker needs from the scoreboard backend.
///
/// `get_leaderboard` returns teams in backend order (descending score);
/// that order is authoritative for ranking.
#[async_trait]
pub trait ScoreboardApi: Send + Sync {
    async fn get_leaderboard(&self) -> ScoreboardResult<Vec<Team>>;
    async fn get_teams(&self) -> ScoreboardResult<Vec<Team>>;
    async fn get_team(&self, id: &str) -> ScoreboardResult<Team>;
    async fn create_team(&self, draft: &TeamDraft) -> ScoreboardResult<Team>;
    async fn update_team(&self, id: &str, draft: &TeamDraft) -> ScoreboardResult<Team>;
    async fn patch_team(&self, id: &str, patch: &TeamPatch) -> ScoreboardResult<Team>;
    async fn delete_team(&self, id: &str) -> ScoreboardResult<()>;
    /// Backend-computed statistics, passed through untouched
    async fn get_stats(&self) -> ScoreboardResult<serde_json::Value>;
}
