//! Leaderboard store: the fetch-and-reconcile path shared by the poller
//! and manual refreshes.
//!
//! Refreshes are serialized: the reconciler sits behind an async mutex held
//! for the whole fetch, so overlapping triggers queue up (FIFO) instead of
//! racing, and the snapshot always reflects the latest started refresh that
//! succeeded. A failed fetch leaves the snapshot and rank history untouched.
//!
//! Board, team list, error and timestamp share one lock, so a snapshot never
//! mixes the results of two refreshes.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::api::ScoreboardApi;
use crate::error::{ScoreboardError, ScoreboardResult};
use crate::poller::{poll_callback, PollCallback};
use crate::reconciler::{RankHistory, Reconciler};
use crate::stats::DashboardStats;
use crate::types::{RankedTeam, Team, TeamDraft, TeamPatch};

/// Point-in-time view handed to renderers
#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardSnapshot {
    pub leaderboard: Vec<RankedTeam>,
    pub teams: Vec<Team>,
    pub is_loading: bool,
    pub last_error: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct BoardState {
    leaderboard: Vec<RankedTeam>,
    teams: Vec<Team>,
    last_error: Option<String>,
    last_updated: Option<DateTime<Utc>>,
}

pub struct LeaderboardStore {
    api: Arc<dyn ScoreboardApi>,
    reconciler: Mutex<Reconciler>,
    state: RwLock<BoardState>,
    in_flight: AtomicU32,
}

/// Counts a request as in flight until dropped (also on cancellation)
struct InFlight<'a>(&'a AtomicU32);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicU32) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl LeaderboardStore {
    pub fn new(api: Arc<dyn ScoreboardApi>) -> Self {
        Self {
            api,
            reconciler: Mutex::new(Reconciler::new()),
            state: RwLock::new(BoardState::default()),
            in_flight: AtomicU32::new(0),
        }
    }

    pub fn snapshot(&self) -> LeaderboardSnapshot {
        let state = self.state.read().unwrap();
        LeaderboardSnapshot {
            leaderboard: state.leaderboard.clone(),
            teams: state.teams.clone(),
            is_loading: self.is_loading(),
            last_error: state.last_error.clone(),
            last_updated: state.last_updated,
        }
    }

    pub fn leaderboard(&self) -> Vec<RankedTeam> {
        self.state.read().unwrap().leaderboard.clone()
    }

    pub fn teams(&self) -> Vec<Team> {
        self.state.read().unwrap().teams.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    pub fn last_error(&self) -> Option<String> {
        self.state.read().unwrap().last_error.clone()
    }

    /// Copy of the current rank history (waits for an in-flight refresh)
    pub async fn rank_history(&self) -> RankHistory {
        self.reconciler.lock().await.history().clone()
    }

    pub fn stats(&self) -> DashboardStats {
        let state = self.state.read().unwrap();
        DashboardStats::compute(&state.teams, &state.leaderboard)
    }

    /// Fetch the leaderboard, rank it and replace the snapshot.
    pub async fn refresh(&self) -> ScoreboardResult<Vec<RankedTeam>> {
        let _in_flight = InFlight::enter(&self.in_flight);
        let mut reconciler = self.reconciler.lock().await;

        let teams = match self.api.get_leaderboard().await {
            Ok(teams) => teams,
            Err(e) => {
                warn!(error = %e, "Leaderboard refresh failed");
                self.record_error(&e);
                return Err(e);
            }
        };

        let ranked = reconciler.apply(teams);
        {
            let mut state = self.state.write().unwrap();
            state.leaderboard = ranked.clone();
            state.last_updated = Some(Utc::now());
            state.last_error = None;
        }
        drop(reconciler);

        let movers = ranked.iter().filter(|r| r.rank != r.previous_rank).count();
        info!(teams = ranked.len(), movers, "Leaderboard refreshed");
        Ok(ranked)
    }

    /// Fetch the plain team list (admin and stats views)
    pub async fn refresh_teams(&self) -> ScoreboardResult<Vec<Team>> {
        let _in_flight = InFlight::enter(&self.in_flight);
        match self.api.get_teams().await {
            Ok(teams) => {
                let mut state = self.state.write().unwrap();
                state.teams = teams.clone();
                state.last_error = None;
                Ok(teams)
            }
            Err(e) => {
                warn!(error = %e, "Team list refresh failed");
                self.record_error(&e);
                Err(e)
            }
        }
    }

    /// Refresh teams then leaderboard; errors are recorded, not returned
    pub async fn refresh_all(&self) {
        let _ = self.refresh_teams().await;
        let _ = self.refresh().await;
    }

    pub async fn create_team(&self, draft: &TeamDraft) -> ScoreboardResult<Team> {
        let draft = draft.normalized().map_err(ScoreboardError::Validation)?;
        let team = self.mutation(self.api.create_team(&draft).await)?;
        info!(id = %team.id, name = %team.name, "Team created");
        self.refresh_all().await;
        Ok(team)
    }

    pub async fn update_team(&self, id: &str, draft: &TeamDraft) -> ScoreboardResult<Team> {
        let draft = draft.normalized().map_err(ScoreboardError::Validation)?;
        let team = self.mutation(self.api.update_team(id, &draft).await)?;
        info!(id = %team.id, "Team updated");
        self.refresh_all().await;
        Ok(team)
    }

    pub async fn patch_team(&self, id: &str, patch: &TeamPatch) -> ScoreboardResult<Team> {
        let patch = patch.normalized().map_err(ScoreboardError::Validation)?;
        let team = self.mutation(self.api.patch_team(id, &patch).await)?;
        info!(id = %team.id, score = team.score, "Team patched");
        self.refresh_all().await;
        Ok(team)
    }

    pub async fn delete_team(&self, id: &str) -> ScoreboardResult<()> {
        self.mutation(self.api.delete_team(id).await)?;
        info!(id, "Team deleted");
        self.refresh_all().await;
        Ok(())
    }

    /// Single team lookup, passed through to the backend
    pub async fn fetch_team(&self, id: &str) -> ScoreboardResult<Team> {
        self.api.get_team(id).await
    }

    /// Backend statistics, passed through
    pub async fn backend_stats(&self) -> ScoreboardResult<serde_json::Value> {
        self.api.get_stats().await
    }

    /// A poller callback that refreshes this store on every tick.
    /// Failures are already recorded in `last_error`.
    pub fn poll_callback(self: &Arc<Self>) -> PollCallback {
        let store = Arc::clone(self);
        poll_callback(move || {
            let store = Arc::clone(&store);
            async move {
                let _ = store.refresh().await;
            }
        })
    }

    fn mutation<T>(&self, result: ScoreboardResult<T>) -> ScoreboardResult<T> {
        if let Err(e) = &result {
            warn!(error = %e, "Team mutation failed");
            self.record_error(e);
        }
        result
    }

    fn record_error(&self, err: &ScoreboardError) {
        self.state.write().unwrap().last_error = Some(err.to_string());
    }
}
