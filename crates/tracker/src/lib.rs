//! Scoreboard Tracker: polling, ranking and trend tracking for team scores
//!
//! Provides:
//! - REST client for the scoreboard backend (teams, leaderboard, stats)
//! - Fixed-interval poller with a hot-swappable callback
//! - Leaderboard reconciler (dense ranks, single-step up/down/stable trends)
//! - Leaderboard store with serialized refreshes and error reporting
//! - Dashboard statistics and CSV/JSON export

pub mod api;
pub mod config;
pub mod error;
pub mod export;
pub mod poller;
pub mod reconciler;
pub mod stats;
pub mod store;
pub mod types;

// Re-exports for convenience
pub use api::{ScoreboardApi, ScoreboardClient};
pub use config::{RetryPolicy, TrackerConfig};
pub use error::{ScoreboardError, ScoreboardResult};
pub use export::{export, ExportFormat};
pub use poller::{poll_callback, PollCallback, Poller, PollerError};
pub use reconciler::{reconcile, RankHistory, Reconciler};
pub use stats::DashboardStats;
pub use store::{LeaderboardSnapshot, LeaderboardStore};
pub use types::*;
