//! Dashboard statistics derived from the team list and the ranked board

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::{RankedTeam, Team, Trend};

const RECENT_CHANGES: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderSummary {
    pub id: String,
    pub name: String,
    pub score: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankChange {
    pub id: String,
    pub name: String,
    pub rank: u32,
    pub trend: Trend,
    pub at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub total_teams: usize,
    /// Mean score rounded to the nearest integer
    pub average_score: u64,
    pub leader: Option<LeaderSummary>,
    /// Points between first and second place
    pub leader_gap: u64,
    pub last_update: Option<DateTime<Utc>>,
    pub recent_changes: Vec<RankChange>,
}

impl DashboardStats {
    pub fn compute(teams: &[Team], leaderboard: &[RankedTeam]) -> Self {
        let total: u64 = teams.iter().map(|t| t.score).sum();
        let average_score = if teams.is_empty() {
            0
        } else {
            (total as f64 / teams.len() as f64).round() as u64
        };

        let leader = leaderboard.first().map(|r| LeaderSummary {
            id: r.team.id.clone(),
            name: r.team.name.clone(),
            score: r.team.score,
        });

        let leader_gap = match leaderboard {
            [first, second, ..] => first.team.score.saturating_sub(second.team.score),
            _ => 0,
        };

        let last_update = teams.iter().filter_map(Team::last_touched).max();

        let recent_changes = leaderboard
            .iter()
            .take(RECENT_CHANGES)
            .map(|r| RankChange {
                id: r.team.id.clone(),
                name: r.team.name.clone(),
                rank: r.rank,
                trend: r.trend,
                at: r.team.last_touched(),
            })
            .collect();

        Self {
            total_teams: teams.len(),
            average_score,
            leader,
            leader_gap,
            last_update,
            recent_changes,
        }
    }
}
