//! Leaderboard reconciliation - dense ranks and single-step trends
//!
//! Every successful fetch is ranked by position (backend order is
//! authoritative) and compared against the ranks seen on the previous
//! successful fetch. The rank history is then rebuilt from the new fetch,
//! so teams that vanish lose their history.

use std::collections::HashMap;

use crate::types::{RankedTeam, Team, Trend};

/// Last-seen rank per team id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RankHistory {
    ranks: HashMap<String, u32>,
}

impl RankHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rank_of(&self, id: &str) -> Option<u32> {
        self.ranks.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ranks.contains_key(id)
    }
}

/// Rank a fetched leaderboard against `history`.
///
/// Returns the ranked teams and the history that should replace `history`.
/// Pure: the caller decides whether to commit the new history.
pub fn reconcile(history: &RankHistory, teams: Vec<Team>) -> (Vec<RankedTeam>, RankHistory) {
    let mut next = HashMap::with_capacity(teams.len());

    let ranked: Vec<RankedTeam> = teams
        .into_iter()
        .enumerate()
        .map(|(index, team)| {
            let rank = index as u32 + 1;
            let previous_rank = history.rank_of(&team.id).unwrap_or(rank);
            next.insert(team.id.clone(), rank);
            RankedTeam {
                team,
                rank,
                previous_rank,
                trend: Trend::between(rank, previous_rank),
            }
        })
        .collect();

    (ranked, RankHistory { ranks: next })
}

/// Owns the rank history between polls
#[derive(Debug, Default)]
pub struct Reconciler {
    history: RankHistory,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> &RankHistory {
        &self.history
    }

    /// Rank `teams` and replace the history with their ranks
    pub fn apply(&mut self, teams: Vec<Team>) -> Vec<RankedTeam> {
        let (ranked, next) = reconcile(&self.history, teams);
        self.history = next;
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn team(id: &str, score: u64) -> Team {
        Team {
            id: id.into(),
            name: format!("Team {}", id),
            members: vec!["member".into()],
            score,
            created_at: None,
            updated_at: None,
        }
    }

    fn trends(ranked: &[RankedTeam]) -> Vec<(&str, u32, Trend)> {
        ranked
            .iter()
            .map(|r| (r.team.id.as_str(), r.rank, r.trend))
            .collect()
    }

    #[test]
    fn test_ranks_are_dense_and_positional() {
        let teams: Vec<Team> = (0..7).map(|i| team(&format!("t{}", i), 100 - i)).collect();
        let (ranked, _) = reconcile(&RankHistory::new(), teams);
        let ranks: Vec<u32> = ranked.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, (1..=7).collect::<Vec<u32>>());
    }

    #[test]
    fn test_ties_keep_backend_order() {
        let (ranked, _) = reconcile(&RankHistory::new(), vec![team("B", 5), team("A", 5)]);
        assert_eq!(ranked[0].team.id, "B");
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[1].rank, 2);
    }

    #[test]
    fn test_first_appearance_is_stable() {
        let (ranked, _) = reconcile(&RankHistory::new(), vec![team("A", 10), team("B", 5)]);
        for r in &ranked {
            assert_eq!(r.trend, Trend::Stable);
            assert_eq!(r.previous_rank, r.rank);
        }
    }

    #[test]
    fn test_two_poll_scenario() {
        let mut reconciler = Reconciler::new();

        let first = reconciler.apply(vec![team("A", 10), team("B", 5)]);
        assert_eq!(
            trends(&first),
            vec![("A", 1, Trend::Stable), ("B", 2, Trend::Stable)]
        );

        let second = reconciler.apply(vec![team("B", 12), team("A", 10)]);
        assert_eq!(
            trends(&second),
            vec![("B", 1, Trend::Up), ("A", 2, Trend::Down)]
        );
        assert_eq!(second[0].previous_rank, 2);
        assert_eq!(second[1].previous_rank, 1);
    }

    #[test]
    fn test_large_moves() {
        let mut reconciler = Reconciler::new();
        reconciler.apply(vec![team("A", 9), team("B", 8), team("C", 7)]);
        let ranked = reconciler.apply(vec![team("C", 20), team("B", 8), team("A", 9)]);
        assert_eq!(
            trends(&ranked),
            vec![("C", 1, Trend::Up), ("B", 2, Trend::Stable), ("A", 3, Trend::Down)]
        );
    }

    #[test]
    fn test_history_holds_exactly_latest_ids() {
        let mut reconciler = Reconciler::new();
        reconciler.apply(vec![team("A", 10), team("B", 5), team("C", 1)]);
        reconciler.apply(vec![team("C", 30), team("A", 10)]);

        let history = reconciler.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history.rank_of("C"), Some(1));
        assert_eq!(history.rank_of("A"), Some(2));
        assert!(!history.contains("B"));
    }

    #[test]
    fn test_empty_fetch_resets_history() {
        let mut reconciler = Reconciler::new();
        reconciler.apply(vec![team("A", 10)]);
        let ranked = reconciler.apply(Vec::new());
        assert!(ranked.is_empty());
        assert!(reconciler.history().is_empty());
    }

    #[test]
    fn test_reappearing_team_is_new() {
        let mut reconciler = Reconciler::new();
        reconciler.apply(vec![team("A", 10), team("B", 5)]);
        reconciler.apply(vec![team("A", 10)]);
        let ranked = reconciler.apply(vec![team("B", 50), team("A", 10)]);
        assert_eq!(ranked[0].team.id, "B");
        assert_eq!(ranked[0].trend, Trend::Stable);
        assert_eq!(ranked[0].previous_rank, 1);
        assert_eq!(ranked[1].trend, Trend::Down);
    }

    #[test]
    fn test_reconcile_does_not_touch_input_history() {
        let mut reconciler = Reconciler::new();
        reconciler.apply(vec![team("A", 10), team("B", 5)]);
        let before = reconciler.history().clone();

        let (_, next) = reconcile(reconciler.history(), vec![team("B", 11)]);
        assert_eq!(reconciler.history(), &before);
        assert_eq!(next.len(), 1);
    }
}
