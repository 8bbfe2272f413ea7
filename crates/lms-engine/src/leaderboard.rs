//! Points leaderboards.

use lms_rules::LeaderboardPeriod;
use serde::Serialize;

use crate::{ProgressEngine, metrics};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    /// 1-based position
    pub rank: u32,
    pub user_id: String,
    pub display_name: Option<String>,
    pub points: i64,
}

impl ProgressEngine {
    /// Top learners by points earned within `period`, highest first.
    ///
    /// Not cached. Store failures yield an empty board.
    pub async fn leaderboard(&self, period: LeaderboardPeriod) -> Vec<LeaderboardEntry> {
        let since = period.window_start(self.clock.now());
        let limit = self.config.leaderboard_limit;

        let mut rows = match self
            .store
            .query_leaderboard(since, i64::try_from(limit).unwrap_or(i64::MAX))
            .await
        {
            Ok(rows) => rows,
            Err(err) => {
                metrics::record_store_failure("query_leaderboard");
                tracing::warn!(period = %period, error = %err, "Leaderboard unavailable");
                return Vec::new();
            }
        };

        rows.sort_by(|a, b| {
            b.points
                .cmp(&a.points)
                .then_with(|| a.user_id.cmp(&b.user_id))
        });
        rows.truncate(limit);

        rows.into_iter()
            .zip(1..)
            .map(|(row, rank)| LeaderboardEntry {
                rank,
                user_id: row.user_id,
                display_name: row.display_name,
                points: row.points,
            })
            .collect()
    }
}
