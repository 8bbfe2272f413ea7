use std::time::Duration;

/// Tuning knobs of the progress engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How long an aggregated course-progress list stays fresh
    pub progress_ttl: Duration,
    /// How long the achievement catalog stays fresh
    pub catalog_ttl: Duration,
    /// Number of entries returned by leaderboard queries
    pub leaderboard_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            progress_ttl: Duration::from_secs(15),
            catalog_ttl: Duration::from_secs(60),
            leaderboard_limit: 10,
        }
    }
}
