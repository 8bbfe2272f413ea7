use std::time::Duration;

use lms_engine::EngineConfig;
use serde::Deserialize;

/// Deployment environment, drives log format and verbosity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub const fn is_development(self) -> bool {
        matches!(self, Self::Development)
    }
}

/// Process configuration, read from the environment (and `.env` when present)
#[derive(Clone, Debug, Deserialize)]
pub struct ApiConfig {
    pub database_url: String,
    #[serde(default)]
    pub env: Environment,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_max_db_connections")]
    pub max_db_connections: u32,
    /// Comma separated list of origins allowed by CORS, every origin when empty
    #[serde(default)]
    pub allowed_origins: String,
    #[serde(default = "default_progress_cache_ttl_secs")]
    pub progress_cache_ttl_secs: u64,
    #[serde(default = "default_catalog_cache_ttl_secs")]
    pub catalog_cache_ttl_secs: u64,
    #[serde(default = "default_leaderboard_limit")]
    pub leaderboard_limit: usize,
}

const fn default_port() -> u16 {
    3000
}

const fn default_max_db_connections() -> u32 {
    10
}

const fn default_progress_cache_ttl_secs() -> u64 {
    15
}

const fn default_catalog_cache_ttl_secs() -> u64 {
    60
}

const fn default_leaderboard_limit() -> usize {
    10
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::from_env()
    }

    pub fn parsed_allowed_origins(&self) -> Vec<String> {
        self.allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            progress_ttl: Duration::from_secs(self.progress_cache_ttl_secs),
            catalog_ttl: Duration::from_secs(self.catalog_cache_ttl_secs),
            leaderboard_limit: self.leaderboard_limit,
        }
    }
}
