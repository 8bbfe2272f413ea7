//! HTTP surface of the progress & achievement engine.

pub mod achievement;
pub mod config;
pub mod error;
pub mod leaderboard;
pub mod metrics;
pub mod middleware;
pub mod progress;
pub mod router;
pub mod state;
pub mod tracing;
pub mod v1;
pub mod validation;

pub use config::ApiConfig;
pub use state::ApiState;
