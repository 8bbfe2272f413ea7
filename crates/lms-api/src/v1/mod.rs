use axum::Router;

use crate::{achievement, leaderboard, progress, state::ApiState};

/// V1 API routes
pub fn routes() -> Router<ApiState> {
    Router::new()
        .merge(progress::routes())
        .merge(achievement::routes())
        .merge(leaderboard::routes())
}
