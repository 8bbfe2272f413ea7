use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use lms_engine::LeaderboardEntry;

use crate::{ApiState, error::ApiError, validation::parse_period};

/// Create the leaderboard routes
pub fn routes() -> Router<ApiState> {
    Router::new().route("/leaderboard/{period}", get(get_leaderboard))
}

/// Top learners for `daily`, `weekly`, `monthly` or `all_time`
async fn get_leaderboard(
    State(state): State<ApiState>,
    Path(period): Path<String>,
) -> Result<Json<Vec<LeaderboardEntry>>, ApiError> {
    let period = parse_period(&period)?;
    Ok(Json(state.engine.leaderboard(period).await))
}
