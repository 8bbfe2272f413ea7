use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
};
use chrono::{DateTime, Utc};
use lms_rules::points_to_next_level;
use serde::Serialize;

use crate::ApiState;

/// Create the learner progress routes
pub fn routes() -> Router<ApiState> {
    Router::new()
        .route("/users/{user_id}/progress", get(get_course_progress))
        .route("/users/{user_id}/points", get(get_points_summary))
}

#[derive(Debug, Serialize)]
struct PointsResponse {
    user_id: String,
    total_points: i64,
    current_level: i32,
    /// `None` once the top level is reached
    points_to_next_level: Option<i64>,
    lessons_completed: i64,
    courses_completed: i64,
    achievements_count: i64,
    updated_at: DateTime<Utc>,
}

/// Progress of every active enrollment of the learner
async fn get_course_progress(
    State(state): State<ApiState>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    let progress = state.engine.course_progress(&user_id).await;
    Json(progress.as_ref().clone())
}

/// Points, level and counters of the learner
async fn get_points_summary(
    State(state): State<ApiState>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    let summary = state.engine.points_summary(&user_id).await;

    Json(PointsResponse {
        points_to_next_level: points_to_next_level(summary.total_points),
        user_id: summary.user_id,
        total_points: summary.total_points,
        current_level: summary.current_level,
        lessons_completed: summary.lessons_completed,
        courses_completed: summary.courses_completed,
        achievements_count: summary.achievements_count,
        updated_at: summary.updated_at,
    })
}
