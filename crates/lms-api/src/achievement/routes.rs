use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
};
use lms_db::models::AchievementDefinition;
use serde::{Deserialize, Serialize};

use crate::{ApiState, validation::course_context};

/// Create the achievement routes
pub fn routes() -> Router<ApiState> {
    Router::new()
        .route("/achievements", get(get_catalog))
        .route("/users/{user_id}/achievements/check", post(check_achievements))
}

#[derive(Debug, Default, Deserialize)]
struct CheckRequest {
    #[serde(default)]
    course_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct CheckResponse {
    granted: Vec<AchievementDefinition>,
}

/// Active achievement catalog, cheapest first
async fn get_catalog(State(state): State<ApiState>) -> impl IntoResponse {
    let catalog = state.engine.achievement_catalog().await;
    Json(catalog.as_ref().clone())
}

/// Evaluate the catalog for the learner and grant what is newly earned
async fn check_achievements(
    State(state): State<ApiState>,
    Path(user_id): Path<String>,
    payload: Option<Json<CheckRequest>>,
) -> impl IntoResponse {
    let Json(request) = payload.unwrap_or_default();
    let course_id = course_context(request.course_id.as_deref());

    let granted = state.engine.check_and_grant(&user_id, course_id).await;
    if !granted.is_empty() {
        tracing::info!(user_id = %user_id, count = granted.len(), "Achievements granted");
    }

    Json(CheckResponse { granted })
}
