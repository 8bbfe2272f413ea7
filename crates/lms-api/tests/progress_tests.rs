use axum::http::StatusCode;
use lms_db::{MemoryStore, StoreOp};
use lms_rules::RequirementType;
use serde_json::{Value, json};

use crate::common::{LEARNER, achievement, app_with};

#[tokio::test]
async fn test_get_progress() {
    let store = MemoryStore::new();
    store.add_course("c1", "Rust Basics", 8);
    store.enroll(LEARNER, "c1", Some(50.0));
    store.add_achievement(achievement("first-steps", 10, RequirementType::LessonsCompleted, 1.0));
    let (client, _) = app_with(store);

    let response = client.get(&format!("/v1/users/{LEARNER}/progress")).await;

    response.assert_status(StatusCode::OK);
    let json: Value = response.json();
    let courses = json.as_array().unwrap();
    assert_eq!(courses.len(), 1);
    assert_eq!(courses[0]["course_id"], "c1");
    assert_eq!(courses[0]["course_title"], "Rust Basics");
    assert_eq!(courses[0]["progress_percent"], 50);
    assert_eq!(courses[0]["completed_lesson_count"], 4);
    assert_eq!(courses[0]["total_lesson_count"], 8);
    assert_eq!(courses[0]["points_earned"], 0);
    assert_eq!(courses[0]["next_achievement"]["id"], "first-steps");
    assert_eq!(courses[0]["earned_achievements"], json!([]));
}

#[tokio::test]
async fn test_get_progress_fails_open() {
    let store = MemoryStore::new();
    store.enroll(LEARNER, "c1", Some(50.0));
    store.fail(StoreOp::ListActiveEnrollments);
    let (client, _) = app_with(store);

    let response = client.get(&format!("/v1/users/{LEARNER}/progress")).await;

    response.assert_status(StatusCode::OK);
    assert_eq!(response.json::<Value>(), json!([]));
}

#[tokio::test]
async fn test_get_points_for_new_learner() {
    let (client, _) = app_with(MemoryStore::new());

    let response = client.get(&format!("/v1/users/{LEARNER}/points")).await;

    response.assert_status(StatusCode::OK);
    let json: Value = response.json();
    assert_eq!(json["user_id"], LEARNER);
    assert_eq!(json["total_points"], 0);
    assert_eq!(json["current_level"], 1);
    assert_eq!(json["points_to_next_level"], 100);
}

#[tokio::test]
async fn test_points_follow_grants() {
    let store = MemoryStore::new();
    store.complete_lessons(LEARNER, "c1", 1);
    store.add_achievement(achievement("first-steps", 120, RequirementType::LessonsCompleted, 1.0));
    let (client, _) = app_with(store);

    client
        .post(&format!("/v1/users/{LEARNER}/achievements/check"))
        .await
        .assert_status(StatusCode::OK);

    let json: Value = client.get(&format!("/v1/users/{LEARNER}/points")).await.json();
    assert_eq!(json["total_points"], 120);
    assert_eq!(json["current_level"], 2);
    assert_eq!(json["points_to_next_level"], 130);
    assert_eq!(json["achievements_count"], 1);
}
