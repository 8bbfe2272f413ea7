use axum::http::StatusCode;
use lms_db::MemoryStore;
use lms_rules::RequirementType;
use serde_json::{Value, json};

use crate::common::{LEARNER, achievement, app_with};

fn granted_ids(json: &Value) -> Vec<&str> {
    json["granted"]
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["id"].as_str().unwrap())
        .collect()
}

#[tokio::test]
async fn test_check_grants_once() {
    let store = MemoryStore::new();
    store.complete_lessons(LEARNER, "c1", 2);
    store.add_achievement(achievement("first-steps", 10, RequirementType::LessonsCompleted, 1.0));
    let (client, store) = app_with(store);
    let uri = format!("/v1/users/{LEARNER}/achievements/check");

    let response = client.post_json(&uri, &json!({ "course_id": "c1" })).await;
    response.assert_status(StatusCode::OK);
    let json: Value = response.json();
    assert_eq!(granted_ids(&json), vec!["first-steps"]);
    assert_eq!(json["granted"][0]["points"], 10);
    assert_eq!(json["granted"][0]["requirement_type"], "lessons_completed");

    let response = client.post_json(&uri, &json!({ "course_id": "c1" })).await;
    assert!(granted_ids(&response.json()).is_empty());
    assert_eq!(store.ledger_for(LEARNER).len(), 1);
}

#[tokio::test]
async fn test_check_without_body_or_course() {
    let store = MemoryStore::new();
    store.complete_lessons(LEARNER, "c1", 2);
    store.add_achievement(achievement("first-steps", 10, RequirementType::LessonsCompleted, 1.0));
    let (client, _) = app_with(store);
    let uri = format!("/v1/users/{LEARNER}/achievements/check");

    let response = client.post_json(&uri, &json!({ "course_id": null })).await;
    response.assert_status(StatusCode::OK);
    assert_eq!(granted_ids(&response.json()), vec!["first-steps"]);

    let response = client.post(&uri).await;
    response.assert_status(StatusCode::OK);
    assert!(granted_ids(&response.json()).is_empty());
}

#[tokio::test]
async fn test_catalog_is_ordered_by_points() {
    let store = MemoryStore::new();
    store.add_achievement(achievement("big", 500, RequirementType::CoursesCompleted, 3.0));
    store.add_achievement(achievement("small", 5, RequirementType::LessonsCompleted, 1.0));
    let (client, _) = app_with(store);

    let response = client.get("/v1/achievements").await;

    response.assert_status(StatusCode::OK);
    let json: Value = response.json();
    let ids: Vec<_> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["small", "big"]);
}
