use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use lms_api::{ApiState, config::Environment, router};
use lms_db::{
    MemoryStore,
    models::{AchievementCategory, AchievementDefinition},
};
use lms_engine::{EngineConfig, ProgressEngine};
use lms_rules::RequirementType;
use serde::Deserialize;
use tower::ServiceExt;

pub const LEARNER: &str = "0b7c9a0e-5a63-4d2e-8d0a-4f1b2c3d4e5f";

/// Test state builder around an in-memory store
pub struct TestStateBuilder {
    store: Arc<MemoryStore>,
    config: EngineConfig,
}

impl TestStateBuilder {
    pub fn new() -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            config: EngineConfig::default(),
        }
    }

    pub fn with_store(mut self, store: MemoryStore) -> Self {
        self.store = Arc::new(store);
        self
    }

    /// Build the state and keep a handle on the store for seeding and inspection
    pub fn build(self) -> (ApiState, Arc<MemoryStore>) {
        let engine = ProgressEngine::new(self.store.clone(), self.config);
        let state = ApiState::from_engine(Arc::new(engine), Environment::Development);
        (state, self.store)
    }
}

impl Default for TestStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// App with a seeded store
pub fn app_with(store: MemoryStore) -> (TestClient, Arc<MemoryStore>) {
    let (state, store) = TestStateBuilder::new().with_store(store).build();
    (TestClient::new(router::router().with_state(state)), store)
}

pub fn achievement(id: &str, points: i64, requirement_type: RequirementType, value: f64) -> AchievementDefinition {
    AchievementDefinition {
        id: id.to_string(),
        title: format!("Achievement {id}"),
        description: String::new(),
        icon: None,
        category: AchievementCategory::Learning,
        points,
        requirement_type,
        requirement_value: value,
        course_id: None,
    }
}

/// Helper to make requests to the test app
pub struct TestClient {
    router: Router,
}

impl TestClient {
    pub fn new(router: Router) -> Self {
        Self { router }
    }

    /// Send a request and get the response
    pub async fn request(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to execute request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read response body")
            .to_bytes();

        TestResponse {
            status,
            body: body_bytes.to_vec(),
        }
    }

    /// Send a GET request
    pub async fn get(&self, uri: &str) -> TestResponse {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .expect("Failed to build request");

        self.request(request).await
    }

    /// Send a POST request with no body
    pub async fn post(&self, uri: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::empty())
            .expect("Failed to build request");

        self.request(request).await
    }

    /// Send a POST request with JSON body
    pub async fn post_json<T: serde::Serialize>(&self, uri: &str, body: &T) -> TestResponse {
        let json_body = serde_json::to_string(body).expect("Failed to serialize body");

        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(json_body))
            .expect("Failed to build request");

        self.request(request).await
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl TestResponse {
    /// Get response body as string
    pub fn text(&self) -> String {
        String::from_utf8(self.body.clone()).expect("Response body is not valid UTF-8")
    }

    /// Parse response body as JSON
    pub fn json<T: for<'de> Deserialize<'de>>(&self) -> T {
        serde_json::from_slice(&self.body).expect("Failed to parse JSON response")
    }

    /// Assert status code
    pub fn assert_status(&self, expected: StatusCode) {
        assert_eq!(
            self.status,
            expected,
            "Expected status {}, got {}. Body: {}",
            expected,
            self.status,
            self.text()
        );
    }
}
