use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use lms_db::{
    MemoryStore,
    models::{AchievementCategory, AchievementDefinition},
};
use lms_engine::{EngineConfig, ManualClock, ProgressEngine};
use lms_rules::RequirementType;

pub const LEARNER: &str = "7d1e3a52-4c0f-4f44-9a77-2f0c4f1d9e10";

/// Wednesday noon, away from any window boundary
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 14, 12, 0, 0).unwrap()
}

/// Engine wired to an in-memory store and a manual clock
pub struct TestEngine {
    pub store: Arc<MemoryStore>,
    pub clock: ManualClock,
    pub engine: Arc<ProgressEngine>,
}

impl TestEngine {
    pub fn new(store: MemoryStore) -> Self {
        Self::with_config(store, EngineConfig::default())
    }

    pub fn with_config(store: MemoryStore, config: EngineConfig) -> Self {
        let store = Arc::new(store);
        let clock = ManualClock::new(start_time());
        let engine = ProgressEngine::with_clock(store.clone(), config, Arc::new(clock.clone()));

        Self {
            store,
            clock,
            engine: Arc::new(engine),
        }
    }
}

/// Global catalog entry
pub fn achievement(
    id: &str,
    points: i64,
    requirement_type: RequirementType,
    requirement_value: f64,
) -> AchievementDefinition {
    AchievementDefinition {
        id: id.to_string(),
        title: format!("Achievement {id}"),
        description: String::new(),
        icon: None,
        category: AchievementCategory::Learning,
        points,
        requirement_type,
        requirement_value,
        course_id: None,
    }
}

/// Catalog entry scoped to `course_id`
pub fn course_achievement(
    id: &str,
    points: i64,
    requirement_type: RequirementType,
    requirement_value: f64,
    course_id: &str,
) -> AchievementDefinition {
    AchievementDefinition {
        course_id: Some(course_id.to_string()),
        ..achievement(id, points, requirement_type, requirement_value)
    }
}
