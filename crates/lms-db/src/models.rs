use chrono::{DateTime, Utc};
use lms_rules::{RequirementType, Rule};
use serde::{Deserialize, Serialize};

/// Ledger action tag written when an achievement is granted.
pub const ACTION_ACHIEVEMENT_EARNED: &str = "achievement_earned";

/// Achievement category shown in the catalog
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AchievementCategory {
    Learning,
    Participation,
    Excellence,
    Completion,
    /// Category added by admin tooling that this version does not know about
    Other(String),
}

impl AchievementCategory {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Learning => "learning",
            Self::Participation => "participation",
            Self::Excellence => "excellence",
            Self::Completion => "completion",
            Self::Other(name) => name,
        }
    }
}

impl From<String> for AchievementCategory {
    fn from(name: String) -> Self {
        match name.as_str() {
            "learning" => Self::Learning,
            "participation" => Self::Participation,
            "excellence" => Self::Excellence,
            "completion" => Self::Completion,
            _ => Self::Other(name),
        }
    }
}

impl From<AchievementCategory> for String {
    fn from(category: AchievementCategory) -> Self {
        category.as_str().to_string()
    }
}

/// Catalog entry describing an achievement and the rule that unlocks it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AchievementDefinition {
    pub id: String,
    pub title: String,
    pub description: String,
    pub icon: Option<String>,
    #[sqlx(try_from = "String")]
    pub category: AchievementCategory,
    /// Points awarded when granted (never negative)
    pub points: i64,
    #[sqlx(try_from = "String")]
    pub requirement_type: RequirementType,
    /// Numeric threshold for the requirement
    pub requirement_value: f64,
    /// Course the achievement is scoped to; `None` means global
    pub course_id: Option<String>,
}

impl AchievementDefinition {
    pub fn is_course_scoped(&self) -> bool {
        self.course_id.is_some()
    }

    /// Borrow the unlock rule for evaluation
    pub fn rule(&self) -> Rule<'_> {
        Rule {
            requirement_type: &self.requirement_type,
            threshold: self.requirement_value,
            course_id: self.course_id.as_deref(),
        }
    }
}

/// Durable proof that a learner earned an achievement.
/// Unique on (user_id, achievement_id).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct GrantRecord {
    pub user_id: String,
    pub achievement_id: String,
    pub course_id: Option<String>,
    pub enrollment_id: Option<String>,
    pub earned_at: DateTime<Utc>,
    /// Completion percentage (0-100)
    pub progress: i32,
    pub is_completed: bool,
}

/// Active enrollment of a learner in a course
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Enrollment {
    pub enrollment_id: String,
    pub course_id: String,
    pub course_title: String,
    /// Legacy progress column, may be stale or missing
    pub legacy_progress: Option<f64>,
}

/// Lesson-level completion count for one course
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CourseLessonCount {
    pub course_id: String,
    pub completed_lessons: i64,
}

/// Append-only points ledger entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PointsLedgerEntry {
    pub user_id: String,
    pub points: i64,
    pub action: String,
    pub description: String,
    pub achievement_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Aggregated points and counters for one learner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserPointsSummary {
    pub user_id: String,
    pub total_points: i64,
    pub current_level: i32,
    pub lessons_completed: i64,
    pub courses_completed: i64,
    pub achievements_count: i64,
    pub updated_at: DateTime<Utc>,
}

impl UserPointsSummary {
    /// Summary for a learner that has not earned anything yet
    pub fn empty(user_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            total_points: 0,
            current_level: lms_rules::level_for_points(0),
            lessons_completed: 0,
            courses_completed: 0,
            achievements_count: 0,
            updated_at: now,
        }
    }
}

/// Points total of one learner within a leaderboard window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct LeaderboardRow {
    pub user_id: String,
    pub display_name: Option<String>,
    pub points: i64,
}

/// Time spent studying and the current daily streak
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StudyActivity {
    pub study_hours: f64,
    pub current_streak: i64,
}

/// Result of inserting a grant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// The (user, achievement) pair was already granted
    AlreadyExists,
}
