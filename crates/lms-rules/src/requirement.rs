//! Achievement requirements and their evaluation.

use serde::{Deserialize, Serialize};

/// What an achievement measures.
///
/// Stored as a free-form tag in the catalog. Tags this version does not know
/// are kept in [`RequirementType::Unknown`] and never evaluate as satisfied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RequirementType {
    LessonsCompleted,
    CoursesCompleted,
    StudyHours,
    QuizScore,
    StudyStreak,
    Unknown(String),
}

impl RequirementType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::LessonsCompleted => "lessons_completed",
            Self::CoursesCompleted => "courses_completed",
            Self::StudyHours => "study_hours",
            Self::QuizScore => "quiz_score",
            Self::StudyStreak => "study_streak",
            Self::Unknown(tag) => tag,
        }
    }
}

impl From<&str> for RequirementType {
    fn from(tag: &str) -> Self {
        match tag.trim() {
            "lessons_completed" => Self::LessonsCompleted,
            "courses_completed" => Self::CoursesCompleted,
            "study_hours" => Self::StudyHours,
            "quiz_score" => Self::QuizScore,
            "study_streak" => Self::StudyStreak,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl From<String> for RequirementType {
    fn from(tag: String) -> Self {
        Self::from(tag.as_str())
    }
}

impl From<RequirementType> for String {
    fn from(requirement: RequirementType) -> Self {
        requirement.as_str().to_string()
    }
}

/// Counters describing what a learner has done so far.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LearnerStats {
    /// Completed lessons across every course
    pub lessons_completed: i64,
    /// Completed lessons in the course being evaluated, when there is one
    pub lessons_completed_in_course: Option<i64>,
    pub courses_completed: i64,
    pub study_hours: f64,
    /// Average quiz score in percent
    pub average_quiz_score: f64,
    /// Consecutive active days
    pub current_streak: i64,
}

/// A single catalog rule, borrowed from its achievement definition.
#[derive(Debug, Clone, Copy)]
pub struct Rule<'a> {
    pub requirement_type: &'a RequirementType,
    pub threshold: f64,
    /// Course the rule is scoped to, `None` for global rules
    pub course_id: Option<&'a str>,
}

/// Decide whether `stats` satisfy `rule`.
///
/// `evaluation_course` is the course the check runs for, if any. A
/// course-scoped `lessons_completed` rule only looks at the course-local
/// counter when it is evaluated for its own course; in every other case the
/// global counter applies.
pub fn is_satisfied(stats: &LearnerStats, rule: Rule<'_>, evaluation_course: Option<&str>) -> bool {
    let threshold = rule.threshold;

    match rule.requirement_type {
        RequirementType::LessonsCompleted => {
            let same_course = matches!(
                (rule.course_id, evaluation_course),
                (Some(scope), Some(current)) if scope == current
            );
            let completed = if same_course {
                stats.lessons_completed_in_course.unwrap_or(0)
            } else {
                stats.lessons_completed
            };
            completed as f64 >= threshold
        }
        RequirementType::CoursesCompleted => stats.courses_completed as f64 >= threshold,
        RequirementType::StudyHours => stats.study_hours >= threshold,
        RequirementType::QuizScore => stats.average_quiz_score >= threshold,
        RequirementType::StudyStreak => stats.current_streak as f64 >= threshold,
        RequirementType::Unknown(_) => false,
    }
}
