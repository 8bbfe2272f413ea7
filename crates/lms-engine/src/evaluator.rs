//! Catalog entry evaluation on top of [`lms_rules::is_satisfied`].

use lms_db::models::AchievementDefinition;
use lms_rules::{LearnerStats, is_satisfied};

/// Whether `definition` may be considered at all in the context of `course_id`.
///
/// Global entries are always candidates. A course-scoped entry is skipped
/// only when the check was triggered by a different course; without a course
/// it is evaluated against the learner's global counters.
pub fn is_candidate(definition: &AchievementDefinition, course_id: Option<&str>) -> bool {
    match (definition.course_id.as_deref(), course_id) {
        (None, _) | (Some(_), None) => true,
        (Some(scope), Some(course)) => scope == course,
    }
}

/// Whether the learner meets the unlock rule of `definition`
pub fn evaluate(stats: &LearnerStats, definition: &AchievementDefinition, course_id: Option<&str>) -> bool {
    is_satisfied(stats, definition.rule(), course_id)
}
