//! Course progress aggregation.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::Instant,
};

use lms_db::models::{AchievementDefinition, CourseLessonCount, Enrollment, GrantRecord};
use serde::Serialize;

use crate::{EngineError, ProgressEngine, metrics, normalize_id, or_degraded};

/// Progress of one learner in one enrolled course
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseProgress {
    pub course_id: String,
    pub course_title: String,
    pub enrollment_id: String,
    /// Completion percentage (0-100)
    pub progress_percent: i32,
    pub completed_lesson_count: i64,
    pub total_lesson_count: i64,
    /// Grants scoped to this course
    pub earned_achievements: Vec<GrantRecord>,
    /// Cheapest catalog entry the learner can still earn here
    pub next_achievement: Option<AchievementDefinition>,
    /// Catalog points of the grants scoped to this course
    pub points_earned: i64,
}

impl ProgressEngine {
    /// Progress for every active enrollment of a learner, in enrollment order.
    ///
    /// Returns an empty list for a blank id and when the enrollments cannot
    /// be read. Partial failures of the secondary reads degrade single fields.
    pub async fn course_progress(&self, user_id: &str) -> Arc<Vec<CourseProgress>> {
        let Some(user_id) = normalize_id(user_id) else {
            return Arc::default();
        };
        let key = user_id.to_string();

        if let Some(progress) = self.progress_cache.get(&key) {
            return progress;
        }

        let cache_key = &key;
        let result = self
            .progress_flights
            .coalesce(key.clone(), move || async move {
                if let Some(progress) = self.progress_cache.lookup(cache_key).into_fresh() {
                    return Ok(progress);
                }

                // A grant landing mid-aggregation leaves this snapshot uncached
                let epoch = self.progress_cache.epoch();
                let progress = Arc::new(self.aggregate(user_id).await?);
                self.progress_cache
                    .insert_if_unchanged(cache_key.clone(), progress.clone(), epoch);
                Ok::<_, EngineError>(progress)
            })
            .await;

        match result {
            Ok(progress) => progress,
            Err(err) => {
                tracing::warn!(user_id, error = %err, "Course progress unavailable");
                Arc::default()
            }
        }
    }

    async fn aggregate(&self, user_id: &str) -> Result<Vec<CourseProgress>, EngineError> {
        let started = Instant::now();

        let enrollments = self
            .store
            .list_active_enrollments(user_id)
            .await
            .inspect_err(|_| metrics::record_store_failure("list_active_enrollments"))?;
        let enrollments = merge_enrollments(enrollments);
        if enrollments.is_empty() {
            return Ok(Vec::new());
        }

        let course_ids: Vec<String> = enrollments
            .iter()
            .map(|enrollment| enrollment.course_id.clone())
            .collect();

        let (totals, grants, finegrained, catalog) = tokio::join!(
            self.store.count_lessons_by_course(&course_ids),
            self.store.list_grants_for_user(user_id, Some(course_ids.as_slice())),
            self.store.finegrained_course_progress(user_id),
            self.catalog(),
        );

        let totals = or_degraded("count_lessons_by_course", user_id, totals);
        let grants = or_degraded("list_grants_for_user", user_id, grants);
        let finegrained: HashMap<String, i64> =
            or_degraded("finegrained_course_progress", user_id, finegrained)
                .unwrap_or_default()
                .into_iter()
                .map(|CourseLessonCount { course_id, completed_lessons }| {
                    (course_id, completed_lessons)
                })
                .collect();
        let catalog = catalog.unwrap_or_else(|err| {
            tracing::warn!(user_id, error = %err, "Catalog unavailable during aggregation");
            Arc::default()
        });

        let earned: HashSet<&str> = grants
            .iter()
            .map(|grant| grant.achievement_id.as_str())
            .collect();
        let points_by_id: HashMap<&str, i64> = catalog
            .iter()
            .map(|entry| (entry.id.as_str(), entry.points))
            .collect();

        let progress = enrollments
            .into_iter()
            .map(|enrollment| {
                let total = totals.get(&enrollment.course_id).copied().unwrap_or(0).max(0);
                let legacy = clamp_percent(enrollment.legacy_progress);

                let completed = match finegrained.get(&enrollment.course_id) {
                    Some(&completed) => completed.clamp(0, total),
                    None => (total as f64 * legacy / 100.0).round() as i64,
                };
                let progress_percent = if total > 0 {
                    (completed as f64 * 100.0 / total as f64).round() as i32
                } else {
                    legacy.round() as i32
                };

                let earned_achievements: Vec<GrantRecord> = grants
                    .iter()
                    .filter(|grant| grant.course_id.as_deref() == Some(enrollment.course_id.as_str()))
                    .cloned()
                    .collect();
                let points_earned = earned_achievements
                    .iter()
                    .filter_map(|grant| points_by_id.get(grant.achievement_id.as_str()))
                    .sum();

                let next_achievement = catalog
                    .iter()
                    .find(|entry| {
                        !earned.contains(entry.id.as_str())
                            && entry
                                .course_id
                                .as_deref()
                                .is_none_or(|course| course == enrollment.course_id)
                    })
                    .cloned();

                CourseProgress {
                    course_id: enrollment.course_id,
                    course_title: enrollment.course_title,
                    enrollment_id: enrollment.enrollment_id,
                    progress_percent,
                    completed_lesson_count: completed,
                    total_lesson_count: total,
                    earned_achievements,
                    next_achievement,
                    points_earned,
                }
            })
            .collect();

        metrics::record_aggregation(started.elapsed());
        Ok(progress)
    }
}

/// Legacy progress clamped to 0..=100, NaN and missing read as 0
fn clamp_percent(legacy: Option<f64>) -> f64 {
    match legacy {
        Some(value) if value.is_finite() => value.clamp(0.0, 100.0),
        Some(value) if value == f64::INFINITY => 100.0,
        _ => 0.0,
    }
}

/// Collapse duplicate enrollments in the same course.
///
/// The first occurrence keeps its position and enrollment id; the highest
/// legacy progress wins.
fn merge_enrollments(enrollments: Vec<Enrollment>) -> Vec<Enrollment> {
    let mut merged: Vec<Enrollment> = Vec::with_capacity(enrollments.len());
    let mut positions: HashMap<String, usize> = HashMap::new();

    for enrollment in enrollments {
        match positions.get(&enrollment.course_id) {
            Some(&index) => {
                let kept = &mut merged[index];
                kept.legacy_progress = match (kept.legacy_progress, enrollment.legacy_progress) {
                    (Some(a), Some(b)) => Some(a.max(b)),
                    (a, b) => a.or(b),
                };
            }
            None => {
                positions.insert(enrollment.course_id.clone(), merged.len());
                merged.push(enrollment);
            }
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enrollment(id: &str, course: &str, legacy: Option<f64>) -> Enrollment {
        Enrollment {
            enrollment_id: id.to_string(),
            course_id: course.to_string(),
            course_title: String::new(),
            legacy_progress: legacy,
        }
    }

    #[test]
    fn test_clamp_percent() {
        assert_eq!(clamp_percent(None), 0.0);
        assert_eq!(clamp_percent(Some(f64::NAN)), 0.0);
        assert_eq!(clamp_percent(Some(-5.0)), 0.0);
        assert_eq!(clamp_percent(Some(150.0)), 100.0);
        assert_eq!(clamp_percent(Some(f64::INFINITY)), 100.0);
        assert_eq!(clamp_percent(Some(42.5)), 42.5);
    }

    #[test]
    fn test_merge_enrollments_keeps_first_position() {
        let merged = merge_enrollments(vec![
            enrollment("e1", "course-a", Some(20.0)),
            enrollment("e2", "course-b", None),
            enrollment("e3", "course-a", Some(60.0)),
        ]);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].enrollment_id, "e1");
        assert_eq!(merged[0].legacy_progress, Some(60.0));
        assert_eq!(merged[1].course_id, "course-b");
    }

    #[test]
    fn test_merge_enrollments_missing_progress() {
        let merged = merge_enrollments(vec![
            enrollment("e1", "course-a", None),
            enrollment("e2", "course-a", Some(10.0)),
        ]);

        assert_eq!(merged[0].legacy_progress, Some(10.0));
    }
}
