//! Achievement granting.
//!
//! A grant is written at most once per learner and achievement. Within the
//! process concurrent checks for the same learner and course are coalesced;
//! across processes the store's unique constraint decides, and a losing
//! insert is treated as already granted.

use std::{collections::HashSet, sync::Arc};

use lms_db::models::{
    ACTION_ACHIEVEMENT_EARNED, AchievementDefinition, Enrollment, GrantRecord, InsertOutcome,
    PointsLedgerEntry, UserPointsSummary,
};
use lms_rules::{LearnerStats, level_for_points};

use crate::{EngineError, ProgressEngine, evaluator, metrics, normalize_id, or_degraded};

/// Work found for a catalog entry during a check
#[derive(Debug, Clone, Copy)]
enum Pending {
    /// Not earned yet, evaluate and grant
    Candidate,
    /// Earned, but its ledger entry is missing
    Unrecorded,
}

/// Coalescing key of a check-and-grant run
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GrantKey {
    pub user_id: String,
    pub course_id: Option<String>,
}

impl ProgressEngine {
    /// Evaluate the catalog for a learner and grant everything newly earned.
    ///
    /// `course_id` is the course whose activity triggered the check. Returns
    /// the achievements granted by this call, in catalog order; failures of
    /// single grants are logged and leave those achievements out. Grants left
    /// without a ledger entry or summary by an earlier failure are repaired
    /// here but not reported again.
    pub async fn check_and_grant(&self, user_id: &str, course_id: Option<&str>) -> Vec<AchievementDefinition> {
        let Some(user_id) = normalize_id(user_id) else {
            return Vec::new();
        };
        let course_id = course_id.and_then(normalize_id);

        let key = GrantKey {
            user_id: user_id.to_string(),
            course_id: course_id.map(str::to_string),
        };
        let granted = self
            .grant_flights
            .coalesce(key, move || async move { Arc::new(self.grant_pending(user_id, course_id).await) })
            .await;

        Arc::unwrap_or_clone(granted)
    }

    /// Stored points summary, or a zero summary at level 1
    pub async fn points_summary(&self, user_id: &str) -> UserPointsSummary {
        let now = self.clock.now();
        let Some(user_id) = normalize_id(user_id) else {
            return UserPointsSummary::empty(user_id.trim(), now);
        };

        match self.store.get_user_points_summary(user_id).await {
            Ok(Some(summary)) => summary,
            Ok(None) => UserPointsSummary::empty(user_id, now),
            Err(err) => {
                metrics::record_store_failure("get_user_points_summary");
                tracing::warn!(user_id, error = %err, "Points summary unavailable");
                UserPointsSummary::empty(user_id, now)
            }
        }
    }

    async fn grant_pending(&self, user_id: &str, course_id: Option<&str>) -> Vec<AchievementDefinition> {
        let (catalog, grants, recorded, summary) = tokio::join!(
            self.catalog(),
            self.store.list_grants_for_user(user_id, None),
            self.store.list_ledger_achievement_ids(user_id),
            self.store.get_user_points_summary(user_id),
        );

        let catalog = match catalog {
            Ok(catalog) => catalog,
            Err(err) => {
                tracing::warn!(user_id, error = %err, "Catalog unavailable, nothing granted");
                return Vec::new();
            }
        };
        let earned: HashSet<String> = match grants {
            Ok(grants) => grants.into_iter().map(|grant| grant.achievement_id).collect(),
            Err(err) => {
                metrics::record_store_failure("list_grants_for_user");
                tracing::warn!(user_id, error = %err, "Earned achievements unavailable, nothing granted");
                return Vec::new();
            }
        };
        // Without these two reads repairs wait for a later check
        let recorded: Option<HashSet<String>> = match recorded {
            Ok(ids) => Some(ids.into_iter().collect()),
            Err(err) => {
                metrics::record_store_failure("list_ledger_achievement_ids");
                tracing::warn!(user_id, error = %err, "Ledger unavailable, skipping points repair");
                None
            }
        };
        let summary_stale = match summary {
            Ok(summary) => summary.map_or(0, |summary| summary.achievements_count) < earned.len() as i64,
            Err(err) => {
                metrics::record_store_failure("get_user_points_summary");
                tracing::warn!(user_id, error = %err, "Points summary unavailable, skipping summary repair");
                false
            }
        };

        let pending: Vec<(&AchievementDefinition, Pending)> = catalog
            .iter()
            .filter_map(|entry| {
                if earned.contains(&entry.id) {
                    let unrecorded = recorded.as_ref().is_some_and(|ids| !ids.contains(&entry.id));
                    unrecorded.then_some((entry, Pending::Unrecorded))
                } else {
                    evaluator::is_candidate(entry, course_id).then_some((entry, Pending::Candidate))
                }
            })
            .collect();
        if pending.is_empty() && !summary_stale {
            return Vec::new();
        }

        let stats = self.learner_stats(user_id, course_id).await;
        let mut enrollments: Option<Vec<Enrollment>> = None;
        let mut summary_written = false;
        let mut granted = Vec::new();

        for (definition, pending) in pending {
            match pending {
                Pending::Unrecorded => match self.record_points(user_id, definition, &stats).await {
                    Ok(()) => {
                        summary_written = true;
                        tracing::warn!(user_id, achievement_id = %definition.id, "Repaired missing ledger entry");
                    }
                    Err(err) => {
                        tracing::error!(
                            user_id,
                            achievement_id = %definition.id,
                            error = %err,
                            "Failed to repair ledger entry"
                        );
                    }
                },
                Pending::Candidate => {
                    if !evaluator::evaluate(&stats, definition, course_id) {
                        continue;
                    }

                    let enrollment_id = match definition.course_id.as_deref() {
                        Some(scope) => {
                            if enrollments.is_none() {
                                enrollments = Some(or_degraded(
                                    "list_active_enrollments",
                                    user_id,
                                    self.store.list_active_enrollments(user_id).await,
                                ));
                            }
                            enrollments
                                .iter()
                                .flatten()
                                .find(|enrollment| enrollment.course_id == scope)
                                .map(|enrollment| enrollment.enrollment_id.clone())
                        }
                        None => None,
                    };

                    match self.grant_one(user_id, definition, enrollment_id, &stats).await {
                        Ok(true) => {
                            summary_written = true;
                            metrics::record_achievement_granted(definition.category.as_str());
                            tracing::info!(
                                user_id,
                                achievement_id = %definition.id,
                                points = definition.points,
                                "Achievement granted"
                            );
                            granted.push(definition.clone());
                        }
                        Ok(false) => {
                            tracing::debug!(user_id, achievement_id = %definition.id, "Achievement already granted");
                        }
                        Err(err) => {
                            tracing::error!(
                                user_id,
                                achievement_id = %definition.id,
                                error = %err,
                                "Failed to grant achievement"
                            );
                        }
                    }
                }
            }
        }

        if summary_stale && !summary_written {
            match self.refresh_summary(user_id, &stats).await {
                Ok(()) => tracing::warn!(user_id, "Repaired stale points summary"),
                Err(err) => tracing::error!(user_id, error = %err, "Failed to repair points summary"),
            }
        }

        granted
    }

    /// Write one grant with its ledger entry and summary update.
    ///
    /// `Ok(false)` means the learner already holds the achievement.
    async fn grant_one(
        &self,
        user_id: &str,
        definition: &AchievementDefinition,
        enrollment_id: Option<String>,
        stats: &LearnerStats,
    ) -> Result<bool, EngineError> {
        let current = self.store.list_grants_for_user(user_id, None).await?;
        if current.iter().any(|grant| grant.achievement_id == definition.id) {
            return Ok(false);
        }

        let grant = GrantRecord {
            user_id: user_id.to_string(),
            achievement_id: definition.id.clone(),
            course_id: definition.course_id.clone(),
            enrollment_id,
            earned_at: self.clock.now(),
            progress: 100,
            is_completed: true,
        };
        if self.store.insert_grant(&grant).await? == InsertOutcome::AlreadyExists {
            return Ok(false);
        }
        self.invalidate_progress(user_id);

        self.record_points(user_id, definition, stats).await?;
        Ok(true)
    }

    /// Append the ledger entry of an earned achievement and refresh the
    /// summary. The store keeps one entry per achievement, so repeating this
    /// after a partial failure does not double count.
    async fn record_points(
        &self,
        user_id: &str,
        definition: &AchievementDefinition,
        stats: &LearnerStats,
    ) -> Result<(), EngineError> {
        self.store
            .append_points_ledger(&PointsLedgerEntry {
                user_id: user_id.to_string(),
                points: definition.points,
                action: ACTION_ACHIEVEMENT_EARNED.to_string(),
                description: format!("Earned achievement: {}", definition.title),
                achievement_id: Some(definition.id.clone()),
                created_at: self.clock.now(),
            })
            .await?;

        self.refresh_summary(user_id, stats).await
    }

    /// Recompute the summary from the ledger and the grant list.
    ///
    /// Both are read after this caller's own writes, and the store never lowers
    /// a stored total, so racing writers end on the complete sum.
    async fn refresh_summary(&self, user_id: &str, stats: &LearnerStats) -> Result<(), EngineError> {
        let (total, grants) = tokio::join!(
            self.store.sum_ledger_points(user_id),
            self.store.list_grants_for_user(user_id, None),
        );
        let total_points = total?.max(0);

        self.store
            .upsert_user_points_summary(&UserPointsSummary {
                user_id: user_id.to_string(),
                total_points,
                current_level: level_for_points(total_points),
                lessons_completed: stats.lessons_completed,
                courses_completed: stats.courses_completed,
                achievements_count: grants?.len() as i64,
                updated_at: self.clock.now(),
            })
            .await?;
        Ok(())
    }

    async fn learner_stats(&self, user_id: &str, course_id: Option<&str>) -> LearnerStats {
        let in_course = async {
            match course_id {
                Some(course_id) => self
                    .store
                    .count_completed_lessons_in_course(user_id, course_id)
                    .await
                    .map(Some),
                None => Ok(None),
            }
        };

        let (lessons, lessons_in_course, courses, quiz, activity) = tokio::join!(
            self.store.count_completed_lessons(user_id),
            in_course,
            self.store.count_completed_courses(user_id),
            self.store.average_quiz_score(user_id),
            self.store.study_activity(user_id, self.clock.now().date_naive()),
        );

        let activity = or_degraded("study_activity", user_id, activity);
        let finite = |value: f64| if value.is_finite() { value } else { 0.0 };

        LearnerStats {
            lessons_completed: or_degraded("count_completed_lessons", user_id, lessons),
            lessons_completed_in_course: or_degraded("count_completed_lessons_in_course", user_id, lessons_in_course)
                .or(course_id.map(|_| 0)),
            courses_completed: or_degraded("count_completed_courses", user_id, courses),
            study_hours: finite(activity.study_hours),
            average_quiz_score: finite(or_degraded("average_quiz_score", user_id, quiz)),
            current_streak: activity.current_streak,
        }
    }
}
