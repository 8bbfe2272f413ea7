//! Data-access contract consumed by the progress engine.
//!
//! The engine never talks to a database directly. Everything it reads or
//! writes goes through [`DataSource`], which is implemented by [`PgStore`] for
//! Postgres and by [`crate::memory::MemoryStore`] for tests and local runs.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;

use crate::{
    error::StoreError,
    models::{
        AchievementDefinition, CourseLessonCount, Enrollment, GrantRecord, InsertOutcome,
        LeaderboardRow, PointsLedgerEntry, StudyActivity, UserPointsSummary,
    },
    repositories::{achievement, activity, enrollment, points},
};

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait DataSource: Send + Sync {
    /// Active enrollments of a learner, in store order
    async fn list_active_enrollments(&self, user_id: &str) -> StoreResult<Vec<Enrollment>>;

    /// Total lesson count per course, fetched in one batch
    async fn count_lessons_by_course(
        &self,
        course_ids: &[String],
    ) -> StoreResult<HashMap<String, i64>>;

    /// Grants of a learner. With `course_ids`, only grants for those courses
    /// plus global (course-less) grants are returned.
    async fn list_grants_for_user(
        &self,
        user_id: &str,
        course_ids: Option<&[String]>,
    ) -> StoreResult<Vec<GrantRecord>>;

    /// Active catalog ordered by ascending points
    async fn list_achievement_catalog(&self) -> StoreResult<Vec<AchievementDefinition>>;

    async fn insert_grant(&self, grant: &GrantRecord) -> StoreResult<InsertOutcome>;

    /// Append a ledger entry. An achievement entry is written at most once per
    /// learner; appending it again is a no-op.
    async fn append_points_ledger(&self, entry: &PointsLedgerEntry) -> StoreResult<()>;

    /// Sum of every ledger entry of a learner
    async fn sum_ledger_points(&self, user_id: &str) -> StoreResult<i64>;

    /// Achievement ids that already have a ledger entry for the learner
    async fn list_ledger_achievement_ids(&self, user_id: &str) -> StoreResult<Vec<String>>;

    /// Insert or update the summary. `total_points`, `current_level` and
    /// `achievements_count` never decrease, so concurrent writers that each
    /// read the ledger after their own append converge on the full sum.
    async fn upsert_user_points_summary(&self, summary: &UserPointsSummary) -> StoreResult<()>;

    async fn get_user_points_summary(&self, user_id: &str)
    -> StoreResult<Option<UserPointsSummary>>;

    async fn count_completed_lessons(&self, user_id: &str) -> StoreResult<i64>;

    async fn count_completed_lessons_in_course(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> StoreResult<i64>;

    async fn count_completed_courses(&self, user_id: &str) -> StoreResult<i64>;

    /// Average quiz score in percent, 0 when the learner took no quiz
    async fn average_quiz_score(&self, user_id: &str) -> StoreResult<f64>;

    /// Points per learner earned since `since` (all time when `None`),
    /// highest first
    async fn query_leaderboard(
        &self,
        since: Option<DateTime<Utc>>,
        limit: i64,
    ) -> StoreResult<Vec<LeaderboardRow>>;

    /// Lesson-level completion counts, when the store tracks them. Every
    /// active enrollment is listed, with zero when nothing was completed.
    /// Overrides the estimate derived from the legacy enrollment progress.
    async fn finegrained_course_progress(
        &self,
        _user_id: &str,
    ) -> StoreResult<Option<Vec<CourseLessonCount>>> {
        Ok(None)
    }

    /// Study hours and the streak of consecutive active days ending at `today`
    async fn study_activity(
        &self,
        _user_id: &str,
        _today: NaiveDate,
    ) -> StoreResult<StudyActivity> {
        Ok(StudyActivity::default())
    }
}

/// Postgres-backed [`DataSource`].
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl DataSource for PgStore {
    async fn list_active_enrollments(&self, user_id: &str) -> StoreResult<Vec<Enrollment>> {
        Ok(enrollment::list_active(&self.pool, user_id).await?)
    }

    async fn count_lessons_by_course(
        &self,
        course_ids: &[String],
    ) -> StoreResult<HashMap<String, i64>> {
        if course_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let counts = enrollment::count_lessons_by_course(&self.pool, course_ids).await?;
        Ok(counts.into_iter().collect())
    }

    async fn list_grants_for_user(
        &self,
        user_id: &str,
        course_ids: Option<&[String]>,
    ) -> StoreResult<Vec<GrantRecord>> {
        Ok(achievement::list_grants_for_user(&self.pool, user_id, course_ids).await?)
    }

    async fn list_achievement_catalog(&self) -> StoreResult<Vec<AchievementDefinition>> {
        Ok(achievement::list_catalog(&self.pool).await?)
    }

    async fn insert_grant(&self, grant: &GrantRecord) -> StoreResult<InsertOutcome> {
        let inserted = achievement::insert_grant(&self.pool, grant).await?;
        Ok(if inserted {
            InsertOutcome::Inserted
        } else {
            InsertOutcome::AlreadyExists
        })
    }

    async fn append_points_ledger(&self, entry: &PointsLedgerEntry) -> StoreResult<()> {
        Ok(points::append_ledger_entry(&self.pool, entry).await?)
    }

    async fn sum_ledger_points(&self, user_id: &str) -> StoreResult<i64> {
        Ok(points::sum_points(&self.pool, user_id).await?)
    }

    async fn list_ledger_achievement_ids(&self, user_id: &str) -> StoreResult<Vec<String>> {
        Ok(points::ledger_achievement_ids(&self.pool, user_id).await?)
    }

    async fn upsert_user_points_summary(&self, summary: &UserPointsSummary) -> StoreResult<()> {
        Ok(points::upsert_summary(&self.pool, summary).await?)
    }

    async fn get_user_points_summary(
        &self,
        user_id: &str,
    ) -> StoreResult<Option<UserPointsSummary>> {
        Ok(points::find_summary(&self.pool, user_id).await?)
    }

    async fn count_completed_lessons(&self, user_id: &str) -> StoreResult<i64> {
        Ok(activity::count_completed_lessons(&self.pool, user_id).await?)
    }

    async fn count_completed_lessons_in_course(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> StoreResult<i64> {
        Ok(activity::count_completed_lessons_in_course(&self.pool, user_id, course_id).await?)
    }

    async fn count_completed_courses(&self, user_id: &str) -> StoreResult<i64> {
        Ok(enrollment::count_completed_courses(&self.pool, user_id).await?)
    }

    async fn average_quiz_score(&self, user_id: &str) -> StoreResult<f64> {
        let average = activity::average_quiz_score(&self.pool, user_id).await?;
        Ok(average.unwrap_or(0.0))
    }

    async fn query_leaderboard(
        &self,
        since: Option<DateTime<Utc>>,
        limit: i64,
    ) -> StoreResult<Vec<LeaderboardRow>> {
        Ok(points::leaderboard(&self.pool, since, limit).await?)
    }

    async fn finegrained_course_progress(
        &self,
        user_id: &str,
    ) -> StoreResult<Option<Vec<CourseLessonCount>>> {
        let counts = activity::completed_lessons_by_course(&self.pool, user_id).await?;
        Ok(Some(counts))
    }

    async fn study_activity(&self, user_id: &str, today: NaiveDate) -> StoreResult<StudyActivity> {
        let study_hours = activity::study_hours(&self.pool, user_id).await?;
        let active_days = activity::active_days(&self.pool, user_id).await?;

        Ok(StudyActivity {
            study_hours,
            current_streak: lms_rules::current_streak(&active_days, today),
        })
    }
}
