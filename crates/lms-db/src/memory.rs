//! In-process [`DataSource`] used by tests and local runs without Postgres.
//!
//! Besides storing data it counts every call per operation, can be told to
//! fail a given operation and can add a fixed latency to every call so that
//! concurrent callers overlap.

use std::{
    collections::{HashMap, HashSet},
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::{
    error::StoreError,
    models::{
        AchievementDefinition, CourseLessonCount, Enrollment, GrantRecord, InsertOutcome,
        LeaderboardRow, PointsLedgerEntry, StudyActivity, UserPointsSummary,
    },
    store::{DataSource, StoreResult},
};

/// Operations of the [`DataSource`] contract, used for call counting and fault injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    ListActiveEnrollments,
    CountLessonsByCourse,
    ListGrantsForUser,
    ListAchievementCatalog,
    InsertGrant,
    AppendPointsLedger,
    SumLedgerPoints,
    ListLedgerAchievementIds,
    UpsertUserPointsSummary,
    GetUserPointsSummary,
    CountCompletedLessons,
    CountCompletedLessonsInCourse,
    CountCompletedCourses,
    AverageQuizScore,
    QueryLeaderboard,
    FinegrainedCourseProgress,
    StudyActivity,
}

#[derive(Debug, Clone)]
struct CourseRow {
    title: String,
    total_lessons: i64,
}

#[derive(Debug, Default)]
struct MemoryState {
    courses: HashMap<String, CourseRow>,
    enrollments: Vec<(String, Enrollment)>,
    completed_lessons: HashMap<(String, String), i64>,
    completed_courses: HashMap<String, HashSet<String>>,
    quiz_scores: HashMap<String, Vec<f64>>,
    study_hours: HashMap<String, f64>,
    active_days: HashMap<String, Vec<NaiveDate>>,
    catalog: Vec<AchievementDefinition>,
    grants: Vec<GrantRecord>,
    ledger: Vec<PointsLedgerEntry>,
    summaries: HashMap<String, UserPointsSummary>,
    display_names: HashMap<String, String>,
    calls: HashMap<StoreOp, usize>,
    faults: HashSet<StoreOp>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    latency: Option<Duration>,
    lesson_tracking: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Report lesson-level completion through `finegrained_course_progress`
    pub const fn with_lesson_tracking(mut self) -> Self {
        self.lesson_tracking = true;
        self
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn enter(&self, op: StoreOp) -> StoreResult<()> {
        let failing = {
            let mut state = self.state();
            *state.calls.entry(op).or_default() += 1;
            state.faults.contains(&op)
        };

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if failing {
            return Err(StoreError::Unavailable(format!("{op:?} is failing")));
        }
        Ok(())
    }

    pub fn add_course(&self, course_id: &str, title: &str, total_lessons: i64) {
        self.state().courses.insert(
            course_id.to_string(),
            CourseRow {
                title: title.to_string(),
                total_lessons,
            },
        );
    }

    /// Enroll a learner and return the enrollment id. The course does not
    /// have to exist, which models an enrollment with a dangling reference.
    pub fn enroll(&self, user_id: &str, course_id: &str, legacy_progress: Option<f64>) -> String {
        let mut state = self.state();
        let enrollment_id = Uuid::new_v4().to_string();
        let course_title = state
            .courses
            .get(course_id)
            .map(|course| course.title.clone())
            .unwrap_or_default();

        state.enrollments.push((
            user_id.to_string(),
            Enrollment {
                enrollment_id: enrollment_id.clone(),
                course_id: course_id.to_string(),
                course_title,
                legacy_progress,
            },
        ));
        enrollment_id
    }

    /// Set how many lessons of a course the learner completed
    pub fn complete_lessons(&self, user_id: &str, course_id: &str, completed: i64) {
        self.state()
            .completed_lessons
            .insert((user_id.to_string(), course_id.to_string()), completed);
    }

    pub fn complete_course(&self, user_id: &str, course_id: &str) {
        self.state()
            .completed_courses
            .entry(user_id.to_string())
            .or_default()
            .insert(course_id.to_string());
    }

    pub fn record_quiz_score(&self, user_id: &str, score: f64) {
        self.state()
            .quiz_scores
            .entry(user_id.to_string())
            .or_default()
            .push(score);
    }

    pub fn set_study_hours(&self, user_id: &str, hours: f64) {
        self.state().study_hours.insert(user_id.to_string(), hours);
    }

    /// Mark a day on which the learner completed a lesson or took a quiz
    pub fn record_active_day(&self, user_id: &str, day: NaiveDate) {
        self.state()
            .active_days
            .entry(user_id.to_string())
            .or_default()
            .push(day);
    }

    /// Add a catalog entry, keeping the catalog ordered by points
    pub fn add_achievement(&self, definition: AchievementDefinition) {
        let mut state = self.state();
        state.catalog.push(definition);
        state.catalog.sort_by_key(|entry| entry.points);
    }

    pub fn set_display_name(&self, user_id: &str, display_name: &str) {
        self.state()
            .display_names
            .insert(user_id.to_string(), display_name.to_string());
    }

    /// Append a ledger entry outside of the achievement flow
    pub fn award_points(&self, user_id: &str, points: i64, at: DateTime<Utc>) {
        self.state().ledger.push(PointsLedgerEntry {
            user_id: user_id.to_string(),
            points,
            action: "manual_adjustment".to_string(),
            description: String::new(),
            achievement_id: None,
            created_at: at,
        });
    }

    pub fn grants_for(&self, user_id: &str) -> Vec<GrantRecord> {
        self.state()
            .grants
            .iter()
            .filter(|grant| grant.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn ledger_for(&self, user_id: &str) -> Vec<PointsLedgerEntry> {
        self.state()
            .ledger
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn summary_for(&self, user_id: &str) -> Option<UserPointsSummary> {
        self.state().summaries.get(user_id).cloned()
    }

    /// Number of calls made to `op` so far, failed ones included
    pub fn calls(&self, op: StoreOp) -> usize {
        self.state().calls.get(&op).copied().unwrap_or(0)
    }

    /// Make every subsequent call to `op` fail
    pub fn fail(&self, op: StoreOp) {
        self.state().faults.insert(op);
    }

    pub fn recover(&self, op: StoreOp) {
        self.state().faults.remove(&op);
    }
}

#[async_trait]
impl DataSource for MemoryStore {
    async fn list_active_enrollments(&self, user_id: &str) -> StoreResult<Vec<Enrollment>> {
        self.enter(StoreOp::ListActiveEnrollments).await?;
        Ok(self
            .state()
            .enrollments
            .iter()
            .filter(|(owner, _)| owner == user_id)
            .map(|(_, enrollment)| enrollment.clone())
            .collect())
    }

    async fn count_lessons_by_course(
        &self,
        course_ids: &[String],
    ) -> StoreResult<HashMap<String, i64>> {
        self.enter(StoreOp::CountLessonsByCourse).await?;
        let state = self.state();
        Ok(course_ids
            .iter()
            .filter_map(|id| {
                state
                    .courses
                    .get(id)
                    .map(|course| (id.clone(), course.total_lessons))
            })
            .collect())
    }

    async fn list_grants_for_user(
        &self,
        user_id: &str,
        course_ids: Option<&[String]>,
    ) -> StoreResult<Vec<GrantRecord>> {
        self.enter(StoreOp::ListGrantsForUser).await?;
        Ok(self
            .state()
            .grants
            .iter()
            .filter(|grant| grant.user_id == user_id)
            .filter(|grant| match (course_ids, &grant.course_id) {
                (None, _) | (Some(_), None) => true,
                (Some(ids), Some(course_id)) => ids.contains(course_id),
            })
            .cloned()
            .collect())
    }

    async fn list_achievement_catalog(&self) -> StoreResult<Vec<AchievementDefinition>> {
        self.enter(StoreOp::ListAchievementCatalog).await?;
        Ok(self.state().catalog.clone())
    }

    async fn insert_grant(&self, grant: &GrantRecord) -> StoreResult<InsertOutcome> {
        self.enter(StoreOp::InsertGrant).await?;
        let mut state = self.state();
        let exists = state.grants.iter().any(|existing| {
            existing.user_id == grant.user_id && existing.achievement_id == grant.achievement_id
        });
        if exists {
            return Ok(InsertOutcome::AlreadyExists);
        }
        state.grants.push(grant.clone());
        Ok(InsertOutcome::Inserted)
    }

    async fn append_points_ledger(&self, entry: &PointsLedgerEntry) -> StoreResult<()> {
        self.enter(StoreOp::AppendPointsLedger).await?;
        let mut state = self.state();
        let duplicate = entry.achievement_id.is_some()
            && state.ledger.iter().any(|existing| {
                existing.user_id == entry.user_id && existing.achievement_id == entry.achievement_id
            });
        if !duplicate {
            state.ledger.push(entry.clone());
        }
        Ok(())
    }

    async fn sum_ledger_points(&self, user_id: &str) -> StoreResult<i64> {
        self.enter(StoreOp::SumLedgerPoints).await?;
        Ok(self
            .state()
            .ledger
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .fold(0, |total, entry| total + entry.points))
    }

    async fn list_ledger_achievement_ids(&self, user_id: &str) -> StoreResult<Vec<String>> {
        self.enter(StoreOp::ListLedgerAchievementIds).await?;
        Ok(self
            .state()
            .ledger
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .filter_map(|entry| entry.achievement_id.clone())
            .collect())
    }

    async fn upsert_user_points_summary(&self, summary: &UserPointsSummary) -> StoreResult<()> {
        self.enter(StoreOp::UpsertUserPointsSummary).await?;
        let mut state = self.state();
        let merged = match state.summaries.get(&summary.user_id) {
            Some(existing) => UserPointsSummary {
                total_points: existing.total_points.max(summary.total_points),
                current_level: existing.current_level.max(summary.current_level),
                achievements_count: existing.achievements_count.max(summary.achievements_count),
                ..summary.clone()
            },
            None => summary.clone(),
        };
        state.summaries.insert(summary.user_id.clone(), merged);
        Ok(())
    }

    async fn get_user_points_summary(
        &self,
        user_id: &str,
    ) -> StoreResult<Option<UserPointsSummary>> {
        self.enter(StoreOp::GetUserPointsSummary).await?;
        Ok(self.state().summaries.get(user_id).cloned())
    }

    async fn count_completed_lessons(&self, user_id: &str) -> StoreResult<i64> {
        self.enter(StoreOp::CountCompletedLessons).await?;
        Ok(self
            .state()
            .completed_lessons
            .iter()
            .filter(|((owner, _), _)| owner == user_id)
            .map(|(_, completed)| *completed)
            .sum())
    }

    async fn count_completed_lessons_in_course(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> StoreResult<i64> {
        self.enter(StoreOp::CountCompletedLessonsInCourse).await?;
        Ok(self
            .state()
            .completed_lessons
            .get(&(user_id.to_string(), course_id.to_string()))
            .copied()
            .unwrap_or(0))
    }

    async fn count_completed_courses(&self, user_id: &str) -> StoreResult<i64> {
        self.enter(StoreOp::CountCompletedCourses).await?;
        Ok(self
            .state()
            .completed_courses
            .get(user_id)
            .map_or(0, |courses| courses.len() as i64))
    }

    async fn average_quiz_score(&self, user_id: &str) -> StoreResult<f64> {
        self.enter(StoreOp::AverageQuizScore).await?;
        let state = self.state();
        let average = match state.quiz_scores.get(user_id) {
            Some(scores) if !scores.is_empty() => {
                scores.iter().sum::<f64>() / scores.len() as f64
            }
            _ => 0.0,
        };
        Ok(average)
    }

    async fn query_leaderboard(
        &self,
        since: Option<DateTime<Utc>>,
        limit: i64,
    ) -> StoreResult<Vec<LeaderboardRow>> {
        self.enter(StoreOp::QueryLeaderboard).await?;
        let state = self.state();

        let mut totals: HashMap<&str, i64> = HashMap::new();
        for entry in &state.ledger {
            if since.is_none_or(|start| entry.created_at >= start) {
                *totals.entry(entry.user_id.as_str()).or_default() += entry.points;
            }
        }

        let mut rows: Vec<LeaderboardRow> = totals
            .into_iter()
            .filter(|(_, points)| *points > 0)
            .map(|(user_id, points)| LeaderboardRow {
                user_id: user_id.to_string(),
                display_name: state.display_names.get(user_id).cloned(),
                points,
            })
            .collect();
        rows.sort_by(|a, b| b.points.cmp(&a.points).then_with(|| a.user_id.cmp(&b.user_id)));
        rows.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(rows)
    }

    async fn finegrained_course_progress(
        &self,
        user_id: &str,
    ) -> StoreResult<Option<Vec<CourseLessonCount>>> {
        self.enter(StoreOp::FinegrainedCourseProgress).await?;
        if !self.lesson_tracking {
            return Ok(None);
        }

        let state = self.state();
        let counts = state
            .enrollments
            .iter()
            .filter(|(owner, _)| owner == user_id)
            .map(|(_, enrollment)| CourseLessonCount {
                course_id: enrollment.course_id.clone(),
                completed_lessons: state
                    .completed_lessons
                    .get(&(user_id.to_string(), enrollment.course_id.clone()))
                    .copied()
                    .unwrap_or(0),
            })
            .collect();
        Ok(Some(counts))
    }

    async fn study_activity(&self, user_id: &str, today: NaiveDate) -> StoreResult<StudyActivity> {
        self.enter(StoreOp::StudyActivity).await?;
        let state = self.state();
        let active_days = state
            .active_days
            .get(user_id)
            .map(Vec::as_slice)
            .unwrap_or_default();
        Ok(StudyActivity {
            study_hours: state.study_hours.get(user_id).copied().unwrap_or(0.0),
            current_streak: lms_rules::current_streak(active_days, today),
        })
    }
}
