use chrono::NaiveDate;
use sqlx::{Executor, Postgres};

use crate::models::CourseLessonCount;

pub async fn count_completed_lessons<'e, E>(executor: E, user_id: &str) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_scalar(
        // language=PostgreSQL
        r#"
            SELECT COUNT(*)
            FROM lesson_progress
            WHERE user_id = $1::uuid AND completed
        "#,
    )
    .bind(user_id)
    .fetch_one(executor)
    .await
}

pub async fn count_completed_lessons_in_course<'e, E>(
    executor: E,
    user_id: &str,
    course_id: &str,
) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_scalar(
        // language=PostgreSQL
        r#"
            SELECT COUNT(*)
            FROM lesson_progress lp
            JOIN lessons l ON l.id = lp.lesson_id
            WHERE lp.user_id = $1::uuid AND l.course_id = $2::uuid AND lp.completed
        "#,
    )
    .bind(user_id)
    .bind(course_id)
    .fetch_one(executor)
    .await
}

/// Completed lessons per actively enrolled course, zero included
pub async fn completed_lessons_by_course<'e, E>(
    executor: E,
    user_id: &str,
) -> Result<Vec<CourseLessonCount>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT e.course_id::text AS course_id, COUNT(lp.lesson_id) AS completed_lessons
            FROM enrollments e
            LEFT JOIN lessons l ON l.course_id = e.course_id
            LEFT JOIN lesson_progress lp
                ON lp.lesson_id = l.id AND lp.user_id = e.user_id AND lp.completed
            WHERE e.user_id = $1::uuid AND e.status = 'active'
            GROUP BY e.course_id
        "#,
    )
    .bind(user_id)
    .fetch_all(executor)
    .await
}

pub async fn average_quiz_score<'e, E>(
    executor: E,
    user_id: &str,
) -> Result<Option<f64>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_scalar(
        // language=PostgreSQL
        r#"
            SELECT AVG(score)::float8
            FROM quiz_attempts
            WHERE user_id = $1::uuid
        "#,
    )
    .bind(user_id)
    .fetch_one(executor)
    .await
}

/// Hours spent in completed lessons
pub async fn study_hours<'e, E>(executor: E, user_id: &str) -> Result<f64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_scalar(
        // language=PostgreSQL
        r#"
            SELECT COALESCE(SUM(l.duration_minutes), 0)::float8 / 60.0
            FROM lesson_progress lp
            JOIN lessons l ON l.id = lp.lesson_id
            WHERE lp.user_id = $1::uuid AND lp.completed
        "#,
    )
    .bind(user_id)
    .fetch_one(executor)
    .await
}

/// Distinct UTC days with a completed lesson or a quiz attempt, most recent first
pub async fn active_days<'e, E>(executor: E, user_id: &str) -> Result<Vec<NaiveDate>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_scalar(
        // language=PostgreSQL
        r#"
            SELECT day FROM (
                SELECT (completed_at AT TIME ZONE 'UTC')::date AS day
                FROM lesson_progress
                WHERE user_id = $1::uuid AND completed AND completed_at IS NOT NULL
                UNION
                SELECT (created_at AT TIME ZONE 'UTC')::date AS day
                FROM quiz_attempts
                WHERE user_id = $1::uuid
            ) days
            ORDER BY day DESC
            LIMIT 366
        "#,
    )
    .bind(user_id)
    .fetch_all(executor)
    .await
}
