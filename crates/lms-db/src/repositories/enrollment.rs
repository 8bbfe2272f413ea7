use sqlx::{Executor, Postgres};

use crate::models::Enrollment;

pub async fn list_active<'e, E>(executor: E, user_id: &str) -> Result<Vec<Enrollment>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    // LEFT JOIN keeps enrollments whose course no longer resolves
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT
                e.id::text AS enrollment_id,
                e.course_id::text AS course_id,
                COALESCE(c.title, '') AS course_title,
                e.progress AS legacy_progress
            FROM enrollments e
            LEFT JOIN courses c ON c.id = e.course_id
            WHERE e.user_id = $1::uuid AND e.status = 'active'
            ORDER BY e.enrolled_at, e.id
        "#,
    )
    .bind(user_id)
    .fetch_all(executor)
    .await
}

pub async fn count_lessons_by_course<'e, E>(
    executor: E,
    course_ids: &[String],
) -> Result<Vec<(String, i64)>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT course_id::text, COUNT(*) AS total_lessons
            FROM lessons
            WHERE course_id = ANY($1::uuid[])
            GROUP BY course_id
        "#,
    )
    .bind(course_ids)
    .fetch_all(executor)
    .await
}

pub async fn count_completed_courses<'e, E>(executor: E, user_id: &str) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_scalar(
        // language=PostgreSQL
        r#"
            SELECT COUNT(DISTINCT course_id)
            FROM enrollments
            WHERE user_id = $1::uuid
              AND (completed_at IS NOT NULL OR progress >= 100)
        "#,
    )
    .bind(user_id)
    .fetch_one(executor)
    .await
}
