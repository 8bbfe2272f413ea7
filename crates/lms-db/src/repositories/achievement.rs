use sqlx::{Executor, Postgres};

use crate::models::{AchievementDefinition, GrantRecord};

pub async fn list_catalog<'e, E>(executor: E) -> Result<Vec<AchievementDefinition>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT
                id::text AS id,
                title,
                description,
                icon,
                category,
                points::bigint AS points,
                requirement_type,
                requirement_value,
                course_id::text AS course_id
            FROM achievements
            WHERE is_active
            ORDER BY points ASC, created_at, id
        "#,
    )
    .fetch_all(executor)
    .await
}

pub async fn list_grants_for_user<'e, E>(
    executor: E,
    user_id: &str,
    course_ids: Option<&[String]>,
) -> Result<Vec<GrantRecord>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT
                user_id::text AS user_id,
                achievement_id::text AS achievement_id,
                course_id::text AS course_id,
                enrollment_id::text AS enrollment_id,
                earned_at,
                progress,
                is_completed
            FROM user_achievements
            WHERE user_id = $1::uuid
              AND (
                  $2::uuid[] IS NULL
                  OR course_id IS NULL
                  OR course_id = ANY($2::uuid[])
              )
            ORDER BY earned_at
        "#,
    )
    .bind(user_id)
    .bind(course_ids)
    .fetch_all(executor)
    .await
}

/// Insert a grant, returns false when the pair was already granted
pub async fn insert_grant<'e, E>(executor: E, grant: &GrantRecord) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        // language=PostgreSQL
        r#"
            INSERT INTO user_achievements
                (user_id, achievement_id, course_id, enrollment_id, earned_at, progress, is_completed)
            VALUES ($1::uuid, $2::uuid, $3::uuid, $4::uuid, $5, $6, $7)
            ON CONFLICT (user_id, achievement_id) DO NOTHING
        "#,
    )
    .bind(&grant.user_id)
    .bind(&grant.achievement_id)
    .bind(&grant.course_id)
    .bind(&grant.enrollment_id)
    .bind(grant.earned_at)
    .bind(grant.progress)
    .bind(grant.is_completed)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}
