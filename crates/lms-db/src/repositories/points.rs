use chrono::{DateTime, Utc};
use sqlx::{Executor, Postgres};

use crate::models::{LeaderboardRow, PointsLedgerEntry, UserPointsSummary};

pub async fn append_ledger_entry<'e, E>(
    executor: E,
    entry: &PointsLedgerEntry,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        // language=PostgreSQL
        r#"
            INSERT INTO points_ledger (user_id, points, action, description, achievement_id, created_at)
            VALUES ($1::uuid, $2, $3, $4, $5::uuid, $6)
            ON CONFLICT (user_id, achievement_id) WHERE achievement_id IS NOT NULL
            DO NOTHING
        "#,
    )
    .bind(&entry.user_id)
    .bind(entry.points)
    .bind(&entry.action)
    .bind(&entry.description)
    .bind(&entry.achievement_id)
    .bind(entry.created_at)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn sum_points<'e, E>(executor: E, user_id: &str) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_scalar(
        // language=PostgreSQL
        r#"
            SELECT COALESCE(SUM(points), 0)::bigint
            FROM points_ledger
            WHERE user_id = $1::uuid
        "#,
    )
    .bind(user_id)
    .fetch_one(executor)
    .await
}

/// Achievements that already have their ledger entry
pub async fn ledger_achievement_ids<'e, E>(
    executor: E,
    user_id: &str,
) -> Result<Vec<String>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_scalar(
        // language=PostgreSQL
        r#"
            SELECT achievement_id::text
            FROM points_ledger
            WHERE user_id = $1::uuid AND achievement_id IS NOT NULL
        "#,
    )
    .bind(user_id)
    .fetch_all(executor)
    .await
}

pub async fn find_summary<'e, E>(
    executor: E,
    user_id: &str,
) -> Result<Option<UserPointsSummary>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT
                user_id::text AS user_id,
                total_points,
                current_level,
                lessons_completed,
                courses_completed,
                achievements_count,
                updated_at
            FROM user_points
            WHERE user_id = $1::uuid
        "#,
    )
    .bind(user_id)
    .fetch_optional(executor)
    .await
}

/// Totals only ever grow, so a writer that read an older ledger sum cannot
/// overwrite a newer one.
pub async fn upsert_summary<'e, E>(
    executor: E,
    summary: &UserPointsSummary,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        // language=PostgreSQL
        r#"
            INSERT INTO user_points
                (user_id, total_points, current_level, lessons_completed, courses_completed, achievements_count, updated_at)
            VALUES ($1::uuid, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (user_id)
            DO UPDATE SET
                total_points = GREATEST(user_points.total_points, EXCLUDED.total_points),
                current_level = GREATEST(user_points.current_level, EXCLUDED.current_level),
                lessons_completed = EXCLUDED.lessons_completed,
                courses_completed = EXCLUDED.courses_completed,
                achievements_count =
                    GREATEST(user_points.achievements_count, EXCLUDED.achievements_count),
                updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(&summary.user_id)
    .bind(summary.total_points)
    .bind(summary.current_level)
    .bind(summary.lessons_completed)
    .bind(summary.courses_completed)
    .bind(summary.achievements_count)
    .bind(summary.updated_at)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn leaderboard<'e, E>(
    executor: E,
    since: Option<DateTime<Utc>>,
    limit: i64,
) -> Result<Vec<LeaderboardRow>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT
                pl.user_id::text AS user_id,
                p.display_name,
                SUM(pl.points)::bigint AS points
            FROM points_ledger pl
            LEFT JOIN profiles p ON p.id = pl.user_id
            WHERE $1::timestamptz IS NULL OR pl.created_at >= $1
            GROUP BY pl.user_id, p.display_name
            HAVING SUM(pl.points) > 0
            ORDER BY points DESC, pl.user_id
            LIMIT $2
        "#,
    )
    .bind(since)
    .bind(limit)
    .fetch_all(executor)
    .await
}
