//! Database operations for the upstream request audit log.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::data::models::{ApiLog, NewApiLog};

pub async fn insert(pool: &PgPool, entry: &NewApiLog) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO api_logs (
            user_id, api_configuration_id, request_method, request_url,
            response_status, response_body
        )
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(entry.user_id)
    .bind(entry.api_configuration_id)
    .bind(&entry.request_method)
    .bind(&entry.request_url)
    .bind(entry.response_status)
    .bind(entry.response_body.as_deref())
    .execute(pool)
    .await
    .context("Failed to insert API log")?;
    Ok(())
}

/// Most recent entries, newest first.
pub async fn list_recent(pool: &PgPool, limit: i64) -> Result<Vec<ApiLog>> {
    sqlx::query_as::<_, ApiLog>("SELECT * FROM api_logs ORDER BY created_at DESC LIMIT $1")
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("Failed to list API logs")
}

/// Timestamp of the newest entry, used for conditional requests.
pub async fn latest_timestamp(pool: &PgPool) -> Result<Option<DateTime<Utc>>> {
    sqlx::query_scalar("SELECT max(created_at) FROM api_logs")
        .fetch_one(pool)
        .await
        .context("Failed to read latest API log timestamp")
}

pub async fn count(pool: &PgPool) -> Result<i64> {
    let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM api_logs")
        .fetch_one(pool)
        .await?;
    Ok(n)
}
