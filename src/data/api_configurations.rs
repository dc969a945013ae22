//! Database operations for per-user Asaas credentials.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::data::models::ApiConfiguration;

pub async fn get_for_user(pool: &PgPool, user_id: Uuid) -> Result<Option<ApiConfiguration>> {
    sqlx::query_as::<_, ApiConfiguration>("SELECT * FROM api_configurations WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .context("Failed to fetch API configuration")
}

/// Insert or replace the caller's configuration (one per user).
pub async fn upsert(
    pool: &PgPool,
    user_id: Uuid,
    api_key: &str,
    webhook_url: &str,
    is_prod: bool,
) -> Result<ApiConfiguration> {
    sqlx::query_as::<_, ApiConfiguration>(
        r#"
        INSERT INTO api_configurations (user_id, api_key, webhook_url, is_prod)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (user_id)
        DO UPDATE SET
            api_key = EXCLUDED.api_key,
            webhook_url = EXCLUDED.webhook_url,
            is_prod = EXCLUDED.is_prod,
            updated_at = now()
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(api_key)
    .bind(webhook_url)
    .bind(is_prod)
    .fetch_one(pool)
    .await
    .context("Failed to save API configuration")
}
