//! Database operations for user profiles.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::data::models::Profile;

/// Create the profile for an authenticated user if it does not exist yet.
///
/// The email is refreshed on every call since the auth provider owns it.
pub async fn ensure_profile(pool: &PgPool, id: Uuid, email: &str) -> Result<Profile> {
    sqlx::query_as::<_, Profile>(
        r#"
        INSERT INTO profiles (id, email)
        VALUES ($1, $2)
        ON CONFLICT (id)
        DO UPDATE SET email = EXCLUDED.email, updated_at = now()
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(email)
    .fetch_one(pool)
    .await
    .context("Failed to ensure profile")
}

pub async fn get(pool: &PgPool, id: Uuid) -> Result<Option<Profile>> {
    sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to fetch profile")
}

/// Case-insensitive lookup by email.
pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Profile>> {
    sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE lower(email) = lower($1)")
        .bind(email.trim())
        .fetch_optional(pool)
        .await
        .context("Failed to look up profile by email")
}

/// Store name and phone and mark the profile complete.
pub async fn complete(pool: &PgPool, id: Uuid, name: &str, phone: &str) -> Result<Option<Profile>> {
    sqlx::query_as::<_, Profile>(
        r#"
        UPDATE profiles
        SET name = $2, phone = $3, completed_profile = TRUE, updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(phone)
    .fetch_optional(pool)
    .await
    .context("Failed to complete profile")
}

pub async fn count(pool: &PgPool) -> Result<i64> {
    let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM profiles")
        .fetch_one(pool)
        .await?;
    Ok(n)
}
