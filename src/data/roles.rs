//! Database operations for role assignments (`user_roles`).

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::data::models::{AppRole, Member};

/// Outcome of assigning a role.
#[derive(Debug)]
pub enum AssignOutcome {
    Created(Member),
    AlreadyAssigned,
}

/// Highest role held by a user, or `None` if they have no assignment.
pub async fn highest_role(pool: &PgPool, user_id: Uuid) -> Result<Option<AppRole>> {
    let roles: Vec<AppRole> =
        sqlx::query_scalar("SELECT role FROM user_roles WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(pool)
            .await
            .context("Failed to load user roles")?;
    Ok(roles.into_iter().max())
}

/// All role assignments with member email, newest first.
pub async fn list_members(pool: &PgPool) -> Result<Vec<Member>> {
    sqlx::query_as::<_, Member>(
        r#"
        SELECT r.id, r.user_id, p.email, r.role, r.created_at
        FROM user_roles r
        JOIN profiles p ON p.id = r.user_id
        ORDER BY r.created_at DESC
        "#,
    )
    .fetch_all(pool)
    .await
    .context("Failed to list members")
}

/// Grant `role` to `user_id`. Assigning an existing pair is not an error.
pub async fn assign(pool: &PgPool, user_id: Uuid, role: AppRole) -> Result<AssignOutcome> {
    let inserted = sqlx::query_as::<_, Member>(
        r#"
        WITH inserted AS (
            INSERT INTO user_roles (user_id, role)
            VALUES ($1, $2)
            ON CONFLICT (user_id, role) DO NOTHING
            RETURNING id, user_id, role, created_at
        )
        SELECT i.id, i.user_id, p.email, i.role, i.created_at
        FROM inserted i
        JOIN profiles p ON p.id = i.user_id
        "#,
    )
    .bind(user_id)
    .bind(role)
    .fetch_optional(pool)
    .await
    .context("Failed to assign role")?;

    Ok(match inserted {
        Some(member) => AssignOutcome::Created(member),
        None => AssignOutcome::AlreadyAssigned,
    })
}

/// Delete a role assignment by id, returning the affected user.
pub async fn remove(pool: &PgPool, assignment_id: Uuid) -> Result<Option<Uuid>> {
    sqlx::query_scalar("DELETE FROM user_roles WHERE id = $1 RETURNING user_id")
        .bind(assignment_id)
        .fetch_optional(pool)
        .await
        .context("Failed to remove role assignment")
}

pub async fn count(pool: &PgPool) -> Result<i64> {
    let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM user_roles")
        .fetch_one(pool)
        .await?;
    Ok(n)
}

/// Grant admin to the profile with `email`, if one exists.
///
/// Returns `false` when no such profile has signed in yet.
pub async fn ensure_seed_admin(pool: &PgPool, email: &str) -> Result<bool> {
    let Some(profile) = crate::data::profiles::find_by_email(pool, email).await? else {
        return Ok(false);
    };
    assign(pool, profile.id, AppRole::Admin).await?;
    Ok(true)
}
