//! Role assignment management.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use tracing::{info, instrument, trace};
use ts_rs::TS;
use uuid::Uuid;

use crate::data::models::{AppRole, Member};
use crate::data::roles::AssignOutcome;
use crate::state::AppState;
use crate::web::auth::extractors::AdminUser;
use crate::web::error::{ApiError, db_error};

#[derive(Debug, Deserialize, TS)]
#[ts(export)]
pub struct AddMemberRequest {
    pub email: String,
    pub role: String,
}

/// Validate the request into a normalized email and role.
fn parse_add_request(body: &AddMemberRequest) -> Result<(String, AppRole), ApiError> {
    let email = body.email.trim();
    let role = body.role.trim();
    if email.is_empty() || role.is_empty() {
        return Err(ApiError::bad_request("Email e função são obrigatórios"));
    }
    let role = role
        .parse::<AppRole>()
        .map_err(|_| ApiError::bad_request(format!("Função inválida: '{role}'")))?;
    Ok((email.to_lowercase(), role))
}

/// `GET /api/admin/members`
#[instrument(skip_all)]
pub async fn list_members(
    AdminUser(_user): AdminUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Member>>, ApiError> {
    let members = crate::data::roles::list_members(&state.db_pool)
        .await
        .map_err(|e| db_error("Member listing", e))?;
    trace!(count = members.len(), "Listed members");
    Ok(Json(members))
}

/// `POST /api/admin/members`: Grant a role to a registered user by email.
#[instrument(skip_all)]
pub async fn add_member(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Json(body): Json<AddMemberRequest>,
) -> Result<(StatusCode, Json<Member>), ApiError> {
    let (email, role) = parse_add_request(&body)?;

    let profile = crate::data::profiles::find_by_email(&state.db_pool, &email)
        .await
        .map_err(|e| db_error("Profile lookup", e))?
        .ok_or_else(|| ApiError::not_found("Este email não está registrado no sistema."))?;

    match crate::data::roles::assign(&state.db_pool, profile.id, role)
        .await
        .map_err(|e| db_error("Role assignment", e))?
    {
        AssignOutcome::Created(member) => {
            state.session_cache.evict_user(profile.id);
            info!(admin_id = %admin.id, user_id = %profile.id, %role, "Granted role");
            Ok((StatusCode::CREATED, Json(member)))
        }
        AssignOutcome::AlreadyAssigned => Err(ApiError::conflict(format!(
            "Este usuário já possui a função '{role}'."
        ))),
    }
}

/// `DELETE /api/admin/members/{id}`: Revoke a role assignment.
#[instrument(skip_all, fields(assignment_id = %id))]
pub async fn remove_member(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let user_id = crate::data::roles::remove(&state.db_pool, id)
        .await
        .map_err(|e| db_error("Role removal", e))?
        .ok_or_else(|| ApiError::not_found("Atribuição não encontrada"))?;

    state.session_cache.evict_user(user_id);
    info!(admin_id = %admin.id, %user_id, "Revoked role");
    Ok(StatusCode::NO_CONTENT)
}
