//! Profile completion for newly registered users.

use axum::extract::State;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use ts_rs::TS;

use crate::data::models::Profile;
use crate::state::AppState;
use crate::web::auth::extractors::AuthUser;
use crate::web::auth::session::home_path;
use crate::web::error::{ApiError, db_error};

#[derive(Deserialize, TS)]
#[ts(export)]
pub struct CompleteProfileRequest {
    pub name: String,
    pub phone: String,
}

#[derive(Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProfileResponse {
    pub profile: Profile,
    pub home: String,
}

/// Trimmed `(name, phone)`, or a message naming the missing field.
fn validate(body: &CompleteProfileRequest) -> Result<(&str, &str), ApiError> {
    let name = body.name.trim();
    let phone = body.phone.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("Nome completo é obrigatório"));
    }
    if phone.is_empty() {
        return Err(ApiError::bad_request("Telefone é obrigatório"));
    }
    Ok((name, phone))
}

/// `GET /api/profile`
pub async fn get_profile(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let profile = crate::data::profiles::get(&state.db_pool, user.id)
        .await
        .map_err(|e| db_error("Profile lookup", e))?
        .ok_or_else(|| ApiError::not_found("Perfil não encontrado"))?;

    Ok(Json(ProfileResponse {
        home: home_path(user.role, profile.completed_profile).to_string(),
        profile,
    }))
}

/// `PUT /api/profile`: Store name and phone and mark the profile complete.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn complete_profile(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(body): Json<CompleteProfileRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let (name, phone) = validate(&body)?;

    let profile = crate::data::profiles::complete(&state.db_pool, user.id, name, phone)
        .await
        .map_err(|e| db_error("Profile update", e))?
        .ok_or_else(|| ApiError::not_found("Perfil não encontrado"))?;

    state.session_cache.evict_user(user.id);
    info!("Profile completed");

    Ok(Json(ProfileResponse {
        home: home_path(user.role, true).to_string(),
        profile,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str, phone: &str) -> CompleteProfileRequest {
        CompleteProfileRequest {
            name: name.into(),
            phone: phone.into(),
        }
    }

    #[test]
    fn trims_fields() {
        let body = request("  Ana Souza ", " 11 99999-0000 ");
        assert_eq!(validate(&body).unwrap(), ("Ana Souza", "11 99999-0000"));
    }

    #[test]
    fn rejects_blank_fields() {
        assert!(validate(&request("   ", "1199")).is_err());
        let err = validate(&request("Ana", "")).unwrap_err();
        assert_eq!(err.message, "Telefone é obrigatório");
    }
}
