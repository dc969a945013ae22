//! Sign-in, sign-out and session introspection.

pub mod extractors;
pub mod session;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use ts_rs::TS;

use crate::state::AppState;
use crate::web::auth::extractors::{AuthUser, BearerToken};
use crate::web::auth::session::SessionUser;
use crate::web::error::{ApiError, db_error};

#[derive(Deserialize, TS)]
#[ts(export)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LoginResponse {
    pub access_token: String,
    #[ts(type = "number | null")]
    pub expires_in: Option<u64>,
    pub user: SessionUser,
    pub home: String,
}

#[derive(Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct MeResponse {
    pub user: SessionUser,
    pub home: String,
}

/// `POST /api/auth/login`: Exchange email/password for a bearer token.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let email = body.email.trim();
    if email.is_empty() || body.password.is_empty() {
        return Err(ApiError::bad_request("Email e senha são obrigatórios"));
    }

    let session = state.auth.sign_in_with_password(email, &body.password).await?;

    let provider_email = session.user.email.as_deref().unwrap_or(email);
    let profile =
        crate::data::profiles::ensure_profile(&state.db_pool, session.user.id, provider_email)
            .await
            .map_err(|e| db_error("Profile setup", e))?;
    let role = crate::data::roles::highest_role(&state.db_pool, profile.id)
        .await
        .map_err(|e| db_error("Role lookup", e))?;

    let user = SessionUser::from_profile(&profile, role);
    state.session_cache.insert(&session.access_token, user.clone());

    info!(user_id = %user.id, role = ?user.role, "User signed in");

    Ok(Json(LoginResponse {
        access_token: session.access_token,
        expires_in: session.expires_in,
        home: user.home().to_string(),
        user,
    }))
}

/// `POST /api/auth/logout`: Revoke the current token.
#[instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, BearerToken(token): BearerToken) -> StatusCode {
    state.session_cache.evict_token(&token);
    state.auth.sign_out(&token).await;
    StatusCode::NO_CONTENT
}

/// `GET /api/auth/me`: The current user and where they should land.
pub async fn me(AuthUser(user): AuthUser) -> Json<MeResponse> {
    Json(MeResponse {
        home: user.home().to_string(),
        user,
    })
}
