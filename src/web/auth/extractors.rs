//! Axum extractors for authenticated and role-gated routes.
//!
//! Tokens come from `Authorization: Bearer <token>`. Resolution order is the
//! session cache, then the auth provider plus profile/role queries.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use http::request::Parts;
use tracing::warn;

use crate::data::models::AppRole;
use crate::state::AppState;
use crate::web::auth::session::SessionUser;
use crate::web::error::{ApiError, db_error};

/// Any signed-in user, regardless of role.
pub struct AuthUser(pub SessionUser);

/// Analyst or higher.
pub struct AnalystUser(pub SessionUser);

/// Coordinator or higher.
pub struct CoordinatorUser(pub SessionUser);

/// Admin only.
pub struct AdminUser(pub SessionUser);

/// The raw bearer token, for handlers that act on the session itself.
pub struct BearerToken(pub String);

/// Extract the token from an `Authorization: Bearer` header.
pub fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Resolve a token to a session user, populating the cache on a miss.
pub async fn resolve_session(state: &AppState, token: &str) -> Result<SessionUser, ApiError> {
    if let Some(user) = state.session_cache.get(token) {
        return Ok(user);
    }

    let identity = state.auth.get_user(token).await?;
    let email = identity_email(&identity)?;
    let profile = crate::data::profiles::ensure_profile(&state.db_pool, identity.id, email)
        .await
        .map_err(|e| db_error("Profile lookup", e))?;
    let role = crate::data::roles::highest_role(&state.db_pool, identity.id)
        .await
        .map_err(|e| db_error("Role lookup", e))?;

    let user = SessionUser::from_profile(&profile, role);
    state.session_cache.insert(token, user.clone());
    Ok(user)
}

/// Profiles are keyed by a unique email, so identities without one cannot sign in.
fn identity_email(identity: &crate::supabase::AuthUser) -> Result<&str, ApiError> {
    match identity.email.as_deref().map(str::trim) {
        Some(email) if !email.is_empty() => Ok(email),
        _ => {
            warn!(user_id = %identity.id, "Provider identity has no email");
            Err(ApiError::unauthorized("Conta sem email associado"))
        }
    }
}

async fn authenticate(parts: &Parts, state: &AppState) -> Result<SessionUser, ApiError> {
    let token = bearer_token(parts).ok_or_else(|| ApiError::unauthorized("Autenticação necessária"))?;
    resolve_session(state, token).await
}

async fn require_role(
    parts: &Parts,
    state: &AppState,
    required: AppRole,
) -> Result<SessionUser, ApiError> {
    let user = authenticate(parts, state).await?;
    if !user.has_role(required) {
        warn!(user_id = %user.id, role = ?user.role, required = %required, "Access denied");
        return Err(ApiError::forbidden("Acesso negado"));
    }
    Ok(user)
}

impl FromRequestParts<AppState> for BearerToken {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &AppState) -> Result<Self, Self::Rejection> {
        bearer_token(parts)
            .map(|t| BearerToken(t.to_owned()))
            .ok_or_else(|| ApiError::unauthorized("Autenticação necessária"))
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        authenticate(parts, state).await.map(AuthUser)
    }
}

impl FromRequestParts<AppState> for AnalystUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        require_role(parts, state, AppRole::Analyst).await.map(AnalystUser)
    }
}

impl FromRequestParts<AppState> for CoordinatorUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        require_role(parts, state, AppRole::Coordinator)
            .await
            .map(CoordinatorUser)
    }
}

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        require_role(parts, state, AppRole::Admin).await.map(AdminUser)
    }
}
