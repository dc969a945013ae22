//! The caller's Asaas credentials.

use axum::extract::State;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use ts_rs::TS;
use url::Url;

use crate::asaas::AsaasEnvironment;
use crate::data::models::ApiConfiguration;
use crate::state::AppState;
use crate::web::auth::extractors::AuthUser;
use crate::web::error::{ApiError, db_error};

#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ApiConfigurationRequest {
    pub api_key: String,
    #[serde(default)]
    pub webhook_url: String,
    #[serde(default)]
    pub is_prod: bool,
}

/// A configuration as shown to its owner. The key is never echoed in full.
#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ApiConfigurationResponse {
    pub masked_api_key: String,
    pub webhook_url: String,
    pub is_prod: bool,
    pub environment: AsaasEnvironment,
    pub updated_at: String,
}

impl From<ApiConfiguration> for ApiConfigurationResponse {
    fn from(config: ApiConfiguration) -> Self {
        Self {
            masked_api_key: mask_key(&config.api_key),
            environment: AsaasEnvironment::from_is_prod(config.is_prod),
            webhook_url: config.webhook_url,
            is_prod: config.is_prod,
            updated_at: config.updated_at.to_rfc3339(),
        }
    }
}

/// Keep only the last four characters visible.
pub fn mask_key(key: &str) -> String {
    let count = key.chars().count();
    if count <= 4 {
        return "*".repeat(count);
    }
    let tail: String = key.chars().skip(count - 4).collect();
    format!("{}{tail}", "*".repeat(count - 4))
}

/// An empty string, or an absolute http(s) URL.
fn validate_webhook_url(raw: &str) -> Result<(), ApiError> {
    if raw.is_empty() {
        return Ok(());
    }
    match Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.host_str().is_some() => Ok(()),
        _ => Err(ApiError::bad_request("URL do webhook inválida")),
    }
}

/// `GET /api/api-configuration`
pub async fn get_configuration(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> Result<Json<ApiConfigurationResponse>, ApiError> {
    crate::data::api_configurations::get_for_user(&state.db_pool, user.id)
        .await
        .map_err(|e| db_error("API configuration lookup", e))?
        .map(|config| Json(config.into()))
        .ok_or_else(|| ApiError::not_found("Configuração da API não encontrada"))
}

/// `PUT /api/api-configuration`
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn save_configuration(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(body): Json<ApiConfigurationRequest>,
) -> Result<Json<ApiConfigurationResponse>, ApiError> {
    let api_key = body.api_key.trim();
    if api_key.is_empty() {
        return Err(ApiError::bad_request("Chave da API é obrigatória"));
    }
    let webhook_url = body.webhook_url.trim();
    validate_webhook_url(webhook_url)?;

    let saved = crate::data::api_configurations::upsert(
        &state.db_pool,
        user.id,
        api_key,
        webhook_url,
        body.is_prod,
    )
    .await
    .map_err(|e| db_error("API configuration save", e))?;

    info!(environment = %AsaasEnvironment::from_is_prod(saved.is_prod), "Saved API configuration");
    Ok(Json(saved.into()))
}
