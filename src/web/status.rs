//! Health and status handlers.

use axum::extract::State;
use axum::response::Json;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{trace, warn};
use ts_rs::TS;

use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum ServiceStatus {
    Active,
    Error,
}

#[derive(Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StatusResponse {
    status: ServiceStatus,
    version: String,
    commit: String,
    database: ServiceStatus,
    #[ts(type = "number | null")]
    database_latency_ms: Option<u64>,
    #[ts(type = "number")]
    cached_sessions: usize,
}

/// Health check endpoint
pub(super) async fn health() -> Json<Value> {
    trace!("health check requested");
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Status endpoint: build info and database reachability.
pub(super) async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let (database, database_latency_ms) = match crate::data::health::ping(&state.db_pool).await {
        Ok(latency) => (ServiceStatus::Active, Some(latency.as_millis() as u64)),
        Err(e) => {
            warn!(error = ?e, "Database unreachable");
            (ServiceStatus::Error, None)
        }
    };

    Json(StatusResponse {
        status: database,
        version: env!("CARGO_PKG_VERSION").to_string(),
        commit: env!("GIT_COMMIT_HASH").to_string(),
        database,
        database_latency_ms,
        cached_sessions: state.session_cache.len(),
    })
}
