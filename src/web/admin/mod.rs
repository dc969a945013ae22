//! Admin API handlers.
//!
//! All endpoints require the `AdminUser` extractor, returning 401/403 as needed.

pub mod members;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{instrument, trace};
use ts_rs::TS;

use crate::data::models::ApiLog;
use crate::state::AppState;
use crate::web::auth::extractors::AdminUser;
use crate::web::error::{ApiError, db_error};

const DEFAULT_LOG_LIMIT: i64 = 200;
const MAX_LOG_LIMIT: i64 = 1000;

#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AdminStatusResponse {
    #[ts(type = "number")]
    profile_count: i64,
    #[ts(type = "number")]
    member_count: i64,
    #[ts(type = "number")]
    payment_record_count: i64,
    #[ts(type = "number")]
    api_log_count: i64,
    #[ts(type = "number")]
    cached_sessions: usize,
}

#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ApiLogsResponse {
    pub entries: Vec<ApiLog>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiLogsParams {
    pub limit: Option<i64>,
}

/// `GET /api/admin/status`: Row counts for the main tables.
#[instrument(skip_all)]
pub async fn admin_status(
    AdminUser(_user): AdminUser,
    State(state): State<AppState>,
) -> Result<Json<AdminStatusResponse>, ApiError> {
    let pool = &state.db_pool;
    let profile_count = crate::data::profiles::count(pool)
        .await
        .map_err(|e| db_error("Profile count", e))?;
    let member_count = crate::data::roles::count(pool)
        .await
        .map_err(|e| db_error("Member count", e))?;
    let payment_record_count = crate::data::payment_records::count(pool)
        .await
        .map_err(|e| db_error("Payment record count", e))?;
    let api_log_count = crate::data::api_logs::count(pool)
        .await
        .map_err(|e| db_error("API log count", e))?;

    trace!(
        profile_count,
        member_count,
        payment_record_count,
        api_log_count,
        "Fetched admin status"
    );

    Ok(Json(AdminStatusResponse {
        profile_count,
        member_count,
        payment_record_count,
        api_log_count,
        cached_sessions: state.session_cache.len(),
    }))
}

/// Format a `DateTime<Utc>` as an HTTP-date (RFC 2822) for Last-Modified headers.
fn to_http_date(dt: &DateTime<Utc>) -> String {
    dt.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Parse an `If-Modified-Since` header value into a `DateTime<Utc>`.
fn parse_if_modified_since(headers: &HeaderMap) -> Option<DateTime<Utc>> {
    let val = headers.get(header::IF_MODIFIED_SINCE)?.to_str().ok()?;
    DateTime::parse_from_rfc2822(val)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// HTTP dates have second precision, so compare whole seconds.
fn not_modified_since(latest: DateTime<Utc>, since: DateTime<Utc>) -> bool {
    latest.timestamp() <= since.timestamp()
}

/// `GET /api/admin/api-logs`: Recent upstream exchanges.
///
/// Supports `If-Modified-Since`: returns 304 when no newer entry exists.
#[instrument(skip_all)]
pub async fn list_api_logs(
    AdminUser(_user): AdminUser,
    headers: HeaderMap,
    State(state): State<AppState>,
    Query(params): Query<ApiLogsParams>,
) -> Result<Response, ApiError> {
    let latest = crate::data::api_logs::latest_timestamp(&state.db_pool)
        .await
        .map_err(|e| db_error("API log lookup", e))?;

    if let (Some(since), Some(latest_ts)) = (parse_if_modified_since(&headers), latest)
        && not_modified_since(latest_ts, since)
    {
        trace!("API logs not modified, returning 304");
        let mut resp = StatusCode::NOT_MODIFIED.into_response();
        if let Ok(val) = to_http_date(&latest_ts).parse() {
            resp.headers_mut().insert(header::LAST_MODIFIED, val);
        }
        return Ok(resp);
    }

    let limit = params
        .limit
        .unwrap_or(DEFAULT_LOG_LIMIT)
        .clamp(1, MAX_LOG_LIMIT);
    let entries = crate::data::api_logs::list_recent(&state.db_pool, limit)
        .await
        .map_err(|e| db_error("API log listing", e))?;

    trace!(count = entries.len(), "Listed API logs");

    let mut resp = Json(ApiLogsResponse { entries }).into_response();
    if let Some(latest_ts) = latest
        && let Ok(val) = to_http_date(&latest_ts).parse()
    {
        resp.headers_mut().insert(header::LAST_MODIFIED, val);
    }
    Ok(resp)
}
