//! Header-driven pass-through to the Asaas REST API.
//!
//! Stateless: the caller supplies the API key and environment on every
//! request, and the upstream status and body are relayed untouched.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, HeaderName, Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, instrument, warn};

use crate::asaas::{AsaasApiError, AsaasClient, AsaasEnvironment, AsaasRequest, RequestType};

pub const PROXY_PATH: &str = "/functions/v1/asaas-proxy";

/// Request headers browsers may send cross-origin.
const ALLOWED_HEADERS: [HeaderName; 9] = [
    HeaderName::from_static("authorization"),
    HeaderName::from_static("x-client-info"),
    HeaderName::from_static("apikey"),
    HeaderName::from_static("content-type"),
    HeaderName::from_static("asaas-environment"),
    HeaderName::from_static("access_token"),
    HeaderName::from_static("request-type"),
    HeaderName::from_static("due-date"),
    HeaderName::from_static("customer-id"),
];

/// Query-string fallbacks for the date and customer headers.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyQuery {
    pub due_date: Option<String>,
    pub customer_id: Option<String>,
}

/// A fully validated proxy call.
#[derive(Debug, PartialEq, Eq)]
pub struct ProxyCall {
    pub environment: AsaasEnvironment,
    pub access_token: String,
    pub request: AsaasRequest,
}

/// A client error, rendered as `{"error": "..."}`.
#[derive(Debug, PartialEq, Eq)]
pub struct ProxyRejection {
    pub status: StatusCode,
    pub message: String,
}

impl ProxyRejection {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl IntoResponse for ProxyRejection {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// Build the proxy router. It carries its own state and CORS policy, so it
/// can be merged into any router.
pub fn router<S>(client: Arc<AsaasClient>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(ALLOWED_HEADERS);

    Router::new()
        .route(PROXY_PATH, get(asaas_proxy).options(preflight))
        .layer(cors)
        .with_state(client)
}

async fn preflight() -> StatusCode {
    StatusCode::OK
}

/// Non-empty, trimmed header value.
fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Validate headers and query into a single upstream call.
pub fn parse_call(headers: &HeaderMap, query: &ProxyQuery) -> Result<ProxyCall, ProxyRejection> {
    let access_token = header_value(headers, "access_token")
        .ok_or_else(|| ProxyRejection::bad_request("API key não fornecida"))?
        .to_string();
    let environment = AsaasEnvironment::from_header(header_value(headers, "asaas-environment"));

    let customer_id =
        header_value(headers, "customer-id").or_else(|| non_empty(query.customer_id.as_deref()));
    let due_date = header_value(headers, "due-date").or_else(|| non_empty(query.due_date.as_deref()));

    let request_type = match header_value(headers, "request-type") {
        Some(raw) => raw.parse::<RequestType>().map_err(ProxyRejection::bad_request)?,
        None if customer_id.is_some() => RequestType::Customer,
        None => RequestType::Payments,
    };

    let request = match request_type {
        RequestType::Customer => {
            let id = customer_id
                .ok_or_else(|| ProxyRejection::bad_request("ID do cliente não fornecido"))?;
            AsaasRequest::customer(id)
                .map_err(|_| ProxyRejection::bad_request(format!("ID do cliente inválido: '{id}'")))?
        }
        RequestType::Payments => {
            let raw = due_date
                .ok_or_else(|| ProxyRejection::bad_request("Data de vencimento não fornecida"))?;
            let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
                ProxyRejection::bad_request(format!(
                    "Data de vencimento inválida: '{raw}'. Use o formato AAAA-MM-DD"
                ))
            })?;
            AsaasRequest::payments(date)
        }
    };

    Ok(ProxyCall {
        environment,
        access_token,
        request,
    })
}

/// `GET /functions/v1/asaas-proxy`
#[instrument(skip_all)]
pub async fn asaas_proxy(
    State(client): State<Arc<AsaasClient>>,
    headers: HeaderMap,
    Query(query): Query<ProxyQuery>,
) -> Response {
    let call = match parse_call(&headers, &query) {
        Ok(call) => call,
        Err(rejection) => {
            debug!(status = %rejection.status, message = %rejection.message, "Rejected proxy call");
            return rejection.into_response();
        }
    };

    let raw = match client
        .send_raw(call.environment, &call.access_token, &call.request)
        .await
    {
        Ok(raw) => raw,
        Err(e) => {
            warn!(error = %e, environment = %call.environment, "Asaas proxy request failed");
            let status = match &e {
                AsaasApiError::InvalidCustomerId(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            return ProxyRejection {
                status,
                message: e.to_string(),
            }
            .into_response();
        }
    };

    if !raw.is_success() {
        debug!(status = raw.status, url = %raw.url, "Relaying upstream error status");
    }

    (
        StatusCode::from_u16(raw.status).unwrap_or(StatusCode::BAD_GATEWAY),
        [(header::CONTENT_TYPE, "application/json")],
        raw.body,
    )
        .into_response()
}
