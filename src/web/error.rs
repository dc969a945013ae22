//! Uniform JSON error responses for the dashboard API.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use tracing::error;
use ts_rs::TS;

/// Machine-readable error codes surfaced to the frontend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum ApiErrorCode {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    NotConfigured,
    UpstreamError,
    InternalError,
}

impl ApiErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::NotConfigured => StatusCode::PRECONDITION_FAILED,
            Self::UpstreamError => StatusCode::BAD_GATEWAY,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub upstream_status: Option<u16>,
}

impl ApiError {
    pub fn new(code: ApiErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            upstream_status: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::BadRequest, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::Forbidden, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::Conflict, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::InternalError, message)
    }

    pub fn with_upstream_status(mut self, status: Option<u16>) -> Self {
        self.upstream_status = status;
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.code.status(), Json(self)).into_response()
    }
}

/// Log a database failure with context and hide the details from the client.
pub fn db_error(context: &str, err: anyhow::Error) -> ApiError {
    error!(error = ?err, "{context} failed");
    ApiError::internal(format!("{context} failed"))
}

impl From<crate::consult::ConsultError> for ApiError {
    fn from(err: crate::consult::ConsultError) -> Self {
        use crate::consult::ConsultError;
        match err {
            ConsultError::NotConfigured => Self::new(ApiErrorCode::NotConfigured, err.to_string()),
            ConsultError::Payments(ref source) => {
                let status = source.upstream_status();
                Self::new(ApiErrorCode::UpstreamError, err.to_string()).with_upstream_status(status)
            }
            ConsultError::Database(e) => db_error("Consultation", e),
        }
    }
}

impl From<crate::supabase::AuthError> for ApiError {
    fn from(err: crate::supabase::AuthError) -> Self {
        use crate::supabase::AuthError;
        match err {
            AuthError::InvalidCredentials | AuthError::InvalidToken => {
                Self::unauthorized(err.to_string())
            }
            AuthError::Rejected { status, message } if status < 500 => {
                Self::bad_request(message)
            }
            AuthError::Rejected { status, message } => {
                error!(status, message = %message, "Auth provider error");
                Self::new(ApiErrorCode::UpstreamError, "Serviço de autenticação indisponível")
                    .with_upstream_status(Some(status))
            }
            AuthError::Request(e) => {
                error!(error = %e, "Auth provider unreachable");
                Self::new(ApiErrorCode::UpstreamError, "Serviço de autenticação indisponível")
            }
        }
    }
}
