//! Web API router construction.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    http::HeaderValue,
    response::Response,
    routing::{delete, get, post},
};
use tower_http::{compression::CompressionLayer, timeout::TimeoutLayer};

use crate::asaas::AsaasClient;
use crate::state::AppState;
use crate::web::middleware::request_id::RequestIdLayer;
use crate::web::middleware::security_headers::SecurityHeadersLayer;
use crate::web::{admin, api_config, auth, coordinator, payments, profile, proxy, status};

/// Cache-Control presets.
pub mod cache {
    /// Anything user-specific -- never cache.
    pub const PRIVATE: &str = "private, no-store, must-revalidate";
}

async fn no_store(mut resp: Response) -> Response {
    resp.headers_mut().insert(
        axum::http::header::CACHE_CONTROL,
        HeaderValue::from_static(cache::PRIVATE),
    );
    resp
}

/// Consultations page through every payment and customer sequentially.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Creates the web server router
pub fn create_router(app_state: AppState) -> Router {
    let api_router = Router::new()
        .route("/health", get(status::health))
        .route("/status", get(status::status))
        .with_state(app_state.clone());

    let auth_router = Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route(
            "/profile",
            get(profile::get_profile).put(profile::complete_profile),
        )
        .route(
            "/api-configuration",
            get(api_config::get_configuration).put(api_config::save_configuration),
        )
        .route("/payments", get(payments::list_payments))
        .route("/payments/consult", post(payments::consult))
        .route("/payments/search", get(payments::search_payments))
        .route("/coordinator/summary", get(coordinator::summary))
        .layer(axum::middleware::map_response(no_store))
        .with_state(app_state.clone());

    let admin_router = Router::new()
        .route("/admin/status", get(admin::admin_status))
        .route(
            "/admin/members",
            get(admin::members::list_members).post(admin::members::add_member),
        )
        .route("/admin/members/{id}", delete(admin::members::remove_member))
        .route("/admin/api-logs", get(admin::list_api_logs))
        .layer(axum::middleware::map_response(no_store))
        .with_state(app_state.clone());

    let asaas: Arc<AsaasClient> = app_state.asaas.clone();

    let router = Router::new()
        .nest("/api", api_router)
        .nest("/api", auth_router)
        .nest("/api", admin_router)
        .merge(proxy::router(asaas))
        .with_state(app_state);

    router.layer((
        // Outermost: per-request ID span + severity-proportional response logging.
        RequestIdLayer,
        SecurityHeadersLayer,
        CompressionLayer::new()
            .zstd(true)
            .br(true)
            .gzip(true)
            .quality(tower_http::CompressionLevel::Fastest),
        TimeoutLayer::new(REQUEST_TIMEOUT),
    ))
}
