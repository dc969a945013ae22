//! Per-request tracing spans and request IDs.
//!
//! A well-formed `X-Request-Id` from the client or an edge proxy is reused so
//! logs correlate across hops; otherwise a ULID is generated. The resolved ID
//! is always echoed on the response.

use axum::extract::Request;
use axum::http::{HeaderValue, StatusCode};
use axum::response::Response;
use std::task::{Context, Poll};
use std::time::Instant;
use tower::{Layer, Service};
use tracing::Instrument;

static REQUEST_ID: &str = "x-request-id";

/// Longest inbound ID accepted verbatim.
const MAX_INBOUND_ID_LEN: usize = 64;

/// Reuse an inbound ID only if it is short and made of safe characters.
pub fn resolve_request_id(inbound: Option<&HeaderValue>) -> String {
    inbound
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|id| {
            !id.is_empty()
                && id.len() <= MAX_INBOUND_ID_LEN
                && id
                    .bytes()
                    .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
        })
        .map(String::from)
        .unwrap_or_else(|| ulid::Ulid::new().to_string())
}

fn log_response(method: &str, path: &str, status: StatusCode, duration_ms: u64) {
    let status = status.as_u16();
    match status {
        200..=399 => tracing::debug!(method, path, status, duration_ms, "Response"),
        400..=499 => tracing::info!(method, path, status, duration_ms, "Response"),
        _ => tracing::warn!(method, path, status, duration_ms, "Response"),
    }
}

#[derive(Clone)]
pub struct RequestIdLayer;

impl<S> Layer<S> for RequestIdLayer {
    type Service = RequestIdService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestIdService { inner }
    }
}

#[derive(Clone)]
pub struct RequestIdService<S> {
    inner: S,
}

impl<S, B> Service<Request> for RequestIdService<S>
where
    S: Service<Request, Response = Response<B>> + Send + 'static,
    S::Future: Send + 'static,
    S::Error: std::fmt::Debug,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let req_id = resolve_request_id(req.headers().get(REQUEST_ID));
        let method = req.method().to_string();
        let path = req.uri().path().to_string();
        let span = tracing::info_span!("request", req_id = %req_id);
        let header_value = HeaderValue::from_str(&req_id).ok();
        let start = Instant::now();

        let future = self.inner.call(req);

        Box::pin(
            async move {
                let mut result = future.await;
                let duration_ms = start.elapsed().as_millis() as u64;

                match &result {
                    Ok(response) => log_response(&method, &path, response.status(), duration_ms),
                    Err(e) => {
                        tracing::error!(method = %method, path = %path, error = ?e, duration_ms, "Request failed");
                    }
                }

                if let Ok(ref mut response) = result
                    && let Some(value) = header_value
                {
                    response.headers_mut().insert(REQUEST_ID, value);
                }

                result
            }
            .instrument(span),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reuses_safe_inbound_ids() {
        let inbound = HeaderValue::from_static("edge-7f3a.01");
        assert_eq!(resolve_request_id(Some(&inbound)), "edge-7f3a.01");
    }

    #[test]
    fn replaces_unsafe_or_missing_ids() {
        let spaced = HeaderValue::from_static("has spaces");
        let generated = resolve_request_id(Some(&spaced));
        assert_eq!(generated.len(), 26);
        assert!(generated.parse::<ulid::Ulid>().is_ok());

        let long = HeaderValue::from_str(&"a".repeat(MAX_INBOUND_ID_LEN + 1)).unwrap();
        assert_ne!(resolve_request_id(Some(&long)).len(), MAX_INBOUND_ID_LEN + 1);
        assert_eq!(resolve_request_id(None).len(), 26);
    }
}
