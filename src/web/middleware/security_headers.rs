//! Security headers applied to every response.
//!
//! HSTS is only sent when the request arrived over TLS at the edge, as
//! reported by `X-Forwarded-Proto`.

use axum::extract::Request;
use axum::http::{HeaderMap, HeaderValue};
use axum::response::Response;
use std::task::{Context, Poll};
use tower::{Layer, Service};

static XFO: HeaderValue = HeaderValue::from_static("DENY");
static XCTO: HeaderValue = HeaderValue::from_static("nosniff");
static REFERRER: HeaderValue = HeaderValue::from_static("no-referrer");
static COOP: HeaderValue = HeaderValue::from_static("same-origin");
static HSTS: HeaderValue = HeaderValue::from_static("max-age=31536000; includeSubDomains");
/// The API only serves JSON, so nothing may be loaded or framed.
static CSP: HeaderValue = HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'");

fn forwarded_over_https(headers: &HeaderMap) -> bool {
    headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|proto| proto.eq_ignore_ascii_case("https"))
}

/// Insert the fixed header set into `headers`.
pub fn apply_security_headers(headers: &mut HeaderMap, https: bool) {
    headers.insert("x-frame-options", XFO.clone());
    headers.insert("x-content-type-options", XCTO.clone());
    headers.insert("referrer-policy", REFERRER.clone());
    headers.insert("cross-origin-opener-policy", COOP.clone());
    if !headers.contains_key("content-security-policy") {
        headers.insert("content-security-policy", CSP.clone());
    }
    if https {
        headers.insert("strict-transport-security", HSTS.clone());
    }
}

#[derive(Clone)]
pub struct SecurityHeadersLayer;

impl<S> Layer<S> for SecurityHeadersLayer {
    type Service = SecurityHeadersService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SecurityHeadersService { inner }
    }
}

#[derive(Clone)]
pub struct SecurityHeadersService<S> {
    inner: S,
}

impl<S, B> Service<Request> for SecurityHeadersService<S>
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
        let https = forwarded_over_https(req.headers());
        let future = self.inner.call(req);

        Box::pin(async move {
            let mut response = future.await?;
            apply_security_headers(response.headers_mut(), https);
            Ok(response)
        })
    }
}
