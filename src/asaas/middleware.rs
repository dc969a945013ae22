//! HTTP middleware for the Asaas client.

use crate::utils::fmt_duration;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use http::Extensions;
use reqwest::{Request, Response};
use reqwest_middleware::{Middleware, Next};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// Requests slower than this are logged at WARN.
const SLOW_REQUEST_THRESHOLD: Duration = Duration::from_secs(5);

/// Logs each upstream call without leaking the `access_token` header.
pub struct TransactionLoggingMiddleware;

#[async_trait::async_trait]
impl Middleware for TransactionLoggingMiddleware {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        let method = req.method().clone();
        let path = req.url().path().to_string();
        let start = Instant::now();

        trace!(method = %method, path = %path, "Asaas request");

        let result = next.run(req, extensions).await;
        let elapsed = start.elapsed();

        match &result {
            Ok(response) => {
                let status = response.status().as_u16();
                if elapsed > SLOW_REQUEST_THRESHOLD {
                    warn!(method = %method, path = %path, status, duration = fmt_duration(elapsed), "Slow Asaas response");
                } else if response.status().is_success() {
                    debug!(method = %method, path = %path, status, duration = fmt_duration(elapsed), "Asaas response");
                } else {
                    warn!(method = %method, path = %path, status, duration = fmt_duration(elapsed), "Asaas error response");
                }
            }
            Err(e) => {
                warn!(method = %method, path = %path, error = %e, duration = fmt_duration(elapsed), "Asaas request failed");
            }
        }

        result
    }
}

/// Holds every outbound request until the shared budget allows it.
pub struct RateLimitMiddleware {
    limiter: Arc<DefaultDirectRateLimiter>,
}

impl RateLimitMiddleware {
    /// A budget of `per_second` requests with an equal burst. Zero is treated as one.
    pub fn new(per_second: u32) -> Self {
        let per_second = NonZeroU32::new(per_second).unwrap_or(NonZeroU32::MIN);
        Self {
            limiter: Arc::new(RateLimiter::direct(Quota::per_second(per_second))),
        }
    }
}

#[async_trait::async_trait]
impl Middleware for RateLimitMiddleware {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        if self.limiter.check().is_err() {
            trace!(path = %req.url().path(), "Asaas rate limit reached, waiting");
            self.limiter.until_ready().await;
        }
        next.run(req, extensions).await
    }
}
