//! HTTP client for the Asaas v3 REST API.

use crate::asaas::errors::AsaasApiError;
use crate::asaas::json::decode;
use crate::asaas::middleware::{RateLimitMiddleware, TransactionLoggingMiddleware};
use crate::asaas::models::AsaasEnvironment;
use chrono::NaiveDate;
use regex::Regex;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use serde::de::DeserializeOwned;
use std::sync::LazyLock;
use std::time::Duration;
use url::Url;

/// Asaas customer ids look like `cus_000005219613`; anything else could alter the path.
static CUSTOMER_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("valid customer id regex"));

/// Date format used by every Asaas date filter.
const DATE_FORMAT: &str = "%Y-%m-%d";

/// An upstream lookup, independent of environment and credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AsaasRequest {
    /// `GET /payments` filtered to a single due date.
    Payments {
        due_date: NaiveDate,
        offset: Option<u32>,
        limit: Option<u32>,
    },
    /// `GET /customers/{id}`.
    Customer { id: String },
}

impl AsaasRequest {
    pub fn payments(due_date: NaiveDate) -> Self {
        Self::Payments {
            due_date,
            offset: None,
            limit: None,
        }
    }

    pub fn payments_page(due_date: NaiveDate, offset: u32, limit: u32) -> Self {
        Self::Payments {
            due_date,
            offset: Some(offset),
            limit: Some(limit),
        }
    }

    /// Build a customer lookup, rejecting ids that are not plain identifiers.
    pub fn customer(id: &str) -> Result<Self, AsaasApiError> {
        let id = id.trim();
        if !CUSTOMER_ID.is_match(id) {
            return Err(AsaasApiError::InvalidCustomerId(id.to_string()));
        }
        Ok(Self::Customer { id: id.to_string() })
    }

    /// Resolve the full upstream URL against `base` (e.g. `https://api.asaas.com/v3`).
    pub fn url(&self, base: &Url) -> Result<Url, AsaasApiError> {
        let mut url = base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?;
            segments.pop_if_empty();
            match self {
                Self::Payments { .. } => {
                    segments.push("payments");
                }
                Self::Customer { id } => {
                    segments.push("customers").push(id);
                }
            }
        }

        if let Self::Payments {
            due_date,
            offset,
            limit,
        } = self
        {
            let date = due_date.format(DATE_FORMAT).to_string();
            let mut query = url.query_pairs_mut();
            query.append_pair("dueDate[ge]", &date);
            query.append_pair("dueDate[le]", &date);
            if let Some(offset) = offset {
                query.append_pair("offset", &offset.to_string());
            }
            if let Some(limit) = limit {
                query.append_pair("limit", &limit.to_string());
            }
        }

        Ok(url)
    }
}

/// An upstream response captured as-is, before any interpretation.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
    /// Requested URL. Credentials travel in headers, so this is safe to persist.
    pub url: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decode a successful response body, or surface the upstream status as an error.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, AsaasApiError> {
        if !self.is_success() {
            return Err(AsaasApiError::Status {
                status: self.status,
                body: self.body_text(),
            });
        }
        decode(&self.body_text()).map_err(|source| AsaasApiError::ParseFailed {
            status: self.status,
            url: self.url.clone(),
            source,
        })
    }
}

pub struct AsaasClient {
    http: ClientWithMiddleware,
    sandbox_base: Url,
    prod_base: Url,
}

impl AsaasClient {
    pub fn new(
        sandbox_base: &str,
        prod_base: &str,
        requests_per_second: u32,
        timeout: Duration,
    ) -> Result<Self, AsaasApiError> {
        let inner = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("boletos/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let http = ClientBuilder::new(inner)
            .with(RateLimitMiddleware::new(requests_per_second))
            .with(TransactionLoggingMiddleware)
            .build();

        Ok(Self {
            http,
            sandbox_base: Url::parse(sandbox_base)?,
            prod_base: Url::parse(prod_base)?,
        })
    }

    pub fn base_url(&self, environment: AsaasEnvironment) -> &Url {
        match environment {
            AsaasEnvironment::Sandbox => &self.sandbox_base,
            AsaasEnvironment::Production => &self.prod_base,
        }
    }

    /// Perform `request` and capture the response without judging its status.
    ///
    /// Only transport failures (connect, timeout, body read) are errors here.
    pub async fn send_raw(
        &self,
        environment: AsaasEnvironment,
        access_token: &str,
        request: &AsaasRequest,
    ) -> Result<RawResponse, AsaasApiError> {
        let url = request.url(self.base_url(environment))?;

        let response = self
            .http
            .get(url.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .header("access_token", access_token)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();

        Ok(RawResponse {
            status,
            body,
            url: url.to_string(),
        })
    }
}
