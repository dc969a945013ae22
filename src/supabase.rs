//! Client for the hosted auth provider (Supabase Auth / GoTrue).
//!
//! Credentials are verified and tokens issued entirely by the provider; this
//! module only exchanges passwords for tokens and tokens for user identities.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// Provider message for a wrong email/password pair.
const INVALID_CREDENTIALS: &str = "Invalid login credentials";

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Email ou senha inválidos")]
    InvalidCredentials,
    #[error("Sessão inválida ou expirada")]
    InvalidToken,
    #[error("{message}")]
    Rejected { status: u16, message: String },
    #[error("Auth provider request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Identity as reported by the provider.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

/// Result of a successful password sign-in.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    pub user: AuthUser,
}

#[derive(Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

/// Error body shapes used by the provider across versions.
#[derive(Deserialize)]
struct ProviderError {
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
    error: Option<String>,
}

/// Extract the human-readable message from a provider error body.
fn provider_message(body: &str) -> Option<String> {
    let parsed: ProviderError = serde_json::from_str(body).ok()?;
    parsed
        .error_description
        .or(parsed.msg)
        .or(parsed.message)
        .or(parsed.error)
        .filter(|m| !m.trim().is_empty())
}

/// Map a failed password grant onto an [`AuthError`].
fn classify_sign_in_failure(status: u16, body: &str) -> AuthError {
    match provider_message(body) {
        Some(message) if message == INVALID_CREDENTIALS => AuthError::InvalidCredentials,
        Some(message) => AuthError::Rejected { status, message },
        None => AuthError::Rejected {
            status,
            message: format!("auth provider returned status {status}"),
        },
    }
}

pub struct SupabaseAuth {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseAuth {
    pub fn new(base_url: &str, anon_key: &str) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.base_url)
    }

    /// Exchange an email/password pair for an access token.
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthError> {
        let response = self
            .http
            .post(self.endpoint("token?grant_type=password"))
            .header("apikey", &self.anon_key)
            .json(&PasswordGrant { email, password })
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<AuthSession>().await?);
        }

        let body = response.text().await.unwrap_or_default();
        let err = classify_sign_in_failure(status.as_u16(), &body);
        debug!(status = status.as_u16(), error = %err, "Password sign-in rejected");
        Err(err)
    }

    /// Resolve an access token to the user it was issued for.
    pub async fn get_user(&self, access_token: &str) -> Result<AuthUser, AuthError> {
        let response = self
            .http
            .get(self.endpoint("user"))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<AuthUser>().await?);
        }
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(AuthError::InvalidToken);
        }

        let body = response.text().await.unwrap_or_default();
        Err(AuthError::Rejected {
            status: status.as_u16(),
            message: provider_message(&body)
                .unwrap_or_else(|| format!("auth provider returned status {status}")),
        })
    }

    /// Revoke the token at the provider. Failures are logged, not returned.
    pub async fn sign_out(&self, access_token: &str) {
        let result = self
            .http
            .post(self.endpoint("logout"))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() => {}
            Ok(resp) => warn!(status = resp.status().as_u16(), "Provider sign-out rejected"),
            Err(e) => warn!(error = %e, "Provider sign-out failed"),
        }
    }
}
