//! Application configuration loaded from the environment.
//!
//! Every key maps to an upper-case environment variable (`DATABASE_URL`,
//! `SUPABASE_URL`, ...). Durations accept human-friendly values such as
//! `8s`, `500ms` or `5m`.

use fundu::DurationParser;
use serde::{Deserialize, Deserializer};
use std::time::Duration;

/// Production Asaas API base.
pub const ASAAS_PROD_URL: &str = "https://api.asaas.com/v3";
/// Sandbox Asaas API base.
pub const ASAAS_SANDBOX_URL: &str = "https://api-sandbox.asaas.com/v3";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Postgres connection string.
    pub database_url: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// How long in-flight requests may drain after a shutdown signal.
    #[serde(
        default = "default_shutdown_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub shutdown_timeout: Duration,

    /// Base URL of the hosted auth provider, e.g. `https://xyz.supabase.co`.
    pub supabase_url: String,
    /// Public (anon) API key sent as `apikey` on every auth request.
    pub supabase_anon_key: String,

    #[serde(default = "default_asaas_sandbox_url")]
    pub asaas_sandbox_url: String,
    #[serde(default = "default_asaas_prod_url")]
    pub asaas_prod_url: String,
    /// Outbound request budget shared by the proxy and consultations.
    #[serde(default = "default_asaas_requests_per_second")]
    pub asaas_requests_per_second: u32,
    #[serde(
        default = "default_asaas_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub asaas_timeout: Duration,

    /// How long a resolved bearer token is trusted before revalidation.
    #[serde(
        default = "default_session_ttl",
        deserialize_with = "deserialize_duration"
    )]
    pub session_ttl: Duration,

    /// Email of a profile that is granted the admin role at startup.
    pub admin_email: Option<String>,
}

impl Config {
    /// Read every key from the process environment (after `.env` is loaded).
    pub fn from_env() -> anyhow::Result<Self> {
        use anyhow::Context;
        use figment::{Figment, providers::Env};

        Figment::new()
            .merge(Env::raw())
            .extract()
            .context("Failed to load config")
    }
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(8)
}

fn default_asaas_sandbox_url() -> String {
    ASAAS_SANDBOX_URL.to_string()
}

fn default_asaas_prod_url() -> String {
    ASAAS_PROD_URL.to_string()
}

fn default_asaas_requests_per_second() -> u32 {
    5
}

fn default_asaas_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_session_ttl() -> Duration {
    Duration::from_secs(5 * 60)
}

/// Parse a duration string. Bare numbers are seconds.
pub fn parse_duration(value: &str) -> Result<Duration, String> {
    let parser = DurationParser::with_all_time_units();
    let parsed = parser
        .parse(value.trim())
        .map_err(|e| format!("invalid duration '{value}': {e}"))?;
    Duration::try_from(parsed).map_err(|e| format!("invalid duration '{value}': {e}"))
}

/// Accepts either a duration string (`"30s"`) or a plain number of seconds.
fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Seconds(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Seconds(secs) => Ok(Duration::from_secs(secs)),
        Raw::Text(text) => parse_duration(&text).map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Figment;
    use figment::providers::Serialized;

    fn base() -> serde_json::Value {
        serde_json::json!({
            "database_url": "postgres://localhost/boletos",
            "supabase_url": "https://example.supabase.co",
            "supabase_anon_key": "anon",
        })
    }

    #[test]
    fn defaults_apply_when_keys_are_missing() {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(base()))
            .extract()
            .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.shutdown_timeout, Duration::from_secs(8));
        assert_eq!(config.asaas_prod_url, ASAAS_PROD_URL);
        assert_eq!(config.asaas_sandbox_url, ASAAS_SANDBOX_URL);
        assert_eq!(config.session_ttl, Duration::from_secs(300));
        assert!(config.admin_email.is_none());
    }

    #[test]
    fn durations_accept_units_and_plain_seconds() {
        let mut raw = base();
        raw["shutdown_timeout"] = serde_json::json!("1500ms");
        raw["session_ttl"] = serde_json::json!(42);
        raw["asaas_timeout"] = serde_json::json!("2m");

        let config: Config = Figment::new()
            .merge(Serialized::defaults(raw))
            .extract()
            .unwrap();

        assert_eq!(config.shutdown_timeout, Duration::from_millis(1500));
        assert_eq!(config.session_ttl, Duration::from_secs(42));
        assert_eq!(config.asaas_timeout, Duration::from_secs(120));
    }

    #[test]
    fn rejects_garbage_duration() {
        assert!(parse_duration("soon").is_err());
    }
}
