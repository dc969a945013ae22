//! Row types for the dashboard tables.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;
use uuid::Uuid;

/// Access tier. Variants are declared lowest to highest so `Ord` matches privilege.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type, TS,
)]
#[sqlx(type_name = "app_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum AppRole {
    Analyst,
    Coordinator,
    Admin,
}

impl AppRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Analyst => "analyst",
            Self::Coordinator => "coordinator",
            Self::Admin => "admin",
        }
    }

    /// Whether a holder of `self` may access something gated on `required`.
    pub fn grants(&self, required: AppRole) -> bool {
        *self >= required
    }
}

impl fmt::Display for AppRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "analyst" => Ok(Self::Analyst),
            "coordinator" => Ok(Self::Coordinator),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub completed_profile: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A role assignment joined with the member's email.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Member {
    pub id: Uuid,
    pub user_id: Uuid,
    pub email: String,
    pub role: AppRole,
    pub created_at: DateTime<Utc>,
}

/// Per-user Asaas credentials.
#[derive(Clone, sqlx::FromRow)]
pub struct ApiConfiguration {
    pub id: Uuid,
    pub user_id: Uuid,
    pub api_key: String,
    pub webhook_url: String,
    pub is_prod: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl fmt::Debug for ApiConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfiguration")
            .field("id", &self.id)
            .field("user_id", &self.user_id)
            .field("api_key", &"<redacted>")
            .field("webhook_url", &self.webhook_url)
            .field("is_prod", &self.is_prod)
            .finish_non_exhaustive()
    }
}

/// One upstream exchange recorded for auditing.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ApiLog {
    pub id: Uuid,
    pub user_id: Uuid,
    pub api_configuration_id: Option<Uuid>,
    pub request_method: String,
    pub request_url: String,
    pub response_status: Option<i32>,
    pub response_body: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An `api_logs` row before insertion.
#[derive(Debug, Clone)]
pub struct NewApiLog {
    pub user_id: Uuid,
    pub api_configuration_id: Option<Uuid>,
    pub request_method: String,
    pub request_url: String,
    pub response_status: Option<i32>,
    pub response_body: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PaymentRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub payment_id: String,
    pub customer_id: String,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub due_date: NaiveDate,
    pub payment_value: f64,
    pub status: String,
    pub invoice_number: Option<String>,
    pub consulted_at: DateTime<Utc>,
}

/// A `payment_records` row before upsert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPaymentRecord {
    pub payment_id: String,
    pub customer_id: String,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub due_date: NaiveDate,
    pub payment_value: f64,
    pub status: String,
    pub invoice_number: Option<String>,
}

/// Coarse grouping of Asaas payment statuses for dashboard totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusBucket {
    Pending,
    Paid,
    Other,
}

impl StatusBucket {
    pub fn of(status: &str) -> Self {
        match status {
            "PENDING" | "OVERDUE" | "AWAITING_RISK_ANALYSIS" => Self::Pending,
            "RECEIVED" | "CONFIRMED" | "RECEIVED_IN_CASH" => Self::Paid,
            _ => Self::Other,
        }
    }
}
