//! Analyst endpoints: run consultations and browse stored payment records.

use axum::extract::{Query, State};
use axum::response::Json;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::America::Sao_Paulo;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use ts_rs::TS;

use crate::consult::ConsultOutcome;
use crate::data::models::PaymentRecord;
use crate::state::AppState;
use crate::web::auth::extractors::AnalystUser;
use crate::web::error::{ApiError, db_error};

#[derive(Debug, Default, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ConsultRequest {
    #[serde(default)]
    #[ts(optional)]
    pub due_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DueDateParams {
    pub due_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub number: Option<String>,
}

#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PaymentRecordsResponse {
    pub records: Vec<PaymentRecord>,
    pub count: usize,
}

impl From<Vec<PaymentRecord>> for PaymentRecordsResponse {
    fn from(records: Vec<PaymentRecord>) -> Self {
        Self {
            count: records.len(),
            records,
        }
    }
}

/// The calendar date in São Paulo at `now`. Boletos fall due on local dates.
pub fn local_today(now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&Sao_Paulo).date_naive()
}

/// Parse an optional `YYYY-MM-DD` value; blank counts as absent.
pub fn parse_due_date(raw: Option<&str>) -> Result<Option<NaiveDate>, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                ApiError::bad_request(format!(
                    "Data de vencimento inválida: '{s}'. Use o formato AAAA-MM-DD"
                ))
            }),
    }
}

/// `POST /api/payments/consult`: Fetch, enrich and store a day's boletos.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn consult(
    AnalystUser(user): AnalystUser,
    State(state): State<AppState>,
    body: Option<Json<ConsultRequest>>,
) -> Result<Json<ConsultOutcome>, ApiError> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let due_date =
        parse_due_date(body.due_date.as_deref())?.unwrap_or_else(|| local_today(Utc::now()));

    let outcome =
        crate::consult::consult_due_date(&state.db_pool, &state.asaas, user.id, due_date).await?;

    info!(
        %due_date,
        records = outcome.records.len(),
        failures = outcome.failures.len(),
        "Consultation completed"
    );
    Ok(Json(outcome))
}

/// `GET /api/payments`: The caller's stored records.
pub async fn list_payments(
    AnalystUser(user): AnalystUser,
    State(state): State<AppState>,
    Query(params): Query<DueDateParams>,
) -> Result<Json<PaymentRecordsResponse>, ApiError> {
    let due_date = parse_due_date(params.due_date.as_deref())?;
    let records = crate::data::payment_records::list_for_user(&state.db_pool, user.id, due_date)
        .await
        .map_err(|e| db_error("Payment record listing", e))?;
    Ok(Json(records.into()))
}

/// `GET /api/payments/search`: Look up stored records by invoice number.
pub async fn search_payments(
    AnalystUser(user): AnalystUser,
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<PaymentRecordsResponse>, ApiError> {
    let number = params
        .number
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::bad_request("Número do boleto é obrigatório"))?;

    let records =
        crate::data::payment_records::find_by_invoice_number(&state.db_pool, user.id, number)
            .await
            .map_err(|e| db_error("Payment record search", e))?;
    Ok(Json(records.into()))
}
