//! Coordinator dashboard: totals across every analyst's records.

use axum::extract::{Query, State};
use axum::response::Json;
use chrono::NaiveDate;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::trace;
use ts_rs::TS;

use crate::data::models::PaymentRecord;
use crate::data::payment_records::StatusTotals;
use crate::state::AppState;
use crate::utils::log_if_slow;
use crate::web::auth::extractors::CoordinatorUser;
use crate::web::error::{ApiError, db_error};
use crate::web::payments::{DueDateParams, parse_due_date};

/// Records returned alongside the totals.
const SUMMARY_RECORD_LIMIT: i64 = 500;

const SLOW_OP_THRESHOLD: Duration = Duration::from_secs(1);

#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SummaryResponse {
    pub due_date: Option<NaiveDate>,
    #[ts(type = "number")]
    pub total: i64,
    #[ts(type = "number")]
    pub pending: i64,
    #[ts(type = "number")]
    pub paid: i64,
    pub records: Vec<PaymentRecord>,
}

/// `GET /api/coordinator/summary`
pub async fn summary(
    CoordinatorUser(_user): CoordinatorUser,
    State(state): State<AppState>,
    Query(params): Query<DueDateParams>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let due_date = parse_due_date(params.due_date.as_deref())?;
    let start = Instant::now();

    let counts = crate::data::payment_records::status_counts(&state.db_pool, due_date)
        .await
        .map_err(|e| db_error("Status totals", e))?;
    let totals = StatusTotals::from_counts(counts.iter().map(|(s, n)| (s.as_str(), *n)));

    let records =
        crate::data::payment_records::list_all(&state.db_pool, due_date, SUMMARY_RECORD_LIMIT)
            .await
            .map_err(|e| db_error("Payment record listing", e))?;

    log_if_slow(start, SLOW_OP_THRESHOLD, "coordinator_summary");
    trace!(?totals, records = records.len(), "Built coordinator summary");

    Ok(Json(SummaryResponse {
        due_date,
        total: totals.total,
        pending: totals.pending,
        paid: totals.paid,
        records,
    }))
}
