//! Database operations for consulted payment records (boletos).

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::data::models::{NewPaymentRecord, PaymentRecord, StatusBucket};

/// Bulk upsert records for one user using the UNNEST pattern.
///
/// Re-consulting a date refreshes existing rows (keyed by `(user_id, payment_id)`)
/// rather than duplicating them.
pub async fn batch_upsert(
    pool: &PgPool,
    user_id: Uuid,
    records: &[NewPaymentRecord],
    consulted_at: DateTime<Utc>,
) -> Result<Vec<PaymentRecord>> {
    if records.is_empty() {
        return Ok(Vec::new());
    }

    let payment_ids: Vec<&str> = records.iter().map(|r| r.payment_id.as_str()).collect();
    let customer_ids: Vec<&str> = records.iter().map(|r| r.customer_id.as_str()).collect();
    let customer_names: Vec<&str> = records.iter().map(|r| r.customer_name.as_str()).collect();
    let emails: Vec<Option<&str>> = records.iter().map(|r| r.customer_email.as_deref()).collect();
    let phones: Vec<Option<&str>> = records.iter().map(|r| r.customer_phone.as_deref()).collect();
    let due_dates: Vec<NaiveDate> = records.iter().map(|r| r.due_date).collect();
    let values: Vec<f64> = records.iter().map(|r| r.payment_value).collect();
    let statuses: Vec<&str> = records.iter().map(|r| r.status.as_str()).collect();
    let invoice_numbers: Vec<Option<&str>> =
        records.iter().map(|r| r.invoice_number.as_deref()).collect();

    sqlx::query_as::<_, PaymentRecord>(
        r#"
        INSERT INTO payment_records (
            user_id, payment_id, customer_id, customer_name, customer_email,
            customer_phone, due_date, payment_value, status, invoice_number,
            consulted_at
        )
        SELECT
            $1, v.payment_id, v.customer_id, v.customer_name, v.customer_email,
            v.customer_phone, v.due_date, v.payment_value, v.status, v.invoice_number,
            $11
        FROM UNNEST(
            $2::text[], $3::text[], $4::text[], $5::text[], $6::text[],
            $7::date[], $8::float8[], $9::text[], $10::text[]
        ) AS v(
            payment_id, customer_id, customer_name, customer_email, customer_phone,
            due_date, payment_value, status, invoice_number
        )
        ON CONFLICT (user_id, payment_id)
        DO UPDATE SET
            customer_id = EXCLUDED.customer_id,
            customer_name = EXCLUDED.customer_name,
            customer_email = EXCLUDED.customer_email,
            customer_phone = EXCLUDED.customer_phone,
            due_date = EXCLUDED.due_date,
            payment_value = EXCLUDED.payment_value,
            status = EXCLUDED.status,
            invoice_number = EXCLUDED.invoice_number,
            consulted_at = EXCLUDED.consulted_at
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(&payment_ids)
    .bind(&customer_ids)
    .bind(&customer_names)
    .bind(&emails)
    .bind(&phones)
    .bind(&due_dates)
    .bind(&values)
    .bind(&statuses)
    .bind(&invoice_numbers)
    .bind(consulted_at)
    .fetch_all(pool)
    .await
    .context("Failed to batch upsert payment records")
}

/// Records for one user, optionally restricted to a due date.
pub async fn list_for_user(
    pool: &PgPool,
    user_id: Uuid,
    due_date: Option<NaiveDate>,
) -> Result<Vec<PaymentRecord>> {
    sqlx::query_as::<_, PaymentRecord>(
        r#"
        SELECT * FROM payment_records
        WHERE user_id = $1 AND ($2::date IS NULL OR due_date = $2)
        ORDER BY due_date DESC, customer_name ASC
        "#,
    )
    .bind(user_id)
    .bind(due_date)
    .fetch_all(pool)
    .await
    .context("Failed to list payment records")
}

/// Records across all users, optionally restricted to a due date.
pub async fn list_all(
    pool: &PgPool,
    due_date: Option<NaiveDate>,
    limit: i64,
) -> Result<Vec<PaymentRecord>> {
    sqlx::query_as::<_, PaymentRecord>(
        r#"
        SELECT * FROM payment_records
        WHERE ($1::date IS NULL OR due_date = $1)
        ORDER BY due_date DESC, customer_name ASC
        LIMIT $2
        "#,
    )
    .bind(due_date)
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("Failed to list payment records")
}

/// Look up a user's records by invoice number.
pub async fn find_by_invoice_number(
    pool: &PgPool,
    user_id: Uuid,
    invoice_number: &str,
) -> Result<Vec<PaymentRecord>> {
    sqlx::query_as::<_, PaymentRecord>(
        r#"
        SELECT * FROM payment_records
        WHERE user_id = $1 AND invoice_number = $2
        ORDER BY due_date DESC
        "#,
    )
    .bind(user_id)
    .bind(invoice_number.trim())
    .fetch_all(pool)
    .await
    .context("Failed to search payment records")
}

/// Status totals over all users, optionally for one due date.
pub async fn status_counts(pool: &PgPool, due_date: Option<NaiveDate>) -> Result<Vec<(String, i64)>> {
    sqlx::query_as(
        r#"
        SELECT status, COUNT(*) FROM payment_records
        WHERE ($1::date IS NULL OR due_date = $1)
        GROUP BY status
        "#,
    )
    .bind(due_date)
    .fetch_all(pool)
    .await
    .context("Failed to count payment records by status")
}

pub async fn count(pool: &PgPool) -> Result<i64> {
    let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM payment_records")
        .fetch_one(pool)
        .await?;
    Ok(n)
}

/// Totals shown on the coordinator dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusTotals {
    pub total: i64,
    pub pending: i64,
    pub paid: i64,
}

impl StatusTotals {
    pub fn from_counts<'a>(counts: impl IntoIterator<Item = (&'a str, i64)>) -> Self {
        counts
            .into_iter()
            .fold(Self::default(), |mut totals, (status, n)| {
                totals.total += n;
                match StatusBucket::of(status) {
                    StatusBucket::Pending => totals.pending += n,
                    StatusBucket::Paid => totals.paid += n,
                    StatusBucket::Other => {}
                }
                totals
            })
    }
}
