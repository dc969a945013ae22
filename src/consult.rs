//! Boleto consultation: fetch a day's payments from Asaas, enrich them with
//! customer details, persist the result, and audit every upstream exchange.
//!
//! The flow is strictly sequential. A failed customer lookup skips that
//! customer's payments; a failed payments page aborts the run.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tracing::{debug, info, instrument, warn};
use ts_rs::TS;
use uuid::Uuid;

use crate::asaas::{
    AsaasApiError, AsaasClient, AsaasEnvironment, AsaasRequest, Customer, Payment, PaymentPage,
    RawResponse,
};
use crate::data::models::{ApiConfiguration, NewApiLog, NewPaymentRecord, PaymentRecord};
use crate::utils::truncate_for_log;

/// Page size requested from `GET /payments` (the Asaas maximum).
pub const PAGE_SIZE: u32 = 100;

/// Upper bound on pages fetched for one due date.
pub const MAX_PAGES: u32 = 50;

/// Response bodies stored in `api_logs` are cut to this many bytes.
const LOGGED_BODY_LIMIT: usize = 4096;

#[derive(Debug, thiserror::Error)]
pub enum ConsultError {
    #[error("Nenhuma configuração de API cadastrada para este usuário")]
    NotConfigured,
    #[error("Erro ao consultar cobranças: {0}")]
    Payments(#[source] AsaasApiError),
    #[error(transparent)]
    Database(#[from] anyhow::Error),
}

/// A customer whose details could not be fetched.
#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CustomerFailure {
    pub customer_id: String,
    /// Payments left out of the result because of this failure.
    pub payment_ids: Vec<String>,
    pub upstream_status: Option<u16>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ConsultOutcome {
    pub due_date: NaiveDate,
    pub environment: AsaasEnvironment,
    pub payments_fetched: usize,
    pub records: Vec<PaymentRecord>,
    pub failures: Vec<CustomerFailure>,
}

/// Run a consultation for `user_id` using their stored API configuration.
#[instrument(skip(pool, asaas), fields(environment = tracing::field::Empty))]
pub async fn consult_due_date(
    pool: &PgPool,
    asaas: &AsaasClient,
    user_id: Uuid,
    due_date: NaiveDate,
) -> Result<ConsultOutcome, ConsultError> {
    let config = crate::data::api_configurations::get_for_user(pool, user_id)
        .await?
        .ok_or(ConsultError::NotConfigured)?;
    let environment = AsaasEnvironment::from_is_prod(config.is_prod);
    tracing::Span::current().record("environment", environment.as_str());

    let audit = ApiLogAuditor {
        pool,
        user_id,
        config: &config,
    };

    let gathered = gather(asaas, &audit, environment, &config.api_key, due_date).await?;
    let consulted_at = Utc::now();
    let saved =
        crate::data::payment_records::batch_upsert(pool, user_id, &gathered.records, consulted_at)
            .await?;

    info!(
        due_date = %due_date,
        payments = gathered.payments_fetched,
        saved = saved.len(),
        failed_customers = gathered.failures.len(),
        "Consultation finished"
    );

    Ok(ConsultOutcome {
        due_date,
        environment,
        payments_fetched: gathered.payments_fetched,
        records: saved,
        failures: gathered.failures,
    })
}

/// Records and failures of a consultation, before persistence.
#[derive(Debug)]
pub struct Gathered {
    /// Distinct payments returned by the upstream.
    pub payments_fetched: usize,
    pub records: Vec<NewPaymentRecord>,
    pub failures: Vec<CustomerFailure>,
}

/// Fetch every payment due on `due_date`, then each distinct customer, and join them.
pub async fn gather(
    asaas: &AsaasClient,
    audit: &dyn AuditSink,
    environment: AsaasEnvironment,
    api_key: &str,
    due_date: NaiveDate,
) -> Result<Gathered, ConsultError> {
    let payments = fetch_all_payments(asaas, audit, environment, api_key, due_date)
        .await
        .map_err(ConsultError::Payments)?;
    debug!(count = payments.len(), "Fetched payments");

    let mut customers: HashMap<String, Result<Customer, AsaasApiError>> = HashMap::new();
    for customer_id in distinct_customers(&payments) {
        let result = fetch_customer(asaas, audit, environment, api_key, customer_id).await;
        if let Err(e) = &result {
            warn!(customer_id, error = %e, "Customer lookup failed");
        }
        customers.insert(customer_id.to_string(), result);
    }

    let (records, failures) = build_records(&payments, &customers);
    Ok(Gathered {
        payments_fetched: payments.len(),
        records,
        failures,
    })
}

/// Receives one entry per upstream exchange, successful or not.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, url: String, outcome: &Result<RawResponse, AsaasApiError>);
}

/// Writes exchanges to `api_logs`. Audit failures never abort a run.
struct ApiLogAuditor<'a> {
    pool: &'a PgPool,
    user_id: Uuid,
    config: &'a ApiConfiguration,
}

#[async_trait]
impl AuditSink for ApiLogAuditor<'_> {
    async fn record(&self, url: String, outcome: &Result<RawResponse, AsaasApiError>) {
        let entry = audit_entry(self.user_id, Some(self.config.id), url, outcome);
        if let Err(e) = crate::data::api_logs::insert(self.pool, &entry).await {
            warn!(error = ?e, "Failed to write API log");
        }
    }
}

/// Build the `api_logs` row for an exchange. Transport failures store the error text.
fn audit_entry(
    user_id: Uuid,
    api_configuration_id: Option<Uuid>,
    url: String,
    outcome: &Result<RawResponse, AsaasApiError>,
) -> NewApiLog {
    let (response_status, response_body) = match outcome {
        Ok(raw) => (
            Some(i32::from(raw.status)),
            Some(truncate_for_log(&raw.body_text(), LOGGED_BODY_LIMIT)),
        ),
        Err(e) => (None, Some(e.to_string())),
    };
    NewApiLog {
        user_id,
        api_configuration_id,
        request_method: "GET".to_string(),
        request_url: url,
        response_status,
        response_body,
    }
}

async fn send_audited(
    asaas: &AsaasClient,
    audit: &dyn AuditSink,
    environment: AsaasEnvironment,
    api_key: &str,
    request: &AsaasRequest,
) -> Result<RawResponse, AsaasApiError> {
    let url = request.url(asaas.base_url(environment))?.to_string();
    let outcome = asaas.send_raw(environment, api_key, request).await;
    audit.record(url, &outcome).await;
    outcome
}

async fn fetch_all_payments(
    asaas: &AsaasClient,
    audit: &dyn AuditSink,
    environment: AsaasEnvironment,
    api_key: &str,
    due_date: NaiveDate,
) -> Result<Vec<Payment>, AsaasApiError> {
    let mut payments = Vec::new();
    let mut offset = 0;

    for page_number in 0..MAX_PAGES {
        let request = AsaasRequest::payments_page(due_date, offset, PAGE_SIZE);
        let page: PaymentPage = send_audited(asaas, audit, environment, api_key, &request)
            .await?
            .json()?;

        let next = next_offset(&page, offset);
        payments.extend(page.data);

        match next {
            Some(n) => offset = n,
            None => break,
        }

        if page_number + 1 == MAX_PAGES {
            warn!(
                fetched = payments.len(),
                "Stopped paging payments after {MAX_PAGES} pages"
            );
        }
    }

    let fetched = payments.len();
    let payments = dedupe_payments(payments);
    if payments.len() < fetched {
        debug!(
            duplicates = fetched - payments.len(),
            "Dropped payments repeated across pages"
        );
    }
    Ok(payments)
}

/// Collapse repeated payment ids, keeping the latest copy at the first position.
///
/// Offset paging returns a row twice when the list shifts between pages, and a
/// single upsert statement cannot touch the same key twice.
pub fn dedupe_payments(payments: Vec<Payment>) -> Vec<Payment> {
    let mut positions: HashMap<String, usize> = HashMap::with_capacity(payments.len());
    let mut unique: Vec<Payment> = Vec::with_capacity(payments.len());
    for payment in payments {
        match positions.get(&payment.id) {
            Some(&i) => unique[i] = payment,
            None => {
                positions.insert(payment.id.clone(), unique.len());
                unique.push(payment);
            }
        }
    }
    unique
}

/// Offset of the following page, or `None` when this page was the last.
///
/// An empty page ends paging even if `hasMore` claims otherwise.
pub fn next_offset(page: &PaymentPage, offset: u32) -> Option<u32> {
    if !page.has_more || page.data.is_empty() {
        return None;
    }
    Some(offset + page.data.len() as u32)
}

async fn fetch_customer(
    asaas: &AsaasClient,
    audit: &dyn AuditSink,
    environment: AsaasEnvironment,
    api_key: &str,
    customer_id: &str,
) -> Result<Customer, AsaasApiError> {
    let request = match AsaasRequest::customer(customer_id) {
        Ok(request) => request,
        Err(e) => {
            // Rejected before sending, but still an attempted lookup.
            let base = asaas.base_url(environment).as_str().trim_end_matches('/');
            let outcome: Result<RawResponse, AsaasApiError> = Err(e);
            audit
                .record(format!("{base}/customers/{customer_id}"), &outcome)
                .await;
            return outcome.and_then(|raw| raw.json());
        }
    };
    send_audited(asaas, audit, environment, api_key, &request)
        .await?
        .json()
}

/// Customer ids in order of first appearance, without repeats.
pub fn distinct_customers(payments: &[Payment]) -> Vec<&str> {
    let mut seen = std::collections::HashSet::new();
    payments
        .iter()
        .map(|p| p.customer.as_str())
        .filter(|id| seen.insert(*id))
        .collect()
}

/// Join payments with their customers. Payments whose customer failed are
/// reported once per customer instead of being saved.
pub fn build_records(
    payments: &[Payment],
    customers: &HashMap<String, Result<Customer, AsaasApiError>>,
) -> (Vec<NewPaymentRecord>, Vec<CustomerFailure>) {
    let mut records = Vec::with_capacity(payments.len());
    let mut failures: Vec<CustomerFailure> = Vec::new();

    for payment in payments {
        match customers.get(&payment.customer) {
            Some(Ok(customer)) => records.push(NewPaymentRecord {
                payment_id: payment.id.clone(),
                customer_id: payment.customer.clone(),
                customer_name: customer.name.clone(),
                customer_email: customer.contact_email().map(str::to_string),
                customer_phone: customer.contact_phone().map(str::to_string),
                due_date: payment.due_date,
                payment_value: payment.value,
                status: payment.status.clone(),
                invoice_number: payment.invoice_number.clone(),
            }),
            outcome => {
                if let Some(existing) = failures
                    .iter_mut()
                    .find(|f| f.customer_id == payment.customer)
                {
                    existing.payment_ids.push(payment.id.clone());
                    continue;
                }
                let (upstream_status, message) = match outcome {
                    Some(Err(e)) => (e.upstream_status(), format!("Erro ao consultar cliente: {e}")),
                    _ => (None, "Cliente não consultado".to_string()),
                };
                failures.push(CustomerFailure {
                    customer_id: payment.customer.clone(),
                    payment_ids: vec![payment.id.clone()],
                    upstream_status,
                    message,
                });
            }
        }
    }

    (records, failures)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payment(id: &str, customer: &str, status: &str) -> Payment {
        Payment {
            id: id.into(),
            customer: customer.into(),
            value: 99.9,
            due_date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            status: status.into(),
            billing_type: Some("BOLETO".into()),
            invoice_number: Some(format!("inv-{id}")),
            description: None,
        }
    }

    fn customer(id: &str, name: &str) -> Customer {
        Customer {
            id: id.into(),
            name: name.into(),
            email: Some(format!("{name}@example.com").to_lowercase()),
            phone: None,
            mobile_phone: Some("11999990000".into()),
            cpf_cnpj: None,
        }
    }

    #[test]
    fn distinct_customers_keeps_first_appearance_order() {
        let payments = vec![
            payment("p1", "cus_b", "PENDING"),
            payment("p2", "cus_a", "PENDING"),
            payment("p3", "cus_b", "RECEIVED"),
        ];
        assert_eq!(distinct_customers(&payments), vec!["cus_b", "cus_a"]);
    }

    #[test]
    fn records_join_customer_details() {
        let payments = vec![payment("p1", "cus_a", "PENDING")];
        let customers = HashMap::from([("cus_a".to_string(), Ok(customer("cus_a", "Ana")))]);

        let (records, failures) = build_records(&payments, &customers);
        assert!(failures.is_empty());
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.customer_name, "Ana");
        assert_eq!(record.customer_email.as_deref(), Some("ana@example.com"));
        assert_eq!(record.customer_phone.as_deref(), Some("11999990000"));
        assert_eq!(record.invoice_number.as_deref(), Some("inv-p1"));
        assert_eq!(record.status, "PENDING");
    }

    #[test]
    fn failed_customer_skips_all_of_its_payments() {
        let payments = vec![
            payment("p1", "cus_bad", "PENDING"),
            payment("p2", "cus_ok", "PENDING"),
            payment("p3", "cus_bad", "OVERDUE"),
        ];
        let customers = HashMap::from([
            ("cus_ok".to_string(), Ok(customer("cus_ok", "Bia"))),
            (
                "cus_bad".to_string(),
                Err(AsaasApiError::Status {
                    status: 404,
                    body: "{}".into(),
                }),
            ),
        ]);

        let (records, failures) = build_records(&payments, &customers);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].payment_id, "p2");

        assert_eq!(failures.len(), 1);
        let failure = &failures[0];
        assert_eq!(failure.customer_id, "cus_bad");
        assert_eq!(failure.payment_ids, vec!["p1", "p3"]);
        assert_eq!(failure.upstream_status, Some(404));
    }

    #[test]
    fn paging_stops_on_last_or_empty_page() {
        let mut page = PaymentPage {
            object: Some("list".into()),
            has_more: true,
            total_count: 250,
            limit: 100,
            offset: 0,
            data: vec![payment("p1", "cus_a", "PENDING"); 100],
        };
        assert_eq!(next_offset(&page, 0), Some(100));

        page.data.clear();
        assert_eq!(next_offset(&page, 200), None);

        page.has_more = false;
        page.data = vec![payment("p9", "cus_a", "PENDING")];
        assert_eq!(next_offset(&page, 200), None);
    }

    #[test]
    fn audit_entry_records_status_or_error() {
        let ok = Ok(RawResponse {
            status: 200,
            body: br#"{"data":[]}"#.to_vec(),
            url: "https://api.asaas.com/v3/payments".into(),
        });
        let entry = audit_entry(Uuid::nil(), None, "u".into(), &ok);
        assert_eq!(entry.response_status, Some(200));
        assert_eq!(entry.response_body.as_deref(), Some(r#"{"data":[]}"#));

        let failed: Result<RawResponse, AsaasApiError> =
            Err(AsaasApiError::InvalidCustomerId("x/y".into()));
        let entry = audit_entry(Uuid::nil(), None, "u".into(), &failed);
        assert_eq!(entry.response_status, None);
        assert!(entry.response_body.unwrap().contains("x/y"));
    }

    #[test]
    fn dedupe_keeps_latest_copy_in_first_position() {
        let payments = vec![
            payment("p1", "cus_a", "PENDING"),
            payment("p2", "cus_b", "PENDING"),
            payment("p2", "cus_b", "RECEIVED"),
            payment("p3", "cus_a", "PENDING"),
        ];
        let unique = dedupe_payments(payments);
        let ids: Vec<&str> = unique.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p2", "p3"]);
        assert_eq!(unique[1].status, "RECEIVED");
    }

    mod upstream {
        use std::collections::HashMap;
        use std::net::SocketAddr;
        use std::sync::Mutex;
        use std::time::Duration;

        use async_trait::async_trait;
        use axum::Router;
        use axum::extract::{Path, Query};
        use axum::http::StatusCode;
        use axum::response::{IntoResponse, Json, Response};
        use axum::routing::get;
        use chrono::NaiveDate;
        use serde_json::{Value, json};
        use tokio::net::TcpListener;

        use crate::asaas::{AsaasApiError, AsaasClient, AsaasEnvironment, RawResponse};
        use crate::consult::{AuditSink, ConsultError, MAX_PAGES, gather};

        /// Keeps `(url, status)` for every audited exchange.
        #[derive(Default)]
        struct RecordingSink(Mutex<Vec<(String, Option<u16>)>>);

        impl RecordingSink {
            fn entries(&self) -> Vec<(String, Option<u16>)> {
                self.0.lock().unwrap().clone()
            }
        }

        #[async_trait]
        impl AuditSink for RecordingSink {
            async fn record(&self, url: String, outcome: &Result<RawResponse, AsaasApiError>) {
                let status = outcome.as_ref().ok().map(|raw| raw.status);
                self.0.lock().unwrap().push((url, status));
            }
        }

        fn payment_json(id: &str, customer: &str, status: &str) -> Value {
            json!({
                "object": "payment",
                "id": id,
                "customer": customer,
                "value": 50.0,
                "dueDate": "2025-03-10",
                "status": status,
                "billingType": "BOLETO"
            })
        }

        fn page(has_more: bool, data: Vec<Value>) -> Response {
            Json(json!({"object": "list", "hasMore": has_more, "data": data})).into_response()
        }

        fn offset(query: &HashMap<String, String>) -> u32 {
            query.get("offset").and_then(|o| o.parse().ok()).unwrap_or(0)
        }

        async fn known_customers(Path(id): Path<String>) -> Response {
            if id == "cus_gone" {
                return (StatusCode::NOT_FOUND, Json(json!({"errors": []}))).into_response();
            }
            Json(json!({"object": "customer", "id": id, "name": format!("Cliente {id}")}))
                .into_response()
        }

        async fn serve(payments: Router) -> AsaasClient {
            let app = payments.route("/v3/customers/{id}", get(known_customers));
            let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
                .await
                .unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                axum::serve(listener, app).await.unwrap();
            });
            AsaasClient::new(
                &format!("http://{addr}/v3"),
                "http://127.0.0.1:9/v3",
                1000,
                Duration::from_secs(5),
            )
            .unwrap()
        }

        fn due_date() -> NaiveDate {
            NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
        }

        #[tokio::test]
        async fn payment_repeated_across_pages_is_kept_once() {
            // The list shifted between requests: pay_2 shows up on both pages.
            let payments = Router::new().route(
                "/v3/payments",
                get(|Query(q): Query<HashMap<String, String>>| async move {
                    match offset(&q) {
                        0 => page(
                            true,
                            vec![
                                payment_json("pay_1", "cus_a", "PENDING"),
                                payment_json("pay_2", "cus_b", "PENDING"),
                            ],
                        ),
                        _ => page(
                            false,
                            vec![
                                payment_json("pay_2", "cus_b", "RECEIVED"),
                                payment_json("pay_3", "cus_a", "OVERDUE"),
                            ],
                        ),
                    }
                }),
            );
            let asaas = serve(payments).await;
            let sink = RecordingSink::default();

            let gathered = gather(&asaas, &sink, AsaasEnvironment::Sandbox, "key", due_date())
                .await
                .unwrap();

            assert_eq!(gathered.payments_fetched, 3);
            let ids: Vec<&str> = gathered.records.iter().map(|r| r.payment_id.as_str()).collect();
            assert_eq!(ids, vec!["pay_1", "pay_2", "pay_3"]);
            assert_eq!(gathered.records[1].status, "RECEIVED");
            assert!(gathered.failures.is_empty());

            // Two pages plus two distinct customers.
            let entries = sink.entries();
            assert_eq!(entries.len(), 4);
            assert!(entries[0].0.contains("offset=0"));
            assert!(entries[1].0.contains("offset=2"));
            assert!(entries[2].0.ends_with("/customers/cus_a"));
            assert!(entries[3].0.ends_with("/customers/cus_b"));
            assert!(entries.iter().all(|(_, status)| *status == Some(200)));
        }

        #[tokio::test]
        async fn paging_stops_at_the_page_cap() {
            let payments = Router::new().route(
                "/v3/payments",
                get(|Query(q): Query<HashMap<String, String>>| async move {
                    let id = format!("pay_{}", offset(&q));
                    page(true, vec![payment_json(&id, "cus_a", "PENDING")])
                }),
            );
            let asaas = serve(payments).await;
            let sink = RecordingSink::default();

            let gathered = gather(&asaas, &sink, AsaasEnvironment::Sandbox, "key", due_date())
                .await
                .unwrap();

            assert_eq!(gathered.payments_fetched, MAX_PAGES as usize);
            assert_eq!(sink.entries().len(), MAX_PAGES as usize + 1);
        }

        #[tokio::test]
        async fn failed_customers_do_not_abort_the_run() {
            let payments = Router::new().route(
                "/v3/payments",
                get(|| async {
                    page(
                        false,
                        vec![
                            payment_json("pay_1", "cus_ok", "PENDING"),
                            payment_json("pay_2", "cus_gone", "PENDING"),
                            payment_json("pay_3", "bad/id", "PENDING"),
                        ],
                    )
                }),
            );
            let asaas = serve(payments).await;
            let sink = RecordingSink::default();

            let gathered = gather(&asaas, &sink, AsaasEnvironment::Sandbox, "key", due_date())
                .await
                .unwrap();

            assert_eq!(gathered.records.len(), 1);
            assert_eq!(gathered.records[0].payment_id, "pay_1");

            let failed: Vec<(&str, Option<u16>)> = gathered
                .failures
                .iter()
                .map(|f| (f.customer_id.as_str(), f.upstream_status))
                .collect();
            assert_eq!(failed, vec![("cus_gone", Some(404)), ("bad/id", None)]);

            // The rejected id is audited even though it never left the process.
            let entries = sink.entries();
            assert_eq!(entries.len(), 4);
            assert_eq!(entries[2].1, Some(404));
            assert!(entries[3].0.ends_with("/customers/bad/id"));
            assert_eq!(entries[3].1, None);
        }

        #[tokio::test]
        async fn failed_payments_page_aborts_with_upstream_status() {
            let payments = Router::new().route(
                "/v3/payments",
                get(|| async {
                    (
                        StatusCode::UNAUTHORIZED,
                        Json(json!({"errors": [{"code": "invalid_access_token"}]})),
                    )
                }),
            );
            let asaas = serve(payments).await;
            let sink = RecordingSink::default();

            let err = gather(&asaas, &sink, AsaasEnvironment::Sandbox, "bad", due_date())
                .await
                .unwrap_err();

            let ConsultError::Payments(source) = &err else {
                panic!("expected a payments error, got {err:?}");
            };
            assert_eq!(source.upstream_status(), Some(401));
            assert_eq!(
                crate::web::error::ApiError::from(err).code.status(),
                StatusCode::BAD_GATEWAY
            );
            let entries = sink.entries();
            assert_eq!(entries.len(), 1);
            assert_eq!(entries[0].1, Some(401));
        }
    }
}
