//! Shared fixtures: a local stand-in for the Asaas API.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, Request, StatusCode, Uri};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use boletos::asaas::AsaasClient;
use serde_json::{Value, json};
use tokio::net::TcpListener;

pub const VALID_KEY: &str = "$aact_test_key";

/// One request as the fake upstream saw it.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub path: String,
    pub query: Option<String>,
    pub access_token: Option<String>,
}

#[derive(Clone, Default)]
pub struct FakeAsaas {
    seen: Arc<Mutex<Vec<SeenRequest>>>,
}

impl FakeAsaas {
    pub fn seen(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }

    fn record(&self, uri: &Uri, headers: &HeaderMap) -> Option<String> {
        let access_token = headers
            .get("access_token")
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        self.seen.lock().unwrap().push(SeenRequest {
            path: uri.path().to_string(),
            query: uri.query().map(String::from),
            access_token: access_token.clone(),
        });
        access_token
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"errors": [{"code": "invalid_access_token", "description": "A chave de API fornecida é inválida"}]})),
    )
        .into_response()
}

async fn payments(State(fake): State<FakeAsaas>, uri: Uri, headers: HeaderMap) -> Response {
    if fake.record(&uri, &headers).as_deref() != Some(VALID_KEY) {
        return unauthorized();
    }
    Json(json!({
        "object": "list",
        "hasMore": false,
        "totalCount": 1,
        "limit": 10,
        "offset": 0,
        "data": [{
            "object": "payment",
            "id": "pay_080225913252",
            "customer": "cus_000005219613",
            "value": 129.9,
            "dueDate": "2025-03-10",
            "status": "PENDING",
            "billingType": "BOLETO",
            "invoiceNumber": "00005101"
        }]
    }))
    .into_response()
}

async fn customer(
    State(fake): State<FakeAsaas>,
    Path(id): Path<String>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    if fake.record(&uri, &headers).as_deref() != Some(VALID_KEY) {
        return unauthorized();
    }
    if id != "cus_000005219613" {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"errors": [{"code": "not_found"}]})),
        )
            .into_response();
    }
    Json(json!({
        "object": "customer",
        "id": id,
        "name": "Marcelo Almeida",
        "email": "marcelo.almeida@gmail.com",
        "phone": "4738010919",
        "mobilePhone": "4799376637",
        "cpfCnpj": "24971563792"
    }))
    .into_response()
}

/// Serve the fake upstream on an ephemeral port and return its `/v3` base URL.
pub async fn spawn_fake_asaas() -> (String, FakeAsaas) {
    let fake = FakeAsaas::default();
    let app = Router::new()
        .route("/v3/payments", get(payments))
        .route("/v3/customers/{id}", get(customer))
        .with_state(fake.clone());

    let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}/v3"), fake)
}

/// A client whose sandbox points at `sandbox` and whose production base is unreachable.
pub fn client_for(sandbox: &str) -> Arc<AsaasClient> {
    Arc::new(AsaasClient::new(sandbox, "http://127.0.0.1:9/v3", 100, Duration::from_secs(5)).unwrap())
}

/// Build a GET request with the given headers.
pub fn get_request(uri: &str, headers: &[(&str, &str)]) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
