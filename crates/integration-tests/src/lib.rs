//! Integration test support for orderdesk.
//!
//! [`FakeBackend`] is an in-process stand-in for the orders REST API. It
//! serves the same endpoints the remote data source calls, on a random local
//! port:
//!
//! - `GET   /api/orders?page=&limit=&status=`
//! - `GET   /api/orders/stats`
//! - `PATCH /api/orders/{id}/status`
//! - `PATCH /api/orders/{id}`
//! - `PATCH /api/orders/bulk/status`
//!
//! Orders are kept as raw JSON so tests can seed the loose payloads the real
//! backend produces. Every request is recorded, and reads and writes can be
//! switched into failure modes independently.
//!
//! Run with: cargo test -p orderdesk-integration-tests

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch};
use axum::{Json, Router};
use orderdesk_admin::config::ApiConfig;
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use url::Url;

/// One request as the fake backend received it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: HashMap<String, String>,
    pub authorization: Option<String>,
    pub body: Option<Value>,
}

/// How the fake backend answers while a failure mode is active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// Respond with this HTTP status and a JSON error message.
    Status(u16),
    /// Respond 429 with a `Retry-After` header.
    RateLimited { retry_after: u64 },
    /// Respond 200 with `success: false` and this message.
    Rejected(String),
}

#[derive(Debug, Default)]
struct BackendState {
    orders: Vec<Value>,
    stats: Option<Value>,
    token: Option<String>,
    read_failure: Option<Failure>,
    write_failure: Option<Failure>,
    paged_payload: bool,
    requests: Vec<RecordedRequest>,
}

type Shared = Arc<Mutex<BackendState>>;

fn lock(state: &Shared) -> MutexGuard<'_, BackendState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A running fake backend. The server stops when this is dropped.
pub struct FakeBackend {
    addr: SocketAddr,
    state: Shared,
    task: JoinHandle<()>,
}

impl FakeBackend {
    /// Serve `orders` on a random local port.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub async fn start(orders: Vec<Value>) -> std::io::Result<Self> {
        let state: Shared = Arc::new(Mutex::new(BackendState {
            orders,
            ..BackendState::default()
        }));
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let app = router(Arc::clone(&state));

        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self { addr, state, task })
    }

    /// Base URL to configure the remote data source with.
    ///
    /// # Errors
    ///
    /// Returns an error if the bound address does not form a valid URL.
    pub fn base_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&format!("http://{}/api", self.addr))
    }

    /// API settings pointing at this backend, with an optional bearer token.
    ///
    /// # Errors
    ///
    /// See [`FakeBackend::base_url`].
    pub fn api_config(&self, token: Option<&str>) -> Result<ApiConfig, url::ParseError> {
        let mut config = ApiConfig::new(self.base_url()?);
        config.token = token.map(|t| SecretString::from(t.to_string()));
        Ok(config)
    }

    /// Require `Authorization: Bearer {token}` on every request.
    pub fn require_token(&self, token: &str) {
        lock(&self.state).token = Some(token.to_string());
    }

    /// Serve these figures from the stats endpoint instead of computing them.
    pub fn set_stats(&self, stats: Value) {
        lock(&self.state).stats = Some(stats);
    }

    /// Fail every GET until cleared with `None`.
    pub fn fail_reads(&self, failure: Option<Failure>) {
        lock(&self.state).read_failure = failure;
    }

    /// Fail every PATCH until cleared with `None`.
    pub fn fail_writes(&self, failure: Option<Failure>) {
        lock(&self.state).write_failure = failure;
    }

    /// Wrap order lists as `{ "orders": [...], "total": n }` instead of a bare array.
    pub fn use_paged_payload(&self, paged: bool) {
        lock(&self.state).paged_payload = paged;
    }

    /// Replace the stored orders.
    pub fn set_orders(&self, orders: Vec<Value>) {
        lock(&self.state).orders = orders;
    }

    /// Current stored orders, including any updates applied by PATCH calls.
    #[must_use]
    pub fn orders(&self) -> Vec<Value> {
        lock(&self.state).orders.clone()
    }

    /// Status of the stored order with this id.
    #[must_use]
    pub fn status_of(&self, id: &str) -> Option<String> {
        lock(&self.state)
            .orders
            .iter()
            .find(|order| order_key(order).as_deref() == Some(id))
            .and_then(|order| order.get("status"))
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    /// Every request received so far, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.state).requests.clone()
    }

    /// Requests received for one path.
    #[must_use]
    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        lock(&self.state)
            .requests
            .iter()
            .filter(|request| request.path == path)
            .cloned()
            .collect()
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// A well-formed order in the backend's current wire shape.
#[must_use]
pub fn wire_order(id: &str, display_id: &str, status: &str, total: &str, created_at: &str) -> Value {
    json!({
        "_id": id,
        "orderId": display_id,
        "status": status,
        "totalAmount": total,
        "subtotal": total,
        "tax": "0",
        "shipping": "0",
        "createdAt": created_at,
        "paymentMethod": "upi",
        "user": {
            "_id": format!("cust-{id}"),
            "name": format!("Customer {display_id}"),
            "phone": "9876500000"
        },
        "items": [
            { "product": { "name": "Masala Chai", "category": "Beverages", "price": total }, "quantity": 1 }
        ]
    })
}

// =============================================================================
// Routes
// =============================================================================

fn router(state: Shared) -> Router {
    Router::new()
        .route("/api/orders", get(list_orders))
        .route("/api/orders/stats", get(order_stats))
        .route("/api/orders/bulk/status", patch(bulk_update_status))
        .route("/api/orders/{id}/status", patch(update_order_status))
        .route("/api/orders/{id}", patch(update_order))
        .with_state(state)
}

/// Record the request, then apply the token check and any active failure mode.
fn admit<'a>(
    state: &'a Shared,
    method: Method,
    uri: &Uri,
    headers: &HeaderMap,
    query: HashMap<String, String>,
    body: &[u8],
) -> Result<MutexGuard<'a, BackendState>, Response> {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let is_write = method == Method::PATCH;

    let mut backend = lock(state);
    backend.requests.push(RecordedRequest {
        method,
        path: uri.path().to_string(),
        query,
        authorization: authorization.clone(),
        body: serde_json::from_slice(body).ok(),
    });

    if let Some(token) = &backend.token
        && authorization.as_deref() != Some(format!("Bearer {token}").as_str())
    {
        return Err(error_response(StatusCode::UNAUTHORIZED, "Invalid token"));
    }

    let failure = if is_write {
        backend.write_failure.clone()
    } else {
        backend.read_failure.clone()
    };
    match failure {
        None => Ok(backend),
        Some(Failure::Status(code)) => Err(error_response(
            StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            "Injected failure",
        )),
        Some(Failure::RateLimited { retry_after }) => {
            let mut response = error_response(StatusCode::TOO_MANY_REQUESTS, "Slow down");
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
            Err(response)
        }
        Some(Failure::Rejected(message)) => Err(Json(json!({
            "success": false,
            "message": message
        }))
        .into_response()),
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "success": false, "message": message }))).into_response()
}

fn order_key(order: &Value) -> Option<String> {
    order
        .get("_id")
        .or_else(|| order.get("id"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn set_field(order: &mut Value, field: &str, value: Value) {
    if let Some(object) = order.as_object_mut() {
        object.insert(field.to_string(), value);
    }
}

fn number(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

async fn list_orders(
    State(state): State<Shared>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let page: usize = query.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    let limit: usize = query.get("limit").and_then(|l| l.parse().ok()).unwrap_or(20);
    let status = query.get("status").cloned();

    let backend = match admit(&state, method, &uri, &headers, query, &[]) {
        Ok(backend) => backend,
        Err(response) => return response,
    };

    let matching: Vec<Value> = backend
        .orders
        .iter()
        .filter(|order| {
            status
                .as_deref()
                .is_none_or(|wanted| order.get("status").and_then(Value::as_str) == Some(wanted))
        })
        .cloned()
        .collect();
    let total = matching.len();
    let orders: Vec<Value> = matching
        .into_iter()
        .skip(page.saturating_sub(1) * limit)
        .take(limit)
        .collect();

    let data = if backend.paged_payload {
        json!({ "orders": orders, "total": total })
    } else {
        Value::Array(orders)
    };
    Json(json!({ "success": true, "data": data })).into_response()
}

async fn order_stats(
    State(state): State<Shared>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let backend = match admit(&state, method, &uri, &headers, HashMap::new(), &[]) {
        Ok(backend) => backend,
        Err(response) => return response,
    };

    let stats = backend.stats.clone().unwrap_or_else(|| {
        let revenue: f64 = backend
            .orders
            .iter()
            .map(|order| number(order.get("totalAmount")))
            .sum();
        let count_status = |wanted: &str| {
            backend
                .orders
                .iter()
                .filter(|order| order.get("status").and_then(Value::as_str) == Some(wanted))
                .count()
        };
        json!({
            "totalOrders": backend.orders.len(),
            "totalRevenue": format!("{revenue:.2}"),
            "deliveredOrders": count_status("delivered"),
        })
    });
    Json(json!({ "success": true, "data": stats })).into_response()
}

async fn update_order_status(
    State(state): State<Shared>,
    Path(id): Path<String>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let mut backend = match admit(&state, method, &uri, &headers, HashMap::new(), &body) {
        Ok(backend) => backend,
        Err(response) => return response,
    };
    let Some(status) = serde_json::from_slice::<Value>(&body)
        .ok()
        .and_then(|b| b.get("status").cloned())
    else {
        return error_response(StatusCode::BAD_REQUEST, "status is required");
    };

    match backend
        .orders
        .iter_mut()
        .find(|order| order_key(order).as_deref() == Some(id.as_str()))
    {
        Some(order) => {
            set_field(order, "status", status);
            Json(json!({ "success": true, "data": order.clone() })).into_response()
        }
        None => error_response(StatusCode::NOT_FOUND, "Order not found"),
    }
}

async fn update_order(
    State(state): State<Shared>,
    Path(id): Path<String>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let mut backend = match admit(&state, method, &uri, &headers, HashMap::new(), &body) {
        Ok(backend) => backend,
        Err(response) => return response,
    };
    let patch = serde_json::from_slice::<Value>(&body).unwrap_or(Value::Null);

    match backend
        .orders
        .iter_mut()
        .find(|order| order_key(order).as_deref() == Some(id.as_str()))
    {
        Some(order) => {
            for field in ["status", "paymentMethod"] {
                if let Some(value) = patch.get(field) {
                    set_field(order, field, value.clone());
                }
            }
            Json(json!({ "success": true, "data": order.clone() })).into_response()
        }
        None => error_response(StatusCode::NOT_FOUND, "Order not found"),
    }
}

async fn bulk_update_status(
    State(state): State<Shared>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let mut backend = match admit(&state, method, &uri, &headers, HashMap::new(), &body) {
        Ok(backend) => backend,
        Err(response) => return response,
    };
    let request = serde_json::from_slice::<Value>(&body).unwrap_or(Value::Null);
    let (Some(ids), Some(status)) = (
        request.get("orderIds").and_then(Value::as_array),
        request.get("status").and_then(Value::as_str),
    ) else {
        return error_response(StatusCode::BAD_REQUEST, "orderIds and status are required");
    };
    let ids: Vec<&str> = ids.iter().filter_map(Value::as_str).collect();

    let mut modified = 0_u64;
    for order in &mut backend.orders {
        let Some(key) = order_key(order) else {
            continue;
        };
        if ids.contains(&key.as_str()) && order.get("status").and_then(Value::as_str) != Some(status) {
            set_field(order, "status", Value::from(status));
            modified += 1;
        }
    }

    Json(json!({ "success": true, "modifiedCount": modified })).into_response()
}
