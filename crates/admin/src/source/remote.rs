//! Backend REST API data source.
//!
//! # API Reference
//!
//! - `GET   orders?page=&limit=&status=` - one page of orders
//! - `GET   orders/stats` - dataset-wide aggregates
//! - `PATCH orders/{id}/status` - set one order's status
//! - `PATCH orders/{id}` - update status and/or payment method
//! - `PATCH orders/bulk/status` - set many orders' status in one request
//!
//! Every response is wrapped in `{ "success": bool, "data": ..., "message": ... }`.
//! Paths are resolved against the configured base URL.

use std::sync::Arc;

use orderdesk_core::{Order, OrderId, OrderPatch, OrderStatus, StatsSummary};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::instrument;
use url::Url;

use super::ingest::{RawStats, normalize_orders, normalize_stats, parse_orders};
use super::{BulkUpdateResponse, DataSource, DataSourceError, FetchRequest, SourceKind};
use crate::config::ApiConfig;

/// Response envelope used by every endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<T> {
    #[serde(default = "default_success")]
    success: bool,
    data: Option<T>,
    message: Option<String>,
    modified_count: Option<u64>,
}

const fn default_success() -> bool {
    true
}

/// Order list payload: either a bare array or wrapped with pagination info.
///
/// Orders stay as raw JSON here so one malformed order cannot fail the page.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OrdersPayload {
    List(Vec<serde_json::Value>),
    Paged { orders: Vec<serde_json::Value> },
}

impl OrdersPayload {
    fn into_orders(self) -> Vec<serde_json::Value> {
        match self {
            Self::List(orders) | Self::Paged { orders } => orders,
        }
    }
}

#[derive(Debug, Serialize)]
struct StatusBody {
    status: OrderStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BulkStatusBody<'a> {
    order_ids: &'a [OrderId],
    status: OrderStatus,
}

/// Backend REST API client.
#[derive(Clone)]
pub struct RemoteDataSource {
    inner: Arc<RemoteDataSourceInner>,
}

struct RemoteDataSourceInner {
    client: reqwest::Client,
    base_url: Url,
}

impl RemoteDataSource {
    /// Create a new client for the configured backend.
    ///
    /// # Errors
    ///
    /// Returns error if the token is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &ApiConfig) -> Result<Self, DataSourceError> {
        let mut headers = HeaderMap::new();

        if let Some(token) = &config.token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
                .map_err(|e| DataSourceError::Parse(format!("Invalid API token format: {e}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        // Url::join drops the last path segment unless it ends with a slash.
        let mut base_url = config.base_url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            inner: Arc::new(RemoteDataSourceInner { client, base_url }),
        })
    }

    /// Base URL all paths are resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, DataSourceError> {
        self.inner
            .base_url
            .join(path)
            .map_err(|e| DataSourceError::Parse(format!("Invalid endpoint path {path}: {e}")))
    }

    /// Execute a GET request and unwrap the envelope.
    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Envelope<T>, DataSourceError> {
        let url = self.endpoint(path)?;
        let response = self.inner.client.get(url).query(query).send().await?;
        Self::handle_response(response).await
    }

    /// Execute a PATCH request and unwrap the envelope.
    async fn patch<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Envelope<T>, DataSourceError> {
        let url = self.endpoint(path)?;
        let response = self.inner.client.patch(url).json(body).send().await?;
        Self::handle_response(response).await
    }

    /// Handle API response, parse JSON, and reject `success: false`.
    async fn handle_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<Envelope<T>, DataSourceError> {
        let status = response.status();

        if !status.is_success() {
            return Err(Self::parse_error(response).await);
        }

        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| DataSourceError::Parse(format!("Failed to parse response: {e}")))?;

        if !envelope.success {
            return Err(DataSourceError::Rejected(
                envelope
                    .message
                    .unwrap_or_else(|| "backend reported failure".to_string()),
            ));
        }

        Ok(envelope)
    }

    /// Map a non-2xx response to an error.
    async fn parse_error(response: reqwest::Response) -> DataSourceError {
        let status = response.status().as_u16();

        if status == 429 {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return DataSourceError::RateLimited(retry_after);
        }

        if status == 401 || status == 403 {
            return DataSourceError::Unauthorized;
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Envelope<serde_json::Value>>(&body)
            .ok()
            .and_then(|e| e.message)
            .unwrap_or(body);

        if status == 404 {
            return DataSourceError::NotFound(message);
        }

        DataSourceError::Api { status, message }
    }
}

impl DataSource for RemoteDataSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Remote
    }

    #[instrument(skip(self), fields(page = request.page, limit = request.limit))]
    async fn fetch_orders(&self, request: &FetchRequest) -> Result<Vec<Order>, DataSourceError> {
        let mut query = vec![
            ("page", request.page.to_string()),
            ("limit", request.limit.to_string()),
        ];
        if let Some(status) = request.status {
            query.push(("status", status.as_str().to_string()));
        }

        let envelope: Envelope<OrdersPayload> = self.get("orders", &query).await?;
        let values = envelope.data.map(OrdersPayload::into_orders).unwrap_or_default();
        Ok(normalize_orders(parse_orders(values)))
    }

    #[instrument(skip(self))]
    async fn fetch_order_stats(&self) -> Result<StatsSummary, DataSourceError> {
        let envelope: Envelope<RawStats> = self.get("orders/stats", &[]).await?;
        let raw = envelope
            .data
            .ok_or_else(|| DataSourceError::Parse("stats response has no data".to_string()))?;
        Ok(normalize_stats(raw))
    }

    #[instrument(skip(self), fields(order_id = %id, status = %status.as_str()))]
    async fn update_order_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
    ) -> Result<(), DataSourceError> {
        let path = format!("orders/{id}/status");
        let _: Envelope<serde_json::Value> = self.patch(&path, &StatusBody { status }).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(order_id = %id))]
    async fn update_order(&self, id: &OrderId, patch: &OrderPatch) -> Result<(), DataSourceError> {
        let path = format!("orders/{id}");
        let _: Envelope<serde_json::Value> = self.patch(&path, patch).await?;
        Ok(())
    }

    #[instrument(skip(self, ids), fields(count = ids.len(), status = %status.as_str()))]
    async fn bulk_update_status(
        &self,
        ids: &[OrderId],
        status: OrderStatus,
    ) -> Result<BulkUpdateResponse, DataSourceError> {
        let body = BulkStatusBody {
            order_ids: ids,
            status,
        };
        let envelope: Envelope<serde_json::Value> = self.patch("orders/bulk/status", &body).await?;

        // Older backends put the count inside `data`.
        let modified_count = envelope
            .modified_count
            .or_else(|| {
                envelope
                    .data
                    .as_ref()
                    .and_then(|d| d.get("modifiedCount"))
                    .and_then(serde_json::Value::as_u64)
            })
            .unwrap_or(0);

        Ok(BulkUpdateResponse { modified_count })
    }
}
