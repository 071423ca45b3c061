//! Order data sources.
//!
//! The order store never talks HTTP directly. It is generic over a
//! [`DataSource`], of which there are two real implementations:
//!
//! - [`RemoteDataSource`] - the backend REST API
//! - [`SyntheticDataSource`] - deterministic in-memory demo data
//!
//! Which one runs is decided by configuration ([`DataSourceMode`]) through
//! [`AnyDataSource`]. A failing remote source never silently falls back to
//! synthetic data.
//!
//! [`DataSourceMode`]: crate::config::DataSourceMode

pub mod ingest;
pub mod remote;
pub mod synthetic;

use std::future::Future;

use orderdesk_core::{Order, OrderId, OrderPatch, OrderStatus, StatsSummary};
use thiserror::Error;

use crate::config::{AdminConfig, DataSourceMode};

pub use remote::RemoteDataSource;
pub use synthetic::SyntheticDataSource;

/// Errors that can occur when talking to a data source.
#[derive(Debug, Error)]
pub enum DataSourceError {
    /// HTTP request failed (network unreachable, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend returned a non-success status code.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Backend answered `success: false`.
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Missing or invalid credentials.
    #[error("Unauthorized: invalid or missing API token")]
    Unauthorized,

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Response body could not be parsed.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Source is not reachable (used by the synthetic source's failure mode).
    #[error("Data source unavailable: {0}")]
    Unavailable(String),
}

/// Which kind of data source is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Remote,
    Synthetic,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Remote => write!(f, "remote"),
            Self::Synthetic => write!(f, "synthetic"),
        }
    }
}

/// One page request for [`DataSource::fetch_orders`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchRequest {
    /// 1-based server page.
    pub page: u32,
    /// Orders per server page.
    pub limit: u32,
    /// Server-side status filter hint.
    pub status: Option<OrderStatus>,
}

/// Response of a batched status update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkUpdateResponse {
    /// Number of orders the backend reports as modified.
    pub modified_count: u64,
}

/// Backend operations consumed by the order store.
///
/// Implementations return fully normalized [`Order`]s: every optional wire
/// field has already been replaced by its documented default.
pub trait DataSource: Send + Sync {
    /// Which kind of source this is.
    fn kind(&self) -> SourceKind;

    /// Fetch one page of orders.
    fn fetch_orders(
        &self,
        request: &FetchRequest,
    ) -> impl Future<Output = Result<Vec<Order>, DataSourceError>> + Send;

    /// Fetch dataset-wide statistics.
    fn fetch_order_stats(&self)
    -> impl Future<Output = Result<StatsSummary, DataSourceError>> + Send;

    /// Set one order's status.
    fn update_order_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
    ) -> impl Future<Output = Result<(), DataSourceError>> + Send;

    /// Update several fields of one order.
    fn update_order(
        &self,
        id: &OrderId,
        patch: &OrderPatch,
    ) -> impl Future<Output = Result<(), DataSourceError>> + Send;

    /// Set the status of many orders in one request.
    fn bulk_update_status(
        &self,
        ids: &[OrderId],
        status: OrderStatus,
    ) -> impl Future<Output = Result<BulkUpdateResponse, DataSourceError>> + Send;
}

/// Configuration-selected data source.
pub enum AnyDataSource {
    Remote(RemoteDataSource),
    Synthetic(SyntheticDataSource),
}

impl AnyDataSource {
    /// Build the data source selected by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if remote mode is selected without API settings or
    /// the HTTP client cannot be built.
    pub fn from_config(config: &AdminConfig) -> Result<Self, DataSourceError> {
        match config.data_source {
            DataSourceMode::Remote => {
                let api = config.api.as_ref().ok_or_else(|| {
                    DataSourceError::Unavailable("remote mode requires ORDERDESK_API_URL".to_string())
                })?;
                Ok(Self::Remote(RemoteDataSource::new(api)?))
            }
            DataSourceMode::Synthetic => {
                Ok(Self::Synthetic(SyntheticDataSource::new(&config.synthetic)))
            }
        }
    }
}

impl DataSource for AnyDataSource {
    fn kind(&self) -> SourceKind {
        match self {
            Self::Remote(source) => source.kind(),
            Self::Synthetic(source) => source.kind(),
        }
    }

    async fn fetch_orders(&self, request: &FetchRequest) -> Result<Vec<Order>, DataSourceError> {
        match self {
            Self::Remote(source) => source.fetch_orders(request).await,
            Self::Synthetic(source) => source.fetch_orders(request).await,
        }
    }

    async fn fetch_order_stats(&self) -> Result<StatsSummary, DataSourceError> {
        match self {
            Self::Remote(source) => source.fetch_order_stats().await,
            Self::Synthetic(source) => source.fetch_order_stats().await,
        }
    }

    async fn update_order_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
    ) -> Result<(), DataSourceError> {
        match self {
            Self::Remote(source) => source.update_order_status(id, status).await,
            Self::Synthetic(source) => source.update_order_status(id, status).await,
        }
    }

    async fn update_order(&self, id: &OrderId, patch: &OrderPatch) -> Result<(), DataSourceError> {
        match self {
            Self::Remote(source) => source.update_order(id, patch).await,
            Self::Synthetic(source) => source.update_order(id, patch).await,
        }
    }

    async fn bulk_update_status(
        &self,
        ids: &[OrderId],
        status: OrderStatus,
    ) -> Result<BulkUpdateResponse, DataSourceError> {
        match self {
            Self::Remote(source) => source.bulk_update_status(ids, status).await,
            Self::Synthetic(source) => source.bulk_update_status(ids, status).await,
        }
    }
}
