//! Error types for the order store and exporter.

use orderdesk_core::OrderId;
use thiserror::Error;

use crate::source::DataSourceError;

/// Errors returned by [`OrderStore`](crate::orders::OrderStore) operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Data source call failed. Any optimistic change has been handled
    /// according to the operation's rollback policy.
    #[error("Data source error: {0}")]
    DataSource(#[from] DataSourceError),

    /// No loaded order has this id. Nothing was sent.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// Bulk action requested with no orders. Nothing was sent.
    #[error("No orders selected")]
    EmptySelection,

    /// Update requested with no fields to change. Nothing was sent.
    #[error("Nothing to update")]
    EmptyPatch,

    /// Another bulk update or reload is in flight.
    #[error("Another bulk update or reload is in progress")]
    Busy,

    /// The batched status update failed. The local collection keeps the
    /// optimistic status for every requested order.
    #[error("Bulk update of {requested} orders failed: {source}")]
    BulkUpdate {
        requested: usize,
        #[source]
        source: DataSourceError,
    },
}

impl StoreError {
    /// Whether the operation was rejected before any request was sent.
    #[must_use]
    pub const fn is_rejected_locally(&self) -> bool {
        matches!(
            self,
            Self::OrderNotFound(_) | Self::EmptySelection | Self::EmptyPatch | Self::Busy
        )
    }
}

/// Errors returned by CSV export.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The filtered list is empty; no file is produced.
    #[error("No orders to export")]
    NoOrders,

    /// A record could not be serialized.
    #[error("Failed to render CSV: {0}")]
    Csv(#[from] csv::Error),

    /// Rendered output was not valid UTF-8.
    #[error("Export is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    /// Writing the file failed.
    #[error("Failed to write export: {0}")]
    Io(#[from] std::io::Error),
}
