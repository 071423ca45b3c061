//! CSV export of the filtered order list.
//!
//! Export works on the filtered, sorted list before pagination, so the file
//! holds every order the operator can page through, not just the visible page.
//! Every field is quoted, embedded quotes are doubled and rows end with `\n`.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use orderdesk_core::Order;
use tracing::instrument;

use crate::error::ExportError;

/// Column headers, in output order.
pub const HEADERS: [&str; 8] = [
    "Order ID",
    "Customer",
    "Customer ID",
    "Status",
    "Total Amount",
    "Date",
    "Payment Method",
    "Products",
];

/// A rendered export, not yet written anywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvExport {
    pub filename: String,
    pub content: String,
    /// Data rows, excluding the header.
    pub rows: usize,
}

impl CsvExport {
    /// Write the file into `dir` and return its path.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Io`] if the file cannot be written.
    #[instrument(skip(self), fields(filename = %self.filename, rows = self.rows))]
    pub async fn write_to(&self, dir: &Path) -> Result<PathBuf, ExportError> {
        let path = dir.join(&self.filename);
        tokio::fs::write(&path, self.content.as_bytes()).await?;
        tracing::info!(path = %path.display(), "Orders exported");
        Ok(path)
    }
}

/// File name for an export made on `date`: `orders-YYYY-MM-DD.csv`.
#[must_use]
pub fn export_filename(date: NaiveDate) -> String {
    format!("orders-{}.csv", date.format("%Y-%m-%d"))
}

/// Render `orders` as CSV.
///
/// # Errors
///
/// Returns [`ExportError::NoOrders`] for an empty list; nothing is rendered.
/// Returns [`ExportError::Csv`] if a record cannot be serialized.
pub fn export_csv(orders: &[Order], date: NaiveDate) -> Result<CsvExport, ExportError> {
    if orders.is_empty() {
        return Err(ExportError::NoOrders);
    }

    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(HEADERS)?;
    for order in orders {
        writer.write_record(&row(order))?;
    }
    let bytes = writer.into_inner().map_err(|e| ExportError::Io(e.into_error()))?;

    Ok(CsvExport {
        filename: export_filename(date),
        content: String::from_utf8(bytes)?,
        rows: orders.len(),
    })
}

fn row(order: &Order) -> [String; 8] {
    [
        order.display_id.clone(),
        order.customer.name.clone(),
        order.customer.id.to_string(),
        order.status.as_str().to_string(),
        format!("{:.2}", order.total_amount),
        order.created_at.format("%Y-%m-%d").to_string(),
        order.payment_method.as_str().to_string(),
        products(order),
    ]
}

/// `"name (qty); name (qty)"`
fn products(order: &Order) -> String {
    order
        .line_items
        .iter()
        .map(|item| format!("{} ({})", item.name, item.quantity))
        .collect::<Vec<_>>()
        .join("; ")
}
