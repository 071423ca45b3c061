//! Order domain types.
//!
//! Orders are created by the backend. The console only ever changes an
//! order's status or payment method; everything else is an immutable
//! snapshot taken when the order was placed.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{CustomerId, OrderId};
use super::status::{OrderStatus, PaymentMethod};

/// Tolerance used when checking that an order's amounts add up.
const AMOUNT_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Structured postal address snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub line1: Option<String>,
    pub line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

impl Address {
    /// Render the non-empty parts on one line, comma-separated.
    #[must_use]
    pub fn one_line(&self) -> String {
        [
            &self.line1,
            &self.line2,
            &self.city,
            &self.state,
            &self.postal_code,
            &self.country,
        ]
        .into_iter()
        .filter_map(|part| part.as_deref().map(str::trim))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
    }

    /// Whether every part is missing or blank.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.one_line().is_empty()
    }
}

/// Denormalized copy of the customer, owned by the order.
///
/// This is not a live reference: later profile edits do not show up here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSnapshot {
    pub id: CustomerId,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<Address>,
}

/// A line on the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub name: String,
    pub category: String,
    pub unit_price: Decimal,
    /// Always at least 1.
    pub quantity: u32,
}

impl LineItem {
    /// `unit_price × quantity`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// A customer order tracked through the status lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Backend-assigned identifier.
    pub id: OrderId,
    /// Human-facing order code (e.g. "ORD-1042").
    pub display_id: String,
    pub status: OrderStatus,
    pub total_amount: Decimal,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub shipping: Decimal,
    /// Default sort key.
    pub created_at: DateTime<Utc>,
    pub payment_method: PaymentMethod,
    pub customer: CustomerSnapshot,
    pub line_items: Vec<LineItem>,
    pub delivery_address: Option<Address>,
}

impl Order {
    /// Total units across all line items.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.line_items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// Sum of line totals.
    #[must_use]
    pub fn line_items_total(&self) -> Decimal {
        self.line_items.iter().map(LineItem::line_total).sum()
    }

    /// Whether `total ≈ subtotal + tax + shipping`.
    ///
    /// Informational only; totals come from upstream and are never corrected here.
    #[must_use]
    pub fn amounts_consistent(&self) -> bool {
        let expected = self.subtotal + self.tax + self.shipping;
        (self.total_amount - expected).abs() <= AMOUNT_TOLERANCE
    }

    /// Apply a patch in place, returning the previous values of the patched fields.
    pub fn apply_patch(&mut self, patch: &OrderPatch) -> OrderPatch {
        let previous = OrderPatch {
            status: patch.status.map(|_| self.status),
            payment_method: patch.payment_method.map(|_| self.payment_method),
        };
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(method) = patch.payment_method {
            self.payment_method = method;
        }
        previous
    }
}

/// Fields an admin may edit on an existing order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<PaymentMethod>,
}

impl OrderPatch {
    /// Patch that only changes the status.
    #[must_use]
    pub const fn status(status: OrderStatus) -> Self {
        Self {
            status: Some(status),
            payment_method: None,
        }
    }

    /// Whether the patch changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.status.is_none() && self.payment_method.is_none()
    }
}
