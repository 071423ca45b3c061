//! Wire types and ingestion normalization.
//!
//! The backend is loose about its payloads: fields go missing, amounts arrive
//! as numbers or strings, and older records use different key names. Everything
//! is accepted here and replaced with a documented default so the rest of the
//! pipeline never sees an absent field:
//!
//! | Field | Default |
//! |-------|---------|
//! | status (missing or unknown) | `order_confirmed` |
//! | amounts (missing or negative) | `0` |
//! | payment method (missing or unknown) | `cash` |
//! | display id | the order id |
//! | customer name | `"Unknown"` |
//! | customer id | `"guest"` |
//! | created at (missing or unparseable) | Unix epoch |
//! | line item quantity (< 1) | `1` |
//!
//! Orders with neither an id nor a display id cannot be addressed and are dropped.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDateTime, Utc};
use orderdesk_core::{
    Address, CustomerId, CustomerSnapshot, LineItem, Order, OrderId, OrderStatus, PaymentMethod,
    StatsSummary,
};
use rust_decimal::Decimal;
use serde::Deserialize;

const UNKNOWN_CUSTOMER: &str = "Unknown";
const GUEST_CUSTOMER_ID: &str = "guest";
const DEFAULT_ITEM_NAME: &str = "Item";
const DEFAULT_CATEGORY: &str = "Uncategorized";

// =============================================================================
// Wire Types
// =============================================================================
//
// Every field goes through a lenient deserializer, so a wrong-typed value
// becomes `None` instead of failing the whole record.

/// An order exactly as the backend sends it.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawOrder {
    #[serde(alias = "_id", deserialize_with = "lenient::string")]
    pub id: Option<String>,
    #[serde(alias = "orderId", alias = "orderNumber", deserialize_with = "lenient::string")]
    pub display_id: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub status: Option<String>,
    #[serde(alias = "total", deserialize_with = "lenient::decimal")]
    pub total_amount: Option<Decimal>,
    #[serde(deserialize_with = "lenient::decimal")]
    pub subtotal: Option<Decimal>,
    #[serde(deserialize_with = "lenient::decimal")]
    pub tax: Option<Decimal>,
    #[serde(alias = "shippingFee", alias = "deliveryFee", deserialize_with = "lenient::decimal")]
    pub shipping: Option<Decimal>,
    pub created_at: Option<serde_json::Value>,
    #[serde(deserialize_with = "lenient::string")]
    pub payment_method: Option<String>,
    #[serde(alias = "user", deserialize_with = "lenient::customer")]
    pub customer: Option<RawCustomer>,
    #[serde(alias = "items", alias = "products", deserialize_with = "lenient::list")]
    pub line_items: Vec<RawLineItem>,
    #[serde(alias = "shippingAddress", deserialize_with = "lenient::object")]
    pub delivery_address: Option<RawAddress>,
}

/// Embedded customer as sent by the backend.
///
/// Some endpoints send only the customer id as a string.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawCustomer {
    #[serde(alias = "_id", deserialize_with = "lenient::string")]
    pub id: Option<String>,
    #[serde(alias = "fullName", deserialize_with = "lenient::string")]
    pub name: Option<String>,
    #[serde(alias = "mobile", alias = "phoneNumber", deserialize_with = "lenient::string")]
    pub phone: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub email: Option<String>,
    #[serde(deserialize_with = "lenient::object")]
    pub address: Option<RawAddress>,
}

/// Line item as sent by the backend.
///
/// Older records nest name, category and price under `product`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawLineItem {
    #[serde(deserialize_with = "lenient::string")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub category: Option<String>,
    #[serde(alias = "price", deserialize_with = "lenient::decimal")]
    pub unit_price: Option<Decimal>,
    #[serde(deserialize_with = "lenient::integer")]
    pub quantity: Option<i64>,
    #[serde(deserialize_with = "lenient::object")]
    pub product: Option<RawProduct>,
}

/// Product reference nested in older line items.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawProduct {
    #[serde(deserialize_with = "lenient::string")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub category: Option<String>,
    #[serde(deserialize_with = "lenient::decimal")]
    pub price: Option<Decimal>,
}

/// Address as sent by the backend.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawAddress {
    #[serde(alias = "street", alias = "addressLine1", deserialize_with = "lenient::string")]
    pub line1: Option<String>,
    #[serde(alias = "addressLine2", alias = "landmark", deserialize_with = "lenient::string")]
    pub line2: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub city: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub state: Option<String>,
    #[serde(alias = "zip", alias = "pincode", alias = "zipCode", deserialize_with = "lenient::string")]
    pub postal_code: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub country: Option<String>,
}

/// Aggregate statistics as sent by the backend.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawStats {
    #[serde(deserialize_with = "lenient::count")]
    pub total_orders: Option<u64>,
    #[serde(deserialize_with = "lenient::decimal")]
    pub total_revenue: Option<Decimal>,
    #[serde(alias = "totalCustomers", deserialize_with = "lenient::count")]
    pub customer_count: Option<u64>,
    #[serde(alias = "averageOrderValue", deserialize_with = "lenient::decimal")]
    pub avg_order_value: Option<Decimal>,
    #[serde(alias = "pendingOrders", deserialize_with = "lenient::count")]
    pub pending_count: Option<u64>,
    #[serde(alias = "deliveredOrders", deserialize_with = "lenient::count")]
    pub delivered_count: Option<u64>,
}

/// Field deserializers that read any JSON value and keep what makes sense.
mod lenient {
    use std::str::FromStr;

    use rust_decimal::Decimal;
    use rust_decimal::prelude::ToPrimitive;
    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    use super::RawCustomer;

    /// Strings as-is, numbers rendered; anything else is absent.
    pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    }

    /// Numbers or numeric strings; `"N/A"` and friends are absent.
    pub fn decimal<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Decimal>, D::Error> {
        let text = match Value::deserialize(d)? {
            Value::Number(n) => n.to_string(),
            Value::String(s) => s.trim().to_string(),
            _ => return Ok(None),
        };
        Ok(Decimal::from_str(&text)
            .or_else(|_| Decimal::from_scientific(&text))
            .ok())
    }

    /// Whole numbers or numeric strings. Fractions are truncated.
    pub fn integer<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Number(n) => n.as_i64().or_else(|| whole(&n.to_string())),
            Value::String(s) => whole(s.trim()),
            _ => None,
        })
    }

    fn whole(text: &str) -> Option<i64> {
        text.parse().ok().or_else(|| {
            Decimal::from_str(text)
                .or_else(|_| Decimal::from_scientific(text))
                .ok()
                .and_then(|d| d.trunc().to_i64())
        })
    }

    /// Non-negative counts.
    pub fn count<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
        Ok(integer(d)?.and_then(|n| u64::try_from(n).ok()))
    }

    /// A nested object; a value of any other shape is absent.
    pub fn object<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        Ok(match Value::deserialize(d)? {
            value @ Value::Object(_) => serde_json::from_value(value).ok(),
            _ => None,
        })
    }

    /// An embedded customer, or a bare customer id.
    pub fn customer<'de, D: Deserializer<'de>>(d: D) -> Result<Option<RawCustomer>, D::Error> {
        Ok(match Value::deserialize(d)? {
            value @ Value::Object(_) => serde_json::from_value(value).ok(),
            Value::String(id) => Some(RawCustomer {
                id: Some(id),
                ..RawCustomer::default()
            }),
            _ => None,
        })
    }

    /// A list of objects. Entries that are not objects are skipped.
    pub fn list<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        Ok(match Value::deserialize(d)? {
            Value::Array(values) => values
                .into_iter()
                .filter(Value::is_object)
                .filter_map(|value| serde_json::from_value(value).ok())
                .collect(),
            _ => Vec::new(),
        })
    }
}

/// Read raw orders one at a time.
///
/// Entries that are not JSON objects cannot be recovered and are dropped.
#[must_use]
pub fn parse_orders(values: Vec<serde_json::Value>) -> Vec<RawOrder> {
    let received = values.len();
    let raws: Vec<RawOrder> = values
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<RawOrder>(value) {
            Ok(raw) => Some(raw),
            Err(e) => {
                tracing::warn!(error = %e, "Dropped order with an unreadable shape");
                None
            }
        })
        .collect();
    if raws.len() != received {
        tracing::warn!(received, kept = raws.len(), "Dropped unreadable orders");
    }
    raws
}

// =============================================================================
// Normalization
// =============================================================================

/// Normalize one raw order. Returns `None` when the order has no usable id.
#[must_use]
pub fn normalize_order(raw: RawOrder) -> Option<Order> {
    let id = non_blank(raw.id).or_else(|| non_blank(raw.display_id.clone()))?;
    let display_id = non_blank(raw.display_id).unwrap_or_else(|| id.clone());

    let status = raw
        .status
        .as_deref()
        .and_then(|s| s.parse::<OrderStatus>().ok())
        .unwrap_or_default();
    let payment_method = raw
        .payment_method
        .as_deref()
        .and_then(|s| s.parse::<PaymentMethod>().ok())
        .unwrap_or_default();

    let customer = normalize_customer(raw.customer.unwrap_or_default());
    let line_items = raw.line_items.into_iter().map(normalize_line_item).collect();
    let delivery_address = raw
        .delivery_address
        .map(normalize_address)
        .filter(|address| !address.is_empty());

    Some(Order {
        id: OrderId::new(id),
        display_id,
        status,
        total_amount: amount(raw.total_amount),
        subtotal: amount(raw.subtotal),
        tax: amount(raw.tax),
        shipping: amount(raw.shipping),
        created_at: raw
            .created_at
            .as_ref()
            .and_then(parse_timestamp)
            .unwrap_or(DateTime::UNIX_EPOCH),
        payment_method,
        customer,
        line_items,
        delivery_address,
    })
}

/// Normalize a batch, dropping unaddressable orders and duplicate ids.
///
/// The first occurrence of an id wins.
#[must_use]
pub fn normalize_orders(raws: Vec<RawOrder>) -> Vec<Order> {
    let received = raws.len();
    let mut seen = HashSet::new();
    let orders: Vec<Order> = raws
        .into_iter()
        .filter_map(normalize_order)
        .filter(|order| seen.insert(order.id.clone()))
        .collect();

    if orders.len() != received {
        tracing::warn!(
            received,
            kept = orders.len(),
            "Dropped orders without an id or with duplicate ids"
        );
    }
    orders
}

/// Normalize backend statistics.
///
/// A missing average is recomputed from revenue and order count.
#[must_use]
pub fn normalize_stats(raw: RawStats) -> StatsSummary {
    let total_orders = raw.total_orders.unwrap_or(0);
    let total_revenue = amount(raw.total_revenue);
    let avg_order_value = raw.avg_order_value.map_or_else(
        || crate::orders::stats::average(total_revenue, total_orders),
        |avg| avg.max(Decimal::ZERO),
    );

    StatsSummary {
        total_orders,
        total_revenue,
        customer_count: raw.customer_count.unwrap_or(0),
        avg_order_value,
        pending_count: raw.pending_count.unwrap_or(0),
        delivered_count: raw.delivered_count.unwrap_or(0),
    }
}

fn normalize_customer(raw: RawCustomer) -> CustomerSnapshot {
    CustomerSnapshot {
        id: CustomerId::new(non_blank(raw.id).unwrap_or_else(|| GUEST_CUSTOMER_ID.to_string())),
        name: non_blank(raw.name).unwrap_or_else(|| UNKNOWN_CUSTOMER.to_string()),
        phone: raw.phone.map(|p| p.trim().to_string()).unwrap_or_default(),
        email: non_blank(raw.email),
        address: raw
            .address
            .map(normalize_address)
            .filter(|address| !address.is_empty()),
    }
}

fn normalize_line_item(raw: RawLineItem) -> LineItem {
    let product = raw.product.unwrap_or_default();
    let quantity = raw
        .quantity
        .unwrap_or(1)
        .clamp(1, i64::from(u32::MAX));

    LineItem {
        name: non_blank(raw.name)
            .or_else(|| non_blank(product.name))
            .unwrap_or_else(|| DEFAULT_ITEM_NAME.to_string()),
        category: non_blank(raw.category)
            .or_else(|| non_blank(product.category))
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
        unit_price: amount(raw.unit_price.or(product.price)),
        quantity: u32::try_from(quantity).unwrap_or(u32::MAX),
    }
}

fn normalize_address(raw: RawAddress) -> Address {
    Address {
        line1: non_blank(raw.line1),
        line2: non_blank(raw.line2),
        city: non_blank(raw.city),
        state: non_blank(raw.state),
        postal_code: non_blank(raw.postal_code),
        country: non_blank(raw.country),
    }
}

/// Missing or negative amounts become zero.
fn amount(value: Option<Decimal>) -> Decimal {
    value.unwrap_or(Decimal::ZERO).max(Decimal::ZERO)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Accepts RFC 3339 strings, naive ISO timestamps (assumed UTC), and epoch milliseconds.
fn parse_timestamp(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    match value {
        serde_json::Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                    .ok()
                    .map(|naive| naive.and_utc())
            }),
        serde_json::Value::Number(n) => n.as_i64().and_then(DateTime::<Utc>::from_timestamp_millis),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: serde_json::Value) -> RawOrder {
        serde_json::from_value(value).unwrap()
    }

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_full_order_normalizes() {
        let order = normalize_order(raw(json!({
            "_id": "65f1",
            "orderId": "ORD-1001",
            "status": "out_for_delivery",
            "totalAmount": 118.5,
            "subtotal": "100.50",
            "tax": 8,
            "shipping": 10,
            "createdAt": "2025-03-01T10:15:00Z",
            "paymentMethod": "upi",
            "user": { "_id": "u1", "name": "Asha Rao", "phone": "9876543200", "email": "asha@mail.test" },
            "items": [{ "name": "Mango", "category": "Fruit", "price": 20.5, "quantity": 2 }],
            "deliveryAddress": { "street": "12 MG Road", "city": "Pune", "pincode": "411001" }
        })))
        .unwrap();

        assert_eq!(order.id.as_str(), "65f1");
        assert_eq!(order.display_id, "ORD-1001");
        assert_eq!(order.status, OrderStatus::OutForDelivery);
        assert_eq!(order.total_amount, dec("118.5"));
        assert_eq!(order.subtotal, dec("100.50"));
        assert_eq!(order.payment_method, PaymentMethod::Upi);
        assert_eq!(order.customer.name, "Asha Rao");
        assert_eq!(order.customer.email.as_deref(), Some("asha@mail.test"));
        assert_eq!(order.line_items[0].line_total(), dec("41.0"));
        assert_eq!(order.delivery_address.unwrap().one_line(), "12 MG Road, Pune, 411001");
        assert_eq!(order.created_at.to_rfc3339(), "2025-03-01T10:15:00+00:00");
    }

    #[test]
    fn test_missing_fields_get_defaults() {
        let order = normalize_order(raw(json!({ "_id": "bare" }))).unwrap();

        assert_eq!(order.display_id, "bare");
        assert_eq!(order.status, OrderStatus::OrderConfirmed);
        assert_eq!(order.total_amount, Decimal::ZERO);
        assert_eq!(order.tax, Decimal::ZERO);
        assert_eq!(order.payment_method, PaymentMethod::Cash);
        assert_eq!(order.customer.name, "Unknown");
        assert_eq!(order.customer.id.as_str(), "guest");
        assert_eq!(order.created_at, DateTime::UNIX_EPOCH);
        assert!(order.line_items.is_empty());
        assert!(order.delivery_address.is_none());
    }

    #[test]
    fn test_unknown_values_fall_back() {
        let order = normalize_order(raw(json!({
            "_id": "x",
            "status": "lost_in_space",
            "paymentMethod": "barter",
            "totalAmount": -5,
            "createdAt": "yesterday"
        })))
        .unwrap();

        assert_eq!(order.status, OrderStatus::OrderConfirmed);
        assert_eq!(order.payment_method, PaymentMethod::Cash);
        assert_eq!(order.total_amount, Decimal::ZERO);
        assert_eq!(order.created_at, DateTime::UNIX_EPOCH);
    }

    #[test]
    fn test_nested_product_and_quantity_clamp() {
        let order = normalize_order(raw(json!({
            "_id": "x",
            "products": [{ "product": { "name": "Bread", "category": "Bakery", "price": "35" }, "quantity": 0 }]
        })))
        .unwrap();

        let item = &order.line_items[0];
        assert_eq!(item.name, "Bread");
        assert_eq!(item.category, "Bakery");
        assert_eq!(item.unit_price, dec("35"));
        assert_eq!(item.quantity, 1);
    }

    #[test]
    fn test_mistyped_fields_degrade_to_defaults() {
        let order = normalize_order(raw(json!({
            "_id": "65f2",
            "user": "65f1c2e9a",
            "totalAmount": "N/A",
            "tax": { "rate": 5 },
            "shipping": " 40 ",
            "items": [
                { "name": "Chai", "price": "12.50", "quantity": "2" },
                "not an item",
                { "name": "Rusk", "price": true, "quantity": 3.7 }
            ],
            "deliveryAddress": "somewhere"
        })))
        .unwrap();

        assert_eq!(order.total_amount, Decimal::ZERO);
        assert_eq!(order.tax, Decimal::ZERO);
        assert_eq!(order.shipping, dec("40"));
        assert_eq!(order.customer.id.as_str(), "65f1c2e9a");
        assert_eq!(order.customer.name, "Unknown");
        assert_eq!(order.line_items.len(), 2);
        assert_eq!(order.line_items[0].quantity, 2);
        assert_eq!(order.line_items[0].line_total(), dec("25.00"));
        assert_eq!(order.line_items[1].unit_price, Decimal::ZERO);
        assert_eq!(order.line_items[1].quantity, 3);
        assert!(order.delivery_address.is_none());
    }

    #[test]
    fn test_parse_orders_skips_non_objects() {
        let raws = parse_orders(vec![
            json!({ "_id": "a", "orderId": 1042 }),
            json!("65f1c2e9a"),
            json!(null),
            json!({ "_id": "b", "status": 3 }),
        ]);

        assert_eq!(raws.len(), 2);
        assert_eq!(raws[0].display_id.as_deref(), Some("1042"));
        assert_eq!(raws[1].status, None);
    }

    #[test]
    fn test_timestamp_formats() {
        let millis = normalize_order(raw(json!({ "_id": "a", "createdAt": 1_700_000_000_000_i64 }))).unwrap();
        assert_eq!(millis.created_at.timestamp(), 1_700_000_000);

        let naive = normalize_order(raw(json!({ "_id": "b", "createdAt": "2025-01-02T03:04:05.678" }))).unwrap();
        assert_eq!(naive.created_at.to_rfc3339(), "2025-01-02T03:04:05.678+00:00");
    }

    #[test]
    fn test_batch_drops_unaddressable_and_duplicates() {
        let orders = normalize_orders(vec![
            raw(json!({ "_id": "a", "status": "pending" })),
            raw(json!({ "status": "pending" })),
            raw(json!({ "_id": "a", "status": "delivered" })),
            raw(json!({ "orderNumber": "ORD-9" })),
        ]);

        let ids: Vec<&str> = orders.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, ["a", "ORD-9"]);
        assert_eq!(orders[0].status, OrderStatus::Pending);
    }

    #[test]
    fn test_stats_normalize_and_recompute_average() {
        let raw: RawStats = serde_json::from_value(json!({
            "totalOrders": 4,
            "totalRevenue": 100,
            "totalCustomers": "3",
            "pendingOrders": 1,
            "deliveredOrders": 2
        }))
        .unwrap();

        let stats = normalize_stats(raw);
        assert_eq!(stats.total_orders, 4);
        assert_eq!(stats.customer_count, 3);
        assert_eq!(stats.avg_order_value, dec("25"));
        assert_eq!(stats.pending_count, 1);
        assert_eq!(stats.delivered_count, 2);
    }
}
