//! Deterministic in-memory data source for demo mode and tests.
//!
//! Orders are generated once from a seeded [`StdRng`], so the same seed always
//! produces the same batch. Mutations are applied to the in-memory batch and
//! show up on the next fetch, which makes the source behave like a small
//! backend rather than a static fixture.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, TimeDelta, Utc};
use orderdesk_core::{
    Address, CustomerId, CustomerSnapshot, LineItem, Order, OrderId, OrderPatch, OrderStatus,
    PaymentMethod, StatsSummary,
};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use tracing::instrument;

use super::{BulkUpdateResponse, DataSource, DataSourceError, FetchRequest, SourceKind};
use crate::config::SyntheticConfig;
use crate::orders::stats::summarize;

/// 2025-01-01T00:00:00Z. Generated orders are spread over the 30 days before it.
const BASE_TIMESTAMP_SECS: i64 = 1_735_689_600;
const FIRST_DISPLAY_NUMBER: usize = 1000;

/// (name, phone, city)
const CUSTOMERS: [(&str, &str, &str); 8] = [
    ("Aarav Sharma", "9876543200", "Mumbai"),
    ("Priya Nair", "9123456780", "Kochi"),
    ("Rohan Mehta", "9988776655", "Pune"),
    ("Ananya Iyer", "9845012345", "Chennai"),
    ("Vikram Singh", "9811122233", "Delhi"),
    ("Meera Joshi", "9000011111", "Jaipur"),
    ("Kabir Das", "9555566666", "Kolkata"),
    ("Sara Thomas", "9444433333", "Bengaluru"),
];

/// (name, category, unit price in paise)
const CATALOG: [(&str, &str, i64); 8] = [
    ("Masala Chai", "Beverages", 4_500),
    ("Paneer Wrap", "Meals", 18_900),
    ("Veg Biryani", "Meals", 24_900),
    ("Mango Lassi", "Beverages", 8_900),
    ("Samosa (2 pc)", "Snacks", 6_000),
    ("Gulab Jamun", "Desserts", 9_900),
    ("Cold Coffee", "Beverages", 12_900),
    ("Masala Dosa", "Meals", 14_900),
];

const PAYMENT_METHODS: [PaymentMethod; 4] = [
    PaymentMethod::Cash,
    PaymentMethod::Wallet,
    PaymentMethod::Card,
    PaymentMethod::Upi,
];

/// In-memory order backend seeded from a fixed RNG.
#[derive(Clone)]
pub struct SyntheticDataSource {
    inner: Arc<SyntheticInner>,
}

struct SyntheticInner {
    orders: Mutex<Vec<Order>>,
    failing: AtomicBool,
}

impl SyntheticDataSource {
    /// Generate a batch from configuration.
    #[must_use]
    pub fn new(config: &SyntheticConfig) -> Self {
        Self::with_orders(generate_orders(config.seed, config.count))
    }

    /// Serve an explicit set of orders.
    #[must_use]
    pub fn with_orders(orders: Vec<Order>) -> Self {
        Self {
            inner: Arc::new(SyntheticInner {
                orders: Mutex::new(orders),
                failing: AtomicBool::new(false),
            }),
        }
    }

    /// Make every subsequent call fail with [`DataSourceError::Unavailable`].
    pub fn set_failing(&self, failing: bool) {
        self.inner.failing.store(failing, Ordering::SeqCst);
    }

    /// Snapshot of the backend's current orders.
    #[must_use]
    pub fn orders(&self) -> Vec<Order> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Order>> {
        self.inner
            .orders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn check_available(&self) -> Result<(), DataSourceError> {
        if self.inner.failing.load(Ordering::SeqCst) {
            return Err(DataSourceError::Unavailable(
                "synthetic source is in failing mode".to_string(),
            ));
        }
        Ok(())
    }

    fn apply(&self, id: &OrderId, patch: &OrderPatch) -> Result<(), DataSourceError> {
        self.check_available()?;
        let mut orders = self.lock();
        let order = orders
            .iter_mut()
            .find(|o| &o.id == id)
            .ok_or_else(|| DataSourceError::NotFound(format!("order {id}")))?;
        order.apply_patch(patch);
        Ok(())
    }
}

impl DataSource for SyntheticDataSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Synthetic
    }

    #[instrument(skip(self), fields(page = request.page, limit = request.limit))]
    async fn fetch_orders(&self, request: &FetchRequest) -> Result<Vec<Order>, DataSourceError> {
        self.check_available()?;

        let mut orders: Vec<Order> = self
            .lock()
            .iter()
            .filter(|o| request.status.is_none_or(|status| o.status == status))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let limit = request.limit.max(1) as usize;
        let skip = (request.page.max(1) as usize - 1) * limit;
        Ok(orders.into_iter().skip(skip).take(limit).collect())
    }

    #[instrument(skip(self))]
    async fn fetch_order_stats(&self) -> Result<StatsSummary, DataSourceError> {
        self.check_available()?;
        Ok(summarize(&self.lock()))
    }

    #[instrument(skip(self), fields(order_id = %id, status = %status.as_str()))]
    async fn update_order_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
    ) -> Result<(), DataSourceError> {
        self.apply(id, &OrderPatch::status(status))
    }

    #[instrument(skip(self), fields(order_id = %id))]
    async fn update_order(&self, id: &OrderId, patch: &OrderPatch) -> Result<(), DataSourceError> {
        self.apply(id, patch)
    }

    #[instrument(skip(self, ids), fields(count = ids.len(), status = %status.as_str()))]
    async fn bulk_update_status(
        &self,
        ids: &[OrderId],
        status: OrderStatus,
    ) -> Result<BulkUpdateResponse, DataSourceError> {
        self.check_available()?;

        let mut modified_count = 0;
        for order in self.lock().iter_mut() {
            if ids.contains(&order.id) && order.status != status {
                order.status = status;
                modified_count += 1;
            }
        }

        Ok(BulkUpdateResponse { modified_count })
    }
}

/// Generate `count` reproducible orders from `seed`.
#[must_use]
pub fn generate_orders(seed: u64, count: usize) -> Vec<Order> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count).map(|index| generate_order(&mut rng, index)).collect()
}

fn generate_order(rng: &mut StdRng, index: usize) -> Order {
    let id = uuid::Builder::from_random_bytes(rng.random()).into_uuid();

    let customer_index = rng.random_range(0..CUSTOMERS.len());
    let (name, phone, city) = CUSTOMERS
        .get(customer_index)
        .copied()
        .unwrap_or(("Unknown", "", ""));
    let address = Address {
        line1: Some(format!("{} Market Road", rng.random_range(1..200))),
        city: Some(city.to_string()),
        country: Some("IN".to_string()),
        ..Address::default()
    };

    let mut line_items = Vec::new();
    for _ in 0..rng.random_range(1..=3) {
        if let Some(&(name, category, paise)) = CATALOG.choose(rng) {
            line_items.push(LineItem {
                name: name.to_string(),
                category: category.to_string(),
                unit_price: Decimal::new(paise, 2),
                quantity: rng.random_range(1..=3),
            });
        }
    }

    let subtotal: Decimal = line_items.iter().map(LineItem::line_total).sum();
    let tax = (subtotal * Decimal::new(5, 2)).round_dp(2);
    let shipping = if subtotal >= Decimal::new(500, 0) {
        Decimal::ZERO
    } else {
        Decimal::new(40, 0)
    };

    let minutes_ago = rng.random_range(0..30 * 24 * 60);
    let created_at =
        DateTime::<Utc>::UNIX_EPOCH + TimeDelta::seconds(BASE_TIMESTAMP_SECS - minutes_ago * 60);

    Order {
        id: OrderId::new(id.to_string()),
        display_id: format!("ORD-{}", FIRST_DISPLAY_NUMBER + index),
        status: *OrderStatus::ALL
            .choose(rng)
            .unwrap_or(&OrderStatus::OrderConfirmed),
        total_amount: subtotal + tax + shipping,
        subtotal,
        tax,
        shipping,
        created_at,
        payment_method: *PAYMENT_METHODS.choose(rng).unwrap_or(&PaymentMethod::Cash),
        customer: CustomerSnapshot {
            id: CustomerId::new(format!("cust-{:03}", customer_index + 1)),
            name: name.to_string(),
            phone: phone.to_string(),
            email: Some(format!(
                "{}@example.com",
                name.to_lowercase().replace(' ', ".")
            )),
            address: Some(address.clone()),
        },
        line_items,
        delivery_address: Some(address),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn request(page: u32, limit: u32) -> FetchRequest {
        FetchRequest {
            page,
            limit,
            status: None,
        }
    }

    #[test]
    fn test_generation_is_deterministic() {
        let a = generate_orders(7, 10);
        let b = generate_orders(7, 10);
        assert_eq!(a, b);
        assert_ne!(a, generate_orders(8, 10));
    }

    #[test]
    fn test_generated_orders_are_well_formed() {
        let orders = generate_orders(42, 25);
        assert_eq!(orders.len(), 25);
        assert_eq!(orders.first().unwrap().display_id, "ORD-1000");

        let mut ids: Vec<_> = orders.iter().map(|o| o.id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 25);

        for order in &orders {
            assert!(!order.line_items.is_empty());
            assert!(order.line_items.iter().all(|item| item.quantity >= 1));
            assert!(order.amounts_consistent());
        }
    }

    #[tokio::test]
    async fn test_fetch_pages_newest_first() {
        let source = SyntheticDataSource::new(&SyntheticConfig { seed: 1, count: 25 });

        let first = source.fetch_orders(&request(1, 10)).await.unwrap();
        let third = source.fetch_orders(&request(3, 10)).await.unwrap();
        let beyond = source.fetch_orders(&request(4, 10)).await.unwrap();

        assert_eq!(first.len(), 10);
        assert_eq!(third.len(), 5);
        assert!(beyond.is_empty());
        assert!(first.windows(2).all(|w| w[0].created_at >= w[1].created_at));
    }

    #[tokio::test]
    async fn test_fetch_honours_status_hint() {
        let source = SyntheticDataSource::new(&SyntheticConfig::default());
        let request = FetchRequest {
            page: 1,
            limit: 100,
            status: Some(OrderStatus::Delivered),
        };

        let orders = source.fetch_orders(&request).await.unwrap();
        let expected = source
            .orders()
            .iter()
            .filter(|o| o.status == OrderStatus::Delivered)
            .count();
        assert_eq!(orders.len(), expected);
        assert!(orders.iter().all(|o| o.status == OrderStatus::Delivered));
    }

    #[tokio::test]
    async fn test_mutations_are_visible_on_refetch() {
        let source = SyntheticDataSource::new(&SyntheticConfig::default());
        let id = source.orders().first().unwrap().id.clone();

        source
            .update_order(
                &id,
                &OrderPatch {
                    status: Some(OrderStatus::Refunded),
                    payment_method: Some(PaymentMethod::Upi),
                },
            )
            .await
            .unwrap();

        let order = source.orders().into_iter().find(|o| o.id == id).unwrap();
        assert_eq!(order.status, OrderStatus::Refunded);
        assert_eq!(order.payment_method, PaymentMethod::Upi);
    }

    #[tokio::test]
    async fn test_bulk_update_counts_modified_orders() {
        let source = SyntheticDataSource::new(&SyntheticConfig::default());
        let orders = source.orders();
        let ids: Vec<_> = orders.iter().take(3).map(|o| o.id.clone()).collect();
        let already = orders
            .iter()
            .take(3)
            .filter(|o| o.status == OrderStatus::Shipped)
            .count() as u64;

        let response = source
            .bulk_update_status(&ids, OrderStatus::Shipped)
            .await
            .unwrap();

        assert_eq!(response.modified_count, 3 - already);
        assert!(
            source
                .orders()
                .iter()
                .filter(|o| ids.contains(&o.id))
                .all(|o| o.status == OrderStatus::Shipped)
        );
    }

    #[tokio::test]
    async fn test_unknown_order_is_not_found() {
        let source = SyntheticDataSource::with_orders(Vec::new());
        let result = source
            .update_order_status(&OrderId::new("missing"), OrderStatus::Packed)
            .await;
        assert!(matches!(result, Err(DataSourceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_failing_mode() {
        let source = SyntheticDataSource::new(&SyntheticConfig::default());
        source.set_failing(true);
        assert!(matches!(
            source.fetch_orders(&request(1, 10)).await,
            Err(DataSourceError::Unavailable(_))
        ));
        assert!(source.fetch_order_stats().await.is_err());

        source.set_failing(false);
        assert!(source.fetch_order_stats().await.is_ok());
    }
}
