//! Store tests that go through configuration, as the console does.
//!
//! Run with: cargo test -p orderdesk-integration-tests

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;

use orderdesk_admin::config::DataSourceMode;
use orderdesk_admin::orders::{NoticeLevel, StatusFilter};
use orderdesk_admin::{AdminConfig, AnyDataSource, OrderStore, SourceKind, StoreError};
use orderdesk_core::{OrderStatus, StatsProvenance};
use orderdesk_integration_tests::{FakeBackend, wire_order};

const TOKEN: &str = "Zk8qP2vLr9xW4mTb";

fn config(vars: &[(&str, String)]) -> AdminConfig {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(key, value)| ((*key).to_string(), value.clone()))
        .collect();
    AdminConfig::from_lookup(|key| vars.get(key).cloned()).unwrap()
}

fn open(config: &AdminConfig) -> OrderStore<AnyDataSource> {
    OrderStore::new(AnyDataSource::from_config(config).unwrap(), &config.store)
}

fn synthetic_config(count: usize) -> AdminConfig {
    config(&[
        ("ORDERDESK_DATA_SOURCE", "synthetic".to_string()),
        ("ORDERDESK_SYNTHETIC_SEED", "7".to_string()),
        ("ORDERDESK_SYNTHETIC_COUNT", count.to_string()),
        ("ORDERDESK_PAGE_SIZE", "10".to_string()),
    ])
}

// ============================================================================
// Remote mode
// ============================================================================

#[tokio::test]
async fn test_remote_mode_uses_configured_url_and_token() {
    let backend = FakeBackend::start(vec![
        wire_order("o-1", "ORD-1001", "pending", "120.00", "2025-03-01T10:00:00Z"),
        wire_order("o-2", "ORD-1002", "delivered", "80.00", "2025-03-02T10:00:00Z"),
    ])
    .await
    .unwrap();
    backend.require_token(TOKEN);

    let config = config(&[
        ("ORDERDESK_API_URL", backend.base_url().unwrap().to_string()),
        ("ORDERDESK_API_TOKEN", TOKEN.to_string()),
        ("ORDERDESK_FETCH_LIMIT", "25".to_string()),
    ]);
    let store = open(&config);
    assert_eq!(store.source_kind(), SourceKind::Remote);

    store.load().await.unwrap();

    assert_eq!(store.snapshot().await.orders.len(), 2);
    let request = backend.requests_to("/api/orders").pop().unwrap();
    assert_eq!(request.query.get("limit").map(String::as_str), Some("25"));
    assert_eq!(request.authorization, Some(format!("Bearer {TOKEN}")));
}

#[tokio::test]
async fn test_remote_failure_does_not_fall_back_to_demo_data() {
    let backend = FakeBackend::start(Vec::new()).await.unwrap();
    backend.require_token(TOKEN);

    // No token configured, so every request is refused.
    let config = config(&[("ORDERDESK_API_URL", backend.base_url().unwrap().to_string())]);
    let store = open(&config);

    let err = store.load().await.unwrap_err();

    assert!(matches!(err, StoreError::DataSource(_)));
    assert!(store.snapshot().await.orders.is_empty());
    assert_eq!(store.source_kind(), SourceKind::Remote);
}

// ============================================================================
// Synthetic mode
// ============================================================================

#[tokio::test]
async fn test_synthetic_mode_is_deterministic() {
    let config = synthetic_config(30);
    let first = open(&config);
    let second = open(&config);
    assert_eq!(first.source_kind(), SourceKind::Synthetic);

    first.load().await.unwrap();
    second.load().await.unwrap();

    let a = first.snapshot().await.orders;
    let b = second.snapshot().await.orders;
    assert_eq!(a.len(), 30);
    assert_eq!(a, b);

    let listing = first.listing().await;
    assert_eq!(listing.page.items.len(), 10);
    assert_eq!(listing.page.total_pages, 3);
}

#[tokio::test]
async fn test_forced_synthetic_mode_loads_without_backend_settings() {
    let config =
        AdminConfig::from_lookup_with_mode(|_| None, Some(DataSourceMode::Synthetic)).unwrap();
    let store = open(&config);
    assert_eq!(store.source_kind(), SourceKind::Synthetic);

    store.load().await.unwrap();

    assert!(!store.snapshot().await.orders.is_empty());
}

#[tokio::test]
async fn test_synthetic_stats_are_authoritative() {
    let store = open(&synthetic_config(30));
    store.load().await.unwrap();

    let stats = store.refresh_stats().await;

    assert_eq!(stats.provenance, StatsProvenance::Authoritative);
    assert_eq!(stats.summary.total_orders, 30);
    assert!(stats.summary.customer_count >= 1);
}

#[tokio::test]
async fn test_synthetic_bulk_update_persists_across_reloads() {
    let store = open(&synthetic_config(20));
    store.load().await.unwrap();
    store.select_all_on_page().await;
    let selected = store.selection().await.len();
    assert_eq!(selected, 10);

    let outcome = store.bulk_update_selected(OrderStatus::Cancelled).await.unwrap();
    assert_eq!(outcome.requested, 10);

    store.set_status_filter(StatusFilter::Only(OrderStatus::Cancelled)).await;
    store.load().await.unwrap();
    let cancelled = store.filtered_orders().await;
    assert!(cancelled.len() >= 10);
    assert!(cancelled.iter().all(|o| o.status == OrderStatus::Cancelled));
}

#[tokio::test]
async fn test_synthetic_outage_rolls_back_and_notifies() {
    let store = open(&synthetic_config(5));
    store.load().await.unwrap();
    let order = store.snapshot().await.orders.into_iter().next().unwrap();
    let target = if order.status == OrderStatus::Returned {
        OrderStatus::Refunded
    } else {
        OrderStatus::Returned
    };

    if let AnyDataSource::Synthetic(source) = store.source() {
        source.set_failing(true);
    }
    let err = store.update_status(&order.id, target).await.unwrap_err();

    assert!(matches!(err, StoreError::DataSource(_)));
    assert_eq!(store.order(&order.id).await.unwrap().status, order.status);
    let notice = store.notices().await.pop().unwrap();
    assert_eq!(notice.level, NoticeLevel::Error);
    assert!(notice.message.contains(&order.display_id));
}
