//! Order commands.
//!
//! Each command builds a store over the configured data source, loads the
//! requested server page and runs a single store operation.

use std::path::Path;

use orderdesk_admin::orders::{NoticeLevel, OrderListing};
use orderdesk_admin::{AdminConfig, AnyDataSource, OrderStore};
use orderdesk_core::{
    Order, OrderPatch, OrderStatus, PaymentMethod, Stats, StatsProvenance, StepState,
    progress_timeline,
};

use super::{CommandError, QueryArgs, open_store, resolve_order};

/// Print the requested page of the filtered listing.
pub async fn list(
    config: &AdminConfig,
    query: &QueryArgs,
    page: usize,
    json: bool,
) -> Result<(), CommandError> {
    let store = open_store(config)?;
    query.apply(&store).await?;
    store.set_page(page).await;

    let listing = store.listing().await;
    if json {
        print_json(&listing)?;
    } else {
        print_listing(&listing);
    }
    print_notices(&store).await;
    Ok(())
}

/// Print one order with its progress timeline.
pub async fn show(config: &AdminConfig, key: &str) -> Result<(), CommandError> {
    let store = loaded_store(config).await?;
    let id = resolve_order(&store, key).await?;
    let order = store
        .order(&id)
        .await
        .ok_or_else(|| CommandError::UnknownOrder(key.to_string()))?;
    print_order(&order);
    Ok(())
}

/// Print headline metrics.
pub async fn stats(config: &AdminConfig) -> Result<(), CommandError> {
    let store = loaded_store(config).await?;
    let stats = store.refresh_stats().await;
    print_stats(&stats);
    Ok(())
}

/// Change one order's status.
pub async fn set_status(
    config: &AdminConfig,
    key: &str,
    status: OrderStatus,
) -> Result<(), CommandError> {
    let store = loaded_store(config).await?;
    let id = resolve_order(&store, key).await?;
    store.update_status(&id, status).await?;
    tracing::info!(order = key, status = %status, "Order status updated");
    Ok(())
}

/// Change an order's status and/or payment method.
pub async fn edit(
    config: &AdminConfig,
    key: &str,
    status: Option<OrderStatus>,
    payment_method: Option<PaymentMethod>,
) -> Result<(), CommandError> {
    let store = loaded_store(config).await?;
    let id = resolve_order(&store, key).await?;
    store
        .update_order(
            &id,
            OrderPatch {
                status,
                payment_method,
            },
        )
        .await?;
    tracing::info!(order = key, "Order updated");
    Ok(())
}

/// Set the status of several orders in one request.
pub async fn bulk_status(
    config: &AdminConfig,
    status: OrderStatus,
    keys: &[String],
) -> Result<(), CommandError> {
    let store = loaded_store(config).await?;
    let mut ids = Vec::with_capacity(keys.len());
    for key in keys {
        ids.push(resolve_order(&store, key).await?);
    }

    let result = store.bulk_update_status(ids, status).await;
    print_notices(&store).await;
    let outcome = result?;

    #[allow(clippy::print_stdout)]
    {
        println!(
            "Updated {} of {} orders to {status}",
            outcome.modified_count, outcome.requested
        );
    }
    Ok(())
}

/// Write the filtered list as CSV into `dir`.
pub async fn export(config: &AdminConfig, query: &QueryArgs, dir: &Path) -> Result<(), CommandError> {
    let store = open_store(config)?;
    query.apply(&store).await?;

    let today = chrono::Local::now().date_naive();
    let result = store.export(today).await;
    print_notices(&store).await;
    let path = result?.write_to(dir).await?;

    #[allow(clippy::print_stdout)]
    {
        println!("{}", path.display());
    }
    Ok(())
}

async fn loaded_store(config: &AdminConfig) -> Result<OrderStore<AnyDataSource>, CommandError> {
    let store = open_store(config)?;
    store.load().await?;
    Ok(store)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), CommandError> {
    let json = serde_json::to_string_pretty(value)?;
    #[allow(clippy::print_stdout)]
    {
        println!("{json}");
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_listing(listing: &OrderListing) {
    let page = &listing.page;
    if page.items.is_empty() {
        println!("No orders");
        return;
    }

    println!(
        "{:<12} {:<20} {:<18} {:>10} {:<17} {:<7}",
        "ORDER", "CUSTOMER", "STATUS", "TOTAL", "CREATED", "PAYMENT"
    );
    for order in &page.items {
        println!(
            "{:<12} {:<20} {:<18} {:>10} {:<17} {:<7}",
            order.display_id,
            truncate(&order.customer.name, 20),
            order.status.to_string(),
            format!("{:.2}", order.total_amount),
            order.created_at.format("%Y-%m-%d %H:%M"),
            order.payment_method.to_string(),
        );
    }
    if page.show_controls() {
        println!(
            "Page {} of {} ({} orders)",
            page.page, page.total_pages, page.total_items
        );
    }
}

#[allow(clippy::print_stdout)]
fn print_order(order: &Order) {
    println!("{} ({})", order.display_id, order.id);
    println!("  Status:   {}", order.status);
    println!("  Placed:   {}", order.created_at.format("%Y-%m-%d %H:%M UTC"));
    println!("  Customer: {} [{}] {}", order.customer.name, order.customer.id, order.customer.phone);
    if let Some(address) = &order.delivery_address {
        println!("  Deliver:  {}", address.one_line());
    }
    println!("  Payment:  {}", order.payment_method);

    println!("  Items:");
    for item in &order.line_items {
        println!(
            "    {} x{} @ {:.2} = {:.2}",
            item.name,
            item.quantity,
            item.unit_price,
            item.line_total()
        );
    }
    println!(
        "  Subtotal {:.2} + tax {:.2} + shipping {:.2} = {:.2}",
        order.subtotal, order.tax, order.shipping, order.total_amount
    );
    if !order.amounts_consistent() {
        println!("  (amounts reported by the backend do not add up)");
    }

    if let Some(steps) = progress_timeline(order.status) {
        let rendered: Vec<String> = steps
            .iter()
            .map(|step| match step.state {
                StepState::Completed => format!("[x] {}", step.status),
                StepState::Current => format!("[>] {}", step.status),
                StepState::Upcoming => format!("[ ] {}", step.status),
            })
            .collect();
        println!("  Progress: {}", rendered.join("  "));
    }
}

#[allow(clippy::print_stdout)]
fn print_stats(stats: &Stats) {
    let summary = &stats.summary;
    match stats.provenance {
        StatsProvenance::Authoritative => println!("Order statistics (all orders)"),
        StatsProvenance::Derived { page_orders } => {
            println!("Order statistics (estimated from {page_orders} loaded orders only)");
        }
    }
    println!("  Orders:          {}", summary.total_orders);
    println!("  Revenue:         {:.2}", summary.total_revenue);
    println!("  Customers:       {}", summary.customer_count);
    println!("  Avg order value: {:.2}", summary.avg_order_value);
    println!("  Pending:         {}", summary.pending_count);
    println!("  Delivered:       {}", summary.delivered_count);
}

async fn print_notices(store: &OrderStore<AnyDataSource>) {
    for notice in store.notices().await {
        match notice.level {
            NoticeLevel::Info => tracing::info!("{}", notice.message),
            NoticeLevel::Warning => tracing::warn!("{}", notice.message),
            NoticeLevel::Error => tracing::error!("{}", notice.message),
        }
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}
