//! Statistics derived from a loaded set of orders.
//!
//! Used when the backend's aggregate endpoint is unreachable. The result only
//! describes the orders passed in, which for the store is a single page.

use std::collections::HashSet;

use orderdesk_core::{Order, OrderStatus, StatsSummary};
use rust_decimal::Decimal;

/// Compute headline metrics from `orders`.
///
/// - revenue: sum of `total_amount`
/// - customers: distinct customer ids
/// - pending: status is neither delivered nor cancelled
/// - delivered: status is delivered
#[must_use]
pub fn summarize(orders: &[Order]) -> StatsSummary {
    let total_orders = orders.len() as u64;
    let total_revenue: Decimal = orders.iter().map(|o| o.total_amount).sum();
    let customer_count = orders
        .iter()
        .map(|o| &o.customer.id)
        .collect::<HashSet<_>>()
        .len() as u64;
    let pending_count = orders.iter().filter(|o| o.status.is_pending_work()).count() as u64;
    let delivered_count = orders
        .iter()
        .filter(|o| o.status == OrderStatus::Delivered)
        .count() as u64;

    StatsSummary {
        total_orders,
        total_revenue,
        customer_count,
        avg_order_value: average(total_revenue, total_orders),
        pending_count,
        delivered_count,
    }
}

/// Average order value rounded to 2 decimal places, `0` when there are no orders.
#[must_use]
pub fn average(total_revenue: Decimal, total_orders: u64) -> Decimal {
    if total_orders == 0 {
        return Decimal::ZERO;
    }
    (total_revenue / Decimal::from(total_orders)).round_dp(2)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::source::synthetic::generate_orders;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_empty_summary() {
        let summary = summarize(&[]);
        assert_eq!(summary, StatsSummary::default());
    }

    #[test]
    fn test_average_rounds() {
        assert_eq!(average(dec("10"), 3), dec("3.33"));
        assert_eq!(average(dec("10"), 0), Decimal::ZERO);
    }

    #[test]
    fn test_summary_counts() {
        let mut orders = generate_orders(3, 6);
        let statuses = [
            OrderStatus::Delivered,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
            OrderStatus::Pending,
            OrderStatus::Shipped,
            OrderStatus::Refunded,
        ];
        for (order, status) in orders.iter_mut().zip(statuses) {
            order.status = status;
            order.total_amount = dec("100.00");
        }
        orders[0].customer.id = "c1".into();
        orders[1].customer.id = "c1".into();
        orders[2].customer.id = "c2".into();
        orders[3].customer.id = "c2".into();
        orders[4].customer.id = "c3".into();
        orders[5].customer.id = "c3".into();

        let summary = summarize(&orders);

        assert_eq!(summary.total_orders, 6);
        assert_eq!(summary.total_revenue, dec("600.00"));
        assert_eq!(summary.customer_count, 3);
        assert_eq!(summary.avg_order_value, dec("100.00"));
        // pending, shipped, refunded
        assert_eq!(summary.pending_count, 3);
        assert_eq!(summary.delivered_count, 2);
    }
}
