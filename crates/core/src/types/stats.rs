//! Aggregate order statistics.
//!
//! Statistics come in two strengths. The backend's aggregate endpoint covers the
//! whole dataset. When it is unreachable the console derives the same figures from
//! the orders it has loaded, which only describes that one page. [`Stats`]
//! carries which of the two a caller is looking at.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Headline order metrics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
    pub total_orders: u64,
    pub total_revenue: Decimal,
    pub customer_count: u64,
    pub avg_order_value: Decimal,
    /// Orders not yet delivered or cancelled.
    pub pending_count: u64,
    pub delivered_count: u64,
}

/// Where a [`StatsSummary`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum StatsProvenance {
    /// Reported by the backend for the whole dataset.
    Authoritative,
    /// Computed locally from the loaded page only.
    Derived {
        /// Number of orders the figures were computed from.
        page_orders: u64,
    },
}

/// A summary together with its provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub summary: StatsSummary,
    pub provenance: StatsProvenance,
}

impl Stats {
    /// Wrap a summary reported by the backend.
    #[must_use]
    pub const fn authoritative(summary: StatsSummary) -> Self {
        Self {
            summary,
            provenance: StatsProvenance::Authoritative,
        }
    }

    /// Wrap a summary computed from `page_orders` locally loaded orders.
    #[must_use]
    pub const fn derived(summary: StatsSummary, page_orders: u64) -> Self {
        Self {
            summary,
            provenance: StatsProvenance::Derived { page_orders },
        }
    }

    /// Whether these figures describe the whole dataset.
    #[must_use]
    pub const fn is_authoritative(&self) -> bool {
        matches!(self.provenance, StatsProvenance::Authoritative)
    }
}
