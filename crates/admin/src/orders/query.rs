//! Filtering and sorting of the order collection.
//!
//! Everything here is a pure function of its inputs: the same orders, criteria
//! and sort spec always give the same ordering, and inputs are never mutated.
//! Sorting is stable, so orders with equal keys keep their original relative
//! order.

use std::cmp::Ordering;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use orderdesk_core::{Order, OrderStatus, ParseEnumError};
use serde::{Deserialize, Serialize};

// =============================================================================
// Filter Criteria
// =============================================================================

/// Status axis of the filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    #[default]
    All,
    Only(OrderStatus),
}

impl StatusFilter {
    /// Whether `status` passes this filter.
    #[must_use]
    pub fn accepts(self, status: OrderStatus) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => wanted == status,
        }
    }

    /// Status to send to the backend as a server-side hint.
    #[must_use]
    pub const fn as_status(self) -> Option<OrderStatus> {
        match self {
            Self::All => None,
            Self::Only(status) => Some(status),
        }
    }
}

impl FromStr for StatusFilter {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        s.parse().map(Self::Only)
    }
}

/// Inclusive creation-time window. Either bound may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DateRange {
    /// Whether `at` falls inside the window.
    #[must_use]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start.is_none_or(|start| at >= start) && self.end.is_none_or(|end| at <= end)
    }
}

/// Which orders to show. All three axes must match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub status: StatusFilter,
    /// Case-insensitive substring over display id, customer name, id and phone.
    pub search_term: String,
    pub date_range: DateRange,
}

impl FilterCriteria {
    /// Whether `order` passes every axis of the filter.
    #[must_use]
    pub fn matches(&self, order: &Order) -> bool {
        Matcher::new(self).matches(order)
    }
}

/// Criteria with the search needle normalized once.
struct Matcher<'a> {
    criteria: &'a FilterCriteria,
    needle: String,
}

impl<'a> Matcher<'a> {
    fn new(criteria: &'a FilterCriteria) -> Self {
        Self {
            criteria,
            needle: criteria.search_term.trim().to_lowercase(),
        }
    }

    fn matches(&self, order: &Order) -> bool {
        self.criteria.status.accepts(order.status)
            && self.matches_search(order)
            && self.criteria.date_range.contains(order.created_at)
    }

    fn matches_search(&self, order: &Order) -> bool {
        if self.needle.is_empty() {
            return true;
        }
        [
            order.display_id.as_str(),
            order.customer.name.as_str(),
            order.customer.id.as_str(),
            order.customer.phone.as_str(),
        ]
        .into_iter()
        .any(|field| field.to_lowercase().contains(&self.needle))
    }
}

// =============================================================================
// Sort Spec
// =============================================================================

/// Sortable column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    Date,
    Amount,
    Status,
    DisplayId,
}

impl SortField {
    /// Parse a URL or CLI style sort key. Unknown keys yield `None`.
    #[must_use]
    pub fn from_param(param: &str) -> Option<Self> {
        match param.trim().to_ascii_lowercase().as_str() {
            "date" | "createdat" | "created_at" | "created" => Some(Self::Date),
            "amount" | "total" | "totalamount" | "total_amount" => Some(Self::Amount),
            "status" => Some(Self::Status),
            "displayid" | "display_id" | "id" | "order" | "orderid" => Some(Self::DisplayId),
            _ => None,
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    /// Parse `asc`/`desc`. Unknown values yield `None`.
    #[must_use]
    pub fn from_param(param: &str) -> Option<Self> {
        match param.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Some(Self::Asc),
            "desc" | "descending" => Some(Self::Desc),
            _ => None,
        }
    }
}

/// Sort order for the listing. Defaults to newest first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortSpec {
    #[must_use]
    pub const fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    /// Build a spec from loose parameters.
    ///
    /// An unknown field falls back to the default spec (date, descending)
    /// whatever the direction says. An unknown direction on a known field
    /// means descending.
    #[must_use]
    pub fn from_params(field: &str, direction: &str) -> Self {
        SortField::from_param(field).map_or_else(Self::default, |field| Self {
            field,
            direction: SortDirection::from_param(direction).unwrap_or_default(),
        })
    }

    /// Compare two orders under this spec.
    #[must_use]
    pub fn compare(&self, a: &Order, b: &Order) -> Ordering {
        let ordering = match self.field {
            SortField::Date => a.created_at.cmp(&b.created_at),
            SortField::Amount => a.total_amount.cmp(&b.total_amount),
            SortField::Status => a.status.as_str().cmp(b.status.as_str()),
            SortField::DisplayId => a.display_id.cmp(&b.display_id),
        };
        match self.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

// =============================================================================
// Pipeline
// =============================================================================

/// Filter then stably sort, borrowing from `orders`.
#[must_use]
pub fn filter_sort_refs<'a>(
    orders: &'a [Order],
    criteria: &FilterCriteria,
    sort: &SortSpec,
) -> Vec<&'a Order> {
    let matcher = Matcher::new(criteria);
    let mut view: Vec<&Order> = orders.iter().filter(|o| matcher.matches(o)).collect();
    // slice::sort_by is stable
    view.sort_by(|a, b| sort.compare(a, b));
    view
}

/// Filter then stably sort into an owned list.
#[must_use]
pub fn filter_sort(orders: &[Order], criteria: &FilterCriteria, sort: &SortSpec) -> Vec<Order> {
    filter_sort_refs(orders, criteria, sort)
        .into_iter()
        .cloned()
        .collect()
}
