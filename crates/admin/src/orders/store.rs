//! The order store.
//!
//! [`OrderStore`] owns the working set of orders, the stats, the selection and
//! the notices. It is the only thing that mutates them. Everything a caller
//! renders comes from read views recomputed on demand from [`OrderState`].
//!
//! # Mutation policy
//!
//! - Single-order updates are optimistic: the local order changes first, and
//!   the previous values are restored if the request fails. A reload applied
//!   while the request was in flight wins over the restore.
//! - Bulk updates are optimistic for every requested order and are *not*
//!   rolled back on failure. The backend only reports a modified count, not
//!   which orders changed, so the local view stays all-or-nothing until the
//!   reload that always follows.
//! - At most one bulk update or reload runs at a time. A reload requested
//!   while busy is skipped, not queued.
//! - Each load is tagged with a generation. A response is applied only if no
//!   newer load or server-side criteria change happened while it was in flight.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, NaiveDate, Utc};
use orderdesk_core::{Order, OrderId, OrderPatch, OrderStatus, Stats};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use super::export::{CsvExport, export_csv};
use super::notice::{Notice, NoticeLevel, Notices};
use super::pagination::{Page, paginate};
use super::query::{DateRange, FilterCriteria, SortSpec, StatusFilter, filter_sort};
use super::selection::SelectionSet;
use super::stats::summarize;
use crate::config::StoreConfig;
use crate::error::{ExportError, StoreError};
use crate::source::{DataSource, DataSourceError, FetchRequest, SourceKind};

/// Everything the store knows, as one serializable value.
#[derive(Debug, Clone, Serialize)]
pub struct OrderState {
    /// One server page of orders. Ids are unique.
    pub orders: Vec<Order>,
    pub criteria: FilterCriteria,
    pub sort: SortSpec,
    /// 1-based client-side page.
    pub page: usize,
    pub page_size: usize,
    /// 1-based page requested from the backend.
    pub server_page: u32,
    pub selection: SelectionSet,
    pub stats: Option<Stats>,
    pub notices: Notices,
    /// Whether a bulk update or reload was in flight when the snapshot was taken.
    pub busy: bool,
    /// Generation of the most recently issued load.
    pub generation: u64,
    /// Number of load responses applied to `orders`.
    pub revision: u64,
    pub last_loaded_at: Option<DateTime<Utc>>,
}

impl OrderState {
    fn new(page_size: usize) -> Self {
        Self {
            orders: Vec::new(),
            criteria: FilterCriteria::default(),
            sort: SortSpec::default(),
            page: 1,
            page_size: page_size.max(1),
            server_page: 1,
            selection: SelectionSet::new(),
            stats: None,
            notices: Notices::default(),
            busy: false,
            generation: 0,
            revision: 0,
            last_loaded_at: None,
        }
    }

    fn filtered(&self) -> Vec<Order> {
        filter_sort(&self.orders, &self.criteria, &self.sort)
    }

    fn order_mut(&mut self, id: &OrderId) -> Option<&mut Order> {
        self.orders.iter_mut().find(|order| &order.id == id)
    }

    /// Advance the generation so any in-flight load is discarded.
    const fn invalidate_loads(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }
}

/// Result of [`OrderStore::load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The response replaced the collection.
    Applied { count: usize },
    /// Another bulk update or reload was in flight; nothing was requested.
    Skipped,
    /// A newer load or criteria change superseded this one; the response was discarded.
    Stale,
}

/// Result of a successful bulk status update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkOutcome {
    /// Distinct orders in the request.
    pub requested: usize,
    /// Orders the backend reports as changed.
    pub modified_count: u64,
}

/// The visible page of the listing.
#[derive(Debug, Clone, Serialize)]
pub struct OrderListing {
    pub page: Page<Order>,
    pub criteria: FilterCriteria,
    pub sort: SortSpec,
    /// Selected orders, on any page.
    pub selected: usize,
}

/// Holds the busy flag for as long as it lives.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Owner of the order collection and mediator of every mutation.
pub struct OrderStore<D> {
    source: D,
    fetch_limit: u32,
    state: RwLock<OrderState>,
    busy: AtomicBool,
}

impl<D: DataSource> OrderStore<D> {
    #[must_use]
    pub fn new(source: D, config: &StoreConfig) -> Self {
        Self {
            source,
            fetch_limit: config.fetch_limit.max(1),
            state: RwLock::new(OrderState::new(config.page_size)),
            busy: AtomicBool::new(false),
        }
    }

    /// The underlying data source.
    pub const fn source(&self) -> &D {
        &self.source
    }

    pub fn source_kind(&self) -> SourceKind {
        self.source.kind()
    }

    /// Whether a bulk update or reload is in flight.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Reload the current server page.
    ///
    /// Skipped when another bulk update or reload is in flight. On failure the
    /// previous collection is kept and a warning notice is recorded.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DataSource`] if the fetch fails and the load was
    /// still current.
    pub async fn load(&self) -> Result<LoadOutcome, StoreError> {
        let Some(_busy) = BusyGuard::acquire(&self.busy) else {
            debug!("Load skipped, store is busy");
            return Ok(LoadOutcome::Skipped);
        };
        self.load_current().await
    }

    #[instrument(skip(self))]
    async fn load_current(&self) -> Result<LoadOutcome, StoreError> {
        let (generation, request) = {
            let mut state = self.state.write().await;
            let generation = state.invalidate_loads();
            let request = FetchRequest {
                page: state.server_page,
                limit: self.fetch_limit,
                status: state.criteria.status.as_status(),
            };
            (generation, request)
        };

        let result = self.source.fetch_orders(&request).await;

        let mut state = self.state.write().await;
        if state.generation != generation {
            debug!(
                generation,
                latest = state.generation,
                "Discarding superseded load"
            );
            return Ok(LoadOutcome::Stale);
        }

        match result {
            Ok(orders) => {
                let count = orders.len();
                state.orders = orders;
                state.revision += 1;
                state.last_loaded_at = Some(Utc::now());
                info!(count, generation, source = %self.source.kind(), "Orders loaded");
                Ok(LoadOutcome::Applied { count })
            }
            Err(e) => {
                warn!(error = %e, generation, "Failed to load orders, keeping previous data");
                state
                    .notices
                    .push(NoticeLevel::Warning, format!("Could not load orders: {e}"));
                Err(e.into())
            }
        }
    }

    /// Fetch dataset-wide stats, deriving them from the loaded page on failure.
    #[instrument(skip(self))]
    pub async fn refresh_stats(&self) -> Stats {
        let stats = match self.source.fetch_order_stats().await {
            Ok(summary) => Stats::authoritative(summary),
            Err(e) => {
                let state = self.state.read().await;
                warn!(
                    error = %e,
                    page_orders = state.orders.len(),
                    "Stats endpoint failed, deriving from loaded page"
                );
                Stats::derived(summarize(&state.orders), state.orders.len() as u64)
            }
        };

        self.state.write().await.stats = Some(stats.clone());
        stats
    }

    // =========================================================================
    // Single-order updates
    // =========================================================================

    /// Set one order's status, restoring the previous status on failure.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::OrderNotFound`] if the order is not loaded, or
    /// [`StoreError::DataSource`] if the request fails.
    #[instrument(skip(self), fields(order_id = %id, status = %status.as_str()))]
    pub async fn update_status(&self, id: &OrderId, status: OrderStatus) -> Result<(), StoreError> {
        self.apply_optimistic(id, &OrderPatch::status(status), || {
            self.source.update_order_status(id, status)
        })
        .await
    }

    /// Update several fields of one order, restoring them all on failure.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::EmptyPatch`] for a patch that changes nothing,
    /// [`StoreError::OrderNotFound`] if the order is not loaded, or
    /// [`StoreError::DataSource`] if the request fails.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn update_order(&self, id: &OrderId, patch: OrderPatch) -> Result<(), StoreError> {
        self.apply_optimistic(id, &patch, || self.source.update_order(id, &patch))
            .await
    }

    /// Apply `patch` locally, run `send`, and restore the previous values if
    /// it fails.
    async fn apply_optimistic<F, Fut>(
        &self,
        id: &OrderId,
        patch: &OrderPatch,
        send: F,
    ) -> Result<(), StoreError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), DataSourceError>>,
    {
        if patch.is_empty() {
            return Err(StoreError::EmptyPatch);
        }

        let (previous, display_id, revision) = {
            let mut state = self.state.write().await;
            let revision = state.revision;
            let order = state
                .order_mut(id)
                .ok_or_else(|| StoreError::OrderNotFound(id.clone()))?;
            (order.apply_patch(patch), order.display_id.clone(), revision)
        };

        let Err(e) = send().await else {
            debug!(display_id = %display_id, "Order updated");
            return Ok(());
        };

        let mut state = self.state.write().await;
        if state.revision == revision {
            warn!(error = %e, display_id = %display_id, "Order update failed, rolling back");
            if let Some(order) = state.order_mut(id) {
                order.apply_patch(&previous);
            }
        } else {
            // A reload landed while the request was in flight and already
            // holds the backend's values.
            warn!(
                error = %e,
                display_id = %display_id,
                "Order update failed after a reload, keeping reloaded values"
            );
        }
        state.notices.push(
            NoticeLevel::Error,
            format!("Failed to update order {display_id}: {e}"),
        );
        Err(e.into())
    }

    // =========================================================================
    // Bulk updates
    // =========================================================================

    /// Set the status of every order in `ids` with one request.
    ///
    /// The local collection is updated for every id before the request and
    /// left that way if it fails. Whatever the result, the selection is
    /// cleared and stats and orders are reloaded.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::EmptySelection`] for an empty set,
    /// [`StoreError::Busy`] if another bulk update or reload is in flight, or
    /// [`StoreError::BulkUpdate`] if the request fails.
    #[instrument(skip(self, ids), fields(status = %status.as_str()))]
    pub async fn bulk_update_status(
        &self,
        ids: impl IntoIterator<Item = OrderId> + Send,
        status: OrderStatus,
    ) -> Result<BulkOutcome, StoreError> {
        let ids = ids.into_iter().collect::<SelectionSet>().to_vec();
        if ids.is_empty() {
            self.state
                .write()
                .await
                .notices
                .push(NoticeLevel::Info, "Select at least one order first");
            return Err(StoreError::EmptySelection);
        }

        let busy = BusyGuard::acquire(&self.busy).ok_or(StoreError::Busy)?;
        let requested = ids.len();

        {
            let mut state = self.state.write().await;
            for order in state.orders.iter_mut().filter(|o| ids.contains(&o.id)) {
                order.status = status;
            }
        }

        let result = self.source.bulk_update_status(&ids, status).await;

        {
            let mut state = self.state.write().await;
            state.selection.clear();
            if let Err(e) = &result {
                warn!(error = %e, requested, "Bulk update failed, local view keeps new status");
                state.notices.push(
                    NoticeLevel::Warning,
                    format!("Bulk update failed, some orders may not have updated: {e}"),
                );
            }
        }
        drop(busy);

        self.refresh_stats().await;
        if let Err(e) = self.load().await {
            debug!(error = %e, "Reload after bulk update failed");
        }

        let response = result.map_err(|source| StoreError::BulkUpdate { requested, source })?;
        if response.modified_count < requested as u64 {
            info!(
                requested,
                modified = response.modified_count,
                "Backend modified fewer orders than requested"
            );
        }

        Ok(BulkOutcome {
            requested,
            modified_count: response.modified_count,
        })
    }

    /// Bulk-update the current selection.
    ///
    /// # Errors
    ///
    /// See [`OrderStore::bulk_update_status`].
    pub async fn bulk_update_selected(&self, status: OrderStatus) -> Result<BulkOutcome, StoreError> {
        let ids = self.state.read().await.selection.to_vec();
        self.bulk_update_status(ids, status).await
    }

    // =========================================================================
    // Export
    // =========================================================================

    /// Render the filtered, sorted list (all pages) as CSV.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::NoOrders`] when nothing matches the filter; an
    /// info notice is recorded and nothing is produced.
    pub async fn export(&self, date: NaiveDate) -> Result<CsvExport, ExportError> {
        let filtered = self.filtered_orders().await;
        let result = export_csv(&filtered, date);
        if let Err(ExportError::NoOrders) = &result {
            debug!("Export aborted, no orders match the current filter");
            self.state
                .write()
                .await
                .notices
                .push(NoticeLevel::Info, "No orders to export");
        }
        result
    }

    // =========================================================================
    // Read views
    // =========================================================================

    /// The visible page of the filtered, sorted list.
    pub async fn listing(&self) -> OrderListing {
        let state = self.state.read().await;
        OrderListing {
            page: paginate(&state.filtered(), state.page_size, state.page),
            criteria: state.criteria.clone(),
            sort: state.sort,
            selected: state.selection.len(),
        }
    }

    /// Every loaded order matching the filter, sorted, before pagination.
    pub async fn filtered_orders(&self) -> Vec<Order> {
        self.state.read().await.filtered()
    }

    pub async fn order(&self, id: &OrderId) -> Option<Order> {
        self.state
            .read()
            .await
            .orders
            .iter()
            .find(|order| &order.id == id)
            .cloned()
    }

    pub async fn stats(&self) -> Option<Stats> {
        self.state.read().await.stats.clone()
    }

    pub async fn selection(&self) -> SelectionSet {
        self.state.read().await.selection.clone()
    }

    pub async fn notices(&self) -> Vec<Notice> {
        self.state.read().await.notices.iter().cloned().collect()
    }

    /// Copy of the whole state.
    pub async fn snapshot(&self) -> OrderState {
        let mut state = self.state.read().await.clone();
        state.busy = self.is_busy();
        state
    }

    // =========================================================================
    // Criteria, paging and selection
    // =========================================================================

    /// Change the status filter. Also sent to the backend as a hint, so any
    /// in-flight load is superseded; call [`OrderStore::load`] afterwards.
    pub async fn set_status_filter(&self, status: StatusFilter) {
        let mut state = self.state.write().await;
        if state.criteria.status != status {
            state.criteria.status = status;
            state.server_page = 1;
            state.invalidate_loads();
        }
        state.page = 1;
    }

    pub async fn set_search_term(&self, term: impl Into<String> + Send) {
        let mut state = self.state.write().await;
        state.criteria.search_term = term.into();
        state.page = 1;
    }

    pub async fn set_date_range(&self, range: DateRange) {
        let mut state = self.state.write().await;
        state.criteria.date_range = range;
        state.page = 1;
    }

    pub async fn set_sort(&self, sort: SortSpec) {
        let mut state = self.state.write().await;
        state.sort = sort;
        state.page = 1;
    }

    /// Go to a client-side page. Pages past the end show nothing.
    pub async fn set_page(&self, page: usize) {
        self.state.write().await.page = page.max(1);
    }

    /// Choose which server page the next load fetches. Supersedes any
    /// in-flight load.
    pub async fn set_server_page(&self, server_page: u32) {
        let mut state = self.state.write().await;
        state.server_page = server_page.max(1);
        state.page = 1;
        state.invalidate_loads();
    }

    /// Toggle one order in the selection. Returns whether it is now selected.
    pub async fn toggle_selection(&self, id: OrderId) -> bool {
        self.state.write().await.selection.toggle(id)
    }

    /// Select every order on the visible page, or deselect them if all were
    /// already selected. Returns whether they ended up selected.
    pub async fn select_all_on_page(&self) -> bool {
        let mut state = self.state.write().await;
        let page = paginate(&state.filtered(), state.page_size, state.page);
        state
            .selection
            .toggle_all(page.items.iter().map(|order| &order.id).collect::<Vec<_>>())
    }

    pub async fn clear_selection(&self) {
        self.state.write().await.selection.clear();
    }

    /// Remove a notice. Returns whether it existed.
    pub async fn dismiss_notice(&self, id: u64) -> bool {
        self.state.write().await.notices.dismiss(id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use orderdesk_core::{PaymentMethod, StatsSummary, StepState};
    use tokio::sync::Notify;

    use super::*;
    use crate::config::StoreConfig;
    use crate::source::synthetic::generate_orders;
    use crate::source::{BulkUpdateResponse, SyntheticDataSource};

    fn config() -> StoreConfig {
        StoreConfig {
            page_size: 10,
            fetch_limit: 100,
        }
    }

    /// 25 orders with ids `o0..o24`; exactly 4 delivered, the rest packed.
    fn fixture() -> Vec<Order> {
        let mut orders = generate_orders(42, 25);
        for (i, order) in orders.iter_mut().enumerate() {
            order.id = format!("o{i}").into();
            order.status = if i < 4 {
                OrderStatus::Delivered
            } else {
                OrderStatus::Packed
            };
        }
        orders
    }

    async fn loaded_store() -> OrderStore<SyntheticDataSource> {
        let store = OrderStore::new(SyntheticDataSource::with_orders(fixture()), &config());
        assert_eq!(
            store.load().await.unwrap(),
            LoadOutcome::Applied { count: 25 }
        );
        store
    }

    async fn status_of(store: &OrderStore<SyntheticDataSource>, id: &str) -> OrderStatus {
        store.order(&id.into()).await.unwrap().status
    }

    #[tokio::test]
    async fn test_first_page_of_twenty_five() {
        let store = loaded_store().await;
        let listing = store.listing().await;

        assert_eq!(listing.page.items.len(), 10);
        assert_eq!(listing.page.total_pages, 3);
        assert_eq!(listing.sort, SortSpec::default());
        assert!(
            listing
                .page
                .items
                .windows(2)
                .all(|w| w[0].created_at >= w[1].created_at)
        );
    }

    #[tokio::test]
    async fn test_status_filter_narrows_listing() {
        let store = loaded_store().await;
        store
            .set_status_filter(StatusFilter::Only(OrderStatus::Delivered))
            .await;
        store.load().await.unwrap();

        assert_eq!(store.filtered_orders().await.len(), 4);
        let listing = store.listing().await;
        assert_eq!(listing.page.total_pages, 1);
        assert_eq!(listing.page.items.len(), 4);
        assert!(!listing.page.show_controls());
    }

    #[tokio::test]
    async fn test_criteria_changes_reset_page() {
        let store = loaded_store().await;
        store.set_page(3).await;
        assert_eq!(store.listing().await.page.items.len(), 5);

        store.set_search_term("ORD-10").await;
        assert_eq!(store.snapshot().await.page, 1);

        store.set_page(3).await;
        store.set_sort(SortSpec::from_params("amount", "asc")).await;
        assert_eq!(store.snapshot().await.page, 1);
    }

    #[tokio::test]
    async fn test_page_past_end_is_empty() {
        let store = loaded_store().await;
        store.set_page(9).await;
        let listing = store.listing().await;
        assert!(listing.page.items.is_empty());
        assert_eq!(listing.page.total_pages, 3);
    }

    #[tokio::test]
    async fn test_bulk_update_success() {
        let store = loaded_store().await;
        for id in ["o5", "o6", "o7"] {
            store.toggle_selection(id.into()).await;
        }

        let outcome = store
            .bulk_update_selected(OrderStatus::Shipped)
            .await
            .unwrap();

        assert_eq!(outcome.requested, 3);
        assert_eq!(outcome.modified_count, 3);
        for id in ["o5", "o6", "o7"] {
            assert_eq!(status_of(&store, id).await, OrderStatus::Shipped);
        }
        assert!(store.selection().await.is_empty());
        assert!(!store.is_busy());
        assert!(store.stats().await.unwrap().is_authoritative());
    }

    #[tokio::test]
    async fn test_bulk_update_with_explicit_ids() {
        let mut orders = fixture();
        for (order, id) in orders.iter_mut().zip(["a", "b", "c"]) {
            order.id = id.into();
        }
        let store = OrderStore::new(SyntheticDataSource::with_orders(orders), &config());
        store.load().await.unwrap();

        let ids = ["a", "b", "c"].map(OrderId::from);
        store.bulk_update_status(ids, OrderStatus::Shipped).await.unwrap();

        for id in ["a", "b", "c"] {
            assert_eq!(status_of(&store, id).await, OrderStatus::Shipped);
        }
        assert!(store.selection().await.is_empty());
    }

    #[tokio::test]
    async fn test_bulk_update_failure_keeps_optimistic_status() {
        let store = loaded_store().await;
        store.toggle_selection("o10".into()).await;
        store.toggle_selection("o11".into()).await;
        store.source().set_failing(true);

        let result = store.bulk_update_selected(OrderStatus::Cancelled).await;

        assert!(matches!(
            result,
            Err(StoreError::BulkUpdate { requested: 2, .. })
        ));
        assert_eq!(status_of(&store, "o10").await, OrderStatus::Cancelled);
        assert_eq!(status_of(&store, "o11").await, OrderStatus::Cancelled);
        assert!(store.selection().await.is_empty());
        assert!(!store.is_busy());
        assert!(
            store
                .notices()
                .await
                .iter()
                .any(|n| n.level == NoticeLevel::Warning
                    && n.message.contains("some orders may not have updated"))
        );
    }

    #[tokio::test]
    async fn test_bulk_update_with_empty_selection_sends_nothing() {
        let store = loaded_store().await;
        store.source().set_failing(true);

        let result = store.bulk_update_selected(OrderStatus::Shipped).await;

        assert!(matches!(result, Err(StoreError::EmptySelection)));
        let notice = store.snapshot().await.notices.latest().cloned().unwrap();
        assert_eq!(notice.level, NoticeLevel::Info);
    }

    #[tokio::test]
    async fn test_busy_store_skips_load_and_rejects_bulk() {
        let store = loaded_store().await;
        let _busy = BusyGuard::acquire(&store.busy).unwrap();

        assert_eq!(store.load().await.unwrap(), LoadOutcome::Skipped);
        assert!(store.snapshot().await.busy);
        assert!(matches!(
            store
                .bulk_update_status([OrderId::from("o1")], OrderStatus::Pending)
                .await,
            Err(StoreError::Busy)
        ));
        assert_eq!(status_of(&store, "o1").await, OrderStatus::Delivered);
    }

    #[tokio::test]
    async fn test_update_status_success() {
        let store = loaded_store().await;
        // No transition guard: delivered can go straight back to pending.
        store
            .update_status(&"o0".into(), OrderStatus::Pending)
            .await
            .unwrap();

        assert_eq!(status_of(&store, "o0").await, OrderStatus::Pending);
        let backend = store.source().orders();
        assert_eq!(backend[0].status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_update_status_rolls_back_on_failure() {
        let store = loaded_store().await;
        store.source().set_failing(true);

        let result = store.update_status(&"o0".into(), OrderStatus::Returned).await;

        assert!(matches!(result, Err(StoreError::DataSource(_))));
        assert_eq!(status_of(&store, "o0").await, OrderStatus::Delivered);
        let notice = store.notices().await.pop().unwrap();
        assert_eq!(notice.level, NoticeLevel::Error);
        assert!(store.dismiss_notice(notice.id).await);
        assert!(store.notices().await.is_empty());
    }

    #[tokio::test]
    async fn test_update_order_rolls_back_every_field() {
        let store = loaded_store().await;
        let before = store.order(&"o4".into()).await.unwrap();
        let new_method = if before.payment_method == PaymentMethod::Card {
            PaymentMethod::Upi
        } else {
            PaymentMethod::Card
        };
        store.source().set_failing(true);

        let patch = OrderPatch {
            status: Some(OrderStatus::Refunded),
            payment_method: Some(new_method),
        };
        assert!(store.update_order(&"o4".into(), patch).await.is_err());

        let after = store.order(&"o4".into()).await.unwrap();
        assert_eq!(after.status, before.status);
        assert_eq!(after.payment_method, before.payment_method);

        store.source().set_failing(false);
        store.update_order(&"o4".into(), patch).await.unwrap();
        let after = store.order(&"o4".into()).await.unwrap();
        assert_eq!(after.status, OrderStatus::Refunded);
        assert_eq!(after.payment_method, new_method);
    }

    #[tokio::test]
    async fn test_update_rejected_locally() {
        let store = loaded_store().await;
        assert!(matches!(
            store
                .update_status(&"missing".into(), OrderStatus::Packed)
                .await,
            Err(StoreError::OrderNotFound(_))
        ));
        assert!(matches!(
            store
                .update_order(&"o1".into(), OrderPatch::default())
                .await,
            Err(StoreError::EmptyPatch)
        ));
    }

    #[tokio::test]
    async fn test_load_failure_keeps_previous_orders() {
        let store = loaded_store().await;
        store.source().set_failing(true);

        assert!(matches!(store.load().await, Err(StoreError::DataSource(_))));
        assert_eq!(store.snapshot().await.orders.len(), 25);
        assert_eq!(
            store.notices().await.last().unwrap().level,
            NoticeLevel::Warning
        );
    }

    #[tokio::test]
    async fn test_stats_authoritative_then_derived() {
        let store = loaded_store().await;

        let stats = store.refresh_stats().await;
        assert!(stats.is_authoritative());
        assert_eq!(stats.summary.total_orders, 25);

        store.source().set_failing(true);
        let stats = store.refresh_stats().await;
        assert!(!stats.is_authoritative());
        assert_eq!(
            stats.provenance,
            orderdesk_core::StatsProvenance::Derived { page_orders: 25 }
        );
        assert_eq!(stats.summary.delivered_count, 4);
        assert_eq!(stats.summary.pending_count, 21);
        assert_eq!(store.stats().await, Some(stats));
    }

    #[tokio::test]
    async fn test_select_all_on_page_toggles() {
        let store = loaded_store().await;

        assert!(store.select_all_on_page().await);
        assert_eq!(store.selection().await.len(), 10);
        assert_eq!(store.listing().await.selected, 10);

        assert!(!store.select_all_on_page().await);
        assert!(store.selection().await.is_empty());

        store.toggle_selection("o1".into()).await;
        store.clear_selection().await;
        assert!(store.selection().await.is_empty());
    }

    #[tokio::test]
    async fn test_export_uses_filtered_list() {
        let store = loaded_store().await;
        store
            .set_status_filter(StatusFilter::Only(OrderStatus::Delivered))
            .await;
        let date = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();

        let export = store.export(date).await.unwrap();
        assert_eq!(export.rows, 4);
        assert_eq!(export.filename, "orders-2025-01-02.csv");
    }

    #[tokio::test]
    async fn test_export_with_no_orders_produces_nothing() {
        let store = OrderStore::new(SyntheticDataSource::with_orders(Vec::new()), &config());
        let date = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();

        assert!(matches!(store.export(date).await, Err(ExportError::NoOrders)));
        let notices = store.notices().await;
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Info);
    }

    #[tokio::test]
    async fn test_progress_timeline_for_loaded_order() {
        let store = loaded_store().await;
        let order = store.order(&"o5".into()).await.unwrap();
        let steps = orderdesk_core::progress_timeline(order.status).unwrap();
        assert_eq!(steps[4].state, StepState::Current);
    }

    /// Source whose `fetch_orders` waits until the test releases it.
    struct GatedSource {
        inner: SyntheticDataSource,
        entered: Notify,
        release: Notify,
    }

    impl DataSource for GatedSource {
        fn kind(&self) -> SourceKind {
            self.inner.kind()
        }

        async fn fetch_orders(
            &self,
            request: &FetchRequest,
        ) -> Result<Vec<Order>, DataSourceError> {
            self.entered.notify_one();
            self.release.notified().await;
            self.inner.fetch_orders(request).await
        }

        async fn fetch_order_stats(&self) -> Result<StatsSummary, DataSourceError> {
            self.inner.fetch_order_stats().await
        }

        async fn update_order_status(
            &self,
            id: &OrderId,
            status: OrderStatus,
        ) -> Result<(), DataSourceError> {
            self.inner.update_order_status(id, status).await
        }

        async fn update_order(
            &self,
            id: &OrderId,
            patch: &OrderPatch,
        ) -> Result<(), DataSourceError> {
            self.inner.update_order(id, patch).await
        }

        async fn bulk_update_status(
            &self,
            ids: &[OrderId],
            status: OrderStatus,
        ) -> Result<BulkUpdateResponse, DataSourceError> {
            self.inner.bulk_update_status(ids, status).await
        }
    }

    /// Source whose status updates wait until the test releases them.
    struct StalledUpdateSource {
        inner: SyntheticDataSource,
        entered: Notify,
        release: Notify,
    }

    impl DataSource for StalledUpdateSource {
        fn kind(&self) -> SourceKind {
            self.inner.kind()
        }

        async fn fetch_orders(
            &self,
            request: &FetchRequest,
        ) -> Result<Vec<Order>, DataSourceError> {
            self.inner.fetch_orders(request).await
        }

        async fn fetch_order_stats(&self) -> Result<StatsSummary, DataSourceError> {
            self.inner.fetch_order_stats().await
        }

        async fn update_order_status(
            &self,
            id: &OrderId,
            status: OrderStatus,
        ) -> Result<(), DataSourceError> {
            self.entered.notify_one();
            self.release.notified().await;
            self.inner.update_order_status(id, status).await
        }

        async fn update_order(
            &self,
            id: &OrderId,
            patch: &OrderPatch,
        ) -> Result<(), DataSourceError> {
            self.inner.update_order(id, patch).await
        }

        async fn bulk_update_status(
            &self,
            ids: &[OrderId],
            status: OrderStatus,
        ) -> Result<BulkUpdateResponse, DataSourceError> {
            self.inner.bulk_update_status(ids, status).await
        }
    }

    #[tokio::test]
    async fn test_failed_update_does_not_undo_newer_reload() {
        let source = StalledUpdateSource {
            inner: SyntheticDataSource::with_orders(fixture()),
            entered: Notify::new(),
            release: Notify::new(),
        };
        let store = Arc::new(OrderStore::new(source, &config()));
        store.load().await.unwrap();

        let in_flight = tokio::spawn({
            let store = Arc::clone(&store);
            async move { store.update_status(&"o0".into(), OrderStatus::Returned).await }
        });
        store.source().entered.notified().await;

        // Someone else changes the order and the store reloads meanwhile.
        store
            .source()
            .inner
            .update_order_status(&"o0".into(), OrderStatus::Refunded)
            .await
            .unwrap();
        assert!(matches!(
            store.load().await.unwrap(),
            LoadOutcome::Applied { .. }
        ));

        store.source().inner.set_failing(true);
        store.source().release.notify_one();

        assert!(matches!(
            in_flight.await.unwrap(),
            Err(StoreError::DataSource(_))
        ));
        let order = store.order(&"o0".into()).await.unwrap();
        assert_eq!(order.status, OrderStatus::Refunded);
        let notice = store.notices().await.pop().unwrap();
        assert_eq!(notice.level, NoticeLevel::Error);
    }

    #[tokio::test]
    async fn test_superseded_load_is_discarded() {
        let source = GatedSource {
            inner: SyntheticDataSource::with_orders(fixture()),
            entered: Notify::new(),
            release: Notify::new(),
        };
        let store = Arc::new(OrderStore::new(source, &config()));

        let in_flight = tokio::spawn({
            let store = Arc::clone(&store);
            async move { store.load().await }
        });

        store.source().entered.notified().await;
        store
            .set_status_filter(StatusFilter::Only(OrderStatus::Delivered))
            .await;
        store.source().release.notify_one();

        assert_eq!(in_flight.await.unwrap().unwrap(), LoadOutcome::Stale);
        assert!(store.snapshot().await.orders.is_empty());
        assert!(store.notices().await.is_empty());
    }
}
