//! Order management: query pipeline, store and export.
//!
//! Data flows one way. The [`OrderStore`] holds one server page of orders;
//! listings are derived from it by [`query::filter_sort`] and then
//! [`pagination::paginate`]. Exports use the filtered list before pagination.

pub mod export;
pub mod notice;
pub mod pagination;
pub mod poller;
pub mod query;
pub mod selection;
pub mod stats;
pub mod store;

pub use export::{CsvExport, export_csv, export_filename};
pub use notice::{Notice, NoticeLevel};
pub use pagination::{Page, paginate};
pub use poller::{PollerHandle, spawn_poller};
pub use query::{
    DateRange, FilterCriteria, SortDirection, SortField, SortSpec, StatusFilter, filter_sort,
};
pub use selection::SelectionSet;
pub use store::{BulkOutcome, LoadOutcome, OrderListing, OrderState, OrderStore};
