//! orderdesk admin library.
//!
//! The order management subsystem of the admin console: configuration, the
//! data sources the console reads from and writes to, and the order store
//! with its query, export and refresh machinery.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod orders;
pub mod source;

pub use config::AdminConfig;
pub use error::{ExportError, StoreError};
pub use orders::OrderStore;
pub use source::{AnyDataSource, DataSource, DataSourceError, SourceKind};
