//! Command implementations.

pub mod orders;
pub mod watch;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Utc};
use clap::Args;
use orderdesk_admin::config::ConfigError;
use orderdesk_admin::orders::{DateRange, SortSpec, StatusFilter};
use orderdesk_admin::{AdminConfig, AnyDataSource, DataSourceError, ExportError, OrderStore, StoreError};
use orderdesk_core::OrderId;
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    DataSource(#[from] DataSourceError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Export(#[from] ExportError),

    /// No loaded order has this id or display id.
    #[error("No loaded order matches `{0}`")]
    UnknownOrder(String),

    #[error("`--from` ({from}) is after `--to` ({to})")]
    InvalidDateRange { from: NaiveDate, to: NaiveDate },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Filter and sort options shared by `list` and `export`.
#[derive(Debug, Args)]
pub struct QueryArgs {
    /// Status to show, or `all`
    #[arg(short, long, default_value = "all")]
    pub status: StatusFilter,

    /// Match display id, customer name, customer id or phone
    #[arg(short = 'q', long)]
    pub search: Option<String>,

    /// Earliest creation date (inclusive, YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Latest creation date (inclusive, YYYY-MM-DD)
    #[arg(long)]
    pub to: Option<NaiveDate>,

    /// `date`, `amount`, `status` or `displayId`
    #[arg(long, default_value = "date")]
    pub sort: String,

    /// `asc` or `desc`
    #[arg(long, default_value = "desc")]
    pub order: String,

    /// Backend page to load (1-based)
    #[arg(long, default_value_t = 1)]
    pub server_page: u32,
}

impl QueryArgs {
    /// Date window covering whole days from `--from` through `--to`.
    pub fn date_range(&self) -> Result<DateRange, CommandError> {
        if let (Some(from), Some(to)) = (self.from, self.to)
            && from > to
        {
            return Err(CommandError::InvalidDateRange { from, to });
        }
        Ok(DateRange {
            start: self.from.map(start_of_day),
            end: self.to.map(end_of_day),
        })
    }

    /// Apply these options to `store` and load the matching server page.
    pub async fn apply(&self, store: &OrderStore<AnyDataSource>) -> Result<(), CommandError> {
        let range = self.date_range()?;
        store.set_status_filter(self.status).await;
        store.set_server_page(self.server_page).await;
        store.load().await?;
        store
            .set_search_term(self.search.clone().unwrap_or_default())
            .await;
        store.set_date_range(range).await;
        store
            .set_sort(SortSpec::from_params(&self.sort, &self.order))
            .await;
        Ok(())
    }
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    start_of_day(date) + TimeDelta::days(1) - TimeDelta::nanoseconds(1)
}

/// Build the store over the configured data source.
pub fn open_store(config: &AdminConfig) -> Result<OrderStore<AnyDataSource>, CommandError> {
    let source = AnyDataSource::from_config(config)?;
    let store = OrderStore::new(source, &config.store);
    tracing::debug!(source = %store.source_kind(), "Order store created");
    Ok(store)
}

/// Resolve an order by id, falling back to display id.
pub async fn resolve_order(
    store: &OrderStore<AnyDataSource>,
    key: &str,
) -> Result<OrderId, CommandError> {
    let id = OrderId::new(key);
    if store.order(&id).await.is_some() {
        return Ok(id);
    }
    store
        .snapshot()
        .await
        .orders
        .into_iter()
        .find(|order| order.display_id.eq_ignore_ascii_case(key))
        .map(|order| order.id)
        .ok_or_else(|| CommandError::UnknownOrder(key.to_string()))
}
