//! `watch` command: keep the store fresh until interrupted.

use std::sync::Arc;
use std::time::Duration;

use orderdesk_admin::AdminConfig;
use orderdesk_admin::orders::spawn_poller;

use super::{CommandError, open_store};

/// Load once, then poll until Ctrl+C.
///
/// `interval_secs` overrides the configured poll interval. With neither set
/// (or set to 0) the command loads once and exits.
pub async fn run(config: &AdminConfig, interval_secs: Option<u64>) -> Result<(), CommandError> {
    let store = Arc::new(open_store(config)?);
    store.load().await?;
    store.refresh_stats().await;

    let interval = match interval_secs {
        Some(0) => None,
        Some(secs) => Some(Duration::from_secs(secs)),
        None => config.poll_interval,
    };
    let Some(interval) = interval else {
        tracing::info!("Polling disabled, nothing to watch");
        return Ok(());
    };

    let poller = spawn_poller(Arc::clone(&store), interval);

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
    }
    tracing::info!("Shutdown signal received, stopping poller");
    poller.shutdown().await;

    let snapshot = store.snapshot().await;
    tracing::info!(
        orders = snapshot.orders.len(),
        generation = snapshot.generation,
        notices = snapshot.notices.len(),
        "Watch finished"
    );
    Ok(())
}
