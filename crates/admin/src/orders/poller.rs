//! Fixed-interval background refresh.
//!
//! Each tick reloads the current server page and then the stats. A tick that
//! finds the store busy with a manual reload or bulk update does nothing.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::store::{LoadOutcome, OrderStore};
use crate::source::DataSource;

/// Handle to a running poller. Dropping it stops the task.
pub struct PollerHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Stop the poller and wait for the current tick to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Err(e) = (&mut self.task).await {
            warn!(error = %e, "Order poller task ended abnormally");
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// Run one refresh: reload orders, then stats if the reload went through.
///
/// Returns `None` when the tick was skipped because the store was busy.
pub async fn poll_once<D: DataSource>(store: &OrderStore<D>) -> Option<LoadOutcome> {
    match store.load().await {
        Ok(LoadOutcome::Skipped) => {
            debug!("Poll tick skipped, store busy");
            None
        }
        Ok(outcome) => {
            if matches!(outcome, LoadOutcome::Applied { .. }) {
                store.refresh_stats().await;
            }
            Some(outcome)
        }
        Err(e) => {
            // The store has already recorded a notice.
            debug!(error = %e, "Poll tick failed");
            None
        }
    }
}

/// Spawn a task that calls [`poll_once`] every `interval`.
///
/// The first refresh happens one full interval after spawning; callers load
/// once themselves before starting the poller.
pub fn spawn_poller<D>(store: Arc<OrderStore<D>>, interval: Duration) -> PollerHandle
where
    D: DataSource + 'static,
{
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

    info!(interval_secs = interval.as_secs(), "Starting order poller");
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = &mut shutdown_rx => break,
                _ = ticker.tick() => {
                    poll_once(&store).await;
                }
            }
        }
        info!("Order poller stopped");
    });

    PollerHandle {
        shutdown: Some(shutdown_tx),
        task,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use orderdesk_core::OrderStatus;

    use super::*;
    use crate::config::StoreConfig;
    use crate::source::SyntheticDataSource;
    use crate::source::synthetic::generate_orders;

    fn store() -> Arc<OrderStore<SyntheticDataSource>> {
        let source = SyntheticDataSource::with_orders(generate_orders(4, 12));
        Arc::new(OrderStore::new(source, &StoreConfig::default()))
    }

    #[tokio::test]
    async fn test_poll_once_loads_and_refreshes_stats() {
        let store = store();
        assert_eq!(
            poll_once(&store).await,
            Some(LoadOutcome::Applied { count: 12 })
        );
        assert!(store.stats().await.unwrap().is_authoritative());
    }

    #[tokio::test]
    async fn test_poll_once_failure_is_not_fatal() {
        let store = store();
        store.source().set_failing(true);
        assert_eq!(poll_once(&store).await, None);
        assert!(store.stats().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_poller_picks_up_backend_changes() {
        let store = store();
        store.load().await.unwrap();
        let id = store.snapshot().await.orders[0].id.clone();

        let handle = spawn_poller(Arc::clone(&store), Duration::from_secs(30));
        store
            .source()
            .update_order_status(&id, OrderStatus::Returned)
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_secs(31)).await;
        handle.shutdown().await;

        assert_eq!(
            store.order(&id).await.unwrap().status,
            OrderStatus::Returned
        );
    }
}
