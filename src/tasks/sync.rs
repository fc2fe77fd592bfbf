//! Background Sync Task
//!
//! Recurring task that drains the pending-mutation queue, standing in for
//! the platform's sync event.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::http::Fetcher;
use crate::sync::{drain_queue, MutationStore};

/// Spawns a background task that periodically replays queued mutations.
///
/// Each pass drains all due mutations; per-mutation backoff and the
/// dead-letter cap are handled by the drain itself. The returned JoinHandle
/// is used to abort the task during graceful shutdown.
pub fn spawn_sync_task(
    store: Arc<dyn MutationStore>,
    fetcher: Arc<dyn Fetcher>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            interval_secs = interval.as_secs(),
            "Starting background sync task"
        );

        loop {
            tokio::time::sleep(interval).await;

            match drain_queue(store.as_ref(), fetcher.as_ref()).await {
                Ok(summary) if summary.replayed > 0 || summary.dead_lettered > 0 => {
                    info!(
                        replayed = summary.replayed,
                        rescheduled = summary.rescheduled,
                        dead_lettered = summary.dead_lettered,
                        "Background sync pass complete"
                    );
                }
                Ok(_) => debug!("Background sync: nothing to replay"),
                Err(err) => warn!(error = %err, "Background sync pass failed"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;

    use crate::error::Result;
    use crate::http::{FetchRequest, StoredResponse};
    use crate::sync::MemoryMutationStore;

    struct AcceptingUpstream;

    #[async_trait]
    impl Fetcher for AcceptingUpstream {
        async fn fetch(&self, _request: &FetchRequest) -> Result<StoredResponse> {
            Ok(StoredResponse::new(200, "application/json", "{}"))
        }
    }

    #[tokio::test]
    async fn test_sync_task_drains_queue() {
        let store: Arc<dyn MutationStore> = Arc::new(MemoryMutationStore::new());
        store
            .enqueue(&FetchRequest {
                method: "POST".to_string(),
                path: "/api/posts".to_string(),
                headers: Vec::new(),
                body: b"{}".to_vec(),
            })
            .unwrap();

        let handle = spawn_sync_task(
            store.clone(),
            Arc::new(AcceptingUpstream),
            Duration::from_millis(50),
        );

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(store.pending_count().unwrap(), 0);

        handle.abort();
    }

    #[tokio::test]
    async fn test_sync_task_can_be_aborted() {
        let store: Arc<dyn MutationStore> = Arc::new(MemoryMutationStore::new());
        let handle = spawn_sync_task(store, Arc::new(AcceptingUpstream), Duration::from_secs(1));

        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
