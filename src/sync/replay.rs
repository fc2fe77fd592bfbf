//! Queue replay.
//!
//! Drains due mutations against the upstream. Failed replays back off
//! exponentially and are dead-lettered after a fixed attempt cap, so a
//! permanently failing mutation cannot retry forever.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::cache::current_timestamp_ms;
use crate::error::Result;
use crate::http::Fetcher;
use crate::sync::MutationStore;

/// Replay attempts before a mutation is dead-lettered.
pub const MAX_REPLAY_ATTEMPTS: u32 = 5;

/// First retry delay; doubled per failed attempt.
const BACKOFF_BASE: Duration = Duration::from_secs(30);

/// Upper bound on the retry delay.
const BACKOFF_CAP: Duration = Duration::from_secs(3600);

/// Retry delay after `attempts` failed attempts: base * 2^(attempts-1),
/// capped at one hour.
pub fn backoff_delay(attempts: u32) -> Duration {
    let exponent = attempts.saturating_sub(1).min(30);
    let delay = BACKOFF_BASE.saturating_mul(1u32 << exponent);
    delay.min(BACKOFF_CAP)
}

// == Drain Summary ==
/// Outcome counts of one drain pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DrainSummary {
    /// Mutations replayed and removed
    pub replayed: usize,
    /// Mutations rescheduled with backoff
    pub rescheduled: usize,
    /// Mutations moved to the dead-letter store
    pub dead_lettered: usize,
}

// == Drain ==
/// Replays every due mutation once.
///
/// A replay succeeds when the upstream answers with a 2xx; the mutation is
/// then removed. Transport errors and error statuses count as a failed
/// attempt.
pub async fn drain_queue(
    store: &dyn MutationStore,
    fetcher: &dyn Fetcher,
) -> Result<DrainSummary> {
    let now = current_timestamp_ms();
    let mut summary = DrainSummary::default();

    for mutation in store.due(now)? {
        let replayed = match fetcher.fetch(&mutation.to_request()).await {
            Ok(response) if response.is_ok() => true,
            Ok(response) => {
                debug!(
                    id = mutation.id,
                    path = %mutation.path,
                    status = response.status,
                    "replay rejected by upstream"
                );
                false
            }
            Err(err) => {
                debug!(id = mutation.id, path = %mutation.path, error = %err, "replay failed");
                false
            }
        };

        if replayed {
            store.remove(mutation.id)?;
            summary.replayed += 1;
            info!(id = mutation.id, path = %mutation.path, "mutation replayed");
            continue;
        }

        let attempts = mutation.attempts + 1;
        if attempts >= MAX_REPLAY_ATTEMPTS {
            store.dead_letter(&mutation)?;
            store.remove(mutation.id)?;
            summary.dead_lettered += 1;
            warn!(
                id = mutation.id,
                path = %mutation.path,
                attempts,
                "mutation dead-lettered"
            );
        } else {
            let delay = backoff_delay(attempts);
            store.reschedule(mutation.id, attempts, now + delay.as_millis() as u64)?;
            summary.rescheduled += 1;
        }
    }

    Ok(summary)
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;

    use crate::error::GatewayError;
    use crate::http::{FetchRequest, StoredResponse};
    use crate::sync::MemoryMutationStore;

    struct SwitchableUpstream {
        online: AtomicBool,
    }

    impl SwitchableUpstream {
        fn new(online: bool) -> Self {
            Self {
                online: AtomicBool::new(online),
            }
        }

        fn set_online(&self, online: bool) {
            self.online.store(online, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl Fetcher for SwitchableUpstream {
        async fn fetch(&self, _request: &FetchRequest) -> Result<StoredResponse> {
            if self.online.load(Ordering::SeqCst) {
                Ok(StoredResponse::new(201, "application/json", "{}"))
            } else {
                Err(GatewayError::Network("offline".to_string()))
            }
        }
    }

    fn post(path: &str) -> FetchRequest {
        FetchRequest {
            method: "POST".to_string(),
            path: path.to_string(),
            headers: Vec::new(),
            body: b"{}".to_vec(),
        }
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        assert_eq!(backoff_delay(1), Duration::from_secs(30));
        assert_eq!(backoff_delay(2), Duration::from_secs(60));
        assert_eq!(backoff_delay(3), Duration::from_secs(120));
        assert_eq!(backoff_delay(4), Duration::from_secs(240));
        // Far beyond the cap
        assert_eq!(backoff_delay(20), Duration::from_secs(3600));
    }

    #[tokio::test]
    async fn test_drain_replays_and_removes_on_success() {
        let store = MemoryMutationStore::new();
        store.enqueue(&post("/api/cart/items")).unwrap();
        let upstream = SwitchableUpstream::new(true);

        let summary = drain_queue(&store, &upstream).await.unwrap();

        assert_eq!(summary.replayed, 1);
        assert_eq!(store.pending_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_drain_reschedules_with_backoff_on_failure() {
        let store = MemoryMutationStore::new();
        store.enqueue(&post("/api/cart/items")).unwrap();
        let upstream = SwitchableUpstream::new(false);

        let summary = drain_queue(&store, &upstream).await.unwrap();

        assert_eq!(summary.rescheduled, 1);
        assert_eq!(store.pending_count().unwrap(), 1);
        // No longer due right now
        assert!(store.due(current_timestamp_ms()).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mutation_dead_lettered_after_attempt_cap() {
        let store = MemoryMutationStore::new();
        let id = store.enqueue(&post("/api/orders")).unwrap();
        let upstream = SwitchableUpstream::new(false);

        for round in 1..=MAX_REPLAY_ATTEMPTS {
            // Make the mutation due again regardless of backoff
            let _ = store.reschedule(
                id,
                round - 1,
                current_timestamp_ms().saturating_sub(1),
            );
            drain_queue(&store, &upstream).await.unwrap();
        }

        assert_eq!(store.pending_count().unwrap(), 0);
        assert_eq!(store.dead_letter_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_queued_mutation_survives_until_upstream_returns() {
        let store = MemoryMutationStore::new();
        let id = store.enqueue(&post("/api/posts")).unwrap();
        let upstream = SwitchableUpstream::new(false);

        drain_queue(&store, &upstream).await.unwrap();
        assert_eq!(store.pending_count().unwrap(), 1);

        // Connectivity returns; force the entry due and drain again
        upstream.set_online(true);
        store
            .reschedule(id, 1, current_timestamp_ms().saturating_sub(1))
            .unwrap();
        let summary = drain_queue(&store, &upstream).await.unwrap();

        assert_eq!(summary.replayed, 1);
        assert_eq!(store.pending_count().unwrap(), 0);
        assert_eq!(store.dead_letter_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_non_2xx_replay_counts_as_failure() {
        struct Rejecting;

        #[async_trait]
        impl Fetcher for Rejecting {
            async fn fetch(&self, _request: &FetchRequest) -> Result<StoredResponse> {
                Ok(StoredResponse::new(500, "text/plain", "boom"))
            }
        }

        let store = MemoryMutationStore::new();
        store.enqueue(&post("/api/orders")).unwrap();

        let summary = drain_queue(&store, &Rejecting).await.unwrap();

        assert_eq!(summary.replayed, 0);
        assert_eq!(summary.rescheduled, 1);
    }
}
