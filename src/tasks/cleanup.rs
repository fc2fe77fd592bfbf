//! TTL Cleanup Task
//!
//! Background task that periodically evicts dynamic cache entries older
//! than the configured maximum age.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::{BucketRegistry, CacheStats};

/// Spawns a background task that periodically sweeps the dynamic bucket.
///
/// Each pass inspects the stored `Date` header of every dynamic entry and
/// deletes those older than `max_age`; undated entries are retained. The
/// returned JoinHandle is used to abort the task during graceful shutdown.
///
/// # Arguments
/// * `registry` - shared bucket registry
/// * `stats` - shared counters; evictions are recorded per pass
/// * `dynamic_bucket` - name of the dynamic generation to sweep
/// * `max_age` - eviction threshold
/// * `interval` - time between sweeps
pub fn spawn_cleanup_task(
    registry: Arc<RwLock<BucketRegistry>>,
    stats: Arc<RwLock<CacheStats>>,
    dynamic_bucket: String,
    max_age: Duration,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            bucket = %dynamic_bucket,
            interval_secs = interval.as_secs(),
            max_age_secs = max_age.as_secs(),
            "Starting TTL cleanup task"
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = {
                let mut registry = registry.write().await;
                registry.open(&dynamic_bucket).sweep_older_than(max_age, Utc::now())
            };

            if removed > 0 {
                stats.write().await.record_evictions(removed as u64);
                info!(removed, "TTL cleanup: evicted stale entries");
            } else {
                debug!("TTL cleanup: no stale entries found");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Duration as ChronoDuration;

    use crate::http::StoredResponse;

    fn response_dated(date: chrono::DateTime<Utc>) -> StoredResponse {
        let mut response = StoredResponse::new(200, "application/json", "{}");
        response
            .headers
            .push(("Date".to_string(), date.to_rfc2822()));
        response
    }

    #[tokio::test]
    async fn test_cleanup_task_evicts_old_entries() {
        let registry = Arc::new(RwLock::new(BucketRegistry::new()));
        let stats = Arc::new(RwLock::new(CacheStats::new()));

        {
            let mut reg = registry.write().await;
            let bucket = reg.open("re-educa-dynamic-v1.1.0");
            bucket.put("GET /old", response_dated(Utc::now() - ChronoDuration::days(8)));
            bucket.put("GET /fresh", response_dated(Utc::now()));
        }

        let handle = spawn_cleanup_task(
            registry.clone(),
            stats.clone(),
            "re-educa-dynamic-v1.1.0".to_string(),
            Duration::from_secs(7 * 24 * 3600),
            Duration::from_millis(50),
        );

        tokio::time::sleep(Duration::from_millis(200)).await;

        {
            let reg = registry.read().await;
            let bucket = reg.get("re-educa-dynamic-v1.1.0").unwrap();
            assert!(bucket.get("GET /old").is_none());
            assert!(bucket.get("GET /fresh").is_some());
        }
        assert_eq!(stats.read().await.evictions, 1);

        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_retains_undated_entries() {
        let registry = Arc::new(RwLock::new(BucketRegistry::new()));
        let stats = Arc::new(RwLock::new(CacheStats::new()));

        {
            let mut reg = registry.write().await;
            reg.open("re-educa-dynamic-v1.1.0")
                .put("GET /undated", StoredResponse::new(200, "text/plain", "x"));
        }

        let handle = spawn_cleanup_task(
            registry.clone(),
            stats,
            "re-educa-dynamic-v1.1.0".to_string(),
            Duration::from_millis(1),
            Duration::from_millis(50),
        );

        tokio::time::sleep(Duration::from_millis(200)).await;

        let reg = registry.read().await;
        assert!(reg
            .get("re-educa-dynamic-v1.1.0")
            .unwrap()
            .get("GET /undated")
            .is_some());

        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_can_be_aborted() {
        let registry = Arc::new(RwLock::new(BucketRegistry::new()));
        let stats = Arc::new(RwLock::new(CacheStats::new()));

        let handle = spawn_cleanup_task(
            registry,
            stats,
            "re-educa-dynamic-v1.1.0".to_string(),
            Duration::from_secs(604_800),
            Duration::from_secs(1),
        );

        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
