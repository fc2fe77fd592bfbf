//! Cache Statistics Module
//!
//! Tracks cache performance metrics across all strategies.

use serde::Serialize;

// == Cache Stats ==
/// Tracks cache performance metrics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Number of requests answered from a cache bucket
    pub hits: u64,
    /// Number of requests that had no usable cached entry
    pub misses: u64,
    /// Number of entries removed by the TTL sweep
    pub evictions: u64,
    /// Number of background revalidations completed
    pub revalidations: u64,
    /// Number of mutations queued for background sync
    pub queued_mutations: u64,
}

impl CacheStats {
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Increments the hit counter.
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    /// Increments the miss counter.
    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    /// Adds swept entries to the eviction counter.
    pub fn record_evictions(&mut self, count: u64) {
        self.evictions += count;
    }

    /// Increments the revalidation counter.
    pub fn record_revalidation(&mut self) {
        self.revalidations += 1;
    }

    /// Increments the queued-mutation counter.
    pub fn record_queued_mutation(&mut self) {
        self.queued_mutations += 1;
    }
}
