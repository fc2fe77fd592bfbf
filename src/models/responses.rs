//! Response DTOs for the gateway control surface
//!
//! Defines the structure of outgoing stats and health bodies.

use serde::Serialize;

/// Response body for the stats endpoint (GET /_sw/stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Number of requests answered from cache
    pub hits: u64,
    /// Number of requests with no usable cached entry
    pub misses: u64,
    /// Number of entries removed by the TTL sweep
    pub evictions: u64,
    /// Number of background revalidations completed
    pub revalidations: u64,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
    /// Entries currently in the static bucket
    pub static_entries: usize,
    /// Entries currently in the dynamic bucket
    pub dynamic_entries: usize,
    /// Mutations awaiting background replay
    pub pending_mutations: usize,
}

impl StatsResponse {
    /// Creates a new StatsResponse from counters and bucket sizes.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        hits: u64,
        misses: u64,
        evictions: u64,
        revalidations: u64,
        static_entries: usize,
        dynamic_entries: usize,
        pending_mutations: usize,
    ) -> Self {
        let total_requests = hits + misses;
        let hit_rate = if total_requests > 0 {
            hits as f64 / total_requests as f64
        } else {
            0.0
        };
        Self {
            hits,
            misses,
            evictions,
            revalidations,
            hit_rate,
            static_entries,
            dynamic_entries,
            pending_mutations,
        }
    }
}

/// Response body for the health endpoint (GET /_sw/health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current lifecycle state
    pub lifecycle: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp.
    pub fn healthy(lifecycle: impl Into<String>) -> Self {
        Self {
            status: "healthy".to_string(),
            lifecycle: lifecycle.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
