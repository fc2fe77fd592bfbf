//! Cache Module
//!
//! Named, versioned cache buckets of request/response pairs with a
//! Date-header-based TTL sweep.

mod bucket;
mod entry;
mod stats;

// Re-export public types
pub use bucket::{Bucket, BucketRegistry};
pub use entry::{current_timestamp_ms, CacheEntry};
pub use stats::CacheStats;

// == Public Constants ==
/// Prefix shared by all cache generation names
pub const CACHE_PREFIX: &str = "re-educa";

/// Builds the static bucket name for a version, e.g. `re-educa-static-v1.1.0`.
pub fn static_bucket_name(version: &str) -> String {
    format!("{CACHE_PREFIX}-static-v{version}")
}

/// Builds the dynamic bucket name for a version, e.g. `re-educa-dynamic-v1.1.0`.
pub fn dynamic_bucket_name(version: &str) -> String {
    format!("{CACHE_PREFIX}-dynamic-v{version}")
}
