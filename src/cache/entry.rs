//! Cache Entry Module
//!
//! Defines the structure for individual cache entries.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};

use crate::http::StoredResponse;

// == Cache Entry ==
/// A stored response together with its insertion time.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The captured response
    pub response: StoredResponse,
    /// Insertion timestamp (Unix milliseconds)
    pub stored_at: u64,
}

impl CacheEntry {
    /// Wraps a response with the current insertion time.
    pub fn new(response: StoredResponse) -> Self {
        Self {
            response,
            stored_at: current_timestamp_ms(),
        }
    }

    /// Checks whether the entry is older than `max_age` as judged by the
    /// stored response's `Date` header.
    ///
    /// Entries without a parsable `Date` header are never considered stale
    /// by this check (conservative retention). The boundary is strict: an
    /// entry aged exactly `max_age` is retained.
    pub fn is_older_than(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        let Some(date) = self.response.date() else {
            return false;
        };
        let Ok(max_age) = chrono::Duration::from_std(max_age) else {
            return false;
        };
        now.signed_duration_since(date) > max_age
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_millis() as u64
}
