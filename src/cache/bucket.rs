//! Bucket Module
//!
//! Named cache generations keyed by request identity, plus the registry
//! that owns all live generations. The registry is injected into strategies
//! and the lifecycle manager; nothing reaches it through globals.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::cache::CacheEntry;
use crate::http::StoredResponse;

// == Bucket ==
/// A single cache generation: request identity -> stored response.
///
/// At most one entry per identity; `put` is an idempotent upsert, so
/// concurrent last-write-wins races are tolerated.
#[derive(Debug, Default)]
pub struct Bucket {
    name: String,
    entries: HashMap<String, CacheEntry>,
}

impl Bucket {
    /// Creates an empty bucket with the given generation name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: HashMap::new(),
        }
    }

    /// Returns the generation name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Looks up an entry by request identity.
    pub fn get(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    /// Stores a response under a request identity, overwriting any prior entry.
    pub fn put(&mut self, key: impl Into<String>, response: StoredResponse) {
        self.entries.insert(key.into(), CacheEntry::new(response));
    }

    /// Removes an entry. Returns true if one existed.
    pub fn delete(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Returns all request identities currently stored.
    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Returns the current number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the bucket holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every entry whose `Date` header is older than `max_age`.
    ///
    /// Entries without a `Date` header are retained. Returns the number of
    /// entries removed.
    pub fn sweep_older_than(&mut self, max_age: Duration, now: DateTime<Utc>) -> usize {
        let stale_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_older_than(max_age, now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &stale_keys {
            self.entries.remove(key);
        }
        stale_keys.len()
    }
}

// == Bucket Registry ==
/// Owns all live cache generations by name.
#[derive(Debug, Default)]
pub struct BucketRegistry {
    buckets: HashMap<String, Bucket>,
}

impl BucketRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the bucket with the given name, creating it if absent.
    pub fn open(&mut self, name: &str) -> &mut Bucket {
        self.buckets
            .entry(name.to_string())
            .or_insert_with(|| Bucket::new(name))
    }

    /// Read-only lookup of an existing bucket.
    pub fn get(&self, name: &str) -> Option<&Bucket> {
        self.buckets.get(name)
    }

    /// Inserts a fully populated bucket, replacing any prior generation of
    /// the same name. Used to commit an install atomically.
    pub fn insert(&mut self, bucket: Bucket) {
        self.buckets.insert(bucket.name().to_string(), bucket);
    }

    /// Deletes a bucket. Returns true if one existed.
    pub fn delete(&mut self, name: &str) -> bool {
        self.buckets.remove(name).is_some()
    }

    /// Returns all live generation names.
    pub fn names(&self) -> Vec<String> {
        self.buckets.keys().cloned().collect()
    }
}
