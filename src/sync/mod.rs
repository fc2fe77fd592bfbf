//! Sync Module
//!
//! Durable queue of mutating requests that failed while the upstream was
//! unreachable, plus the replay logic that drains it.

mod replay;
mod store;

pub use replay::{backoff_delay, drain_queue, DrainSummary, MAX_REPLAY_ATTEMPTS};
pub use store::{MemoryMutationStore, SqliteMutationStore};

use crate::error::Result;
use crate::http::FetchRequest;

// == Pending Mutation ==
/// A queued mutating request awaiting replay.
#[derive(Debug, Clone)]
pub struct PendingMutation {
    /// Queue row id
    pub id: i64,
    /// Request path with query string
    pub path: String,
    /// HTTP method
    pub method: String,
    /// Request headers as (name, value) pairs
    pub headers: Vec<(String, String)>,
    /// Request body bytes
    pub body: Vec<u8>,
    /// Number of failed replay attempts so far
    pub attempts: u32,
    /// Earliest replay time (Unix milliseconds)
    pub next_attempt_at: u64,
}

impl PendingMutation {
    /// Rebuilds the request for replay.
    pub fn to_request(&self) -> FetchRequest {
        FetchRequest {
            method: self.method.clone(),
            path: self.path.clone(),
            headers: self.headers.clone(),
            body: self.body.clone(),
        }
    }
}

// == Mutation Store Trait ==
/// Storage backend for the pending-mutation queue.
pub trait MutationStore: Send + Sync {
    /// Persists a request for later replay; returns its queue id.
    fn enqueue(&self, request: &FetchRequest) -> Result<i64>;

    /// Returns all mutations whose `next_attempt_at` is due, oldest first.
    fn due(&self, now_ms: u64) -> Result<Vec<PendingMutation>>;

    /// Removes a successfully replayed mutation.
    fn remove(&self, id: i64) -> Result<()>;

    /// Records a failed attempt and schedules the next one.
    fn reschedule(&self, id: i64, attempts: u32, next_attempt_at: u64) -> Result<()>;

    /// Moves a mutation that exhausted its attempts to the dead-letter store.
    fn dead_letter(&self, mutation: &PendingMutation) -> Result<()>;

    /// Number of mutations still awaiting replay.
    fn pending_count(&self) -> Result<usize>;

    /// Number of dead-lettered mutations.
    fn dead_letter_count(&self) -> Result<usize>;
}
