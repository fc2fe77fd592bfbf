//! Tasks Module
//!
//! Recurring background tasks: TTL sweep and sync queue drain.

mod cleanup;
mod sync;

pub use cleanup::spawn_cleanup_task;
pub use sync::spawn_sync_task;
