//! Mutation queue storage backends.
//!
//! `SqliteMutationStore` is the durable production backend; queued mutations
//! survive process restarts. `MemoryMutationStore` backs tests.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection};

use crate::cache::current_timestamp_ms;
use crate::error::{GatewayError, Result};
use crate::http::FetchRequest;
use crate::sync::{MutationStore, PendingMutation};

/// Schema for the queue tables.
const QUEUE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS pending_mutations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    path TEXT NOT NULL,
    method TEXT NOT NULL,
    headers TEXT NOT NULL,
    body BLOB NOT NULL,
    attempts INTEGER NOT NULL DEFAULT 0,
    next_attempt_at INTEGER NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_pending_due ON pending_mutations(next_attempt_at);

CREATE TABLE IF NOT EXISTS dead_letters (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    path TEXT NOT NULL,
    method TEXT NOT NULL,
    headers TEXT NOT NULL,
    body BLOB NOT NULL,
    attempts INTEGER NOT NULL,
    failed_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

// == SQLite Store ==
/// SQLite-backed mutation queue.
pub struct SqliteMutationStore {
    conn: Mutex<Connection>,
}

impl SqliteMutationStore {
    /// Opens (or creates) the queue database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref()).map_err(|e| {
            GatewayError::Storage(format!(
                "Failed to open queue database at {}: {e}",
                path.as_ref().display()
            ))
        })?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    /// Opens an in-memory queue; contents vanish when dropped.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| GatewayError::Storage(format!("Failed to open in-memory queue: {e}")))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(QUEUE_SCHEMA)
            .map_err(|e| GatewayError::Storage(format!("Failed to run queue migrations: {e}")))?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| GatewayError::Storage(format!("Lock poisoned: {e}")))
    }
}

impl MutationStore for SqliteMutationStore {
    fn enqueue(&self, request: &FetchRequest) -> Result<i64> {
        let headers = serde_json::to_string(&request.headers)
            .map_err(|e| GatewayError::Storage(format!("Failed to serialize headers: {e}")))?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO pending_mutations (path, method, headers, body, attempts, next_attempt_at)
             VALUES (?, ?, ?, ?, 0, ?)",
            params![
                request.path,
                request.method,
                headers,
                request.body,
                current_timestamp_ms()
            ],
        )
        .map_err(|e| GatewayError::Storage(format!("Failed to enqueue mutation: {e}")))?;
        Ok(conn.last_insert_rowid())
    }

    fn due(&self, now_ms: u64) -> Result<Vec<PendingMutation>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, path, method, headers, body, attempts, next_attempt_at
                 FROM pending_mutations
                 WHERE next_attempt_at <= ?
                 ORDER BY id",
            )
            .map_err(|e| GatewayError::Storage(format!("Failed to prepare due query: {e}")))?;

        let rows = stmt
            .query_map(params![now_ms], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Vec<u8>>(4)?,
                    row.get::<_, u32>(5)?,
                    row.get::<_, u64>(6)?,
                ))
            })
            .map_err(|e| GatewayError::Storage(format!("Failed to query due mutations: {e}")))?;

        let mut mutations = Vec::new();
        for row in rows {
            let (id, path, method, headers, body, attempts, next_attempt_at) =
                row.map_err(|e| GatewayError::Storage(format!("Failed to read row: {e}")))?;
            let headers: Vec<(String, String)> = serde_json::from_str(&headers)
                .map_err(|e| GatewayError::Storage(format!("Corrupt headers column: {e}")))?;
            mutations.push(PendingMutation {
                id,
                path,
                method,
                headers,
                body,
                attempts,
                next_attempt_at,
            });
        }
        Ok(mutations)
    }

    fn remove(&self, id: i64) -> Result<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM pending_mutations WHERE id = ?", params![id])
            .map_err(|e| GatewayError::Storage(format!("Failed to remove mutation: {e}")))?;
        Ok(())
    }

    fn reschedule(&self, id: i64, attempts: u32, next_attempt_at: u64) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE pending_mutations SET attempts = ?, next_attempt_at = ? WHERE id = ?",
            params![attempts, next_attempt_at, id],
        )
        .map_err(|e| GatewayError::Storage(format!("Failed to reschedule mutation: {e}")))?;
        Ok(())
    }

    fn dead_letter(&self, mutation: &PendingMutation) -> Result<()> {
        let headers = serde_json::to_string(&mutation.headers)
            .map_err(|e| GatewayError::Storage(format!("Failed to serialize headers: {e}")))?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO dead_letters (path, method, headers, body, attempts)
             VALUES (?, ?, ?, ?, ?)",
            params![
                mutation.path,
                mutation.method,
                headers,
                mutation.body,
                mutation.attempts
            ],
        )
        .map_err(|e| GatewayError::Storage(format!("Failed to dead-letter mutation: {e}")))?;
        Ok(())
    }

    fn pending_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        conn.query_row("SELECT COUNT(*) FROM pending_mutations", [], |row| {
            row.get::<_, i64>(0)
        })
        .map(|n| n as usize)
        .map_err(|e| GatewayError::Storage(format!("Failed to count pending mutations: {e}")))
    }

    fn dead_letter_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        conn.query_row("SELECT COUNT(*) FROM dead_letters", [], |row| {
            row.get::<_, i64>(0)
        })
        .map(|n| n as usize)
        .map_err(|e| GatewayError::Storage(format!("Failed to count dead letters: {e}")))
    }
}

// == In-Memory Store ==
/// Non-durable queue used by tests.
#[derive(Default)]
pub struct MemoryMutationStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    next_id: i64,
    pending: Vec<PendingMutation>,
    dead: Vec<PendingMutation>,
}

impl MemoryMutationStore {
    /// Creates an empty in-memory queue.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryInner>> {
        self.inner
            .lock()
            .map_err(|e| GatewayError::Storage(format!("Lock poisoned: {e}")))
    }
}

impl MutationStore for MemoryMutationStore {
    fn enqueue(&self, request: &FetchRequest) -> Result<i64> {
        let mut inner = self.lock()?;
        inner.next_id += 1;
        let id = inner.next_id;
        inner.pending.push(PendingMutation {
            id,
            path: request.path.clone(),
            method: request.method.clone(),
            headers: request.headers.clone(),
            body: request.body.clone(),
            attempts: 0,
            next_attempt_at: current_timestamp_ms(),
        });
        Ok(id)
    }

    fn due(&self, now_ms: u64) -> Result<Vec<PendingMutation>> {
        let inner = self.lock()?;
        Ok(inner
            .pending
            .iter()
            .filter(|m| m.next_attempt_at <= now_ms)
            .cloned()
            .collect())
    }

    fn remove(&self, id: i64) -> Result<()> {
        self.lock()?.pending.retain(|m| m.id != id);
        Ok(())
    }

    fn reschedule(&self, id: i64, attempts: u32, next_attempt_at: u64) -> Result<()> {
        let mut inner = self.lock()?;
        if let Some(mutation) = inner.pending.iter_mut().find(|m| m.id == id) {
            mutation.attempts = attempts;
            mutation.next_attempt_at = next_attempt_at;
        }
        Ok(())
    }

    fn dead_letter(&self, mutation: &PendingMutation) -> Result<()> {
        self.lock()?.dead.push(mutation.clone());
        Ok(())
    }

    fn pending_count(&self) -> Result<usize> {
        Ok(self.lock()?.pending.len())
    }

    fn dead_letter_count(&self) -> Result<usize> {
        Ok(self.lock()?.dead.len())
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn mutation_request() -> FetchRequest {
        FetchRequest {
            method: "POST".to_string(),
            path: "/api/cart/items".to_string(),
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: br#"{"product_id":42}"#.to_vec(),
        }
    }

    fn assert_store_roundtrip(store: &dyn MutationStore) {
        let id = store.enqueue(&mutation_request()).unwrap();
        assert_eq!(store.pending_count().unwrap(), 1);

        let due = store.due(current_timestamp_ms()).unwrap();
        assert_eq!(due.len(), 1);
        let mutation = &due[0];
        assert_eq!(mutation.id, id);
        assert_eq!(mutation.method, "POST");
        assert_eq!(mutation.path, "/api/cart/items");
        assert_eq!(mutation.body, br#"{"product_id":42}"#);
        assert_eq!(mutation.attempts, 0);

        let request = mutation.to_request();
        assert_eq!(request.header("content-type"), Some("application/json"));

        store.remove(id).unwrap();
        assert_eq!(store.pending_count().unwrap(), 0);
    }

    #[test]
    fn test_sqlite_store_roundtrip() {
        let store = SqliteMutationStore::open_in_memory().unwrap();
        assert_store_roundtrip(&store);
    }

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryMutationStore::new();
        assert_store_roundtrip(&store);
    }

    #[test]
    fn test_reschedule_defers_mutation() {
        let store = SqliteMutationStore::open_in_memory().unwrap();
        let id = store.enqueue(&mutation_request()).unwrap();
        let now = current_timestamp_ms();

        store.reschedule(id, 1, now + 60_000).unwrap();

        // Not due now, due after the scheduled time
        assert!(store.due(now).unwrap().is_empty());
        let later = store.due(now + 60_001).unwrap();
        assert_eq!(later.len(), 1);
        assert_eq!(later[0].attempts, 1);
    }

    #[test]
    fn test_dead_letter_preserves_payload() {
        let store = SqliteMutationStore::open_in_memory().unwrap();
        let id = store.enqueue(&mutation_request()).unwrap();
        let mutation = store.due(current_timestamp_ms()).unwrap().remove(0);

        store.dead_letter(&mutation).unwrap();
        store.remove(id).unwrap();

        assert_eq!(store.pending_count().unwrap(), 0);
        assert_eq!(store.dead_letter_count().unwrap(), 1);
    }

    #[test]
    fn test_sqlite_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queue.db");

        {
            let store = SqliteMutationStore::open(&path).unwrap();
            store.enqueue(&mutation_request()).unwrap();
        }

        let reopened = SqliteMutationStore::open(&path).unwrap();
        assert_eq!(reopened.pending_count().unwrap(), 1);
        let due = reopened.due(current_timestamp_ms()).unwrap();
        assert_eq!(due[0].path, "/api/cart/items");
    }
}
