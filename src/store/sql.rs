//! SQLite-backed storage backend.
//!
//! Rows live in a single `store` table. Every call opens its own connection
//! and closes it before returning; the table is created lazily before
//! writes, and a missing table reads as an empty store.

use super::backend::{KeyStream, Store};
use crate::error::{Error, Result};
use async_trait::async_trait;
use futures::StreamExt;
use futures::stream;
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Connection address used when no override is configured.
pub const DEFAULT_ADDRESS: &str = "kvshift.sqlite3";

/// Keys buffered between the cursor task and the consumer.
const KEY_CURSOR_BUFFER: usize = 64;

/// How long a connection waits on a locked database before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS store (
    key TEXT NOT NULL PRIMARY KEY,
    value TEXT NOT NULL
)";

const UPSERT: &str = "INSERT INTO store (key, value)
    VALUES (?1, ?2)
    ON CONFLICT (key) DO UPDATE
    SET value = excluded.value";

const DELETE: &str = "DELETE FROM store WHERE key = ?1";

const SELECT_VALUE: &str = "SELECT value FROM store WHERE key = ?1 LIMIT 1";

const SELECT_KEYS: &str = "SELECT key FROM store";

/// SQLite-backed key-value backend.
///
/// The address is a database path or `file:` URI. Because each call opens a
/// fresh connection, `:memory:` addresses do not keep data between calls.
///
/// # Thread Safety
///
/// `SqlStore` holds no connection state. Concurrent calls are isolated by
/// SQLite transactions.
#[derive(Clone, Debug)]
pub struct SqlStore {
    address: String,
}

impl SqlStore {
    /// Creates a store for the database at `address`.
    ///
    /// Does not connect or create the table.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }

    /// Returns the connection address.
    pub fn address(&self) -> &str {
        &self.address
    }

    fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.address)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        // WAL lets a long key cursor run without blocking writers.
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })?;
        Ok(conn)
    }

    fn get_sync(&self, key: &str) -> Result<String> {
        let conn = self.connect()?;
        let value = conn
            .query_row(SELECT_VALUE, params![key], |row| row.get::<_, String>(0))
            .optional();
        match value {
            Ok(value) => Ok(value.unwrap_or_default()),
            Err(e) if is_missing_table(&e) => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn set_sync(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.connect()?;
        conn.execute_batch(CREATE_TABLE)?;

        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if value.is_empty() {
            tx.execute(DELETE, params![key])?;
        } else {
            tx.execute(UPSERT, params![key, value])?;
        }
        tx.commit()?;
        debug!(address = %self.address, key, deleted = value.is_empty(), "sql store written");
        Ok(())
    }

    /// Walks every key inside one read transaction, pushing each into `tx`.
    ///
    /// Stops early once the receiving stream has been dropped.
    fn stream_keys_sync(&self, tx: &mpsc::Sender<Result<String>>) -> Result<()> {
        let mut conn = self.connect()?;
        let txn = conn.transaction_with_behavior(TransactionBehavior::Deferred)?;
        let mut stmt = match txn.prepare(SELECT_KEYS) {
            Ok(stmt) => stmt,
            Err(e) if is_missing_table(&e) => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        for key in rows {
            if tx.blocking_send(key.map_err(Error::from)).is_err() {
                break;
            }
        }
        Ok(())
    }
}

impl Default for SqlStore {
    fn default() -> Self {
        Self::new(DEFAULT_ADDRESS)
    }
}

/// A missing `store` table means the store has never been written.
fn is_missing_table(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(_, Some(msg))
        | rusqlite::Error::SqlInputError { msg, .. } => msg.starts_with("no such table"),
        _ => false,
    }
}

/// Yields the keys sent by the cursor task, then surfaces a panic of that
/// task as a final `Err` so a truncated walk never looks complete.
fn drain_cursor(rx: mpsc::Receiver<Result<String>>, cursor: JoinHandle<()>) -> KeyStream<'static> {
    stream::unfold(Some((rx, cursor)), |state| async move {
        let (mut rx, cursor) = state?;
        match rx.recv().await {
            Some(item) => Some((item, Some((rx, cursor)))),
            None => match cursor.await {
                Ok(()) => None,
                Err(e) => Some((Err(e.into()), None)),
            },
        }
    })
    .boxed()
}

#[async_trait]
impl Store for SqlStore {
    async fn get(&self, key: &str) -> Result<String> {
        let store = self.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || store.get_sync(&key)).await?
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let store = self.clone();
        let key = key.to_string();
        let value = value.to_string();
        tokio::task::spawn_blocking(move || store.set_sync(&key, &value)).await?
    }

    fn keys(&self) -> KeyStream<'_> {
        let store = self.clone();
        stream::once(async move {
            let (tx, rx) = mpsc::channel(KEY_CURSOR_BUFFER);
            let cursor = tokio::task::spawn_blocking(move || {
                if let Err(e) = store.stream_keys_sync(&tx) {
                    warn!(address = %store.address, error = %e, "key cursor failed");
                    let _ = tx.blocking_send(Err(e));
                }
            });
            drain_cursor(rx, cursor)
        })
        .flatten()
        .boxed()
    }
}
