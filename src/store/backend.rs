//! The `Store` trait implemented by every backend.
//!
//! Defines the interface all key-value backends and decorators share,
//! enabling pluggable storage (JSON file, SQLite, memory, migration).

use crate::error::Result;
use async_trait::async_trait;
use futures::stream::{BoxStream, TryStreamExt};
use std::sync::Arc;

/// Lazy, fallible stream of keys produced by [`Store::keys`].
pub type KeyStream<'a> = BoxStream<'a, Result<String>>;

/// Shared handle to the active store.
pub type SharedStore = Arc<dyn Store>;

/// Backend trait for string key-value storage.
///
/// All backends must be thread-safe (`Send + Sync`) for use with tokio.
/// An empty value is the same as an absent key: `set(key, "")` deletes,
/// and `get` on a missing key returns `""`.
///
/// # Example
///
/// ```ignore
/// use kvshift::store::{MemoryStore, Store};
///
/// let store = MemoryStore::new();
/// store.set("guild/prefix", "!").await?;
/// assert_eq!(store.get("guild/prefix").await?, "!");
/// ```
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Retrieves the value for `key`.
    ///
    /// Returns `Ok(String::new())` if the key doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage operation fails.
    async fn get(&self, key: &str) -> Result<String>;

    /// Stores `value` under `key`, or deletes `key` if `value` is empty.
    ///
    /// The write is durable when this returns.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage operation fails. A failed
    /// write leaves the previous state intact.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Enumerates every present key in implementation-defined order.
    ///
    /// Nothing is read until the stream is first polled, and each call
    /// re-reads current state. Intended for occasional full scans (backup,
    /// migration, search), not hot paths.
    fn keys(&self) -> KeyStream<'_>;

    /// Deletes `key`. Equivalent to `set(key, "")`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage operation fails.
    async fn delete(&self, key: &str) -> Result<()> {
        self.set(key, "").await
    }

    /// Drains [`Store::keys`] into a vector.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by the key stream.
    async fn collect_keys(&self) -> Result<Vec<String>> {
        self.keys().try_collect().await
    }
}
