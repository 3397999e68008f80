//! In-memory storage backend.
//!
//! Provides a fast, non-persistent store using DashMap for concurrent
//! access. Used for tests, embedding, and as a migration scratch target.

use super::backend::{KeyStream, Store};
use crate::error::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use futures::StreamExt;
use futures::stream;
use std::collections::BTreeMap;

/// In-memory key-value backend using DashMap.
///
/// All data is lost when the process exits.
///
/// # Thread Safety
///
/// `MemoryStore` uses `DashMap` internally for lock-free concurrent access.
/// Clones are independent copies, so share it through an `Arc`.
#[derive(Clone, Default)]
pub struct MemoryStore {
    data: DashMap<String, String>,
}

impl MemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `entries`. Empty values are skipped.
    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let data = DashMap::new();
        for (key, value) in entries {
            let value = value.into();
            if !value.is_empty() {
                data.insert(key.into(), value);
            }
        }
        Self { data }
    }

    /// Returns the number of entries in the store.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns a sorted copy of every entry.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.data
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, key: &str) -> Result<String> {
        Ok(self
            .data
            .get(key)
            .map(|entry| entry.value().clone())
            .unwrap_or_default())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        if value.is_empty() {
            self.data.remove(key);
        } else {
            self.data.insert(key.to_string(), value.to_string());
        }
        Ok(())
    }

    fn keys(&self) -> KeyStream<'_> {
        // Snapshot on first poll so the stream never holds a shard lock.
        stream::once(async move {
            let keys: Vec<Result<String>> =
                self.data.iter().map(|entry| Ok(entry.key().clone())).collect();
            stream::iter(keys)
        })
        .flatten()
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_set() {
        let store = MemoryStore::new();

        store.set("key1", "value1").await.unwrap();
        assert_eq!(store.get("key1").await.unwrap(), "value1");
    }

    #[tokio::test]
    async fn test_get_nonexistent() {
        let store = MemoryStore::new();
        assert_eq!(store.get("nonexistent").await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_empty_value_deletes() {
        let store = MemoryStore::new();

        store.set("key1", "value1").await.unwrap();
        store.set("key1", "").await.unwrap();

        assert_eq!(store.get("key1").await.unwrap(), "");
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_keys() {
        let store = MemoryStore::new();

        store.set("a/1", "v").await.unwrap();
        store.set("a/2", "v").await.unwrap();
        store.set("b/1", "v").await.unwrap();

        let mut all = store.collect_keys().await.unwrap();
        all.sort();
        assert_eq!(all, vec!["a/1", "a/2", "b/1"]);
    }

    #[tokio::test]
    async fn test_keys_is_lazy() {
        let store = MemoryStore::new();
        let keys = store.keys();

        // Written after the stream was created but before it was polled.
        store.set("late", "v").await.unwrap();

        let collected: Vec<String> = keys.map(|k| k.unwrap()).collect().await;
        assert_eq!(collected, vec!["late"]);
    }

    #[tokio::test]
    async fn test_from_entries_skips_empty() {
        let store = MemoryStore::from_entries([("a", "1"), ("b", "")]);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("a").await.unwrap(), "1");
    }

    #[tokio::test]
    async fn test_overwrite() {
        let store = MemoryStore::new();

        store.set("key", "value1").await.unwrap();
        store.set("key", "value2").await.unwrap();

        assert_eq!(store.get("key").await.unwrap(), "value2");
    }
}
