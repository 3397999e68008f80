//! Offline copies between stores.
//!
//! Unlike [`super::MoveStore`] these helpers do not coordinate with
//! concurrent writers; callers pause writes or accept a fuzzy snapshot.

use crate::error::Result;
use crate::store::{FileStore, Store};
use futures::TryStreamExt;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// Copies every key of `from` into `to`, returning how many were copied.
///
/// # Errors
///
/// Returns the first enumeration, read or write error. Keys copied before
/// the failure stay in `to`; re-running the copy is safe.
pub async fn copy_all<F, T>(from: &F, to: &T) -> Result<usize>
where
    F: Store + ?Sized,
    T: Store + ?Sized,
{
    let mut keys = from.keys();
    let mut copied = 0usize;
    while let Some(key) = keys.try_next().await? {
        let value = from.get(&key).await?;
        to.set(&key, &value).await?;
        copied += 1;
    }
    info!(copied, "store copied");
    Ok(copied)
}

/// Writes a JSON snapshot of `from` to `path` in a single atomic write.
///
/// An existing file at `path` is replaced, not merged.
///
/// # Errors
///
/// Returns the first enumeration or read error, or the write error. On
/// error any previous file at `path` is left intact.
pub async fn backup_to_file<F>(from: &F, path: impl AsRef<Path>) -> Result<usize>
where
    F: Store + ?Sized,
{
    let mut entries = BTreeMap::new();
    let mut keys = from.keys();
    while let Some(key) = keys.try_next().await? {
        let value = from.get(&key).await?;
        if !value.is_empty() {
            entries.insert(key, value);
        }
    }
    let count = entries.len();
    let target = FileStore::new(path);
    target.replace_all(entries).await?;
    info!(path = %target.path().display(), entries = count, "backup written");
    Ok(count)
}
