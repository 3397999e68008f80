//! Moving data between stores.

use anyhow::{Context, Result};
use kvshift::{MoveStore, SharedStore, Store, backup_to_file, copy_all};
use std::path::Path;
use tracing::info;

pub async fn backup(store: &SharedStore, path: &Path) -> Result<()> {
    let count = backup_to_file(store.as_ref(), path)
        .await
        .with_context(|| format!("Failed to write backup to {}", path.display()))?;
    println!("Backed up {count} keys to {}", path.display());
    Ok(())
}

pub async fn copy(store: &SharedStore, target: SharedStore) -> Result<()> {
    let count = copy_all(store.as_ref(), target.as_ref())
        .await
        .context("Copy failed")?;
    println!("Copied {count} keys");
    Ok(())
}

pub async fn migrate(store: SharedStore, target: SharedStore) -> Result<()> {
    let mover = MoveStore::new(store, target);
    let moved = mover.move_all().await.context("Migration failed")?;
    let phase = mover.phase().await;
    info!(?phase, moved, "migration finished");

    let count = mover
        .destination()
        .collect_keys()
        .await
        .context("Failed to count migrated keys")?
        .len();
    println!("Migration {phase:?}: {count} keys in the new store");
    Ok(())
}
