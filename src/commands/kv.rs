//! Single-key access and key listings.

use anyhow::{Context, Result};
use futures::{StreamExt, TryStreamExt, future};
use kvshift::{KeyStream, Paginator, SharedStore, Store};

pub async fn get(store: &SharedStore, key: &str) -> Result<()> {
    let value = store
        .get(key)
        .await
        .with_context(|| format!("Failed to read key '{key}'"))?;
    if value.is_empty() {
        println!("*Empty value*");
    } else {
        println!("{value}");
    }
    Ok(())
}

pub async fn set(store: &SharedStore, key: &str, value: &str) -> Result<()> {
    store
        .set(key, value)
        .await
        .with_context(|| format!("Failed to write key '{key}'"))?;
    println!("Updated");
    Ok(())
}

/// Prints every key, or only those containing `pattern`, one page per line.
pub async fn keys(
    store: &SharedStore,
    pattern: Option<&str>,
    separator: &str,
    limit: usize,
) -> Result<()> {
    let paginator = Paginator::new(separator, limit)?;
    let keys: KeyStream<'_> = match pattern {
        Some(pattern) => store
            .keys()
            .try_filter(move |key| future::ready(key.contains(pattern)))
            .boxed(),
        None => store.keys(),
    };

    let mut pages = paginator.page_stream(keys);
    let mut printed = 0usize;
    while let Some(page) = pages.try_next().await.context("Failed to list keys")? {
        println!("{page}");
        printed += 1;
    }
    if printed == 0 {
        println!("*No keys*");
    }
    Ok(())
}
