//! Swappable key-value storage with live migration.
//!
//! An application keeps all of its persisted state behind one [`Store`]
//! handle. Backends can be swapped at startup ([`StoreConfig`]) or while the
//! application is running ([`MoveStore`]).
//!
//! # Quick Start
//!
//! ```ignore
//! use kvshift::prelude::*;
//! use std::sync::Arc;
//!
//! let store = StoreConfig::from_env()?.open();
//! store.set("guild/prefix", "!").await?;
//! assert_eq!(store.get("guild/prefix").await?, "!");
//!
//! // Move everything into SQLite without downtime.
//! let mover = Arc::new(MoveStore::new(store, Arc::new(SqlStore::new("kvshift.sqlite3"))));
//! mover.move_all().await?;
//! ```
//!
//! # Modules
//!
//! - [`store`] - The `Store` trait and its file, SQL and memory backends
//! - [`migrate`] - Live migration and offline copy/backup
//! - [`paginate`] - Packing long listings into bounded pages
//! - [`config`] - Environment and TOML backend selection

pub mod config;
pub mod migrate;
pub mod paginate;
pub mod prelude;
pub mod store;

mod error;

pub use error::{Error, Result};

pub use config::{BackendKind, StoreConfig};
pub use migrate::{MoveStore, Phase, backup_to_file, copy_all};
pub use paginate::Paginator;
pub use store::{FileStore, KeyStream, MemoryStore, SharedStore, SqlStore, Store};
