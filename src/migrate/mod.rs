//! Moving data between stores.
//!
//! - [`MoveStore`]: live migration that keeps serving reads and writes
//! - [`copy_all`]: one-shot copy of every key into another store
//! - [`backup_to_file`]: JSON snapshot of any store
//!
//! # Example
//!
//! ```ignore
//! use kvshift::migrate::MoveStore;
//! use kvshift::store::{FileStore, SqlStore};
//! use std::sync::Arc;
//!
//! let mover = Arc::new(MoveStore::new(
//!     Arc::new(FileStore::new("json-store.json")),
//!     Arc::new(SqlStore::new("kvshift.sqlite3")),
//! ));
//! mover.move_all().await?;
//! ```

mod copy;
mod move_store;


pub use copy::{backup_to_file, copy_all};
pub use move_store::{MoveStore, Phase};
