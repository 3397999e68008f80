//! String key-value stores with pluggable backends.
//!
//! Every backend implements [`Store`]:
//!
//! - **FileStore**: one compact JSON document, replaced atomically on write
//! - **SqlStore**: a single SQLite table, one connection per call
//! - **MemoryStore**: fast, non-persistent storage (testing/embedding)
//!
//! An empty value is the same as an absent key.
//!
//! # Example
//!
//! ```ignore
//! use kvshift::store::{FileStore, SqlStore, Store};
//!
//! let store = FileStore::new("json-store.json");
//! store.set("welcome/channel", "1234").await?;
//!
//! let store = SqlStore::new("kvshift.sqlite3");
//! let value = store.get("welcome/channel").await?; // "" when unset
//! ```

mod backend;
mod file;
mod memory;
mod sql;


// Re-export the public API
pub use backend::{KeyStream, SharedStore, Store};
pub use file::{DEFAULT_FILENAME, FileStore};
pub use memory::MemoryStore;
pub use sql::{DEFAULT_ADDRESS, SqlStore};
