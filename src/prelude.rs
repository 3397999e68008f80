//! Convenient re-exports for common usage patterns.
//!
//! ```ignore
//! use kvshift::prelude::*;
//!
//! let store = StoreConfig::from_env()?.open();
//! let value = store.get("welcome/channel").await?;
//! ```

pub use crate::config::{BackendKind, StoreConfig};
pub use crate::error::{Error, Result};
pub use crate::migrate::{MoveStore, Phase, backup_to_file, copy_all};
pub use crate::paginate::Paginator;
pub use crate::store::{FileStore, KeyStream, MemoryStore, SharedStore, SqlStore, Store};
