//! CLI command implementations for kvshift.
//!
//! - [`kv`] - `get`, `set`, `keys` and `search` against the active store
//! - [`transfer`] - `backup`, `copy` and `migrate` between stores

pub mod kv;
pub mod transfer;
