//! Backend selection.
//!
//! [`StoreConfig`] picks one of a closed set of backends ([`BackendKind`])
//! and the location it persists to. It can be read from the environment or
//! from a TOML file:
//!
//! | Variable | TOML key | Default |
//! |----------|----------|---------|
//! | `KVSHIFT_BACKEND` | `backend` | `file` |
//! | `KVSHIFT_FILE` | `file` | `json-store.json` |
//! | `KVSHIFT_DATABASE_URL`, then `DATABASE_URL` | `database_url` | `kvshift.sqlite3` |

use crate::error::{Error, Result};
use crate::store::{DEFAULT_ADDRESS, DEFAULT_FILENAME, FileStore, MemoryStore, SharedStore, SqlStore};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

/// Environment variable selecting the backend.
pub const ENV_BACKEND: &str = "KVSHIFT_BACKEND";

/// Environment variable overriding the file backend's path.
pub const ENV_FILE: &str = "KVSHIFT_FILE";

/// Environment variable with the SQL backend's address.
pub const ENV_DATABASE_URL: &str = "KVSHIFT_DATABASE_URL";

/// Conventional fallback for [`ENV_DATABASE_URL`].
pub const ENV_DATABASE_URL_FALLBACK: &str = "DATABASE_URL";

/// The available backends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum BackendKind {
    /// [`FileStore`]: one JSON document on local disk.
    #[default]
    File,
    /// [`SqlStore`]: a SQLite database.
    Sql,
    /// [`MemoryStore`]: nothing persisted.
    Memory,
}

impl BackendKind {
    /// Returns the configuration name of the backend.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Sql => "sql",
            Self::Memory => "memory",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" | "local" | "json" => Ok(Self::File),
            "sql" | "sqlite" => Ok(Self::Sql),
            "memory" => Ok(Self::Memory),
            other => Err(Error::config(format!(
                "unknown backend '{other}' (expected file, sql or memory)"
            ))),
        }
    }
}

impl TryFrom<String> for BackendKind {
    type Error = Error;

    fn try_from(name: String) -> Result<Self> {
        name.parse()
    }
}

/// Which backend to construct and where it persists.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub backend: BackendKind,
    pub file: PathBuf,
    pub database_url: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            file: PathBuf::from(DEFAULT_FILENAME),
            database_url: DEFAULT_ADDRESS.to_string(),
        }
    }
}

impl StoreConfig {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the backend name is unknown.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup`. Empty values count as unset.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the backend name is unknown.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.is_empty());
        let mut config = Self::default();

        if let Some(backend) = get(ENV_BACKEND) {
            config.backend = backend.parse()?;
        }
        if let Some(file) = get(ENV_FILE) {
            config.file = PathBuf::from(file);
        }
        if let Some(url) = get(ENV_DATABASE_URL).or_else(|| get(ENV_DATABASE_URL_FALLBACK)) {
            config.database_url = url;
        }
        Ok(config)
    }

    /// Loads configuration from a TOML file. Missing keys take defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| Error::io(format!("reading {}", path.display()), e))?;
        toml::from_str(&content).map_err(|e| Error::config(format!("{}: {e}", path.display())))
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or has unknown keys.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::config(e.to_string()))
    }

    /// Constructs the selected backend.
    pub fn open(&self) -> SharedStore {
        info!(backend = %self.backend, location = %self.location(), "opening store");
        match self.backend {
            BackendKind::File => Arc::new(FileStore::new(&self.file)),
            BackendKind::Sql => Arc::new(SqlStore::new(self.database_url.clone())),
            BackendKind::Memory => Arc::new(MemoryStore::new()),
        }
    }

    /// Human-readable location of the selected backend's data.
    pub fn location(&self) -> String {
        match self.backend {
            BackendKind::File => self.file.display().to_string(),
            BackendKind::Sql => self.database_url.clone(),
            BackendKind::Memory => "memory".to_string(),
        }
    }
}
