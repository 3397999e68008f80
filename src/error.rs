//! Error types for store operations.
//!
//! Every backend, the migration engine and the paginator report failures
//! through [`Error`]. Missing files, tables, rows and keys are never errors:
//! they read as empty.

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Store errors with structured context.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// IO error with context.
    #[error("IO error in {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// The persisted document is not a JSON object of strings.
    #[error("malformed store document: {0}")]
    Json(#[from] serde_json::Error),

    /// SQLite error wrapper.
    #[error("SQL error: {0}")]
    Sql(#[from] rusqlite::Error),

    /// A blocking task panicked or was cancelled.
    #[error("blocking task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Paginator contract violation.
    #[error("pagination error: {0}")]
    Pagination(String),

    /// A migration copy pass did not complete.
    #[error("migration failed: {reason}")]
    MigrationFailed { reason: String },
}

impl Error {
    /// Create an IO error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a pagination error.
    pub fn pagination(msg: impl Into<String>) -> Self {
        Self::Pagination(msg.into())
    }

    /// Create a migration failure.
    pub fn migration_failed(reason: impl Into<String>) -> Self {
        Self::MigrationFailed {
            reason: reason.into(),
        }
    }

    /// Returns true if this is a migration failure.
    #[must_use]
    pub fn is_migration_failure(&self) -> bool {
        matches!(self, Self::MigrationFailed { .. })
    }
}
