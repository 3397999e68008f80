//! kvshift command-line interface.
//!
//! Operates on the store selected by `KVSHIFT_*` environment variables or
//! the matching flags.

mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use kvshift::{BackendKind, StoreConfig, paginate};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "kvshift", version, about = "Swappable key-value store with live migration")]
struct Cli {
    #[command(flatten)]
    store: StoreArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Flags selecting a store. Unset flags fall back to the environment.
#[derive(Args, Debug)]
struct StoreArgs {
    /// TOML file with `backend`, `file` and `database_url` keys
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Backend to use: file, sql or memory
    #[arg(long, global = true)]
    backend: Option<String>,

    /// Path of the JSON document (file backend)
    #[arg(long, global = true)]
    file: Option<PathBuf>,

    /// SQLite path or URI (sql backend)
    #[arg(long, global = true)]
    database_url: Option<String>,
}

/// Flags selecting the store to copy or migrate into.
#[derive(Args, Debug)]
struct TargetArgs {
    /// Backend to move into: file, sql or memory
    #[arg(long = "to-backend")]
    backend: String,

    /// Path of the target JSON document
    #[arg(long = "to-file")]
    file: Option<PathBuf>,

    /// Target SQLite path or URI
    #[arg(long = "to-database-url")]
    database_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the value stored under a key
    Get { key: String },

    /// Store a value (an empty value deletes the key)
    Set { key: String, value: String },

    /// List every key, packed into pages
    Keys {
        #[command(flatten)]
        pages: PageArgs,
    },

    /// List keys containing a pattern
    Search {
        pattern: String,
        #[command(flatten)]
        pages: PageArgs,
    },

    /// Write a JSON snapshot of the store
    Backup { path: PathBuf },

    /// Copy every key into another store
    Copy {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Move every key into another store through a live migration
    Migrate {
        #[command(flatten)]
        target: TargetArgs,
    },
}

#[derive(Args, Debug)]
struct PageArgs {
    /// Maximum page length in characters
    #[arg(long, default_value_t = paginate::DEFAULT_LIMIT)]
    limit: usize,

    /// Separator placed between keys
    #[arg(long, default_value = paginate::DEFAULT_SEPARATOR)]
    separator: String,
}

impl StoreArgs {
    /// Resolves the config: TOML file or environment, then flags on top.
    fn resolve(&self) -> Result<StoreConfig> {
        let mut config = match &self.config {
            Some(path) => StoreConfig::load_from(path)?,
            None => StoreConfig::from_env()?,
        };
        if let Some(backend) = &self.backend {
            config.backend = backend.parse()?;
        }
        if let Some(file) = &self.file {
            config.file = file.clone();
        }
        if let Some(url) = &self.database_url {
            config.database_url = url.clone();
        }
        Ok(config)
    }
}

impl TargetArgs {
    fn resolve(&self) -> Result<StoreConfig> {
        let mut config = StoreConfig {
            backend: self.backend.parse::<BackendKind>()?,
            ..StoreConfig::default()
        };
        if let Some(file) = &self.file {
            config.file = file.clone();
        }
        if let Some(url) = &self.database_url {
            config.database_url = url.clone();
        }
        Ok(config)
    }
}

/// Initialize stderr logging so stdout carries only command output.
fn init_logging() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let store = cli.store.resolve()?.open();

    match cli.command {
        Commands::Get { key } => commands::kv::get(&store, &key).await,
        Commands::Set { key, value } => commands::kv::set(&store, &key, &value).await,
        Commands::Keys { pages } => {
            commands::kv::keys(&store, None, &pages.separator, pages.limit).await
        },
        Commands::Search { pattern, pages } => {
            commands::kv::keys(&store, Some(&pattern), &pages.separator, pages.limit).await
        },
        Commands::Backup { path } => commands::transfer::backup(&store, &path).await,
        Commands::Copy { target } => {
            commands::transfer::copy(&store, target.resolve()?.open()).await
        },
        Commands::Migrate { target } => {
            commands::transfer::migrate(store, target.resolve()?.open()).await
        },
    }
}
