//! Server configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser};
use metricol_core::FileStoreConfig;

/// metricol server command line arguments.
#[derive(Debug, Parser)]
#[command(name = "metricol-server")]
#[command(about = "Collects metrics reported by metricol agents")]
pub struct Args {
    /// Address to listen on for HTTP requests.
    #[arg(short, long, env = "ADDRESS", default_value = "localhost:8080")]
    pub address: String,

    /// Seconds between snapshot writes. 0 writes after every update.
    #[arg(short = 'i', long, env = "STORE_INTERVAL", default_value_t = 300)]
    pub store_interval: u64,

    /// Snapshot file. Empty disables the file store.
    #[arg(short, long, env = "FILE_STORAGE_PATH", default_value = "")]
    pub file_storage_path: String,

    /// Load the snapshot file on start.
    #[arg(short, long, env = "RESTORE", default_value_t = true, action = ArgAction::Set)]
    pub restore: bool,

    /// SQLite database path. Takes precedence over the snapshot file.
    #[arg(short = 'd', long, env = "DATABASE_DSN", default_value = "")]
    pub database_dsn: String,

    /// Shared HMAC-SHA256 key. Empty disables hash checks.
    #[arg(short, long, env = "KEY", default_value = "")]
    pub key: String,

    /// Log filter used when RUST_LOG is unset.
    #[arg(long, env = "LOG_LVL", default_value = "info")]
    pub log_level: String,
}

/// Which store the server runs on.
#[derive(Debug, Clone)]
pub enum Backend {
    /// SQLite database at this path.
    Database(String),
    /// Snapshot-backed memory store.
    File(FileStoreConfig),
    /// Plain memory store.
    Memory,
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on.
    pub address: String,
    /// Time between snapshot writes; zero for synchronous writes.
    pub store_interval: Duration,
    /// Snapshot file.
    pub file_storage_path: Option<PathBuf>,
    /// Load the snapshot on start.
    pub restore: bool,
    /// SQLite database path.
    pub database_dsn: Option<String>,
    /// Shared HMAC key.
    pub key: Option<String>,
}

impl ServerConfig {
    /// Set the listen address.
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    /// Use a snapshot file.
    pub fn with_file_storage(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_storage_path = Some(path.into());
        self
    }

    /// Set the snapshot interval.
    pub fn with_store_interval(mut self, interval: Duration) -> Self {
        self.store_interval = interval;
        self
    }

    /// Set whether the snapshot is restored on start.
    pub fn with_restore(mut self, restore: bool) -> Self {
        self.restore = restore;
        self
    }

    /// Use a SQLite database.
    pub fn with_database(mut self, dsn: impl Into<String>) -> Self {
        self.database_dsn = Some(dsn.into());
        self
    }

    /// Set the shared key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// The store to run on: database, then snapshot file, then memory.
    pub fn backend(&self) -> Backend {
        if let Some(dsn) = &self.database_dsn {
            return Backend::Database(dsn.clone());
        }
        if let Some(path) = &self.file_storage_path {
            return Backend::File(
                FileStoreConfig::new(path)
                    .with_restore(self.restore)
                    .with_store_interval(self.store_interval),
            );
        }
        Backend::Memory
    }
}

fn non_empty(value: &str) -> Option<String> {
    Some(value.to_string()).filter(|v| !v.is_empty())
}

impl From<&Args> for ServerConfig {
    fn from(args: &Args) -> Self {
        Self {
            address: args.address.clone(),
            store_interval: Duration::from_secs(args.store_interval),
            file_storage_path: non_empty(&args.file_storage_path).map(PathBuf::from),
            restore: args.restore,
            database_dsn: non_empty(&args.database_dsn),
            key: non_empty(&args.key),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "localhost:8080".to_string(),
            store_interval: Duration::from_secs(300),
            file_storage_path: None,
            restore: true,
            database_dsn: None,
            key: None,
        }
    }
}
