//! # Database Handle
//!
//! Connection setup for the SQLite ledger file.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Per-Operation Connections                          │
//! │                                                                         │
//! │  Tracker Startup                                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbConfig::new(path)       ← Configure file + busy timeout             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::open(config)    ← Build options + create table              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐                           │
//! │  │  SqliteConnectOptions (no open handle)  │                           │
//! │  └─────────────────────────────────────────┘                           │
//! │       │                                                                 │
//! │       │  each append / pending / drain                                 │
//! │       ▼                                                                 │
//! │  connect() ──► run statements ──► close()                              │
//! │                                                                         │
//! │  Nothing stays open across the (hour-long) sleep interval.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## WAL Mode
//! SQLite WAL (Write-Ahead Logging) mode is enabled so an external reader
//! inspecting the ledger does not block the tracker's writes.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqliteSynchronous};
use sqlx::{ConnectOptions, Connection, SqliteConnection};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::ledger::LocalLedger;

// =============================================================================
// Configuration
// =============================================================================

/// Database configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/path/to/location_log.db")
///     .busy_timeout(Duration::from_secs(10));
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite database file.
    pub database_path: PathBuf,

    /// How long a statement waits on a locked file before failing.
    /// Default: 5 seconds
    pub busy_timeout: Duration,

    /// Whether to create missing parent directories on open.
    /// Default: true
    pub create_dirs: bool,
}

impl DbConfig {
    /// Creates a new database configuration with the given path.
    ///
    /// The file is created on first open if it doesn't exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            busy_timeout: Duration::from_secs(5),
            create_dirs: true,
        }
    }

    /// Sets the busy timeout.
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Sets whether missing parent directories are created.
    pub fn create_dirs(mut self, create: bool) -> Self {
        self.create_dirs = create;
        self
    }
}

// =============================================================================
// Database
// =============================================================================

/// Handle to the ledger file.
///
/// Cheap to clone; it holds connection options, not connections.
#[derive(Debug, Clone)]
pub struct Database {
    options: SqliteConnectOptions,
    path: PathBuf,
}

impl Database {
    /// Opens the ledger file and ensures the schema exists.
    ///
    /// ## What This Does
    /// 1. Creates the parent directory (if enabled)
    /// 2. Configures SQLite:
    ///    - WAL mode
    ///    - NORMAL synchronous
    ///    - create-if-missing
    /// 3. Opens one connection, creates `location_log`, closes it
    ///
    /// ## Returns
    /// * `Ok(Database)` - Ready-to-use database handle
    /// * `Err(DbError)` - File or schema setup failed (fatal at startup)
    pub async fn open(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Opening ledger database"
        );

        if config.create_dirs {
            if let Some(parent) = config.database_path.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await.map_err(|e| {
                        DbError::ConnectionFailed(format!(
                            "cannot create {}: {}",
                            parent.display(),
                            e
                        ))
                    })?;
                }
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(&config.database_path)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(config.busy_timeout)
            .create_if_missing(true);

        debug!("Connection options configured");

        let db = Database {
            options,
            path: config.database_path,
        };

        let mut conn = db.connect().await?;
        migrations::ensure_schema(&mut conn).await?;
        conn.close().await?;

        Ok(db)
    }

    /// Opens a fresh connection for one operation.
    ///
    /// Callers close it (or drop it) when the operation is done.
    pub async fn connect(&self) -> DbResult<SqliteConnection> {
        self.options
            .connect()
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))
    }

    /// Path of the ledger file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the ledger repository.
    pub fn ledger(&self) -> LocalLedger {
        LocalLedger::new(self.clone())
    }

    /// Checks if the file can be opened and queried.
    pub async fn health_check(&self) -> bool {
        match self.connect().await {
            Ok(mut conn) => sqlx::query("SELECT 1").execute(&mut conn).await.is_ok(),
            Err(_) => false,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Row;

    #[tokio::test]
    async fn test_open_creates_file_and_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("ledger.db");

        let db = Database::open(DbConfig::new(&path)).await.unwrap();

        assert!(path.exists());
        assert!(db.health_check().await);

        let mut conn = db.connect().await.unwrap();
        let tables: Vec<String> = sqlx::query(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
        )
        .fetch_all(&mut conn)
        .await
        .unwrap()
        .into_iter()
        .map(|row| row.get::<String, _>("name"))
        .collect();

        assert_eq!(tables, vec!["location_log".to_string()]);
    }

    #[tokio::test]
    async fn test_open_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");

        Database::open(DbConfig::new(&path)).await.unwrap();
        assert!(Database::open(DbConfig::new(&path)).await.is_ok());
    }

    #[tokio::test]
    async fn test_open_fails_when_parent_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let result = Database::open(DbConfig::new(blocker.join("ledger.db"))).await;
        assert!(matches!(result, Err(DbError::ConnectionFailed(_))));
    }

    #[test]
    fn test_config_builder() {
        let config = DbConfig::new("/tmp/ledger.db")
            .busy_timeout(Duration::from_secs(10))
            .create_dirs(false);

        assert_eq!(config.busy_timeout, Duration::from_secs(10));
        assert!(!config.create_dirs);
    }
}
