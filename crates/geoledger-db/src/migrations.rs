//! # Schema Setup
//!
//! The ledger has exactly one table and no schema versioning.
//!
//! ## How Setup Works
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Schema Setup                                       │
//! │                                                                         │
//! │  Database::open                                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  CREATE TABLE IF NOT EXISTS location_log (...)                         │
//! │       │                                                                 │
//! │       ├── table missing  → created                                     │
//! │       └── table present  → no-op (rows untouched)                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Tracker continues startup                                             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A failure here is fatal: the binary exits non-zero rather than run a
//! tracker that cannot buffer.

use sqlx::SqliteConnection;
use tracing::info;

use crate::error::{DbError, DbResult};

/// Name of the single ledger table.
pub const LEDGER_TABLE: &str = "location_log";

/// DDL for the ledger table.
///
/// `AUTOINCREMENT` keeps ids monotonic even after the newest row is deleted,
/// so `ORDER BY id` is always insertion order.
pub const CREATE_LEDGER_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS location_log (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp      TEXT NOT NULL,
    source_address TEXT,
    city           TEXT,
    region         TEXT,
    country        TEXT
)
"#;

/// Creates the ledger table if it does not exist.
///
/// ## Safety
/// - Idempotent: safe to run on every startup
/// - Existing rows are never touched
pub async fn ensure_schema(conn: &mut SqliteConnection) -> DbResult<()> {
    sqlx::query(CREATE_LEDGER_TABLE)
        .execute(conn)
        .await
        .map_err(|e| DbError::SchemaFailed(e.to_string()))?;

    info!(table = LEDGER_TABLE, "Ledger schema ready");
    Ok(())
}
