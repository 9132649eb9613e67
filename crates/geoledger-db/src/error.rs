//! # Database Error Types
//!
//! Error types for ledger operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SyncError::Storage (geoledger-sync)                                   │
//! │       │                                                                 │
//! │       ├── at startup   → process exits non-zero                        │
//! │       └── during cycle → logged, cycle skipped                         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Ledger operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file doesn't exist and can't be created
    /// - File permissions issue
    /// - Disk full
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Creating the `location_log` table failed.
    #[error("Schema setup failed: {0}")]
    SchemaFailed(String),

    /// Query execution failed.
    ///
    /// ## When This Occurs
    /// - Runtime SQL error (locked file, corrupt page, missing table)
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// A stored timestamp is not in `YYYY-MM-DD HH:MM:SS` form.
    #[error("Row {id} has invalid timestamp '{value}'")]
    InvalidTimestamp { id: i64, value: String },

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::Database       → DbError::QueryFailed
/// sqlx::Error::Io / Tls /
///   Configuration             → DbError::ConnectionFailed
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => DbError::QueryFailed(db_err.message().to_string()),

            sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::Configuration(_) => {
                DbError::ConnectionFailed(err.to_string())
            }

            _ => DbError::Internal(err.to_string()),
        }
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found_is_internal() {
        let err: DbError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, DbError::Internal(_)));
    }

    #[test]
    fn test_io_error_is_connection_failure() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err: DbError = sqlx::Error::Io(io).into();
        assert!(matches!(err, DbError::ConnectionFailed(_)));
    }
}
