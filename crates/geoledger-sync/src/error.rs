//! # Sync Error Types
//!
//! Error types for resolution, delivery and buffering.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    SyncError Taxonomy                                   │
//! │                                                                         │
//! │  CredentialUnavailable ── proximity path only → fall back to address   │
//! │  NoLocationAvailable  ─── skip the cycle                               │
//! │  Network              ─── fall back to ledger / stop a drain pass      │
//! │  Storage              ─── fatal at startup, skip cycle when running    │
//! │                                                                         │
//! │  InvalidConfig / ConfigLoadFailed ── startup only                      │
//! │  Internal             ─── bugs, never expected                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Sync error type covering every failure a resolution cycle can hit.
#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Resolution Errors
    // =========================================================================
    /// No credential provider yielded an API key.
    #[error("API key unavailable: {0}")]
    CredentialUnavailable(String),

    /// Neither lookup produced a usable location.
    ///
    /// ## When This Occurs
    /// - Address lookup answered without `ip`/`city`/`region`/`country`
    /// - One of those fields was empty
    /// - Address lookup body was not a JSON object
    #[error("No location available: {0}")]
    NoLocationAvailable(String),

    // =========================================================================
    // Transport Errors
    // =========================================================================
    /// DNS, connect, timeout, non-2xx status or unusable echo body.
    #[error("Network error: {0}")]
    Network(String),

    // =========================================================================
    // Storage Errors
    // =========================================================================
    /// The local ledger could not be read or written.
    #[error("Storage error: {0}")]
    Storage(String),

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid tracker configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Failed to read or parse a config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Internal error: {0}")]
    Internal(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<geoledger_db::DbError> for SyncError {
    fn from(err: geoledger_db::DbError) -> Self {
        SyncError::Storage(err.to_string())
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        SyncError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Internal(format!("JSON encoding failed: {}", err))
    }
}

impl From<url::ParseError> for SyncError {
    fn from(err: url::ParseError) -> Self {
        SyncError::InvalidConfig(format!("invalid URL: {}", err))
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl SyncError {
    /// Short label used as the `kind` field in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            SyncError::CredentialUnavailable(_) => "credential_unavailable",
            SyncError::NoLocationAvailable(_) => "no_location_available",
            SyncError::Network(_) => "network",
            SyncError::Storage(_) => "storage",
            SyncError::InvalidConfig(_) => "invalid_config",
            SyncError::ConfigLoadFailed(_) => "config_load_failed",
            SyncError::Internal(_) => "internal",
        }
    }

    /// Returns true if the same operation may succeed next cycle.
    ///
    /// Only network failures qualify; everything else needs a human.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::Network(_))
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidConfig(_) | SyncError::ConfigLoadFailed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_retryable() {
        assert!(SyncError::Network("timeout".into()).is_retryable());
        assert!(!SyncError::NoLocationAvailable("city empty".into()).is_retryable());
        assert!(!SyncError::Storage("disk full".into()).is_retryable());
    }

    #[test]
    fn test_db_error_becomes_storage() {
        let err: SyncError = geoledger_db::DbError::QueryFailed("database is locked".into()).into();
        assert_eq!(err.kind(), "storage");
        assert!(err.to_string().contains("database is locked"));
    }

    #[test]
    fn test_config_errors() {
        let err: SyncError = toml::from_str::<toml::Value>("= nope").unwrap_err().into();
        assert!(err.is_config_error());
        assert!(!SyncError::Network("x".into()).is_config_error());
    }
}
