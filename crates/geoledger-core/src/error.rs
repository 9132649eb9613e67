//! # Error Types
//!
//! Domain-specific error types for geoledger-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  geoledger-core errors (this file)                                     │
//! │  ├── CoreError        - General domain errors                          │
//! │  └── ValidationError  - Upstream payload failed the field rule         │
//! │                                                                         │
//! │  geoledger-db errors (separate crate)                                  │
//! │  └── DbError          - Local ledger failures                          │
//! │                                                                         │
//! │  geoledger-sync errors (separate crate)                                │
//! │  └── SyncError        - Resolution / delivery / storage taxonomy       │
//! │                                                                         │
//! │  Flow: ValidationError → SyncError::NoLocationAvailable → cycle log    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core domain errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A stored timestamp could not be parsed back.
    ///
    /// ## When This Occurs
    /// - The ledger file was edited by hand
    /// - A row was written by an incompatible build
    #[error("Invalid timestamp '{value}': {reason}")]
    InvalidTimestamp { value: String, reason: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Field-level failures of the mandatory-field rule.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A required key is absent from the upstream payload.
    #[error("{field} is required")]
    Required { field: String },

    /// A required key is present but holds an empty value.
    #[error("{field} must not be empty")]
    Empty { field: String },
}

impl ValidationError {
    /// Name of the offending field.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field } | ValidationError::Empty { field } => field,
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "ip".to_string(),
        };
        assert_eq!(err.to_string(), "ip is required");

        let err = ValidationError::Empty {
            field: "city".to_string(),
        };
        assert_eq!(err.to_string(), "city must not be empty");
        assert_eq!(err.field(), "city");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "country".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
