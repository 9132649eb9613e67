//! # Validation Module
//!
//! The mandatory-field rule applied to address-based lookups.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Address Lookup Validation                          │
//! │                                                                         │
//! │  Upstream JSON { ip, city, region, country, ... }                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Step 1: every required key present?  ──── no ──► Required { field }   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Step 2: every required value non-empty? ─ no ──► Empty { field }      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  LocationRecord::from_upstream (defaulting never triggers here)        │
//! │                                                                         │
//! │  Partially valid payloads are rejected whole, never trusted in part.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use geoledger_core::validation::validate_address_fields;
//!
//! let body = serde_json::json!({ "ip": "1.2.3.4", "city": "", "region": "WA", "country": "US" });
//! assert!(validate_address_fields(body.as_object().unwrap()).is_err());
//! ```

use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::REQUIRED_ADDRESS_FIELDS;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validates an address-lookup payload.
///
/// ## Rules
/// - `ip`, `city`, `region`, `country` must all be present (JSON `null`
///   counts as absent)
/// - none of them may be the empty string (whitespace counts as a value)
///
/// Missing keys are reported before empty ones so the error names the most
/// fundamental problem.
pub fn validate_address_fields(fields: &Map<String, Value>) -> ValidationResult<()> {
    for field in REQUIRED_ADDRESS_FIELDS {
        if matches!(fields.get(field), None | Some(Value::Null)) {
            return Err(ValidationError::Required {
                field: field.to_string(),
            });
        }
    }

    for field in REQUIRED_ADDRESS_FIELDS {
        let empty = match &fields[field] {
            Value::String(s) => s.is_empty(),
            _ => false,
        };
        if empty {
            return Err(ValidationError::Empty {
                field: field.to_string(),
            });
        }
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
