//! # geoledger-core: Pure Location Types
//!
//! The domain model shared by the ledger and the sync engine. Everything in
//! here is deterministic and free of I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        geoledger Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 geoledger-sync (resolver, engine)               │   │
//! │  │   scanner ──► proximity lookup ──► address lookup ──► sink      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ geoledger-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────────────┐  ┌──────────────┐  ┌──────────────────┐ │   │
//! │  │   │      types       │  │  validation  │  │      error       │ │   │
//! │  │   │  LocationRecord  │  │  mandatory   │  │  ValidationError │ │   │
//! │  │   │  LedgerEntry     │  │  fields      │  │  CoreError       │ │   │
//! │  │   │  AccessPoint     │  │              │  │                  │ │   │
//! │  │   └──────────────────┘  └──────────────┘  └──────────────────┘ │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 geoledger-db (local ledger)                     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (LocationRecord, LedgerEntry, AccessPoint)
//! - [`error`] - Domain error types
//! - [`validation`] - Mandatory-field rule for address lookups
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::Utc;
//! use geoledger_core::LocationRecord;
//!
//! let body = serde_json::json!({ "ip": "1.2.3.4", "city": "Seattle" });
//! let record = LocationRecord::from_upstream(body.as_object().unwrap(), Utc::now());
//!
//! assert_eq!(record.city, "Seattle");
//! assert_eq!(record.region, "Unknown"); // key was missing upstream
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, ValidationError};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Sentinel stored for city/region/country when upstream omits the key.
pub const UNKNOWN_FIELD: &str = "Unknown";

/// Signal-to-noise ratio sent with every access point.
///
/// The geolocation-by-proximity request contract fixes this value; scanners
/// do not report it.
pub const SIGNAL_TO_NOISE_RATIO: i32 = 40;

/// Text format for timestamps at rest and on the wire (second precision).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Upstream keys that an address lookup must carry, non-empty.
///
/// These names are the external contract of the address service.
pub const REQUIRED_ADDRESS_FIELDS: [&str; 4] = ["ip", "city", "region", "country"];
