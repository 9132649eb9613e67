//! # Domain Types
//!
//! Core domain types used throughout geoledger.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌──────────────────────┐   ┌─────────────────┐  │
//! │  │  AccessPoint    │   │   LocationRecord     │   │  LedgerEntry    │  │
//! │  │  ─────────────  │   │  ──────────────────  │   │  ─────────────  │  │
//! │  │  identifier     │──►│  captured_at (secs)  │──►│  id (autoinc)   │  │
//! │  │  signal_strength│   │  source_address?     │   │  record         │  │
//! │  └─────────────────┘   │  city / region /     │   └─────────────────┘  │
//! │   (scanner output)     │  country ("Unknown") │    (offline buffer)    │
//! │                        └──────────────────────┘                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Missing vs Empty
//! Upstream services may omit `city`, `region` or `country`. A missing key
//! becomes [`UNKNOWN_FIELD`]; a key that is present with an empty string is
//! kept as-is. Rejecting empties is the job of [`crate::validation`], not of
//! record construction.

use chrono::{DateTime, NaiveDateTime, SubsecRound, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CoreError, CoreResult};
use crate::{TIMESTAMP_FORMAT, UNKNOWN_FIELD};

// =============================================================================
// Access Point
// =============================================================================

/// A nearby wireless access point reported by a proximity scanner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPoint {
    /// Hardware identifier (BSSID / MAC address).
    pub identifier: String,

    /// Observed signal strength in dBm.
    pub signal_strength: i32,
}

impl AccessPoint {
    /// Creates an access point observation.
    pub fn new(identifier: impl Into<String>, signal_strength: i32) -> Self {
        AccessPoint {
            identifier: identifier.into(),
            signal_strength,
        }
    }
}

// =============================================================================
// Location Record
// =============================================================================

/// One location estimate, the unit of work for the ledger and the sink.
///
/// ## Field Rules
/// - `captured_at` is set at resolution time, truncated to whole seconds
/// - `source_address` is never defaulted; `None` means upstream had no `ip`
/// - `city`, `region`, `country` are never absent (see [`UNKNOWN_FIELD`])
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationRecord {
    /// When the estimate was resolved (UTC, second precision).
    #[serde(rename = "timestamp", with = "timestamp_format")]
    pub captured_at: DateTime<Utc>,

    /// Network address associated with the estimate.
    #[serde(rename = "ip")]
    pub source_address: Option<String>,

    pub city: String,
    pub region: String,
    pub country: String,
}

impl LocationRecord {
    /// Creates a record, truncating `captured_at` to whole seconds.
    pub fn new(
        captured_at: DateTime<Utc>,
        source_address: Option<String>,
        city: impl Into<String>,
        region: impl Into<String>,
        country: impl Into<String>,
    ) -> Self {
        LocationRecord {
            captured_at: captured_at.trunc_subsecs(0),
            source_address,
            city: city.into(),
            region: region.into(),
            country: country.into(),
        }
    }

    /// Builds a record from an upstream JSON object.
    ///
    /// ## Defaulting
    /// ```text
    /// key absent / null   → "Unknown"   (city, region, country)
    /// key = ""            → ""          (kept verbatim)
    /// "ip" absent / null  → None        (never defaulted)
    /// ```
    pub fn from_upstream(fields: &Map<String, Value>, captured_at: DateTime<Utc>) -> Self {
        LocationRecord::new(
            captured_at,
            fields.get("ip").and_then(value_text),
            text_or_unknown(fields, "city"),
            text_or_unknown(fields, "region"),
            text_or_unknown(fields, "country"),
        )
    }

    /// Capture time in the storage/wire text format.
    pub fn timestamp(&self) -> String {
        format_timestamp(&self.captured_at)
    }

    /// Short human-readable place, used in log lines.
    pub fn place(&self) -> String {
        format!("{}, {}", self.city, self.country)
    }
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn text_or_unknown(fields: &Map<String, Value>, key: &str) -> String {
    fields
        .get(key)
        .and_then(value_text)
        .unwrap_or_else(|| UNKNOWN_FIELD.to_string())
}

// =============================================================================
// Ledger Entry
// =============================================================================

/// A record waiting in the local ledger.
///
/// The `id` is assigned by the store and increases monotonically, so ordering
/// by `id` is insertion (FIFO) order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub id: i64,
    pub record: LocationRecord,
}

// =============================================================================
// Timestamp Helpers
// =============================================================================

/// Formats a timestamp as `YYYY-MM-DD HH:MM:SS`.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parses a `YYYY-MM-DD HH:MM:SS` timestamp as UTC.
pub fn parse_timestamp(value: &str) -> CoreResult<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|e| CoreError::InvalidTimestamp {
            value: value.to_string(),
            reason: e.to_string(),
        })
}

/// Serde adapter for [`TIMESTAMP_FORMAT`] text timestamps.
pub mod timestamp_format {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_timestamp(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_timestamp(&raw).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
