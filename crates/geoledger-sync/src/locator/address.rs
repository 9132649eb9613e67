//! # Address Locator
//!
//! Fallback lookup: the geolocation-by-address service answers for whatever
//! public address the request arrives from, so it takes no input.
//!
//! ## Outcome Mapping
//! ```text
//! transport failure / non-2xx          → Network
//! 2xx, body not a JSON object          → NoLocationAvailable
//! 2xx, ip/city/region/country missing  → NoLocationAvailable
//!      or empty
//! 2xx, all four present and non-empty  → LocationRecord
//! ```

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info};

use geoledger_core::validation::validate_address_fields;
use geoledger_core::LocationRecord;

use crate::error::{SyncError, SyncResult};

/// Client for the geolocation-by-address service.
#[derive(Debug, Clone)]
pub struct AddressLocator {
    client: reqwest::Client,
    url: String,
}

impl AddressLocator {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        AddressLocator {
            client,
            url: url.into(),
        }
    }

    /// Looks up the estimate for the caller's public address.
    pub async fn locate(&self) -> SyncResult<LocationRecord> {
        debug!(url = %self.url, "Requesting address estimate");

        let body = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let value: Value = serde_json::from_str(&body)
            .map_err(|e| SyncError::NoLocationAvailable(format!("response is not JSON: {}", e)))?;

        let fields = value.as_object().ok_or_else(|| {
            SyncError::NoLocationAvailable("response is not a JSON object".to_string())
        })?;

        validate_address_fields(fields)
            .map_err(|e| SyncError::NoLocationAvailable(e.to_string()))?;

        let record = LocationRecord::from_upstream(fields, Utc::now());
        info!(
            ip = record.source_address.as_deref().unwrap_or_default(),
            place = %record.place(),
            "Address estimate received"
        );

        Ok(record)
    }
}
