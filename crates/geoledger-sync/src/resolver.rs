//! # Location Resolver
//!
//! Produces one `LocationRecord` per cycle, preferring the proximity estimate
//! and falling back to the address lookup.
//!
//! ## Resolution Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        resolve()                                        │
//! │                                                                         │
//! │  scanner.scan()                                                        │
//! │       │                                                                 │
//! │       ├── error / empty ─────────────────────────────┐                  │
//! │       ▼                                              │                  │
//! │  proximity.locate(access_points)                     │                  │
//! │       │                                              │                  │
//! │       ├── Ok(estimate) ──► return                    │                  │
//! │       └── any error (no key, HTTP, malformed) ───────┤                  │
//! │                                                      ▼                  │
//! │                                        address.locate()                 │
//! │                                             │                           │
//! │                                             ├── Ok ──► return           │
//! │                                             ├── invalid ► NoLocationAvailable │
//! │                                             └── HTTP ───► Network       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use geoledger_core::LocationRecord;

use crate::error::SyncResult;
use crate::locator::{AddressLocator, ProximityLocator};
use crate::scanner::ProximityScanner;

/// Anything that can produce the current location.
#[async_trait]
pub trait LocationSource: Send + Sync {
    async fn resolve(&self) -> SyncResult<LocationRecord>;
}

/// Proximity-first resolver with address fallback.
pub struct LocationResolver {
    scanner: Arc<dyn ProximityScanner>,
    proximity: ProximityLocator,
    address: AddressLocator,
}

impl LocationResolver {
    pub fn new(
        scanner: Arc<dyn ProximityScanner>,
        proximity: ProximityLocator,
        address: AddressLocator,
    ) -> Self {
        LocationResolver {
            scanner,
            proximity,
            address,
        }
    }

    async fn try_proximity(&self) -> Option<LocationRecord> {
        let access_points = match self.scanner.scan().await {
            Ok(aps) if aps.is_empty() => {
                debug!("No access points in range");
                return None;
            }
            Ok(aps) => aps,
            Err(e) => {
                warn!(kind = e.kind(), error = %e, "Access point scan failed");
                return None;
            }
        };

        match self.proximity.locate(&access_points).await {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(kind = e.kind(), error = %e, "Proximity lookup failed, using address lookup");
                None
            }
        }
    }
}

#[async_trait]
impl LocationSource for LocationResolver {
    async fn resolve(&self) -> SyncResult<LocationRecord> {
        if let Some(record) = self.try_proximity().await {
            return Ok(record);
        }

        self.address.locate().await
    }
}
