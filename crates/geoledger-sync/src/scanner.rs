//! # Proximity Scanner
//!
//! Platform seam for discovering nearby wireless access points. The
//! implementation is picked once at wiring time; nothing downstream branches
//! on platform.
//!
//! ## Backends
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ScannerBackend::Iwlist  →  IwlistScanner  (`iwlist <iface> scan`)     │
//! │  ScannerBackend::None    →  NullScanner    (always empty)              │
//! │                                                                         │
//! │  An empty list or a scan error both send the resolver to the address   │
//! │  lookup, so a missing tool only costs precision.                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use std::sync::Arc;
use tokio::process::Command;
use tracing::debug;

use geoledger_core::AccessPoint;

use crate::config::{ScannerBackend, ScannerSettings};
use crate::error::{SyncError, SyncResult};

/// Reports nearby access points. An empty list is a normal answer.
#[async_trait]
pub trait ProximityScanner: Send + Sync {
    async fn scan(&self) -> SyncResult<Vec<AccessPoint>>;
}

/// Builds the scanner selected in config.
pub fn from_settings(settings: &ScannerSettings) -> Arc<dyn ProximityScanner> {
    match settings.backend {
        ScannerBackend::Iwlist => Arc::new(IwlistScanner::new(&settings.interface)),
        ScannerBackend::None => Arc::new(NullScanner),
    }
}

// =============================================================================
// Null Scanner
// =============================================================================

/// Scanner for hosts with no wireless scanning support. Always reports no
/// access points, which sends the resolver straight to the address lookup.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullScanner;

#[async_trait]
impl ProximityScanner for NullScanner {
    async fn scan(&self) -> SyncResult<Vec<AccessPoint>> {
        Ok(Vec::new())
    }
}

// =============================================================================
// iwlist Scanner
// =============================================================================

/// Linux scanner backed by the wireless-tools `iwlist` command.
#[derive(Debug, Clone)]
pub struct IwlistScanner {
    interface: String,
}

impl IwlistScanner {
    pub fn new(interface: impl Into<String>) -> Self {
        IwlistScanner {
            interface: interface.into(),
        }
    }
}

#[async_trait]
impl ProximityScanner for IwlistScanner {
    async fn scan(&self) -> SyncResult<Vec<AccessPoint>> {
        let output = Command::new("iwlist")
            .arg(&self.interface)
            .arg("scan")
            .output()
            .await
            .map_err(|e| SyncError::Internal(format!("cannot run iwlist: {}", e)))?;

        if !output.status.success() {
            return Err(SyncError::Internal(format!(
                "iwlist {} scan exited with {}: {}",
                self.interface,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let access_points = parse_iwlist(&String::from_utf8_lossy(&output.stdout));
        debug!(
            interface = %self.interface,
            found = access_points.len(),
            "Access point scan complete"
        );
        Ok(access_points)
    }
}

/// Extracts `(Address, Signal level)` pairs from `iwlist scan` output.
///
/// Cells whose signal is not reported in dBm are skipped.
pub fn parse_iwlist(output: &str) -> Vec<AccessPoint> {
    let mut access_points = Vec::new();
    let mut current: Option<String> = None;

    for line in output.lines() {
        if let Some((_, address)) = line.split_once("Address:") {
            current = Some(address.trim().to_string());
            continue;
        }

        if let Some((_, level)) = line.split_once("Signal level=") {
            let Some(identifier) = current.take() else {
                continue;
            };
            let mut parts = level.split_whitespace();
            let value = parts.next().and_then(|v| v.parse::<i32>().ok());
            if let (Some(dbm), Some("dBm")) = (value, parts.next()) {
                access_points.push(AccessPoint::new(identifier, dbm));
            }
        }
    }

    access_points
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"wlan0     Scan completed :
          Cell 01 - Address: 00:11:22:33:44:55
                    Channel:6
                    Frequency:2.437 GHz (Channel 6)
                    Quality=47/70  Signal level=-63 dBm
                    Encryption key:on
                    ESSID:"HomeNet"
          Cell 02 - Address: 66:77:88:99:AA:BB
                    Channel:11
                    Quality=30/70  Signal level=-80 dBm
                    ESSID:"Cafe"
          Cell 03 - Address: CC:DD:EE:FF:00:11
                    Quality:40/100  Signal level=40/100
"#;

    #[test]
    fn test_parse_iwlist() {
        let found = parse_iwlist(SAMPLE);

        assert_eq!(
            found,
            vec![
                AccessPoint::new("00:11:22:33:44:55", -63),
                AccessPoint::new("66:77:88:99:AA:BB", -80),
            ]
        );
    }

    #[test]
    fn test_parse_empty_scan() {
        assert!(parse_iwlist("wlan0     No scan results\n").is_empty());
    }

    #[tokio::test]
    async fn test_null_scanner_is_empty() {
        assert!(NullScanner.scan().await.unwrap().is_empty());
    }
}
