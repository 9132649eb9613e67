//! # Tracker Configuration
//!
//! Configuration management for the tracker.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   Configuration Priority (high → low)                   │
//! │                                                                         │
//! │  1. Environment variables (GEOLEDGER_INTERVAL_SECS, GEOLEDGER_DB_PATH) │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  2. Config file (explicit path, or platform config dir/tracker.toml)   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  3. Built-in defaults                                                  │
//! │                                                                         │
//! │  Every source is validated together at the end of `load`.              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # tracker.toml
//! [tracker]
//! interval_secs = 3600
//!
//! [storage]
//! database_path = "/var/lib/geoledger/location_log.db"
//!
//! [probe]
//! address = "8.8.8.8:53"
//! timeout_secs = 5
//!
//! [endpoints]
//! address_geolocation_url = "https://ipinfo.io"
//! public_ip_url = "https://api.ipify.org"
//! sink_scheme = "http"
//! sink_port = 80
//! sink_path = "/v1/location"
//!
//! [credentials]
//! env_var = "GOOGLE_API_KEY"
//! config_file = "credentials.toml"
//!
//! [scanner]
//! backend = "iwlist"   # or "none"
//! interface = "wlan0"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{SyncError, SyncResult};

// =============================================================================
// Tracker Settings
// =============================================================================

/// Main loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerSettings {
    /// Pause between resolution cycles (seconds).
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
}

fn default_interval() -> u64 {
    3600
}

impl Default for TrackerSettings {
    fn default() -> Self {
        TrackerSettings {
            interval_secs: default_interval(),
        }
    }
}

// =============================================================================
// Storage Settings
// =============================================================================

/// Where the local ledger lives.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Ledger file. Defaults to the platform data dir.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
}

// =============================================================================
// Probe Settings
// =============================================================================

/// Connectivity probe target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeSettings {
    /// `host:port` dialled to decide reachability.
    #[serde(default = "default_probe_address")]
    pub address: String,

    /// Dial timeout (seconds).
    #[serde(default = "default_probe_timeout")]
    pub timeout_secs: u64,
}

fn default_probe_address() -> String {
    "8.8.8.8:53".to_string()
}

fn default_probe_timeout() -> u64 {
    5
}

impl Default for ProbeSettings {
    fn default() -> Self {
        ProbeSettings {
            address: default_probe_address(),
            timeout_secs: default_probe_timeout(),
        }
    }
}

// =============================================================================
// Endpoint Settings
// =============================================================================

/// External HTTP services.
///
/// ## Sink URL
/// The sink host is not configured. It is discovered on every delivery from
/// `public_ip_url`, then combined as `{sink_scheme}://{ip}:{sink_port}{sink_path}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointSettings {
    /// Geolocation-by-proximity service (POST, `?key=`).
    #[serde(default = "default_proximity_url")]
    pub proximity_geolocation_url: String,

    /// Geolocation-by-address service (GET).
    #[serde(default = "default_address_url")]
    pub address_geolocation_url: String,

    /// Public-IP echo service (GET, plain text).
    #[serde(default = "default_public_ip_url")]
    pub public_ip_url: String,

    #[serde(default = "default_sink_scheme")]
    pub sink_scheme: String,

    #[serde(default = "default_sink_port")]
    pub sink_port: u16,

    #[serde(default = "default_sink_path")]
    pub sink_path: String,

    /// Timeout applied to every HTTP request (seconds).
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
}

fn default_proximity_url() -> String {
    "https://www.googleapis.com/geolocation/v1/geolocate".to_string()
}

fn default_address_url() -> String {
    "https://ipinfo.io".to_string()
}

fn default_public_ip_url() -> String {
    "https://api.ipify.org".to_string()
}

fn default_sink_scheme() -> String {
    "http".to_string()
}

fn default_sink_port() -> u16 {
    80
}

fn default_sink_path() -> String {
    "/v1/location".to_string()
}

fn default_http_timeout() -> u64 {
    30
}

impl Default for EndpointSettings {
    fn default() -> Self {
        EndpointSettings {
            proximity_geolocation_url: default_proximity_url(),
            address_geolocation_url: default_address_url(),
            public_ip_url: default_public_ip_url(),
            sink_scheme: default_sink_scheme(),
            sink_port: default_sink_port(),
            sink_path: default_sink_path(),
            http_timeout_secs: default_http_timeout(),
        }
    }
}

// =============================================================================
// Credential Settings
// =============================================================================

/// Where the proximity-lookup API key may be found, in lookup order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialSettings {
    /// Environment variable holding the key.
    #[serde(default = "default_key_env")]
    pub env_var: String,

    /// TOML file with `[api] google_api_key = "..."`.
    #[serde(default = "default_credentials_file")]
    pub config_file: PathBuf,

    /// File holding a Fernet token that decrypts to the key.
    #[serde(default = "default_encrypted_file")]
    pub encrypted_file: PathBuf,

    /// Environment variable holding the Fernet key.
    #[serde(default = "default_encryption_key_env")]
    pub encryption_key_env: String,
}

fn default_key_env() -> String {
    "GOOGLE_API_KEY".to_string()
}

fn default_credentials_file() -> PathBuf {
    PathBuf::from("credentials.toml")
}

fn default_encrypted_file() -> PathBuf {
    PathBuf::from("encrypted_api_key.bin")
}

fn default_encryption_key_env() -> String {
    "ENCRYPTION_KEY".to_string()
}

impl Default for CredentialSettings {
    fn default() -> Self {
        CredentialSettings {
            env_var: default_key_env(),
            config_file: default_credentials_file(),
            encrypted_file: default_encrypted_file(),
            encryption_key_env: default_encryption_key_env(),
        }
    }
}

// =============================================================================
// Scanner Settings
// =============================================================================

/// Access point scanning backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScannerBackend {
    /// Shell out to `iwlist <interface> scan` (Linux wireless-tools).
    Iwlist,
    /// No scanning; every cycle uses the address lookup.
    None,
}

impl Default for ScannerBackend {
    fn default() -> Self {
        if cfg!(target_os = "linux") {
            ScannerBackend::Iwlist
        } else {
            ScannerBackend::None
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerSettings {
    #[serde(default)]
    pub backend: ScannerBackend,

    /// Wireless interface handed to the scanner.
    #[serde(default = "default_interface")]
    pub interface: String,
}

fn default_interface() -> String {
    "wlan0".to_string()
}

impl Default for ScannerSettings {
    fn default() -> Self {
        ScannerSettings {
            backend: ScannerBackend::default(),
            interface: default_interface(),
        }
    }
}

// =============================================================================
// Main Tracker Configuration
// =============================================================================

/// Complete tracker configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackerConfig {
    #[serde(default)]
    pub tracker: TrackerSettings,

    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub probe: ProbeSettings,

    #[serde(default)]
    pub endpoints: EndpointSettings,

    #[serde(default)]
    pub credentials: CredentialSettings,

    #[serde(default)]
    pub scanner: ScannerSettings,
}

impl TrackerConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (tracker.toml)
    /// 3. Environment variables
    ///
    /// An explicit `config_path` must exist. Only the platform default may be
    /// absent, in which case the built-in defaults apply.
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        match config_path {
            Some(path) if !path.exists() => {
                return Err(SyncError::ConfigLoadFailed(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            Some(path) => config = Self::read_file(&path)?,
            None => match Self::default_config_path() {
                Some(path) if path.exists() => config = Self::read_file(&path)?,
                path => debug!(?path, "No config file, using defaults"),
            },
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    fn read_file(path: &Path) -> SyncResult<Self> {
        info!(?path, "Loading tracker config from file");
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        if self.tracker.interval_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "interval_secs must be greater than 0".into(),
            ));
        }

        if self.probe.timeout_secs == 0 || self.endpoints.http_timeout_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "timeouts must be greater than 0".into(),
            ));
        }

        match self.probe.address.rsplit_once(':') {
            Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => {}
            _ => {
                return Err(SyncError::InvalidConfig(format!(
                    "probe address must be host:port, got: {}",
                    self.probe.address
                )))
            }
        }

        for url in [
            &self.endpoints.proximity_geolocation_url,
            &self.endpoints.address_geolocation_url,
            &self.endpoints.public_ip_url,
        ] {
            Url::parse(url)?;
        }

        if !matches!(self.endpoints.sink_scheme.as_str(), "http" | "https") {
            return Err(SyncError::InvalidConfig(format!(
                "sink_scheme must be http or https, got: {}",
                self.endpoints.sink_scheme
            )));
        }

        if self.scanner.backend == ScannerBackend::Iwlist && self.scanner.interface.trim().is_empty() {
            return Err(SyncError::InvalidConfig(
                "scanner interface must not be empty".into(),
            ));
        }

        if !self.endpoints.sink_path.starts_with('/') {
            return Err(SyncError::InvalidConfig(format!(
                "sink_path must start with '/', got: {}",
                self.endpoints.sink_path
            )));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(secs) = lookup("GEOLEDGER_INTERVAL_SECS") {
            match secs.parse::<u64>() {
                Ok(s) => {
                    debug!(interval_secs = s, "Overriding interval from environment");
                    self.tracker.interval_secs = s;
                }
                Err(_) => warn!(value = %secs, "Ignoring non-numeric GEOLEDGER_INTERVAL_SECS"),
            }
        }

        if let Some(path) = lookup("GEOLEDGER_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.storage.database_path = Some(PathBuf::from(path));
        }

        if let Some(address) = lookup("GEOLEDGER_PROBE_ADDRESS") {
            self.probe.address = address;
        }

        if let Some(scheme) = lookup("GEOLEDGER_SINK_SCHEME") {
            self.endpoints.sink_scheme = scheme;
        }

        if let Some(port) = lookup("GEOLEDGER_SINK_PORT") {
            if let Ok(p) = port.parse::<u16>() {
                debug!(port = p, "Overriding sink port from environment");
                self.endpoints.sink_port = p;
            }
        }

        if let Some(path) = lookup("GEOLEDGER_SINK_PATH") {
            self.endpoints.sink_path = path;
        }

        if let Some(interface) = lookup("GEOLEDGER_SCANNER_INTERFACE") {
            self.scanner.interface = interface;
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("org", "geoledger", "geoledger")
            .map(|dirs| dirs.config_dir().join("tracker.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Ledger file path: configured, else platform data dir, else the
    /// working directory.
    pub fn database_path(&self) -> PathBuf {
        if let Some(ref path) = self.storage.database_path {
            return path.clone();
        }

        directories::ProjectDirs::from("org", "geoledger", "geoledger")
            .map(|dirs| dirs.data_dir().join("location_log.db"))
            .unwrap_or_else(|| PathBuf::from("location_log.db"))
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.tracker.interval_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe.timeout_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.endpoints.http_timeout_secs)
    }
}
