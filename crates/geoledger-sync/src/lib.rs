//! # geoledger-sync: Resolution and Sync Engine
//!
//! Resolves the device's location, delivers it to the remote sink, and keeps
//! it in the local ledger whenever delivery is not possible.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     geoledger-sync Architecture                         │
//! │                                                                         │
//! │  ┌───────────────────────────────────────────────────────────────────┐ │
//! │  │                         SyncEngine                                │ │
//! │  │       resolve → check → (drain → deliver | append) → sleep        │ │
//! │  └──────┬──────────────────┬──────────────────┬──────────────┬───────┘ │
//! │         │                  │                  │              │         │
//! │         ▼                  ▼                  ▼              ▼         │
//! │  ┌──────────────┐  ┌───────────────┐  ┌──────────────┐ ┌────────────┐ │
//! │  │ Location     │  │ Connectivity  │  │ RemoteSink   │ │ LocalLedger│ │
//! │  │ Resolver     │  │ Probe         │  │ (HTTP POST)  │ │ (SQLite)   │ │
//! │  │              │  │ (TCP dial)    │  │              │ │ geoledger- │ │
//! │  │ scanner      │  └───────────────┘  │ public-IP    │ │ db         │ │
//! │  │ proximity ─┐ │                     │ echo first   │ └────────────┘ │
//! │  │ address ◄──┘ │                     └──────────────┘                │
//! │  └──────────────┘                                                      │
//! │         ▲                                                              │
//! │  ┌──────┴───────┐                                                      │
//! │  │ Credential   │ env → file → encrypted file                         │
//! │  │ Chain        │                                                      │
//! │  └──────────────┘                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`config`] - Tracker configuration (TOML + env)
//! - [`credentials`] - API key providers and fallback chain
//! - [`engine`] - The resolve/record/drain loop
//! - [`error`] - Sync error taxonomy
//! - [`locator`] - HTTP clients for the geolocation services
//! - [`probe`] - Connectivity probe
//! - [`resolver`] - Proximity-first, address-fallback resolution
//! - [`scanner`] - Access point scanner seam
//! - [`sink`] - Remote sink delivery

pub mod config;
pub mod credentials;
pub mod engine;
pub mod error;
pub mod locator;
pub mod probe;
pub mod resolver;
pub mod scanner;
pub mod sink;

// Re-exports for convenience
pub use config::TrackerConfig;
pub use credentials::{
    CredentialChain, CredentialProvider, EncryptedFileCredentialProvider, EnvCredentialProvider,
    FileCredentialProvider,
};
pub use engine::{CycleOutcome, CycleReport, DrainSummary, SyncEngine, SyncEngineHandle};
pub use error::{SyncError, SyncResult};
pub use locator::{AddressLocator, ProximityLocator};
pub use probe::{ConnectivityProbe, TcpConnectivityProbe};
pub use resolver::{LocationResolver, LocationSource};
pub use scanner::{IwlistScanner, NullScanner, ProximityScanner};
pub use sink::{HttpRemoteSink, RemoteSink};
