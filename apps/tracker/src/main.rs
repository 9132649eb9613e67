//! # geoledger Tracker Entry Point
//!
//! Runs the resolve/record/drain loop as a long-lived process.
//!
//! ## Startup Sequence
//! 1. Initialize tracing (logging)
//! 2. Load configuration (`GEOLEDGER_CONFIG` or the platform config dir)
//! 3. Open the local ledger (fatal on failure)
//! 4. Wire scanner, locators, resolver, sink and probe
//! 5. Install the shutdown signal handler
//! 6. Run the sync engine until shutdown
//!
//! ## Runtime Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          geoledger-tracker                              │
//! │                                                                         │
//! │  ┌───────────────────┐        ┌──────────────────────────────────────┐ │
//! │  │ signal task       │ stop   │ SyncEngine::run                      │ │
//! │  │ ctrl-c / SIGTERM  │───────►│   resolve → record → drain → sleep   │ │
//! │  └───────────────────┘        └──────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use geoledger_db::{Database, DbConfig};
use geoledger_sync::{
    scanner, AddressLocator, CredentialChain, HttpRemoteSink, LocationResolver,
    ProximityLocator, SyncEngine, SyncEngineHandle, TcpConnectivityProbe, TrackerConfig,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting geoledger tracker"
    );

    let config_path = std::env::var_os("GEOLEDGER_CONFIG").map(PathBuf::from);
    let config = match TrackerConfig::load(config_path) {
        Ok(config) => config,
        Err(e) => {
            error!(
                kind = e.kind(),
                config_error = e.is_config_error(),
                error = %e,
                "Failed to load tracker config"
            );
            return Err(e.into());
        }
    };

    let db_path = config.database_path();
    info!(?db_path, "Opening local ledger");
    let database = Database::open(DbConfig::new(db_path)).await?;
    if !database.health_check().await {
        warn!(path = ?database.path(), "Ledger failed its health check");
    }

    match database.ledger().count_pending().await {
        Ok(0) => debug!("Ledger is empty"),
        Ok(pending) => info!(pending, "Buffered records waiting for delivery"),
        Err(e) => warn!(error = %e, "Could not count buffered records"),
    }

    let client = reqwest::Client::builder()
        .timeout(config.http_timeout())
        .build()?;

    let credentials = Arc::new(CredentialChain::from_settings(&config.credentials));

    let resolver = LocationResolver::new(
        scanner::from_settings(&config.scanner),
        ProximityLocator::new(
            client.clone(),
            &config.endpoints.proximity_geolocation_url,
            credentials,
        ),
        AddressLocator::new(client.clone(), &config.endpoints.address_geolocation_url),
    );

    let sink = HttpRemoteSink::from_settings(client, &config.endpoints);
    let probe = TcpConnectivityProbe::new(&config.probe.address, config.probe_timeout());

    let (engine, handle) = SyncEngine::new(
        Arc::new(resolver),
        database.ledger(),
        Arc::new(sink),
        Arc::new(probe),
        config.interval(),
    );

    info!(
        scanner = ?config.scanner.backend,
        probe = %config.probe.address,
        "Tracker wired"
    );

    tokio::spawn(stop_on_signal(handle));

    engine.run().await;

    info!("Tracker shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber. `RUST_LOG` overrides the default filter.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,geoledger=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Waits for ctrl-c or SIGTERM, then stops the engine.
async fn stop_on_signal(handle: SyncEngineHandle) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, stopping tracker");
    handle.shutdown().await;
}
