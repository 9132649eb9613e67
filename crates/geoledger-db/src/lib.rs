//! # geoledger-db: Local Ledger
//!
//! The durable FIFO buffer that holds location records while the remote sink
//! is unreachable. It uses SQLite through sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        geoledger Data Flow                              │
//! │                                                                         │
//! │  SyncEngine (geoledger-sync)                                           │
//! │       │  sink unreachable → append      sink reachable → drain          │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   geoledger-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  LocalLedger  │    │  Migrations  │  │   │
//! │  │   │ (database.rs) │    │  (ledger.rs)  │    │ (idempotent) │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ ConnectOpts   │◄───│ append        │    │ location_log │  │   │
//! │  │   │ per-operation │    │ pending       │    │              │  │   │
//! │  │   │ connections   │    │ drain         │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  SQLite file (e.g. ~/.local/share/geoledger/location_log.db)    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`database`] - Connection options and the `Database` handle
//! - [`migrations`] - Idempotent schema creation
//! - [`error`] - Database error types
//! - [`repository`] - The ledger repository
//!
//! ## Usage
//!
//! ```rust,ignore
//! use geoledger_db::{Database, DbConfig};
//!
//! let db = Database::open(DbConfig::new("location_log.db")).await?;
//! let ledger = db.ledger();
//!
//! ledger.append(&record).await?;
//! let report = ledger.drain(|record| async move { sink.deliver(&record).await }).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod database;
pub mod error;
pub mod migrations;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use database::{Database, DbConfig};
pub use error::{DbError, DbResult};

pub use repository::ledger::{DrainFailure, DrainReport, LocalLedger};
