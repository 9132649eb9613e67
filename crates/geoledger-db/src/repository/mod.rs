//! # Repository Module
//!
//! Database repository implementations for geoledger.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Ledger Repository                                    │
//! │                                                                         │
//! │  SyncEngine                                                            │
//! │       │                                                                 │
//! │       │  db.ledger().append(&record)                                   │
//! │       │  ↓                                                              │
//! │       ▼                                                                 │
//! │  LocalLedger                                                           │
//! │  ├── append(&self, record)                                             │
//! │  ├── pending(&self)                                                    │
//! │  ├── count_pending(&self)                                              │
//! │  └── drain(&self, deliver)                                             │
//! │       │                                                                 │
//! │       │  SQL Query (one connection per call)                            │
//! │       ▼                                                                 │
//! │  location_log table                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`LocalLedger`](ledger::LocalLedger) - FIFO buffer of undelivered records

pub mod ledger;
