//! # Local Ledger Repository
//!
//! Durable FIFO buffer for records the remote sink has not confirmed.
//!
//! ## Drain Pass
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Delete-After-Delivery                                │
//! │                                                                         │
//! │  SELECT * FROM location_log ORDER BY id                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  for each row (oldest first, one at a time):                    │   │
//! │  │                                                                 │   │
//! │  │    deliver(record)                                              │   │
//! │  │      ├── Ok  → DELETE FROM location_log WHERE id = ?  (now)     │   │
//! │  │      └── Err → STOP. This row and every later row stay.         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  KEY GUARANTEES:                                                       │
//! │  • A row is deleted only after its delivery was confirmed              │
//! │  • Order is preserved across passes                                    │
//! │  • A crash between deliver and delete redelivers (at-least-once)       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::{Connection, SqliteConnection};
use std::future::Future;
use tracing::{debug, info, warn};

use crate::database::Database;
use crate::error::{DbError, DbResult};
use geoledger_core::{parse_timestamp, LedgerEntry, LocationRecord, UNKNOWN_FIELD};

// =============================================================================
// Drain Report
// =============================================================================

/// The row a drain pass stopped on, and why.
#[derive(Debug)]
pub struct DrainFailure<E> {
    /// Ledger id of the row whose delivery failed.
    pub entry_id: i64,

    /// The error returned by the delivery callback.
    pub error: E,
}

/// Result of one drain pass.
#[derive(Debug)]
pub struct DrainReport<E> {
    /// Rows delivered and deleted during this pass.
    pub delivered: usize,

    /// Rows still in the ledger when the pass ended.
    pub remaining: usize,

    /// Set when the pass stopped early.
    pub failure: Option<DrainFailure<E>>,
}

impl<E> DrainReport<E> {
    /// True when every row present at the start was delivered.
    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }
}

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct LocationRow {
    id: i64,
    timestamp: String,
    source_address: Option<String>,
    city: Option<String>,
    region: Option<String>,
    country: Option<String>,
}

impl TryFrom<LocationRow> for LedgerEntry {
    type Error = DbError;

    fn try_from(row: LocationRow) -> DbResult<Self> {
        let captured_at =
            parse_timestamp(&row.timestamp).map_err(|_| DbError::InvalidTimestamp {
                id: row.id,
                value: row.timestamp.clone(),
            })?;

        let or_unknown = |v: Option<String>| v.unwrap_or_else(|| UNKNOWN_FIELD.to_string());

        Ok(LedgerEntry {
            id: row.id,
            record: LocationRecord::new(
                captured_at,
                row.source_address,
                or_unknown(row.city),
                or_unknown(row.region),
                or_unknown(row.country),
            ),
        })
    }
}

// =============================================================================
// Local Ledger
// =============================================================================

/// Repository over the `location_log` table.
///
/// ## Usage
/// ```rust,ignore
/// let ledger = db.ledger();
///
/// ledger.append(&record).await?;
///
/// let report = ledger
///     .drain(|record| async move { sink.deliver(&record).await })
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct LocalLedger {
    db: Database,
}

impl LocalLedger {
    /// Creates a new LocalLedger.
    pub fn new(db: Database) -> Self {
        LocalLedger { db }
    }

    /// Buffers one record.
    ///
    /// A single `INSERT`, so the row is either fully written or absent.
    pub async fn append(&self, record: &LocationRecord) -> DbResult<LedgerEntry> {
        let mut conn = self.db.connect().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO location_log (timestamp, source_address, city, region, country)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(record.timestamp())
        .bind(record.source_address.as_deref())
        .bind(&record.city)
        .bind(&record.region)
        .bind(&record.country)
        .execute(&mut conn)
        .await?;

        conn.close().await?;

        let id = result.last_insert_rowid();
        debug!(id, timestamp = %record.timestamp(), "Record appended to ledger");

        Ok(LedgerEntry {
            id,
            record: record.clone(),
        })
    }

    /// All buffered records, oldest first.
    pub async fn pending(&self) -> DbResult<Vec<LedgerEntry>> {
        let mut conn = self.db.connect().await?;
        let entries = Self::read_all(&mut conn).await?;
        conn.close().await?;
        Ok(entries)
    }

    /// Counts buffered records.
    pub async fn count_pending(&self) -> DbResult<i64> {
        let mut conn = self.db.connect().await?;
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM location_log")
            .fetch_one(&mut conn)
            .await?;
        conn.close().await?;
        Ok(count)
    }

    /// Delivers buffered records in insertion order, deleting each one as
    /// soon as `deliver` confirms it.
    ///
    /// ## Stop Rule
    /// The first `Err` from `deliver` ends the pass. That row and every row
    /// after it stay in the ledger, in order, and the error is returned
    /// inside the report rather than as `Err`. Only storage failures make
    /// this method itself fail.
    ///
    /// ## Arguments
    /// * `deliver` - Called once per row, sequentially, oldest first
    pub async fn drain<F, Fut, E>(&self, mut deliver: F) -> DbResult<DrainReport<E>>
    where
        F: FnMut(LocationRecord) -> Fut,
        Fut: Future<Output = Result<(), E>>,
    {
        let mut conn = self.db.connect().await?;
        let entries = Self::read_all(&mut conn).await?;
        let total = entries.len();

        if total == 0 {
            conn.close().await?;
            return Ok(DrainReport {
                delivered: 0,
                remaining: 0,
                failure: None,
            });
        }

        debug!(pending = total, "Starting drain pass");

        let mut delivered = 0;
        let mut failure = None;

        for entry in entries {
            match deliver(entry.record).await {
                Ok(()) => {
                    sqlx::query("DELETE FROM location_log WHERE id = ?1")
                        .bind(entry.id)
                        .execute(&mut conn)
                        .await?;
                    delivered += 1;
                }
                Err(error) => {
                    warn!(
                        entry_id = entry.id,
                        delivered,
                        "Drain pass stopped, delivery failed"
                    );
                    failure = Some(DrainFailure {
                        entry_id: entry.id,
                        error,
                    });
                    break;
                }
            }
        }

        conn.close().await?;

        let remaining = total - delivered;
        info!(delivered, remaining, "Drain pass finished");

        Ok(DrainReport {
            delivered,
            remaining,
            failure,
        })
    }

    async fn read_all(conn: &mut SqliteConnection) -> DbResult<Vec<LedgerEntry>> {
        let rows = sqlx::query_as::<_, LocationRow>(
            r#"
            SELECT id, timestamp, source_address, city, region, country
            FROM location_log
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&mut *conn)
        .await?;

        rows.into_iter().map(LedgerEntry::try_from).collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
