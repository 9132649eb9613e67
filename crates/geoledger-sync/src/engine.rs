//! # Sync Engine
//!
//! The tracker's single worker: resolve, record, drain, sleep, repeat.
//!
//! ## Cycle State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        SyncEngine cycle                                 │
//! │                                                                         │
//! │  RESOLVE ── NoLocationAvailable / Network ───────────────────┐          │
//! │     │                                                        │          │
//! │     ▼                                                        │          │
//! │  SYNC_CHECK  probe.is_reachable()?                           │          │
//! │     ├── no  ─────────────────────→ ledger.append → Buffered ─┤          │
//! │     ▼                                                        │          │
//! │  SYNC_DRAIN  ledger.drain(sink.deliver)                      │          │
//! │     ├── backlog left ────────────→ ledger.append → Buffered ─┤          │
//! │     ▼                                                        │          │
//! │  RECORD      sink.deliver(record)                            │          │
//! │     ├── Ok  → Delivered ─────────────────────────────────────┤          │
//! │     └── Err → ledger.append → Buffered ──────────────────────┤          │
//! │                                                              ▼          │
//! │  SLEEP(interval) ◄──────────────────────────────────────────────        │
//! │     │  └── shutdown signal → exit                                      │
//! │     ▼                                                                   │
//! │  RESOLVE ...                                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Ordering
//! The sink sees records in capture order. When connectivity comes back the
//! backlog is drained first, oldest first, and the fresh record follows. If
//! the drain stops early the fresh record is appended behind the remaining
//! backlog instead of overtaking it.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use geoledger_core::LocationRecord;
use geoledger_db::{DrainReport, LocalLedger};

use crate::error::SyncError;
use crate::probe::ConnectivityProbe;
use crate::resolver::LocationSource;
use crate::sink::RemoteSink;

// =============================================================================
// Cycle Report
// =============================================================================

/// What happened to the freshly resolved record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The sink confirmed the record directly.
    Delivered,

    /// The record went into the ledger.
    Buffered { reason: String },

    /// No record was kept this cycle. `kind` is the error's log label.
    Skipped { kind: &'static str },
}

/// Drain pass counts, without the typed error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrainSummary {
    pub delivered: usize,
    pub remaining: usize,
    pub stopped_by: Option<String>,
}

impl From<DrainReport<SyncError>> for DrainSummary {
    fn from(report: DrainReport<SyncError>) -> Self {
        DrainSummary {
            delivered: report.delivered,
            remaining: report.remaining,
            stopped_by: report.failure.map(|f| f.error.to_string()),
        }
    }
}

/// Result of one `run_cycle`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub outcome: CycleOutcome,

    /// `None` when the sink was unreachable or the cycle was skipped.
    pub drain: Option<DrainSummary>,
}

impl CycleReport {
    fn skipped(kind: &'static str) -> Self {
        CycleReport {
            outcome: CycleOutcome::Skipped { kind },
            drain: None,
        }
    }
}

// =============================================================================
// Sync Engine
// =============================================================================

/// Periodic resolve-and-sync worker.
///
/// All collaborators are injected; there is no global state.
pub struct SyncEngine {
    resolver: Arc<dyn LocationSource>,
    ledger: LocalLedger,
    sink: Arc<dyn RemoteSink>,
    probe: Arc<dyn ConnectivityProbe>,
    interval: Duration,
    shutdown_rx: mpsc::Receiver<()>,
}

impl SyncEngine {
    /// Creates the engine and the handle used to stop it.
    pub fn new(
        resolver: Arc<dyn LocationSource>,
        ledger: LocalLedger,
        sink: Arc<dyn RemoteSink>,
        probe: Arc<dyn ConnectivityProbe>,
        interval: Duration,
    ) -> (Self, SyncEngineHandle) {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let engine = SyncEngine {
            resolver,
            ledger,
            sink,
            probe,
            interval,
            shutdown_rx,
        };

        (engine, SyncEngineHandle { shutdown_tx })
    }

    /// Runs cycles until the handle signals shutdown.
    ///
    /// Cycle errors never end the loop; they are logged and the engine
    /// sleeps until the next cycle.
    pub async fn run(mut self) {
        info!(interval_secs = self.interval.as_secs(), "Sync engine started");

        loop {
            let report = self.run_cycle().await;
            debug!(?report, "Cycle finished");

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}

                _ = self.shutdown_rx.recv() => {
                    info!("Sync engine received shutdown");
                    break;
                }
            }
        }

        info!("Sync engine stopped");
    }

    /// Executes one RESOLVE → SYNC_CHECK → SYNC_DRAIN → RECORD pass.
    pub async fn run_cycle(&self) -> CycleReport {
        let record = match self.resolver.resolve().await {
            Ok(record) => record,
            Err(e) => {
                warn!(kind = e.kind(), error = %e, "Location resolution failed, skipping cycle");
                return CycleReport::skipped(e.kind());
            }
        };

        if !self.probe.is_reachable().await {
            return match self.buffer(&record, "sink unreachable".to_string()).await {
                Some(outcome) => CycleReport {
                    outcome,
                    drain: None,
                },
                None => CycleReport::skipped("storage"),
            };
        }

        let drain = self.drain().await;
        let backlog_clear = matches!(drain, Some(DrainSummary { remaining: 0, .. }));

        let outcome = if backlog_clear {
            match self.sink.deliver(&record).await {
                Ok(()) => {
                    info!(place = %record.place(), "Location sent to remote sink");
                    Some(CycleOutcome::Delivered)
                }
                Err(e) => {
                    warn!(
                        kind = e.kind(),
                        retryable = e.is_retryable(),
                        error = %e,
                        "Delivery failed, buffering locally"
                    );
                    self.buffer(&record, e.to_string()).await
                }
            }
        } else {
            self.buffer(&record, "backlog not drained".to_string()).await
        };

        let Some(outcome) = outcome else {
            return CycleReport::skipped("storage");
        };

        CycleReport { outcome, drain }
    }

    async fn buffer(&self, record: &LocationRecord, reason: String) -> Option<CycleOutcome> {
        match self.ledger.append(record).await {
            Ok(entry) => {
                info!(
                    id = entry.id,
                    place = %record.place(),
                    reason = %reason,
                    "Location logged locally"
                );
                Some(CycleOutcome::Buffered { reason })
            }
            Err(e) => {
                let e = SyncError::from(e);
                error!(kind = e.kind(), error = %e, "Failed to buffer location, record dropped");
                None
            }
        }
    }

    async fn drain(&self) -> Option<DrainSummary> {
        let result = self
            .ledger
            .drain(|record| {
                let sink = Arc::clone(&self.sink);
                async move { sink.deliver(&record).await }
            })
            .await;

        match result {
            Ok(report) => {
                if let Some(ref failure) = report.failure {
                    warn!(
                        entry_id = failure.entry_id,
                        kind = failure.error.kind(),
                        error = %failure.error,
                        "Backlog drain stopped"
                    );
                }
                Some(DrainSummary::from(report))
            }
            Err(e) => {
                let e = SyncError::from(e);
                error!(kind = e.kind(), error = %e, "Backlog drain aborted");
                None
            }
        }
    }
}

// =============================================================================
// Engine Handle
// =============================================================================

/// Handle for stopping a running SyncEngine from outside.
#[derive(Debug, Clone)]
pub struct SyncEngineHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl SyncEngineHandle {
    /// Signals the engine to stop at its next sleep.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncResult;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use geoledger_db::{Database, DbConfig};
    use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;

    // -------------------------------------------------------------------------
    // Doubles
    // -------------------------------------------------------------------------

    /// Yields records one minute apart, named "city-N".
    #[derive(Default)]
    struct CountingResolver {
        next: AtomicI64,
        fail: AtomicBool,
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl LocationSource for CountingResolver {
        async fn resolve(&self) -> SyncResult<LocationRecord> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(SyncError::NoLocationAvailable("city is empty".into()));
            }
            let n = self.next.fetch_add(1, Ordering::SeqCst);
            Ok(LocationRecord::new(
                Utc.timestamp_opt(1_700_000_000 + n * 60, 0).unwrap(),
                Some("203.0.113.7".into()),
                format!("city-{}", n),
                "Region",
                "Country",
            ))
        }
    }

    #[derive(Default)]
    struct SwitchProbe {
        up: AtomicBool,
    }

    #[async_trait]
    impl ConnectivityProbe for SwitchProbe {
        async fn is_reachable(&self) -> bool {
            self.up.load(Ordering::SeqCst)
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        received: Mutex<Vec<LocationRecord>>,
        fail: AtomicBool,
        attempts: AtomicUsize,
    }

    impl RecordingSink {
        fn cities(&self) -> Vec<String> {
            self.received.lock().unwrap().iter().map(|r| r.city.clone()).collect()
        }
    }

    #[async_trait]
    impl RemoteSink for RecordingSink {
        async fn deliver(&self, record: &LocationRecord) -> SyncResult<()> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(SyncError::Network("connection refused".into()));
            }
            self.received.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    struct Harness {
        dir: TempDir,
        db: Database,
        resolver: Arc<CountingResolver>,
        probe: Arc<SwitchProbe>,
        sink: Arc<RecordingSink>,
        ledger: LocalLedger,
        engine: SyncEngine,
        handle: SyncEngineHandle,
    }

    async fn harness(interval: Duration) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(DbConfig::new(dir.path().join("ledger.db")))
            .await
            .unwrap();
        let ledger = db.ledger();

        let resolver = Arc::new(CountingResolver::default());
        let probe = Arc::new(SwitchProbe::default());
        let sink = Arc::new(RecordingSink::default());

        let (engine, handle) = SyncEngine::new(
            resolver.clone(),
            ledger.clone(),
            sink.clone(),
            probe.clone(),
            interval,
        );

        Harness {
            dir,
            db,
            resolver,
            probe,
            sink,
            ledger,
            engine,
            handle,
        }
    }

    // -------------------------------------------------------------------------
    // Cycle behaviour
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_unreachable_buffers_without_delivery_attempt() {
        let h = harness(Duration::from_secs(3600)).await;

        let report = h.engine.run_cycle().await;

        assert!(matches!(report.outcome, CycleOutcome::Buffered { .. }));
        assert_eq!(report.drain, None);
        assert_eq!(h.sink.attempts.load(Ordering::SeqCst), 0);
        assert_eq!(h.ledger.count_pending().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_reachable_delivers_without_append_and_drains_backlog() {
        let h = harness(Duration::from_secs(3600)).await;
        h.engine.run_cycle().await;
        assert_eq!(h.ledger.count_pending().await.unwrap(), 1);

        h.probe.up.store(true, Ordering::SeqCst);
        let report = h.engine.run_cycle().await;

        assert_eq!(report.outcome, CycleOutcome::Delivered);
        assert_eq!(
            report.drain,
            Some(DrainSummary {
                delivered: 1,
                remaining: 0,
                stopped_by: None
            })
        );
        assert_eq!(h.ledger.count_pending().await.unwrap(), 0);
        assert_eq!(h.sink.cities(), vec!["city-0", "city-1"]);
    }

    #[tokio::test]
    async fn test_failed_delivery_falls_back_to_ledger() {
        let h = harness(Duration::from_secs(3600)).await;
        h.probe.up.store(true, Ordering::SeqCst);
        h.sink.fail.store(true, Ordering::SeqCst);

        let report = h.engine.run_cycle().await;

        assert!(matches!(report.outcome, CycleOutcome::Buffered { ref reason } if reason.contains("connection refused")));
        assert_eq!(
            report.drain,
            Some(DrainSummary {
                delivered: 0,
                remaining: 0,
                stopped_by: None
            })
        );
        assert_eq!(h.sink.attempts.load(Ordering::SeqCst), 1);
        assert_eq!(h.ledger.count_pending().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_stalled_drain_keeps_fresh_record_behind_backlog() {
        let h = harness(Duration::from_secs(3600)).await;
        h.engine.run_cycle().await;

        h.probe.up.store(true, Ordering::SeqCst);
        h.sink.fail.store(true, Ordering::SeqCst);
        let report = h.engine.run_cycle().await;

        assert!(matches!(report.outcome, CycleOutcome::Buffered { ref reason } if reason == "backlog not drained"));
        let drain = report.drain.unwrap();
        assert_eq!(drain.delivered, 0);
        assert_eq!(drain.remaining, 1);
        assert!(drain.stopped_by.is_some());
        // Only the backlog row was attempted; the fresh record did not overtake it.
        assert_eq!(h.sink.attempts.load(Ordering::SeqCst), 1);

        let backlog: Vec<String> = h
            .ledger
            .pending()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.record.city)
            .collect();
        assert_eq!(backlog, vec!["city-0", "city-1"]);
    }

    #[tokio::test]
    async fn test_resolution_failure_skips_cycle() {
        let h = harness(Duration::from_secs(3600)).await;
        h.resolver.fail.store(true, Ordering::SeqCst);
        h.probe.up.store(true, Ordering::SeqCst);

        let report = h.engine.run_cycle().await;

        assert_eq!(report, CycleReport::skipped("no_location_available"));
        assert_eq!(h.sink.attempts.load(Ordering::SeqCst), 0);
        assert_eq!(h.ledger.count_pending().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_offline_then_online_end_to_end() {
        let h = harness(Duration::from_secs(3600)).await;

        for _ in 0..3 {
            h.engine.run_cycle().await;
        }

        let backlog: Vec<String> = h
            .ledger
            .pending()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.record.city)
            .collect();
        assert_eq!(backlog, vec!["city-0", "city-1", "city-2"]);

        h.probe.up.store(true, Ordering::SeqCst);
        let report = h.engine.run_cycle().await;

        assert_eq!(report.outcome, CycleOutcome::Delivered);
        assert_eq!(h.ledger.count_pending().await.unwrap(), 0);
        assert_eq!(h.sink.cities(), vec!["city-0", "city-1", "city-2", "city-3"]);

        let received = h.sink.received.lock().unwrap().clone();
        assert!(received
            .windows(2)
            .all(|pair| pair[0].captured_at < pair[1].captured_at));
    }

    // -------------------------------------------------------------------------
    // Storage failures
    // -------------------------------------------------------------------------

    async fn drop_ledger_table(db: &Database) {
        let mut conn = db.connect().await.unwrap();
        sqlx::query("DROP TABLE location_log")
            .execute(&mut conn)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_append_failure_skips_cycle_and_loop_recovers() {
        let h = harness(Duration::from_secs(3600)).await;
        drop_ledger_table(&h.db).await;

        let report = h.engine.run_cycle().await;
        assert_eq!(report, CycleReport::skipped("storage"));
        assert_eq!(h.sink.attempts.load(Ordering::SeqCst), 0);

        // Reopening recreates the table; the next cycle buffers normally.
        Database::open(DbConfig::new(h.dir.path().join("ledger.db")))
            .await
            .unwrap();

        let report = h.engine.run_cycle().await;
        assert!(matches!(report.outcome, CycleOutcome::Buffered { .. }));
        assert_eq!(h.resolver.attempts.load(Ordering::SeqCst), 2);
        assert_eq!(h.ledger.count_pending().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_drain_failure_while_reachable_skips_cycle() {
        let h = harness(Duration::from_secs(3600)).await;
        h.probe.up.store(true, Ordering::SeqCst);
        drop_ledger_table(&h.db).await;

        let report = h.engine.run_cycle().await;

        assert_eq!(report, CycleReport::skipped("storage"));
        assert_eq!(report.drain, None);
        assert_eq!(h.sink.attempts.load(Ordering::SeqCst), 0);
    }

    // -------------------------------------------------------------------------
    // Run loop
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_shutdown_interrupts_sleep() {
        let h = harness(Duration::from_secs(3600)).await;
        let resolver = h.resolver.clone();
        let handle = h.handle.clone();

        let task = tokio::spawn(h.engine.run());

        while resolver.next.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        handle.shutdown().await;

        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("engine did not stop promptly")
            .unwrap();

        assert_eq!(resolver.next.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_survives_failed_cycles() {
        let h = harness(Duration::from_secs(60)).await;
        h.resolver.fail.store(true, Ordering::SeqCst);
        let resolver = h.resolver.clone();
        let handle = h.handle.clone();

        let task = tokio::spawn(h.engine.run());

        tokio::time::sleep(Duration::from_secs(150)).await;
        resolver.fail.store(false, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(60)).await;

        handle.shutdown().await;
        task.await.unwrap();

        // Cycles at t=0, 60 and 120 fail; the cycle at t=180 succeeds.
        assert_eq!(resolver.attempts.load(Ordering::SeqCst), 4);
        assert_eq!(resolver.next.load(Ordering::SeqCst), 1);
    }
}
