use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{error, info, warn};

use stockpulse_inventory::InventoryReport;

use crate::services::{InsightsService, InventorySync, InventorySyncError};

/// Config for the nightly CSV import runner.
///
/// Clones share one run lock, so a manual run and the scheduled loop never
/// overlap.
#[derive(Debug, Clone)]
pub struct NightlyImportRunner {
    pub csv_path: PathBuf,
    pub interval: Duration,
    pub max_retries: u32,
    pub base_backoff: Duration,
    running: Arc<Mutex<()>>,
}

impl NightlyImportRunner {
    pub fn new(csv_path: impl Into<PathBuf>) -> Self {
        Self {
            csv_path: csv_path.into(),
            interval: Duration::from_secs(24 * 60 * 60),
            max_retries: 5,
            base_backoff: Duration::from_millis(250),
            running: Arc::new(Mutex::new(())),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// What a single run attempt did.
#[derive(Debug)]
pub enum RunOutcome {
    /// Rows were applied. `delivered` is false when the report sink kept
    /// failing after every retry.
    Completed {
        report: InventoryReport,
        delivered: bool,
    },
    /// Another run held the lock; nothing was done.
    Skipped,
}

/// Shared by the scheduled loop and manual triggers.
#[derive(Clone)]
struct Worker {
    cfg: NightlyImportRunner,
    sync: Arc<InventorySync>,
    insights: Option<Arc<InsightsService>>,
    running: Arc<Mutex<()>>,
}

impl Worker {
    async fn run_once(&self) -> Result<RunOutcome, InventorySyncError> {
        let Ok(_guard) = self.running.try_lock() else {
            warn!(path = %self.cfg.csv_path.display(), "nightly import already running, skipping");
            return Ok(RunOutcome::Skipped);
        };

        // Only reading and parsing may fail the run. Both precede applying
        // rows, so a retried run never applies a row twice.
        let csv = tokio::fs::read_to_string(&self.cfg.csv_path).await?;
        let now = Utc::now();
        let report = self.sync.import_batch(&csv, now).await?;

        if let Some(insights) = &self.insights {
            if let Err(e) = insights.refresh_trending(now).await {
                warn!(error = %e, "trending refresh after import failed");
            }
        }
        let delivered = self.deliver(&report).await;
        info!(
            succeeded = report.succeeded,
            failed = report.failed,
            delivered,
            "nightly import finished"
        );
        Ok(RunOutcome::Completed { report, delivered })
    }

    /// Deliver the report, retrying only the delivery with backoff.
    async fn deliver(&self, report: &InventoryReport) -> bool {
        let mut attempt: u32 = 0;
        loop {
            match self.sync.deliver_report(report).await {
                Ok(()) => return true,
                Err(e) => {
                    attempt += 1;
                    if attempt > self.cfg.max_retries {
                        error!(error = %e, attempts = attempt, "giving up on report delivery");
                        return false;
                    }
                    warn!(error = %e, attempt, "report delivery failed");
                    time::sleep(backoff(self.cfg.base_backoff, attempt)).await;
                }
            }
        }
    }
}

/// Handle for the running import loop (trigger + shutdown).
#[derive(Debug)]
pub struct NightlyImportHandle {
    shutdown: watch::Sender<bool>,
    trigger: mpsc::Sender<()>,
    join: Option<JoinHandle<()>>,
}

impl NightlyImportHandle {
    /// Ask for a run now. Coalesced: a pending trigger absorbs further ones.
    pub fn trigger(&self) {
        let _ = self.trigger.try_send(());
    }

    /// Stop the loop and wait for it to exit.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(join) = self.join.take() {
            let _ = join.await;
        }
    }
}

impl NightlyImportRunner {
    /// Run one import immediately (CLI path). Skips if a run is in progress.
    pub async fn run_now(
        &self,
        sync: Arc<InventorySync>,
        insights: Option<Arc<InsightsService>>,
    ) -> Result<RunOutcome, InventorySyncError> {
        self.worker(sync, insights).run_once().await
    }

    fn worker(&self, sync: Arc<InventorySync>, insights: Option<Arc<InsightsService>>) -> Worker {
        Worker {
            cfg: self.clone(),
            sync,
            insights,
            running: self.running.clone(),
        }
    }

    /// Spawn the scheduled loop on the current tokio runtime.
    ///
    /// - Schedule: runs every `interval`, first run one interval from now
    /// - Trigger: `handle.trigger()` requests an extra run
    /// - Failures: a run that could not read or parse the file is retried
    ///   with bounded exponential backoff; report delivery retries on its own
    pub fn spawn(
        &self,
        sync: Arc<InventorySync>,
        insights: Option<Arc<InsightsService>>,
    ) -> NightlyImportHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (trigger_tx, trigger_rx) = mpsc::channel(1);
        let worker = self.worker(sync, insights);

        let join = tokio::spawn(runner_loop(worker, shutdown_rx, trigger_rx));

        NightlyImportHandle {
            shutdown: shutdown_tx,
            trigger: trigger_tx,
            join: Some(join),
        }
    }
}

async fn runner_loop(
    worker: Worker,
    mut shutdown_rx: watch::Receiver<bool>,
    mut trigger_rx: mpsc::Receiver<()>,
) {
    info!(path = %worker.cfg.csv_path.display(), "nightly import runner started");

    let mut ticker = time::interval_at(Instant::now() + worker.cfg.interval, worker.cfg.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut failures: u32 = 0;

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => break,
            _ = ticker.tick() => {}
            Some(()) = trigger_rx.recv() => {}
        }

        loop {
            match worker.run_once().await {
                Ok(_) => {
                    failures = 0;
                    break;
                }
                Err(e) => {
                    failures += 1;
                    warn!(error = %e, attempt = failures, "nightly import failed");
                    if failures > worker.cfg.max_retries {
                        failures = 0;
                        break;
                    }
                    tokio::select! {
                        _ = shutdown_rx.changed() => {
                            info!("nightly import runner stopped");
                            return;
                        }
                        _ = time::sleep(backoff(worker.cfg.base_backoff, failures)) => {}
                    }
                }
            }
        }
    }

    info!("nightly import runner stopped");
}

fn backoff(base: Duration, attempt: u32) -> Duration {
    // Exponential backoff: base * 2^(attempt-1), capped.
    let pow = 1u32 << attempt.saturating_sub(1).min(10);
    let ms = base.as_millis().saturating_mul(pow as u128);
    Duration::from_millis(ms.min(10_000) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{InMemoryInventoryStore, ProductRepository, StockLedger};
    use crate::services::{InMemoryReportSink, ReportSink};
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicU32, Ordering};
    use stockpulse_products::{NewProduct, Product};

    async fn seeded_store() -> Arc<InMemoryInventoryStore> {
        let store = Arc::new(InMemoryInventoryStore::new());
        let product = Product::create(
            NewProduct {
                sku: "SP001".to_string(),
                name: "Mouse".to_string(),
                price: Decimal::ONE,
                quantity: 5,
                discount_percentage: None,
                created_by: None,
            },
            Utc::now(),
        )
        .unwrap();
        store.insert(product).await.unwrap();
        store
    }

    async fn sync_with_sink() -> (Arc<InventorySync>, Arc<InMemoryReportSink>) {
        let sink = Arc::new(InMemoryReportSink::new());
        let report_sink: Arc<dyn ReportSink> = sink.clone();
        (Arc::new(InventorySync::new(seeded_store().await, report_sink)), sink)
    }

    /// Rejects every report and counts the attempts.
    #[derive(Default)]
    struct RejectingSink {
        attempts: AtomicU32,
    }

    #[async_trait::async_trait]
    impl ReportSink for RejectingSink {
        async fn deliver(&self, _report: &InventoryReport) -> Result<(), InventorySyncError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(InventorySyncError::Report("mail relay down".to_string()))
        }
    }

    fn csv_file(content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("stockpulse-import-{}.csv", uuid::Uuid::now_v7()));
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn backoff_grows_and_caps() {
        let base = Duration::from_millis(250);
        assert_eq!(backoff(base, 1), Duration::from_millis(250));
        assert_eq!(backoff(base, 3), Duration::from_millis(1000));
        assert_eq!(backoff(base, 30), Duration::from_millis(10_000));
    }

    #[tokio::test]
    async fn run_now_imports_the_file() {
        let (sync, sink) = sync_with_sink().await;
        let path = csv_file("sku,inventory_quantity\nSP001,40\n");

        let outcome = NightlyImportRunner::new(&path).run_now(sync, None).await.unwrap();
        let RunOutcome::Completed { report, delivered } = outcome else {
            panic!("expected a completed run");
        };
        assert_eq!(report.succeeded, 1);
        assert!(delivered);
        assert_eq!(sink.all().len(), 1);
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn overlapping_run_is_skipped() {
        let (sync, sink) = sync_with_sink().await;
        let path = csv_file("sku,inventory_quantity\nSP001,40\n");
        let worker = NightlyImportRunner::new(&path).worker(sync, None);

        let guard = worker.running.lock().await;
        assert!(matches!(worker.run_once().await.unwrap(), RunOutcome::Skipped));
        drop(guard);
        assert!(matches!(worker.run_once().await.unwrap(), RunOutcome::Completed { .. }));
        assert_eq!(sink.all().len(), 1);
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let (sync, _) = sync_with_sink().await;
        let err = NightlyImportRunner::new("/definitely/not/here.csv")
            .run_now(sync, None)
            .await
            .unwrap_err();
        assert!(matches!(err, InventorySyncError::Io(_)));
    }

    #[tokio::test]
    async fn triggered_loop_runs_and_shuts_down() {
        let (sync, sink) = sync_with_sink().await;
        let path = csv_file("sku,inventory_quantity\nSP001,7\n");
        let handle = NightlyImportRunner::new(&path)
            .with_interval(Duration::from_secs(3600))
            .spawn(sync, None);

        handle.trigger();
        for _ in 0..100 {
            if !sink.all().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        handle.shutdown().await;
        assert_eq!(sink.all().len(), 1);
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn rejected_report_is_retried_without_reapplying_rows() {
        let store = seeded_store().await;
        let sink = Arc::new(RejectingSink::default());
        let sync = Arc::new(InventorySync::new(store.clone(), sink.clone()));
        let path = csv_file("sku,inventory_quantity\nSP001,40\n");
        let mut runner = NightlyImportRunner::new(&path).with_interval(Duration::from_secs(3600));
        runner.base_backoff = Duration::from_millis(1);
        let expected_attempts = runner.max_retries + 1;

        let handle = runner.spawn(sync, None);
        handle.trigger();
        for _ in 0..200 {
            if sink.attempts.load(Ordering::SeqCst) >= expected_attempts {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        // Room for a whole-run retry to show up if one were scheduled.
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.shutdown().await;

        assert_eq!(sink.attempts.load(Ordering::SeqCst), expected_attempts);
        let product = store.get_by_sku("SP001").await.unwrap().unwrap();
        assert_eq!(product.quantity(), 40);
        let history = store
            .entries_since(product.id_typed(), Utc::now() - chrono::Duration::days(1))
            .await
            .unwrap();
        assert_eq!(history.len(), 1);
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn run_now_reports_undelivered_report() {
        let sink = Arc::new(RejectingSink::default());
        let sync = Arc::new(InventorySync::new(seeded_store().await, sink.clone()));
        let path = csv_file("sku,inventory_quantity\nSP001,40\n");
        let mut runner = NightlyImportRunner::new(&path);
        runner.max_retries = 2;
        runner.base_backoff = Duration::from_millis(1);

        let outcome = runner.run_now(sync, None).await.unwrap();
        assert!(matches!(outcome, RunOutcome::Completed { delivered: false, .. }));
        assert_eq!(sink.attempts.load(Ordering::SeqCst), 3);
        let _ = std::fs::remove_file(path);
    }
}
