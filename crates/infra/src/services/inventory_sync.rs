//! Inventory-level ingestion: the store webhook and the nightly CSV batch.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, instrument, warn};

use stockpulse_core::DomainError;
use stockpulse_inventory::{
    parse_inventory_csv, ImportError, ImportRow, InventoryReport, InventoryUpdate,
    StockLevelChange, UpdateOutcome,
};

use crate::repository::{InventoryStore, RepositoryError, StockLedger};

#[derive(Debug, Error)]
pub enum InventorySyncError {
    #[error("invalid inventory update: {0}")]
    Invalid(#[from] DomainError),

    #[error("product not found: {0}")]
    UnknownSku(String),

    #[error(transparent)]
    Repository(RepositoryError),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error("failed to read batch file: {0}")]
    Io(#[from] std::io::Error),

    #[error("report delivery failed: {0}")]
    Report(String),
}

/// Where the nightly report goes.
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn deliver(&self, report: &InventoryReport) -> Result<(), InventorySyncError>;
}

/// Writes the report to the structured log.
#[derive(Debug, Default)]
pub struct LogReportSink;

#[async_trait]
impl ReportSink for LogReportSink {
    async fn deliver(&self, report: &InventoryReport) -> Result<(), InventorySyncError> {
        info!(
            subject = %report.subject,
            succeeded = report.succeeded,
            failed = report.failed,
            body = %report.body,
            "inventory report"
        );
        Ok(())
    }
}

/// Keeps delivered reports in memory for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryReportSink {
    inner: Mutex<Vec<InventoryReport>>,
}

impl InMemoryReportSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<InventoryReport> {
        self.inner.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ReportSink for InMemoryReportSink {
    async fn deliver(&self, report: &InventoryReport) -> Result<(), InventorySyncError> {
        self.inner
            .lock()
            .map_err(|_| InventorySyncError::Report("lock poisoned".to_string()))?
            .push(report.clone());
        Ok(())
    }
}

pub struct InventorySync {
    store: Arc<dyn InventoryStore>,
    sink: Arc<dyn ReportSink>,
}

impl InventorySync {
    pub fn new(store: Arc<dyn InventoryStore>, sink: Arc<dyn ReportSink>) -> Self {
        Self { store, sink }
    }

    /// Validate and apply one inventory-level report.
    ///
    /// Appends a ledger entry and sets the product quantity atomically. An
    /// unknown SKU leaves the ledger untouched.
    #[instrument(skip(self, update), fields(sku = %update.sku, quantity = update.inventory_quantity), err)]
    pub async fn apply(
        &self,
        update: &InventoryUpdate,
        now: DateTime<Utc>,
    ) -> Result<StockLevelChange, InventorySyncError> {
        let valid = update.validate()?;
        let change = self
            .store
            .record_stock_level(&valid, now)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound(_) => InventorySyncError::UnknownSku(valid.sku.to_string()),
                other => InventorySyncError::Repository(other),
            })?;
        info!(
            old_quantity = change.old_quantity,
            new_quantity = change.new_quantity,
            "inventory level recorded"
        );
        Ok(change)
    }

    /// Apply every parsed row; each yields a success or an error outcome.
    pub async fn apply_rows(&self, rows: Vec<ImportRow>, now: DateTime<Utc>) -> Vec<UpdateOutcome> {
        let mut outcomes = Vec::with_capacity(rows.len());
        for row in rows {
            let outcome = match row {
                ImportRow::Invalid { sku, error } => UpdateOutcome::Error { sku, error },
                ImportRow::Update(update) => match self.apply(&update, now).await {
                    Ok(change) => UpdateOutcome::Success {
                        sku: change.sku.to_string(),
                        old_quantity: change.old_quantity,
                        new_quantity: change.new_quantity,
                    },
                    Err(InventorySyncError::UnknownSku(_)) => UpdateOutcome::Error {
                        sku: update.sku,
                        error: "Product not found".to_string(),
                    },
                    Err(e) => UpdateOutcome::Error {
                        sku: update.sku,
                        error: e.to_string(),
                    },
                },
            };
            outcomes.push(outcome);
        }
        outcomes
    }

    /// Parse → apply → report.
    ///
    /// Fails only on an unreadable CSV, before any row is applied; per-row
    /// problems land in the report instead.
    #[instrument(skip(self, csv), fields(bytes = csv.len()), err)]
    pub async fn import_batch(&self, csv: &str, now: DateTime<Utc>) -> Result<InventoryReport, InventorySyncError> {
        let rows = parse_inventory_csv(csv)?;
        let outcomes = self.apply_rows(rows, now).await;
        let report = InventoryReport::from_outcomes(&outcomes);
        if report.failed > 0 {
            warn!(failed = report.failed, "inventory batch had failures");
        }
        Ok(report)
    }

    /// Hand a finished report to the configured sink.
    pub async fn deliver_report(&self, report: &InventoryReport) -> Result<(), InventorySyncError> {
        self.sink.deliver(report).await
    }
}
