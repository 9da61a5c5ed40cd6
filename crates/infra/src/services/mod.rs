//! Application services: orchestration over repositories, cache and analytics.

mod catalog;
mod insights;
mod inventory_sync;
mod report_mail;
mod search;

use thiserror::Error;
use tracing::warn;

use stockpulse_ai::AiError;
use stockpulse_core::DomainError;

use crate::cache::{CacheError, CacheStore};
use crate::repository::RepositoryError;

pub use catalog::CatalogService;
pub use insights::{InsightsService, InsightsSettings};
pub use inventory_sync::{
    InMemoryReportSink, InventorySync, InventorySyncError, LogReportSink, ReportSink,
};
pub use report_mail::SmtpReportSink;
pub use search::{SearchService, SearchSettings};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(String),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Embedding(#[from] AiError),
}

/// Delete cache keys; failures are logged and otherwise ignored.
pub(crate) async fn invalidate(cache: &dyn CacheStore, keys: &[&str]) {
    for key in keys {
        if let Err(e) = cache.delete(key).await {
            warn!(key, error = %e, "cache invalidation failed");
        }
    }
}

/// Log a cache failure on a read/write path and carry on as a miss.
pub(crate) fn cache_miss_on_error<T>(key: &str, result: Result<Option<T>, CacheError>) -> Option<T> {
    result.unwrap_or_else(|e| {
        warn!(key, error = %e, "cache read failed, treating as miss");
        None
    })
}

pub(crate) fn log_cache_write(key: &str, result: Result<(), CacheError>) {
    if let Err(e) = result {
        warn!(key, error = %e, "cache write failed");
    }
}
