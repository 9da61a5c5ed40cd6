//! Infrastructure layer: storage, cache, external services, and the
//! application services the HTTP surface calls into.

pub mod cache;
pub mod embedding;
pub mod repository;
pub mod services;
pub mod workers;

pub use cache::{CacheError, CacheStore, CacheStoreExt, InMemoryCacheStore};
#[cfg(feature = "redis")]
pub use cache::RedisCacheStore;
pub use embedding::{HttpEmbedder, HttpEmbedderConfig};
pub use repository::{
    InMemoryInventoryStore, InventoryStore, PostgresInventoryStore, ProductRepository,
    RepositoryError, StockLedger,
};
pub use services::{
    CatalogService, InsightsService, InsightsSettings, InventorySync, InventorySyncError,
    InMemoryReportSink, LogReportSink, ReportSink, SearchService, SearchSettings, ServiceError,
    SmtpReportSink,
};
pub use workers::{NightlyImportHandle, NightlyImportRunner, RunOutcome};
