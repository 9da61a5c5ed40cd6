//! Persistence ports for the catalog and the stock ledger.
//!
//! Both traits are async; the analytics core is synchronous, so callers load a
//! [`LedgerWindow`] first and hand it to the pure pipeline.

mod in_memory;
mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use stockpulse_core::{DomainError, ProductId, ProfileId};
use stockpulse_inventory::{LedgerWindow, StockHistoryEntry, StockLevelChange, ValidInventoryUpdate};
use stockpulse_products::{Product, ProductFilter};

pub use in_memory::InMemoryInventoryStore;
pub use postgres::PostgresInventoryStore;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("storage error: {0}")]
    Storage(String),
}

impl RepositoryError {
    pub fn product_not_found(what: impl std::fmt::Display) -> Self {
        RepositoryError::NotFound(format!("product {what}"))
    }
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Products matching `filter`, ordered by name ascending.
    async fn list(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError>;

    async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    async fn get_by_sku(&self, sku: &str) -> Result<Option<Product>, RepositoryError>;

    /// Fails with `Conflict` when the SKU is already taken.
    async fn insert(&self, product: Product) -> Result<Product, RepositoryError>;

    /// Replace a stored product's attributes.
    async fn update(&self, product: Product) -> Result<Product, RepositoryError>;

    /// Delete a product and its ledger. Returns `false` when it did not exist.
    async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError>;

    async fn count(&self) -> Result<u64, RepositoryError>;

    async fn set_embedding(&self, id: ProductId, embedding: Vec<f32>) -> Result<(), RepositoryError>;

    /// Clear the owner of every product created by `profile`. Returns how many changed.
    async fn release_profile(&self, profile: ProfileId) -> Result<u64, RepositoryError>;
}

#[async_trait]
pub trait StockLedger: Send + Sync {
    /// A product's entries with `recorded_at >= since`, ascending.
    async fn entries_since(
        &self,
        product_id: ProductId,
        since: DateTime<Utc>,
    ) -> Result<Vec<StockHistoryEntry>, RepositoryError>;

    /// Every entry with `recorded_at >= since`, grouped for the analytics pipeline.
    async fn load_window(&self, since: DateTime<Utc>) -> Result<LedgerWindow, RepositoryError>;

    /// Append a ledger entry and set the product's quantity as one atomic unit.
    ///
    /// Unknown SKU → `NotFound` and the ledger is left untouched.
    async fn record_stock_level(
        &self,
        update: &ValidInventoryUpdate,
        recorded_at: DateTime<Utc>,
    ) -> Result<StockLevelChange, RepositoryError>;
}

/// Both ports together; what the services depend on.
pub trait InventoryStore: ProductRepository + StockLedger {}

impl<T: ProductRepository + StockLedger> InventoryStore for T {}
