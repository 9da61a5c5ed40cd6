//! Key/value cache for derived data (insight snapshots, product embeddings).
//!
//! Payloads are JSON strings. The store is injected into services; nothing in
//! the process holds cache state globally. Writes are last-writer-wins.

mod in_memory;
#[cfg(feature = "redis")]
mod redis_store;

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

pub use in_memory::InMemoryCacheStore;
#[cfg(feature = "redis")]
pub use redis_store::RedisCacheStore;

/// Cached insight snapshot (statistics + trending list).
pub const PRODUCT_INSIGHTS_KEY: &str = "product_insights";
/// Cached trending list on its own.
pub const TRENDING_PRODUCTS_KEY: &str = "trending_products";

/// Key under which a product's embedding vector is cached.
pub fn embedding_key(sku: &str) -> String {
    format!("product_embedding_{sku}")
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),

    #[error("cache payload error: {0}")]
    Payload(#[from] serde_json::Error),
}

#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// `ttl = None` keeps the value until it is deleted or overwritten.
    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}

/// Typed JSON helpers over any [`CacheStore`].
#[async_trait]
pub trait CacheStoreExt: CacheStore {
    async fn get_json<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>, CacheError> {
        match self.get(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn set_json<T: Serialize + Sync + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let raw = serde_json::to_string(value)?;
        self.set(key, raw, ttl).await
    }
}

impl<S: CacheStore + ?Sized> CacheStoreExt for S {}
