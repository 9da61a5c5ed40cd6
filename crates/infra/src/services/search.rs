use std::sync::Arc;

use tracing::{debug, info, instrument};

use stockpulse_ai::{rank_by_similarity, Embedder, ScoredMatch};
use stockpulse_products::{Product, ProductFilter};

use crate::cache::{embedding_key, CacheStore, CacheStoreExt};
use crate::repository::{InventoryStore, ProductRepository};

use super::{cache_miss_on_error, log_cache_write, ServiceError};

#[derive(Debug, Clone, Copy)]
pub struct SearchSettings {
    /// Matches must score strictly above this.
    pub min_score: f64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            min_score: stockpulse_ai::similarity::DEFAULT_MIN_SCORE,
        }
    }
}

/// Semantic product search over name embeddings.
pub struct SearchService {
    store: Arc<dyn InventoryStore>,
    cache: Arc<dyn CacheStore>,
    embedder: Arc<dyn Embedder>,
    settings: SearchSettings,
}

impl SearchService {
    pub fn new(
        store: Arc<dyn InventoryStore>,
        cache: Arc<dyn CacheStore>,
        embedder: Arc<dyn Embedder>,
        settings: SearchSettings,
    ) -> Self {
        Self {
            store,
            cache,
            embedder,
            settings,
        }
    }

    /// Products ranked by similarity to `query`, best first.
    ///
    /// A blank query returns every product in list order, each scored 1.0.
    #[instrument(skip(self), err)]
    pub async fn search(&self, query: &str) -> Result<Vec<ScoredMatch<Product>>, ServiceError> {
        let products = self.store.list(&ProductFilter::default()).await?;
        if query.trim().is_empty() {
            return Ok(products
                .into_iter()
                .map(|item| ScoredMatch { item, score: 1.0 })
                .collect());
        }

        let query_vector = self.embedder.embed(query).await?;
        let mut candidates = Vec::with_capacity(products.len());
        for product in products {
            let vector = self.product_vector(&product).await?;
            candidates.push((product, vector));
        }

        let ranked = rank_by_similarity(&query_vector, candidates, self.settings.min_score);
        debug!(matches = ranked.len(), "search ranked");
        Ok(ranked)
    }

    /// Cache → stored embedding → embed the name (then persist and cache).
    async fn product_vector(&self, product: &Product) -> Result<Vec<f32>, ServiceError> {
        let key = embedding_key(product.sku().as_str());
        if let Some(cached) = cache_miss_on_error(&key, self.cache.get_json::<Vec<f32>>(&key).await) {
            return Ok(cached);
        }
        if let Some(stored) = product.embedding() {
            return Ok(stored.to_vec());
        }

        let vector = self.embedder.embed(product.name()).await?;
        self.store
            .set_embedding(product.id_typed(), vector.clone())
            .await?;
        log_cache_write(&key, self.cache.set_json(&key, &vector, None).await);
        Ok(vector)
    }

    /// Re-embed every product name, persist it, and cache it without expiry.
    #[instrument(skip(self), err)]
    pub async fn regenerate_embeddings(&self) -> Result<usize, ServiceError> {
        let products = self.store.list(&ProductFilter::default()).await?;
        for product in &products {
            let vector = self.embedder.embed(product.name()).await?;
            self.store
                .set_embedding(product.id_typed(), vector.clone())
                .await?;
            let key = embedding_key(product.sku().as_str());
            log_cache_write(&key, self.cache.set_json(&key, &vector, None).await);
            info!(sku = %product.sku(), name = product.name(), "generated embedding");
        }
        Ok(products.len())
    }
}
