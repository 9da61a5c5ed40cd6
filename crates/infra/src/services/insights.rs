use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};

use stockpulse_ai::{InsightSnapshot, InsightsAggregator, TrendingProduct};
use stockpulse_products::{Product, ProductFilter};

use crate::cache::{CacheStore, CacheStoreExt, PRODUCT_INSIGHTS_KEY, TRENDING_PRODUCTS_KEY};
use crate::repository::{InventoryStore, ProductRepository, StockLedger};

use super::{cache_miss_on_error, log_cache_write, ServiceError};

pub const DEFAULT_INSIGHTS_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, Copy)]
pub struct InsightsSettings {
    pub aggregator: InsightsAggregator,
    pub ttl: Duration,
}

impl Default for InsightsSettings {
    fn default() -> Self {
        Self {
            aggregator: InsightsAggregator::default(),
            ttl: DEFAULT_INSIGHTS_TTL,
        }
    }
}

/// Cached inventory insights.
///
/// The snapshot lives under `product_insights` and the trending list under
/// `trending_products`, both with the configured TTL.
pub struct InsightsService {
    store: Arc<dyn InventoryStore>,
    cache: Arc<dyn CacheStore>,
    settings: InsightsSettings,
}

impl InsightsService {
    pub fn new(
        store: Arc<dyn InventoryStore>,
        cache: Arc<dyn CacheStore>,
        settings: InsightsSettings,
    ) -> Self {
        Self {
            store,
            cache,
            settings,
        }
    }

    /// Statistics plus trending products, served from cache when present.
    #[instrument(skip(self), err)]
    pub async fn snapshot(&self, now: DateTime<Utc>) -> Result<InsightSnapshot, ServiceError> {
        if let Some(cached) = cache_miss_on_error(
            PRODUCT_INSIGHTS_KEY,
            self.cache
                .get_json::<InsightSnapshot>(PRODUCT_INSIGHTS_KEY)
                .await,
        ) {
            debug!("insights served from cache");
            return Ok(cached);
        }

        let products = self.store.list(&ProductFilter::default()).await?;
        let statistics = self.settings.aggregator.statistics(&products);
        let trending_products = self.trending_for(&products, now).await?;
        let snapshot = InsightSnapshot {
            statistics,
            trending_products,
        };

        log_cache_write(
            PRODUCT_INSIGHTS_KEY,
            self.cache
                .set_json(PRODUCT_INSIGHTS_KEY, &snapshot, Some(self.settings.ttl))
                .await,
        );
        Ok(snapshot)
    }

    /// Recompute the trending list and overwrite its cache entry.
    #[instrument(skip(self), err)]
    pub async fn refresh_trending(&self, now: DateTime<Utc>) -> Result<Vec<TrendingProduct>, ServiceError> {
        let products = self.store.list(&ProductFilter::default()).await?;
        let trending = self.compute_trending(&products, now).await?;
        self.cache_trending(&trending).await;
        info!(count = trending.len(), "trending products refreshed");
        Ok(trending)
    }

    async fn trending_for(
        &self,
        products: &[Product],
        now: DateTime<Utc>,
    ) -> Result<Vec<TrendingProduct>, ServiceError> {
        if let Some(cached) = cache_miss_on_error(
            TRENDING_PRODUCTS_KEY,
            self.cache
                .get_json::<Vec<TrendingProduct>>(TRENDING_PRODUCTS_KEY)
                .await,
        ) {
            return Ok(cached);
        }
        let trending = self.compute_trending(products, now).await?;
        self.cache_trending(&trending).await;
        Ok(trending)
    }

    async fn compute_trending(
        &self,
        products: &[Product],
        now: DateTime<Utc>,
    ) -> Result<Vec<TrendingProduct>, ServiceError> {
        let aggregator = &self.settings.aggregator;
        let window = self
            .store
            .load_window(aggregator.extractor.window_start(now))
            .await?;
        let trending = aggregator.trending(products, &window, now);
        debug!(
            products = products.len(),
            ledger_entries = window.len(),
            trending = trending.len(),
            "trend pipeline ran"
        );
        Ok(trending)
    }

    async fn cache_trending(&self, trending: &[TrendingProduct]) {
        log_cache_write(
            TRENDING_PRODUCTS_KEY,
            self.cache
                .set_json(TRENDING_PRODUCTS_KEY, trending, Some(self.settings.ttl))
                .await,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheError, InMemoryCacheStore};
    use crate::repository::{InMemoryInventoryStore, ProductRepository, StockLedger};
    use chrono::Duration as ChronoDuration;
    use rust_decimal::Decimal;
    use stockpulse_core::Sku;
    use stockpulse_inventory::ValidInventoryUpdate;
    use stockpulse_products::NewProduct;

    struct FailingCache;

    #[async_trait::async_trait]
    impl CacheStore for FailingCache {
        async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
            Err(CacheError::Backend("down".to_string()))
        }
        async fn set(&self, _key: &str, _value: String, _ttl: Option<Duration>) -> Result<(), CacheError> {
            Err(CacheError::Backend("down".to_string()))
        }
        async fn delete(&self, _key: &str) -> Result<(), CacheError> {
            Err(CacheError::Backend("down".to_string()))
        }
    }

    async fn seeded_store() -> Arc<InMemoryInventoryStore> {
        let store = Arc::new(InMemoryInventoryStore::new());
        let now = Utc::now();
        for (sku, name, first, last) in [
            ("SP001", "Blue Wireless Mouse", 50, 5),
            ("SP002", "Red Gaming Keyboard", 35, 30),
        ] {
            store
                .insert(
                    Product::create(
                        NewProduct {
                            sku: sku.to_string(),
                            name: name.to_string(),
                            price: Decimal::new(2999, 2),
                            quantity: i64::from(first),
                            discount_percentage: None,
                            created_by: None,
                        },
                        now,
                    )
                    .unwrap(),
                )
                .await
                .unwrap();
            for (quantity, at) in [(first, now - ChronoDuration::days(5)), (last, now)] {
                let update = ValidInventoryUpdate {
                    sku: Sku::parse(sku).unwrap(),
                    quantity,
                };
                store.record_stock_level(&update, at).await.unwrap();
            }
        }
        store
    }

    #[tokio::test]
    async fn snapshot_reports_statistics_and_trending() {
        let store = seeded_store().await;
        let cache = Arc::new(InMemoryCacheStore::new());
        let service = InsightsService::new(store, cache.clone(), InsightsSettings::default());

        let snapshot = service.snapshot(Utc::now()).await.unwrap();
        assert_eq!(snapshot.statistics.total_products, 2);
        assert_eq!(snapshot.statistics.low_stock_products, 1);
        assert_eq!(snapshot.statistics.low_stock_percentage, 50.0);
        assert_eq!(snapshot.trending_products.len(), 1);
        assert_eq!(snapshot.trending_products[0].sku, "SP001");
        assert_eq!(snapshot.trending_products[0].percentage_change, -90.0);

        assert!(cache.get(PRODUCT_INSIGHTS_KEY).await.unwrap().is_some());
        assert!(cache.get(TRENDING_PRODUCTS_KEY).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn cached_snapshot_is_served_until_invalidated() {
        let store = seeded_store().await;
        let cache = Arc::new(InMemoryCacheStore::new());
        let service = InsightsService::new(store.clone(), cache.clone(), InsightsSettings::default());

        let first = service.snapshot(Utc::now()).await.unwrap();
        let mouse = store.get_by_sku("SP001").await.unwrap().unwrap();
        store.delete(mouse.id_typed()).await.unwrap();

        // Stale until the key is gone.
        assert_eq!(service.snapshot(Utc::now()).await.unwrap(), first);

        cache.delete(PRODUCT_INSIGHTS_KEY).await.unwrap();
        cache.delete(TRENDING_PRODUCTS_KEY).await.unwrap();
        let fresh = service.snapshot(Utc::now()).await.unwrap();
        assert_eq!(fresh.statistics.total_products, 1);
        assert!(fresh.trending_products.is_empty());
    }

    #[tokio::test]
    async fn cache_failures_fall_back_to_computation() {
        let store = seeded_store().await;
        let service = InsightsService::new(store, Arc::new(FailingCache), InsightsSettings::default());

        let snapshot = service.snapshot(Utc::now()).await.unwrap();
        assert_eq!(snapshot.trending_products.len(), 1);
    }

    #[tokio::test]
    async fn empty_catalog_has_zero_statistics() {
        let service = InsightsService::new(
            Arc::new(InMemoryInventoryStore::new()),
            Arc::new(InMemoryCacheStore::new()),
            InsightsSettings::default(),
        );
        let snapshot = service.snapshot(Utc::now()).await.unwrap();
        assert_eq!(snapshot.statistics.total_products, 0);
        assert_eq!(snapshot.statistics.low_stock_percentage, 0.0);
        assert!(snapshot.trending_products.is_empty());
    }

    #[tokio::test]
    async fn refresh_trending_overwrites_cache() {
        let store = seeded_store().await;
        let cache = Arc::new(InMemoryCacheStore::new());
        cache
            .set_json(TRENDING_PRODUCTS_KEY, &Vec::<TrendingProduct>::new(), None)
            .await
            .unwrap();
        let service = InsightsService::new(store, cache.clone(), InsightsSettings::default());

        let trending = service.refresh_trending(Utc::now()).await.unwrap();
        assert_eq!(trending.len(), 1);
        let cached: Vec<TrendingProduct> = cache.get_json(TRENDING_PRODUCTS_KEY).await.unwrap().unwrap();
        assert_eq!(cached, trending);
    }
}
