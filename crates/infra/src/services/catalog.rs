use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{info, instrument};

use stockpulse_core::ProductId;
use stockpulse_inventory::StockHistoryEntry;
use stockpulse_products::{NewProduct, Product, ProductFilter, ProductUpdate};

use crate::cache::{embedding_key, CacheStore, PRODUCT_INSIGHTS_KEY, TRENDING_PRODUCTS_KEY};
use crate::repository::{InventoryStore, ProductRepository, StockLedger};

use super::{invalidate, ServiceError};

/// Product CRUD plus discount management with cache invalidation.
pub struct CatalogService {
    store: Arc<dyn InventoryStore>,
    cache: Arc<dyn CacheStore>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn InventoryStore>, cache: Arc<dyn CacheStore>) -> Self {
        Self { store, cache }
    }

    pub async fn list(&self, filter: &ProductFilter) -> Result<Vec<Product>, ServiceError> {
        Ok(self.store.list(filter).await?)
    }

    pub async fn get(&self, id: ProductId) -> Result<Product, ServiceError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("product {id}")))
    }

    #[instrument(skip(self, input), fields(sku = %input.sku), err)]
    pub async fn create(&self, input: NewProduct, now: DateTime<Utc>) -> Result<Product, ServiceError> {
        let product = Product::create(input, now)?;
        let product = self.store.insert(product).await?;
        info!(product_id = %product.id_typed(), "product created");
        Ok(product)
    }

    #[instrument(skip(self, update), fields(product_id = %id), err)]
    pub async fn update(
        &self,
        id: ProductId,
        update: ProductUpdate,
        now: DateTime<Utc>,
    ) -> Result<Product, ServiceError> {
        let mut product = self.get(id).await?;
        let changes = product.apply_update(update, now)?;
        let product = self.store.update(product).await?;

        let embedding = embedding_key(product.sku().as_str());
        if changes.discount {
            invalidate(
                self.cache.as_ref(),
                &[PRODUCT_INSIGHTS_KEY, TRENDING_PRODUCTS_KEY, embedding.as_str()],
            )
            .await;
        } else if changes.name {
            invalidate(self.cache.as_ref(), &[embedding.as_str()]).await;
        }
        Ok(product)
    }

    /// Set a product's discount and drop every cache entry derived from it.
    #[instrument(skip(self), fields(product_id = %id), err)]
    pub async fn apply_discount(
        &self,
        id: ProductId,
        discount_percentage: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Product, ServiceError> {
        let mut product = self.get(id).await?;
        product.set_discount(discount_percentage, now)?;
        let product = self.store.update(product).await?;

        invalidate(
            self.cache.as_ref(),
            &[
                PRODUCT_INSIGHTS_KEY,
                TRENDING_PRODUCTS_KEY,
                embedding_key(product.sku().as_str()).as_str(),
            ],
        )
        .await;
        info!(discount = %product.discount().value(), "discount applied");
        Ok(product)
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    pub async fn delete(&self, id: ProductId) -> Result<(), ServiceError> {
        let product = self.get(id).await?;
        if !self.store.delete(id).await? {
            return Err(ServiceError::NotFound(format!("product {id}")));
        }
        invalidate(
            self.cache.as_ref(),
            &[
                PRODUCT_INSIGHTS_KEY,
                TRENDING_PRODUCTS_KEY,
                embedding_key(product.sku().as_str()).as_str(),
            ],
        )
        .await;
        info!(sku = %product.sku(), "product deleted");
        Ok(())
    }

    /// Full stock history of a product, oldest first.
    pub async fn history(&self, id: ProductId) -> Result<Vec<StockHistoryEntry>, ServiceError> {
        self.get(id).await?;
        Ok(self.store.entries_since(id, DateTime::<Utc>::UNIX_EPOCH).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCacheStore;
    use crate::repository::{InMemoryInventoryStore, RepositoryError};
    use stockpulse_core::DomainError;

    fn new_product(sku: &str, name: &str) -> NewProduct {
        NewProduct {
            sku: sku.to_string(),
            name: name.to_string(),
            price: Decimal::from(100),
            quantity: 20,
            discount_percentage: None,
            created_by: None,
        }
    }

    fn service() -> (CatalogService, Arc<InMemoryCacheStore>) {
        let cache = Arc::new(InMemoryCacheStore::new());
        let service = CatalogService::new(Arc::new(InMemoryInventoryStore::new()), cache.clone());
        (service, cache)
    }

    async fn warm(cache: &InMemoryCacheStore, sku: &str) {
        for key in [PRODUCT_INSIGHTS_KEY, TRENDING_PRODUCTS_KEY, embedding_key(sku).as_str()] {
            cache.set(key, "[]".to_string(), None).await.unwrap();
        }
    }

    #[tokio::test]
    async fn discount_updates_price_and_invalidates_caches() {
        let (service, cache) = service();
        let product = service.create(new_product("SP001", "Mouse"), Utc::now()).await.unwrap();
        warm(&cache, "SP001").await;

        let updated = service
            .apply_discount(product.id_typed(), Decimal::from(25), Utc::now())
            .await
            .unwrap();

        assert_eq!(updated.discounted_price(), Decimal::from(75));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn discount_out_of_range_is_rejected_and_caches_survive() {
        let (service, cache) = service();
        let product = service.create(new_product("SP001", "Mouse"), Utc::now()).await.unwrap();
        warm(&cache, "SP001").await;

        let err = service
            .apply_discount(product.id_typed(), Decimal::from(101), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))));
        assert_eq!(cache.len(), 3);
        assert_eq!(
            service.get(product.id_typed()).await.unwrap().discount().value(),
            Decimal::ZERO
        );
    }

    #[tokio::test]
    async fn renaming_clears_only_the_embedding_key() {
        let (service, cache) = service();
        let product = service.create(new_product("SP001", "Mouse"), Utc::now()).await.unwrap();
        warm(&cache, "SP001").await;

        let update = ProductUpdate {
            name: Some("Wireless Mouse".to_string()),
            ..Default::default()
        };
        service.update(product.id_typed(), update, Utc::now()).await.unwrap();

        assert!(cache.get(&embedding_key("SP001")).await.unwrap().is_none());
        assert!(cache.get(PRODUCT_INSIGHTS_KEY).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn changing_sku_is_rejected() {
        let (service, _) = service();
        let product = service.create(new_product("SP001", "Mouse"), Utc::now()).await.unwrap();
        let update = ProductUpdate {
            sku: Some("SP999".to_string()),
            ..Default::default()
        };
        let err = service.update(product.id_typed(), update, Utc::now()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(_)));
    }

    #[tokio::test]
    async fn duplicate_sku_is_a_conflict() {
        let (service, _) = service();
        service.create(new_product("SP001", "Mouse"), Utc::now()).await.unwrap();
        let err = service
            .create(new_product("SP001", "Mouse 2"), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Repository(RepositoryError::Conflict(_))));
    }

    #[tokio::test]
    async fn missing_product_is_not_found() {
        let (service, _) = service();
        let id = ProductId::new();
        assert!(matches!(service.get(id).await, Err(ServiceError::NotFound(_))));
        assert!(matches!(service.delete(id).await, Err(ServiceError::NotFound(_))));
        assert!(matches!(
            service.apply_discount(id, Decimal::TEN, Utc::now()).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(service.history(id).await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn delete_clears_product_cache_entries() {
        let (service, cache) = service();
        let product = service.create(new_product("SP001", "Mouse"), Utc::now()).await.unwrap();
        warm(&cache, "SP001").await;

        service.delete(product.id_typed()).await.unwrap();
        assert!(cache.is_empty());
        assert!(service.list(&ProductFilter::default()).await.unwrap().is_empty());
    }
}
