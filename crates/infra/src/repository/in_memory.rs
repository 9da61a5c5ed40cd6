use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use stockpulse_core::{ProductId, ProfileId};
use stockpulse_inventory::{
    LedgerReader, LedgerWindow, StockHistoryEntry, StockLevelChange, ValidInventoryUpdate,
};
use stockpulse_products::{Product, ProductFilter};

use super::{ProductRepository, RepositoryError, StockLedger};

#[derive(Debug, Default)]
struct State {
    products: HashMap<ProductId, Product>,
    by_sku: HashMap<String, ProductId>,
    ledger: LedgerWindow,
}

/// Catalog and ledger behind one lock.
///
/// Intended for tests/dev and for running without a database. The single lock
/// is what makes "append entry + set quantity" atomic.
#[derive(Debug, Default)]
pub struct InMemoryInventoryStore {
    state: RwLock<State>,
}

impl InMemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, RepositoryError> {
        self.state
            .read()
            .map_err(|_| RepositoryError::Storage("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, RepositoryError> {
        self.state
            .write()
            .map_err(|_| RepositoryError::Storage("lock poisoned".to_string()))
    }
}

fn by_name(a: &Product, b: &Product) -> std::cmp::Ordering {
    a.name()
        .cmp(b.name())
        .then_with(|| a.sku().as_str().cmp(b.sku().as_str()))
}

#[async_trait]
impl ProductRepository for InMemoryInventoryStore {
    async fn list(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        let state = self.read()?;
        let mut products: Vec<Product> = state
            .products
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        products.sort_by(by_name);
        Ok(products)
    }

    async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.read()?.products.get(&id).cloned())
    }

    async fn get_by_sku(&self, sku: &str) -> Result<Option<Product>, RepositoryError> {
        let state = self.read()?;
        Ok(state
            .by_sku
            .get(sku)
            .and_then(|id| state.products.get(id))
            .cloned())
    }

    async fn insert(&self, product: Product) -> Result<Product, RepositoryError> {
        let mut state = self.write()?;
        let sku = product.sku().as_str().to_string();
        if state.by_sku.contains_key(&sku) {
            return Err(RepositoryError::Conflict(format!(
                "product with sku {sku} already exists"
            )));
        }
        state.by_sku.insert(sku, product.id_typed());
        state.products.insert(product.id_typed(), product.clone());
        Ok(product)
    }

    async fn update(&self, product: Product) -> Result<Product, RepositoryError> {
        let mut state = self.write()?;
        let id = product.id_typed();
        let Some(existing) = state.products.get(&id) else {
            return Err(RepositoryError::product_not_found(id));
        };

        let old_sku = existing.sku().as_str().to_string();
        let new_sku = product.sku().as_str().to_string();
        if old_sku != new_sku {
            if state.by_sku.contains_key(&new_sku) {
                return Err(RepositoryError::Conflict(format!(
                    "product with sku {new_sku} already exists"
                )));
            }
            state.by_sku.remove(&old_sku);
            state.by_sku.insert(new_sku, id);
        }
        state.products.insert(id, product.clone());
        Ok(product)
    }

    async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let mut state = self.write()?;
        let Some(product) = state.products.remove(&id) else {
            return Ok(false);
        };
        state.by_sku.remove(product.sku().as_str());
        state.ledger.remove_product(id);
        Ok(true)
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        Ok(self.read()?.products.len() as u64)
    }

    async fn set_embedding(&self, id: ProductId, embedding: Vec<f32>) -> Result<(), RepositoryError> {
        let mut state = self.write()?;
        let product = state
            .products
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::product_not_found(id))?;
        product.set_embedding(embedding);
        Ok(())
    }

    async fn release_profile(&self, profile: ProfileId) -> Result<u64, RepositoryError> {
        let mut state = self.write()?;
        let mut released = 0;
        for product in state.products.values_mut() {
            if product.created_by() == Some(profile) {
                product.release_owner();
                released += 1;
            }
        }
        Ok(released)
    }
}

#[async_trait]
impl StockLedger for InMemoryInventoryStore {
    async fn entries_since(
        &self,
        product_id: ProductId,
        since: DateTime<Utc>,
    ) -> Result<Vec<StockHistoryEntry>, RepositoryError> {
        Ok(self.read()?.ledger.entries_since(product_id, since))
    }

    async fn load_window(&self, since: DateTime<Utc>) -> Result<LedgerWindow, RepositoryError> {
        let state = self.read()?;
        let entries = state
            .products
            .keys()
            .flat_map(|id| state.ledger.entries_since(*id, since));
        Ok(LedgerWindow::from_entries(entries))
    }

    async fn record_stock_level(
        &self,
        update: &ValidInventoryUpdate,
        recorded_at: DateTime<Utc>,
    ) -> Result<StockLevelChange, RepositoryError> {
        let mut state = self.write()?;
        let State {
            products,
            by_sku,
            ledger,
        } = &mut *state;

        let product = by_sku
            .get(update.sku.as_str())
            .and_then(|id| products.get_mut(id))
            .ok_or_else(|| RepositoryError::product_not_found(format!("with sku {}", update.sku)))?;

        let old_quantity = product.quantity();
        product.set_quantity(update.quantity, recorded_at);
        let entry = StockHistoryEntry::new(product.id_typed(), update.quantity, recorded_at);
        ledger.push(entry.clone());

        Ok(StockLevelChange {
            product_id: product.id_typed(),
            sku: update.sku.clone(),
            old_quantity,
            new_quantity: update.quantity,
            entry,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal::Decimal;
    use stockpulse_core::Sku;
    use stockpulse_products::NewProduct;

    fn product(sku: &str, name: &str, quantity: i64) -> Product {
        Product::create(
            NewProduct {
                sku: sku.to_string(),
                name: name.to_string(),
                price: Decimal::new(2999, 2),
                quantity,
                discount_percentage: None,
                created_by: None,
            },
            Utc::now(),
        )
        .unwrap()
    }

    fn update(sku: &str, quantity: u32) -> ValidInventoryUpdate {
        ValidInventoryUpdate {
            sku: Sku::parse(sku).unwrap(),
            quantity,
        }
    }

    #[tokio::test]
    async fn list_is_ordered_by_name() {
        let store = InMemoryInventoryStore::new();
        store.insert(product("SP002", "Red Gaming Keyboard", 30)).await.unwrap();
        store.insert(product("SP001", "Blue Wireless Mouse", 5)).await.unwrap();

        let names: Vec<String> = store
            .list(&ProductFilter::default())
            .await
            .unwrap()
            .iter()
            .map(|p| p.name().to_string())
            .collect();
        assert_eq!(names, vec!["Blue Wireless Mouse", "Red Gaming Keyboard"]);
    }

    #[tokio::test]
    async fn duplicate_sku_conflicts() {
        let store = InMemoryInventoryStore::new();
        store.insert(product("SP001", "Mouse", 5)).await.unwrap();
        let err = store.insert(product("SP001", "Other", 1)).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn record_stock_level_appends_and_sets_quantity() {
        let store = InMemoryInventoryStore::new();
        let mouse = store.insert(product("SP001", "Mouse", 50)).await.unwrap();
        let at = Utc::now();

        let change = store.record_stock_level(&update("SP001", 5), at).await.unwrap();
        assert_eq!(change.old_quantity, 50);
        assert_eq!(change.new_quantity, 5);
        assert_eq!(change.entry.quantity, 5);

        let stored = store.get(mouse.id_typed()).await.unwrap().unwrap();
        assert_eq!(stored.quantity(), 5);
        assert_eq!(stored.last_updated(), at);

        let history = store
            .entries_since(mouse.id_typed(), at - Duration::days(1))
            .await
            .unwrap();
        assert_eq!(history, vec![change.entry]);
    }

    #[tokio::test]
    async fn unknown_sku_leaves_ledger_untouched() {
        let store = InMemoryInventoryStore::new();
        store.insert(product("SP001", "Mouse", 50)).await.unwrap();

        let err = store
            .record_stock_level(&update("NOPE", 5), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(_)));
        let window = store.load_window(Utc::now() - Duration::days(30)).await.unwrap();
        assert!(window.is_empty());
    }

    #[tokio::test]
    async fn delete_cascades_to_ledger() {
        let store = InMemoryInventoryStore::new();
        let mouse = store.insert(product("SP001", "Mouse", 50)).await.unwrap();
        store.record_stock_level(&update("SP001", 40), Utc::now()).await.unwrap();

        assert!(store.delete(mouse.id_typed()).await.unwrap());
        assert!(!store.delete(mouse.id_typed()).await.unwrap());
        assert!(store.get_by_sku("SP001").await.unwrap().is_none());
        let window = store.load_window(Utc::now() - Duration::days(1)).await.unwrap();
        assert!(window.is_empty());

        // The SKU is free again.
        store.insert(product("SP001", "Mouse v2", 1)).await.unwrap();
    }

    #[tokio::test]
    async fn release_profile_clears_owner_only_for_that_profile() {
        let store = InMemoryInventoryStore::new();
        let owner = ProfileId::new();
        let owned = Product::from_parts(stockpulse_products::ProductParts {
            created_by: Some(owner),
            ..product("SP001", "Mouse", 1).into_parts()
        });
        store.insert(owned).await.unwrap();
        store.insert(product("SP002", "Keyboard", 1)).await.unwrap();

        assert_eq!(store.release_profile(owner).await.unwrap(), 1);
        let mouse = store.get_by_sku("SP001").await.unwrap().unwrap();
        assert_eq!(mouse.created_by(), None);
    }

    #[tokio::test]
    async fn concurrent_updates_keep_ledger_and_quantity_consistent() {
        let store = std::sync::Arc::new(InMemoryInventoryStore::new());
        let mouse = store.insert(product("SP001", "Mouse", 0)).await.unwrap();

        let mut handles = Vec::new();
        for q in 1..=20u32 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.record_stock_level(&update("SP001", q), Utc::now()).await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }

        let history = store
            .entries_since(mouse.id_typed(), Utc::now() - Duration::days(1))
            .await
            .unwrap();
        assert_eq!(history.len(), 20);
        let stored = store.get(mouse.id_typed()).await.unwrap().unwrap();
        assert!(history.iter().any(|e| e.quantity == stored.quantity()));
    }
}
