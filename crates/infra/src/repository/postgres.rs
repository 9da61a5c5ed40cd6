//! Postgres-backed catalog and stock ledger.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Code | RepositoryError |
//! |------------|-----------------|-----------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (other) | any | `Storage` |
//! | PoolClosed / network / other | N/A | `Storage` |
//!
//! ## Atomicity
//!
//! `record_stock_level` locks the product row (`FOR UPDATE`), updates its
//! quantity and inserts the ledger row in one transaction. Ledger rows cascade
//! on product deletion via the foreign key.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use tracing::{instrument, Span};

use stockpulse_core::{DiscountPercentage, ProductId, ProfileId, Sku, StockEntryId};
use stockpulse_inventory::{LedgerWindow, StockHistoryEntry, StockLevelChange, ValidInventoryUpdate};
use stockpulse_products::{Product, ProductFilter, ProductParts};

use super::{ProductRepository, RepositoryError, StockLedger};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS products (
        id                  UUID PRIMARY KEY,
        sku                 VARCHAR(50) NOT NULL UNIQUE,
        name                VARCHAR(255) NOT NULL,
        price               NUMERIC(12, 2) NOT NULL CHECK (price >= 0),
        quantity            BIGINT NOT NULL CHECK (quantity >= 0),
        discount_percentage NUMERIC(5, 2) NOT NULL DEFAULT 0
                            CHECK (discount_percentage >= 0 AND discount_percentage <= 100),
        last_updated        TIMESTAMPTZ NOT NULL,
        embedding           JSONB NULL,
        created_by          UUID NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS stock_history (
        id          UUID PRIMARY KEY,
        seq         BIGSERIAL NOT NULL,
        product_id  UUID NOT NULL REFERENCES products(id) ON DELETE CASCADE,
        quantity    BIGINT NOT NULL CHECK (quantity >= 0),
        recorded_at TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS stock_history_product_time
        ON stock_history (product_id, recorded_at, seq)
    "#,
];

const PRODUCT_COLUMNS: &str =
    "id, sku, name, price, quantity, discount_percentage, last_updated, embedding, created_by";

#[derive(Debug, Clone)]
pub struct PostgresInventoryStore {
    pool: Arc<PgPool>,
}

impl PostgresInventoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub async fn connect(database_url: &str) -> Result<Self, RepositoryError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create tables and indexes if they are missing.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> Result<(), RepositoryError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        }
        Ok(())
    }
}

fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len() + 2);
    out.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
    if let Some(sku) = &filter.sku {
        qb.push(" AND sku = ").push_bind(sku.clone());
    }
    if let Some(sku) = &filter.sku_contains {
        qb.push(" AND sku ILIKE ").push_bind(escape_like(sku));
    }
    if let Some(name) = &filter.name {
        qb.push(" AND name = ").push_bind(name.clone());
    }
    if let Some(name) = &filter.name_contains {
        qb.push(" AND name ILIKE ").push_bind(escape_like(name));
    }
    if let Some(price) = filter.price {
        qb.push(" AND price = ").push_bind(price);
    }
    if let Some(price) = filter.price_min {
        qb.push(" AND price >= ").push_bind(price);
    }
    if let Some(price) = filter.price_max {
        qb.push(" AND price <= ").push_bind(price);
    }
    if let Some(q) = filter.quantity {
        qb.push(" AND quantity = ").push_bind(i64::from(q));
    }
    if let Some(q) = filter.quantity_min {
        qb.push(" AND quantity >= ").push_bind(i64::from(q));
    }
    if let Some(q) = filter.quantity_max {
        qb.push(" AND quantity <= ").push_bind(i64::from(q));
    }
    if let Some(term) = &filter.search {
        let pattern = escape_like(term);
        qb.push(" AND (name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR sku ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

#[async_trait]
impl ProductRepository for PostgresInventoryStore {
    #[instrument(skip(self, filter), err)]
    async fn list(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE TRUE"
        ));
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY name ASC, sku ASC");

        let rows = qb
            .build()
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_products", e))?;

        Span::current().record("product_count", rows.len());
        rows.iter().map(product_from_row).collect()
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_product", e))?;
        row.as_ref().map(product_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn get_by_sku(&self, sku: &str) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE sku = $1"))
            .bind(sku)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_product_by_sku", e))?;
        row.as_ref().map(product_from_row).transpose()
    }

    #[instrument(skip(self, product), fields(sku = %product.sku()), err)]
    async fn insert(&self, product: Product) -> Result<Product, RepositoryError> {
        sqlx::query(&format!(
            "INSERT INTO products ({PRODUCT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"
        ))
        .bind(*product.id_typed().as_uuid())
        .bind(product.sku().as_str())
        .bind(product.name())
        .bind(product.price())
        .bind(i64::from(product.quantity()))
        .bind(product.discount().value())
        .bind(product.last_updated())
        .bind(product.embedding().map(|e| Json(e.to_vec())))
        .bind(product.created_by().map(|p| *p.as_uuid()))
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_product", e))?;
        Ok(product)
    }

    #[instrument(skip(self, product), fields(product_id = %product.id_typed()), err)]
    async fn update(&self, product: Product) -> Result<Product, RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET sku = $2,
                name = $3,
                price = $4,
                quantity = $5,
                discount_percentage = $6,
                last_updated = $7,
                embedding = $8,
                created_by = $9
            WHERE id = $1
            "#,
        )
        .bind(*product.id_typed().as_uuid())
        .bind(product.sku().as_str())
        .bind(product.name())
        .bind(product.price())
        .bind(i64::from(product.quantity()))
        .bind(product.discount().value())
        .bind(product.last_updated())
        .bind(product.embedding().map(|e| Json(e.to_vec())))
        .bind(product.created_by().map(|p| *p.as_uuid()))
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_product", e))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::product_not_found(product.id_typed()));
        }
        Ok(product)
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), err)]
    async fn count(&self) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_products", e))?;
        Ok(count.max(0) as u64)
    }

    #[instrument(skip(self, embedding), fields(product_id = %id, dims = embedding.len()), err)]
    async fn set_embedding(&self, id: ProductId, embedding: Vec<f32>) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE products SET embedding = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(Json(embedding))
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("set_embedding", e))?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::product_not_found(id));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(profile_id = %profile), err)]
    async fn release_profile(&self, profile: ProfileId) -> Result<u64, RepositoryError> {
        let result = sqlx::query("UPDATE products SET created_by = NULL WHERE created_by = $1")
            .bind(profile.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("release_profile", e))?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl StockLedger for PostgresInventoryStore {
    #[instrument(skip(self), fields(product_id = %product_id), err)]
    async fn entries_since(
        &self,
        product_id: ProductId,
        since: DateTime<Utc>,
    ) -> Result<Vec<StockHistoryEntry>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, product_id, quantity, recorded_at
            FROM stock_history
            WHERE product_id = $1 AND recorded_at >= $2
            ORDER BY recorded_at ASC, seq ASC
            "#,
        )
        .bind(product_id.as_uuid())
        .bind(since)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("entries_since", e))?;

        rows.iter().map(entry_from_row).collect()
    }

    #[instrument(skip(self), fields(entry_count = tracing::field::Empty), err)]
    async fn load_window(&self, since: DateTime<Utc>) -> Result<LedgerWindow, RepositoryError> {
        // timestamptz cannot hold chrono's minimum; nothing predates the epoch.
        let since = since.max(DateTime::<Utc>::UNIX_EPOCH);
        let rows = sqlx::query(
            r#"
            SELECT id, product_id, quantity, recorded_at
            FROM stock_history
            WHERE recorded_at >= $1
            ORDER BY product_id, recorded_at ASC, seq ASC
            "#,
        )
        .bind(since)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_window", e))?;

        Span::current().record("entry_count", rows.len());
        let entries = rows
            .iter()
            .map(entry_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(LedgerWindow::from_entries(entries))
    }

    #[instrument(skip(self, update), fields(sku = %update.sku, quantity = update.quantity), err)]
    async fn record_stock_level(
        &self,
        update: &ValidInventoryUpdate,
        recorded_at: DateTime<Utc>,
    ) -> Result<StockLevelChange, RepositoryError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let row = sqlx::query("SELECT id, quantity FROM products WHERE sku = $1 FOR UPDATE")
            .bind(update.sku.as_str())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("lock_product", e))?;

        let Some(row) = row else {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(RepositoryError::product_not_found(format!("with sku {}", update.sku)));
        };

        let product_id = ProductId::from_uuid(row.try_get("id").map_err(decode_error)?);
        let old_quantity = quantity_from_db(row.try_get("quantity").map_err(decode_error)?)?;
        let entry = StockHistoryEntry::new(product_id, update.quantity, recorded_at);

        sqlx::query("UPDATE products SET quantity = $2, last_updated = $3 WHERE id = $1")
            .bind(product_id.as_uuid())
            .bind(i64::from(update.quantity))
            .bind(recorded_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("set_quantity", e))?;

        sqlx::query(
            "INSERT INTO stock_history (id, product_id, quantity, recorded_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(entry.id.as_uuid())
        .bind(product_id.as_uuid())
        .bind(i64::from(entry.quantity))
        .bind(recorded_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_stock_history", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(StockLevelChange {
            product_id,
            sku: update.sku.clone(),
            old_quantity,
            new_quantity: update.quantity,
            entry,
        })
    }
}

fn decode_error(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Storage(format!("failed to decode row: {e}"))
}

fn quantity_from_db(value: i64) -> Result<u32, RepositoryError> {
    u32::try_from(value).map_err(|_| RepositoryError::Storage(format!("stored quantity {value} out of range")))
}

fn product_from_row(row: &PgRow) -> Result<Product, RepositoryError> {
    let sku: String = row.try_get("sku").map_err(decode_error)?;
    let discount: Decimal = row.try_get("discount_percentage").map_err(decode_error)?;
    let embedding: Option<Json<Vec<f32>>> = row.try_get("embedding").map_err(decode_error)?;
    let created_by: Option<uuid::Uuid> = row.try_get("created_by").map_err(decode_error)?;

    Ok(Product::from_parts(ProductParts {
        id: ProductId::from_uuid(row.try_get("id").map_err(decode_error)?),
        sku: Sku::parse(&sku)?,
        name: row.try_get("name").map_err(decode_error)?,
        price: row.try_get("price").map_err(decode_error)?,
        quantity: quantity_from_db(row.try_get("quantity").map_err(decode_error)?)?,
        discount: DiscountPercentage::new(discount)?,
        last_updated: row.try_get("last_updated").map_err(decode_error)?,
        embedding: embedding.map(|Json(v)| v),
        created_by: created_by.map(ProfileId::from_uuid),
    }))
}

fn entry_from_row(row: &PgRow) -> Result<StockHistoryEntry, RepositoryError> {
    Ok(StockHistoryEntry {
        id: StockEntryId::from_uuid(row.try_get("id").map_err(decode_error)?),
        product_id: ProductId::from_uuid(row.try_get("product_id").map_err(decode_error)?),
        quantity: quantity_from_db(row.try_get("quantity").map_err(decode_error)?)?,
        recorded_at: row.try_get("recorded_at").map_err(decode_error)?,
    })
}

/// Map SQLx errors to RepositoryError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> RepositoryError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => RepositoryError::Conflict(msg),
                _ => RepositoryError::Storage(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            RepositoryError::Storage(format!("connection pool closed in {}", operation))
        }
        other => RepositoryError::Storage(format!("{} failed: {}", operation, other)),
    }
}
