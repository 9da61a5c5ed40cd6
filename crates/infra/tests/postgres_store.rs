//! Postgres-backed store checks.
//!
//! These need a running PostgreSQL; set `TEST_DATABASE_URL` to run them,
//! otherwise they return early.

use std::fmt::Debug;
use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use tracing::field::{Field, Visit};
use tracing::span::{Id, Record};
use tracing::Subscriber;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

use stockpulse_core::Sku;
use stockpulse_infra::{PostgresInventoryStore, ProductRepository, StockLedger};
use stockpulse_inventory::ValidInventoryUpdate;
use stockpulse_products::{NewProduct, Product};

/// Collects every `entry_count` recorded on a span after creation.
#[derive(Clone, Default)]
struct EntryCounts(Arc<Mutex<Vec<u64>>>);

struct EntryCountVisitor<'a>(&'a Mutex<Vec<u64>>);

impl Visit for EntryCountVisitor<'_> {
    fn record_u64(&mut self, field: &Field, value: u64) {
        if field.name() == "entry_count" {
            self.0.lock().unwrap().push(value);
        }
    }

    fn record_debug(&mut self, _field: &Field, _value: &dyn Debug) {}
}

impl<S: Subscriber> Layer<S> for EntryCounts {
    fn on_record(&self, _id: &Id, values: &Record<'_>, _ctx: Context<'_, S>) {
        values.record(&mut EntryCountVisitor(&self.0));
    }
}

async fn store() -> Option<PostgresInventoryStore> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;
    let store = PostgresInventoryStore::connect(&url).await.unwrap();
    store.ensure_schema().await.unwrap();
    Some(store)
}

#[tokio::test]
async fn load_window_records_entry_count_on_its_span() {
    let Some(store) = store().await else {
        return;
    };
    let counts = EntryCounts::default();
    let _guard = tracing_subscriber::registry()
        .with(counts.clone())
        .set_default();

    let sku = format!("PG{}", &uuid::Uuid::now_v7().simple().to_string()[20..]);
    let now = Utc::now();
    store
        .insert(
            Product::create(
                NewProduct {
                    sku: sku.clone(),
                    name: "Window Span Mouse".to_string(),
                    price: Decimal::TEN,
                    quantity: 50,
                    discount_percentage: None,
                    created_by: None,
                },
                now,
            )
            .unwrap(),
        )
        .await
        .unwrap();
    for (quantity, at) in [(50, now - Duration::days(1)), (5, now)] {
        let update = ValidInventoryUpdate {
            sku: Sku::parse(&sku).unwrap(),
            quantity,
        };
        store.record_stock_level(&update, at).await.unwrap();
    }

    let window = store.load_window(now - Duration::days(2)).await.unwrap();

    let recorded = counts.0.lock().unwrap().clone();
    assert_eq!(recorded, vec![window.len() as u64]);
    assert!(window.len() >= 2);
}
