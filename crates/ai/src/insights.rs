//! Count-based inventory statistics merged with the trending list.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockpulse_core::ProductId;
use stockpulse_inventory::LedgerReader;
use stockpulse_products::Product;

use crate::trend::{TrendExtractor, TrendRecord};
use crate::trending::TrendClassifier;

pub const DEFAULT_LOW_STOCK_THRESHOLD: u32 = 10;

/// Round half away from zero to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryStatistics {
    pub total_products: u64,
    pub low_stock_products: u64,
    pub low_stock_percentage: f64,
}

impl InventoryStatistics {
    /// Products with `quantity < low_stock_threshold` count as low stock.
    pub fn from_quantities(quantities: impl IntoIterator<Item = u32>, low_stock_threshold: u32) -> Self {
        let (total, low) = quantities
            .into_iter()
            .fold((0u64, 0u64), |(total, low), q| {
                (total + 1, low + u64::from(q < low_stock_threshold))
            });
        let low_stock_percentage = if total == 0 {
            0.0
        } else {
            round2(low as f64 / total as f64 * 100.0)
        };
        Self {
            total_products: total,
            low_stock_products: low,
            low_stock_percentage,
        }
    }
}

/// Presentation shape of a trending product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingProduct {
    pub id: ProductId,
    pub name: String,
    pub sku: String,
    pub quantity_change: i64,
    pub percentage_change: f64,
    pub price: Decimal,
    pub discounted_price: Decimal,
}

impl From<&TrendRecord> for TrendingProduct {
    fn from(record: &TrendRecord) -> Self {
        let p = &record.product;
        Self {
            id: p.id_typed(),
            name: p.name().to_string(),
            sku: p.sku().as_str().to_string(),
            quantity_change: record.quantity_change,
            percentage_change: round2(record.percentage_change),
            price: p.price(),
            discounted_price: p.discounted_price(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightSnapshot {
    pub statistics: InventoryStatistics,
    pub trending_products: Vec<TrendingProduct>,
}

/// Extract → classify → merge with statistics. Caching lives with the caller.
#[derive(Debug, Clone, Copy)]
pub struct InsightsAggregator {
    pub extractor: TrendExtractor,
    pub classifier: TrendClassifier,
    pub low_stock_threshold: u32,
}

impl Default for InsightsAggregator {
    fn default() -> Self {
        Self {
            extractor: TrendExtractor::default(),
            classifier: TrendClassifier::default(),
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
        }
    }
}

impl InsightsAggregator {
    pub fn trending<L>(&self, products: &[Product], ledger: &L, now: DateTime<Utc>) -> Vec<TrendingProduct>
    where
        L: LedgerReader + ?Sized,
    {
        let records = self.extractor.extract(products, ledger, now);
        self.classifier
            .select(&records)
            .iter()
            .map(TrendingProduct::from)
            .collect()
    }

    pub fn statistics(&self, products: &[Product]) -> InventoryStatistics {
        InventoryStatistics::from_quantities(
            products.iter().map(Product::quantity),
            self.low_stock_threshold,
        )
    }

    pub fn snapshot<L>(&self, products: &[Product], ledger: &L, now: DateTime<Utc>) -> InsightSnapshot
    where
        L: LedgerReader + ?Sized,
    {
        InsightSnapshot {
            statistics: self.statistics(products),
            trending_products: self.trending(products, ledger, now),
        }
    }
}
