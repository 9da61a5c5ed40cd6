//! Trend extraction: per-product stock movement over a recent window.

use chrono::{DateTime, Duration, Utc};

use stockpulse_inventory::LedgerReader;
use stockpulse_products::Product;

/// Default look-back window.
pub const DEFAULT_WINDOW_DAYS: i64 = 7;

/// Stock movement of one product over the window.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendRecord {
    pub product: Product,
    /// `(last - first) / first * 100`, unrounded.
    pub percentage_change: f64,
    /// `last - first`.
    pub quantity_change: i64,
}

impl TrendRecord {
    /// Build a record from the first and last quantities of the window.
    ///
    /// Returns `None` when `first` is zero (no percentage can be computed).
    pub fn from_endpoints(product: Product, first: u32, last: u32) -> Option<Self> {
        if first == 0 {
            return None;
        }
        let quantity_change = i64::from(last) - i64::from(first);
        Some(Self {
            product,
            percentage_change: quantity_change as f64 / f64::from(first) * 100.0,
            quantity_change,
        })
    }

    /// Feature row used for clustering.
    pub fn features(&self) -> [f64; 2] {
        [self.percentage_change, self.quantity_change as f64]
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TrendExtractor {
    window: Duration,
}

impl Default for TrendExtractor {
    fn default() -> Self {
        Self::new(Duration::days(DEFAULT_WINDOW_DAYS))
    }
}

impl TrendExtractor {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Start of the window ending at `now` (inclusive).
    ///
    /// A window reaching past the earliest representable instant covers all
    /// history.
    pub fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_signed(self.window).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// One record per product with at least two entries in the window and a
    /// non-zero first quantity. Output keeps the input product order.
    pub fn extract<'a, L>(
        &self,
        products: impl IntoIterator<Item = &'a Product>,
        ledger: &L,
        now: DateTime<Utc>,
    ) -> Vec<TrendRecord>
    where
        L: LedgerReader + ?Sized,
    {
        let since = self.window_start(now);
        products
            .into_iter()
            .filter_map(|product| {
                let entries = ledger.entries_since(product.id_typed(), since);
                if entries.len() < 2 {
                    return None;
                }
                let first = entries.first()?.quantity;
                let last = entries.last()?.quantity;
                TrendRecord::from_endpoints(product.clone(), first, last)
            })
            .collect()
    }
}
