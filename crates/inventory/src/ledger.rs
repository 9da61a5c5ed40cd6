use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockpulse_core::{ProductId, StockEntryId};

/// Immutable stock observation: "product X had N units at time T".
///
/// Entries are never mutated; the ledger for a product only grows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockHistoryEntry {
    pub id: StockEntryId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub recorded_at: DateTime<Utc>,
}

impl StockHistoryEntry {
    pub fn new(product_id: ProductId, quantity: u32, recorded_at: DateTime<Utc>) -> Self {
        Self {
            id: StockEntryId::new(),
            product_id,
            quantity,
            recorded_at,
        }
    }
}

/// Synchronous, read-only view over the stock ledger.
///
/// Implementations return entries with `recorded_at >= since`, ordered by
/// timestamp ascending (insertion order on equal timestamps).
pub trait LedgerReader {
    fn entries_since(&self, product_id: ProductId, since: DateTime<Utc>) -> Vec<StockHistoryEntry>;
}

impl<R: LedgerReader + ?Sized> LedgerReader for &R {
    fn entries_since(&self, product_id: ProductId, since: DateTime<Utc>) -> Vec<StockHistoryEntry> {
        (**self).entries_since(product_id, since)
    }
}

/// In-memory ledger slice, grouped per product and kept in timestamp order.
///
/// Used both as the in-process ledger and as a prefetched window handed to the
/// analytics pipeline by async stores.
#[derive(Debug, Clone, Default)]
pub struct LedgerWindow {
    by_product: HashMap<ProductId, Vec<StockHistoryEntry>>,
}

impl LedgerWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = StockHistoryEntry>) -> Self {
        let mut window = Self::new();
        for entry in entries {
            window.push(entry);
        }
        window
    }

    /// Append an entry, keeping the product's entries ordered by timestamp.
    ///
    /// An entry with the same timestamp as existing ones goes after them.
    pub fn push(&mut self, entry: StockHistoryEntry) {
        let entries = self.by_product.entry(entry.product_id).or_default();
        let at = entries.partition_point(|e| e.recorded_at <= entry.recorded_at);
        entries.insert(at, entry);
    }

    /// All entries for a product, ascending.
    pub fn entries(&self, product_id: ProductId) -> &[StockHistoryEntry] {
        self.by_product
            .get(&product_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Remove a product's history (cascade on product deletion).
    pub fn remove_product(&mut self, product_id: ProductId) -> usize {
        self.by_product
            .remove(&product_id)
            .map(|v| v.len())
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.by_product.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LedgerReader for LedgerWindow {
    fn entries_since(&self, product_id: ProductId, since: DateTime<Utc>) -> Vec<StockHistoryEntry> {
        let entries = self.entries(product_id);
        let start = entries.partition_point(|e| e.recorded_at < since);
        entries[start..].to_vec()
    }
}
