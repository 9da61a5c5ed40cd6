//! Catalog list filtering.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::product::Product;

/// Query filters for listing products.
///
/// Every populated field narrows the result; an empty filter matches everything.
/// String "contains" matches are case-insensitive, exact matches are not.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProductFilter {
    pub sku: Option<String>,
    pub sku_contains: Option<String>,
    pub name: Option<String>,
    pub name_contains: Option<String>,
    pub price: Option<Decimal>,
    pub price_min: Option<Decimal>,
    pub price_max: Option<Decimal>,
    pub quantity: Option<u32>,
    pub quantity_min: Option<u32>,
    pub quantity_max: Option<u32>,
    /// Free-text search over name and SKU.
    pub search: Option<String>,
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

impl ProductFilter {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn matches(&self, product: &Product) -> bool {
        let sku = product.sku().as_str();
        let name = product.name();
        let price = product.price();
        let quantity = product.quantity();

        if self.sku.as_deref().is_some_and(|s| s != sku) {
            return false;
        }
        if self.sku_contains.as_deref().is_some_and(|s| !contains_ci(sku, s)) {
            return false;
        }
        if self.name.as_deref().is_some_and(|n| n != name) {
            return false;
        }
        if self.name_contains.as_deref().is_some_and(|n| !contains_ci(name, n)) {
            return false;
        }
        if self.price.is_some_and(|p| p != price) {
            return false;
        }
        if self.price_min.is_some_and(|p| price < p) {
            return false;
        }
        if self.price_max.is_some_and(|p| price > p) {
            return false;
        }
        if self.quantity.is_some_and(|q| q != quantity) {
            return false;
        }
        if self.quantity_min.is_some_and(|q| quantity < q) {
            return false;
        }
        if self.quantity_max.is_some_and(|q| quantity > q) {
            return false;
        }
        if let Some(term) = self.search.as_deref() {
            if !contains_ci(name, term) && !contains_ci(sku, term) {
                return false;
            }
        }
        true
    }
}
