//! CSV batch parsing for the nightly inventory import.
//!
//! Expected shape: a header row that includes `sku` and `inventory_quantity`
//! (any other columns are ignored), then one row per product.

use thiserror::Error;

use crate::update::InventoryUpdate;

pub const SKU_COLUMN: &str = "sku";
pub const QUANTITY_COLUMN: &str = "inventory_quantity";

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("missing required column: {0}")]
    MissingColumn(&'static str),

    #[error("malformed csv: {0}")]
    Csv(#[from] csv::Error),
}

/// One parsed CSV row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportRow {
    Update(InventoryUpdate),
    /// The row had both values but the quantity was not an integer.
    Invalid { sku: String, error: String },
}

/// Parse CSV text into inventory updates.
///
/// Rows where the SKU or quantity cell is missing or blank are skipped.
pub fn parse_inventory_csv(content: &str) -> Result<Vec<ImportRow>, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers = reader.headers()?.clone();
    let position = |name: &'static str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or(ImportError::MissingColumn(name))
    };
    let sku_idx = position(SKU_COLUMN)?;
    let qty_idx = position(QUANTITY_COLUMN)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let (Some(sku), Some(qty)) = (record.get(sku_idx), record.get(qty_idx)) else {
            continue;
        };
        if sku.is_empty() || qty.is_empty() {
            continue;
        }

        match qty.parse::<i64>() {
            Ok(inventory_quantity) => rows.push(ImportRow::Update(InventoryUpdate {
                sku: sku.to_string(),
                inventory_quantity,
            })),
            Err(e) => rows.push(ImportRow::Invalid {
                sku: sku.to_string(),
                error: format!("inventory_quantity {qty:?} is not an integer: {e}"),
            }),
        }
    }

    Ok(rows)
}
