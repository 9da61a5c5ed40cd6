use serde::{Deserialize, Serialize};

use stockpulse_core::{DomainError, ProductId, Sku};

use crate::ledger::StockHistoryEntry;

/// External inventory-level report: "SKU now has N units".
///
/// Arrives from the store webhook or a row of the nightly CSV batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryUpdate {
    pub sku: String,
    pub inventory_quantity: i64,
}

/// An inventory update that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidInventoryUpdate {
    pub sku: Sku,
    pub quantity: u32,
}

impl InventoryUpdate {
    pub fn new(sku: impl Into<String>, inventory_quantity: i64) -> Self {
        Self {
            sku: sku.into(),
            inventory_quantity,
        }
    }

    pub fn validate(&self) -> Result<ValidInventoryUpdate, DomainError> {
        let sku = Sku::parse(&self.sku)?;
        if self.inventory_quantity < 0 {
            return Err(DomainError::validation("inventory_quantity cannot be negative"));
        }
        let quantity = u32::try_from(self.inventory_quantity)
            .map_err(|_| DomainError::validation("inventory_quantity is too large"))?;
        Ok(ValidInventoryUpdate { sku, quantity })
    }
}

/// Result of applying one inventory update: the ledger entry that was appended
/// and the quantity transition it caused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockLevelChange {
    pub product_id: ProductId,
    pub sku: Sku,
    pub old_quantity: u32,
    pub new_quantity: u32,
    pub entry: StockHistoryEntry,
}
