//! Inventory domain module.
//!
//! The stock ledger (append-only quantity observations per product) and the
//! inventory-update inputs that feed it: single updates from webhooks and
//! CSV batches from the nightly import. No IO beyond parsing in-memory text.

pub mod import;
pub mod ledger;
pub mod report;
pub mod update;

pub use import::{parse_inventory_csv, ImportError, ImportRow};
pub use ledger::{LedgerReader, LedgerWindow, StockHistoryEntry};
pub use report::{InventoryReport, UpdateOutcome};
pub use update::{InventoryUpdate, StockLevelChange, ValidInventoryUpdate};
