use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

/// Per-row result of an inventory batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UpdateOutcome {
    Success {
        sku: String,
        old_quantity: u32,
        new_quantity: u32,
    },
    Error {
        sku: String,
        error: String,
    },
}

impl UpdateOutcome {
    pub fn sku(&self) -> &str {
        match self {
            UpdateOutcome::Success { sku, .. } | UpdateOutcome::Error { sku, .. } => sku,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, UpdateOutcome::Success { .. })
    }
}

/// Plain-text summary of a batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventoryReport {
    pub subject: String,
    pub body: String,
    pub succeeded: usize,
    pub failed: usize,
}

impl InventoryReport {
    pub const SUBJECT: &'static str = "Nightly Inventory Update Report";

    pub fn from_outcomes(outcomes: &[UpdateOutcome]) -> Self {
        let mut body = String::from("Inventory Update Summary:\n\n");
        let mut succeeded = 0;
        for outcome in outcomes {
            // Writing into a String cannot fail.
            let _ = match outcome {
                UpdateOutcome::Success {
                    sku,
                    old_quantity,
                    new_quantity,
                } => {
                    succeeded += 1;
                    writeln!(body, "SKU: {sku}, Updated from {old_quantity} to {new_quantity}")
                }
                UpdateOutcome::Error { sku, error } => writeln!(body, "SKU: {sku}, Error: {error}"),
            };
        }

        Self {
            subject: Self::SUBJECT.to_string(),
            body,
            succeeded,
            failed: outcomes.len() - succeeded,
        }
    }
}
