//! Value objects: equality by value, not identity.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Maximum SKU length accepted by the catalog.
pub const SKU_MAX_LEN: usize = 50;

/// Stock keeping unit: unique, non-empty product code.
///
/// Surrounding whitespace is stripped on construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Sku(String);

impl Sku {
    pub fn parse(raw: impl AsRef<str>) -> DomainResult<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("SKU cannot be empty"));
        }
        if trimmed.chars().count() > SKU_MAX_LEN {
            return Err(DomainError::validation(format!(
                "SKU cannot be longer than {SKU_MAX_LEN} characters"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sku {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Sku {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Sku::parse(value)
    }
}

impl From<Sku> for String {
    fn from(value: Sku) -> Self {
        value.0
    }
}

/// Discount percentage in the closed range `0..=100`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct DiscountPercentage(Decimal);

impl DiscountPercentage {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(value: Decimal) -> DomainResult<Self> {
        if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
            return Err(DomainError::validation(
                "discount percentage must be between 0 and 100",
            ));
        }
        // Stored with two decimal places.
        Ok(Self(value.round_dp(2)))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Apply the discount to a price: `price * (1 - pct / 100)`.
    pub fn apply_to(&self, price: Decimal) -> Decimal {
        price * (Decimal::ONE - self.0 / Decimal::ONE_HUNDRED)
    }
}

impl TryFrom<Decimal> for DiscountPercentage {
    type Error = DomainError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        DiscountPercentage::new(value)
    }
}

impl From<DiscountPercentage> for Decimal {
    fn from(value: DiscountPercentage) -> Self {
        value.0
    }
}
