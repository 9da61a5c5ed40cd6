use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

use stockpulse_core::{DiscountPercentage, DomainError, Entity, ProductId, ProfileId, Sku};

/// Maximum display-name length.
pub const NAME_MAX_LEN: usize = 255;

/// Catalog entity: Product.
///
/// `quantity` is the stock currently on hand. It is only moved together with a
/// ledger entry by the inventory-update path; CRUD edits may also overwrite it.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    id: ProductId,
    sku: Sku,
    name: String,
    price: Decimal,
    quantity: u32,
    discount: DiscountPercentage,
    last_updated: DateTime<Utc>,
    embedding: Option<Vec<f32>>,
    created_by: Option<ProfileId>,
}

/// Every stored attribute of a product, used to rehydrate from storage.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductParts {
    pub id: ProductId,
    pub sku: Sku,
    pub name: String,
    pub price: Decimal,
    pub quantity: u32,
    pub discount: DiscountPercentage,
    pub last_updated: DateTime<Utc>,
    pub embedding: Option<Vec<f32>>,
    pub created_by: Option<ProfileId>,
}

/// Payload for creating a product.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub discount_percentage: Option<Decimal>,
    #[serde(default)]
    pub created_by: Option<ProfileId>,
}

/// Payload for updating a product. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProductUpdate {
    pub sku: Option<String>,
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub quantity: Option<i64>,
    pub discount_percentage: Option<Decimal>,
}

/// What an update actually changed; callers use this to invalidate derived data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProductChanges {
    pub name: bool,
    pub price: bool,
    pub quantity: bool,
    pub discount: bool,
}

impl ProductChanges {
    pub fn any(&self) -> bool {
        self.name || self.price || self.quantity || self.discount
    }
}

fn validate_name(name: &str) -> Result<String, DomainError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation("name cannot be empty"));
    }
    if trimmed.chars().count() > NAME_MAX_LEN {
        return Err(DomainError::validation(format!(
            "name cannot be longer than {NAME_MAX_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}

fn validate_price(price: Decimal) -> Result<Decimal, DomainError> {
    if price < Decimal::ZERO {
        return Err(DomainError::validation("price cannot be negative"));
    }
    Ok(price.round_dp(2))
}

fn validate_quantity(quantity: i64) -> Result<u32, DomainError> {
    if quantity < 0 {
        return Err(DomainError::validation("quantity cannot be negative"));
    }
    u32::try_from(quantity).map_err(|_| DomainError::validation("quantity is too large"))
}

impl Product {
    /// Validate a creation payload and build a new product.
    pub fn create(input: NewProduct, now: DateTime<Utc>) -> Result<Self, DomainError> {
        let sku = Sku::parse(&input.sku)?;
        let name = validate_name(&input.name)?;
        let price = validate_price(input.price)?;
        let quantity = validate_quantity(input.quantity)?;
        let discount = match input.discount_percentage {
            Some(pct) => DiscountPercentage::new(pct)?,
            None => DiscountPercentage::ZERO,
        };

        Ok(Self {
            id: ProductId::new(),
            sku,
            name,
            price,
            quantity,
            discount,
            last_updated: now,
            embedding: None,
            created_by: input.created_by,
        })
    }

    pub fn from_parts(parts: ProductParts) -> Self {
        Self {
            id: parts.id,
            sku: parts.sku,
            name: parts.name,
            price: parts.price,
            quantity: parts.quantity,
            discount: parts.discount,
            last_updated: parts.last_updated,
            embedding: parts.embedding,
            created_by: parts.created_by,
        }
    }

    pub fn into_parts(self) -> ProductParts {
        ProductParts {
            id: self.id,
            sku: self.sku,
            name: self.name,
            price: self.price,
            quantity: self.quantity,
            discount: self.discount,
            last_updated: self.last_updated,
            embedding: self.embedding,
            created_by: self.created_by,
        }
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn sku(&self) -> &Sku {
        &self.sku
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn price(&self) -> Decimal {
        self.price
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn discount(&self) -> DiscountPercentage {
        self.discount
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    pub fn embedding(&self) -> Option<&[f32]> {
        self.embedding.as_deref()
    }

    pub fn created_by(&self) -> Option<ProfileId> {
        self.created_by
    }

    /// `price * (1 - discount / 100)`, rounded to cents.
    pub fn discounted_price(&self) -> Decimal {
        self.discount.apply_to(self.price).round_dp(2)
    }

    /// Apply a partial update.
    ///
    /// The SKU is immutable once assigned: sending the current SKU is accepted,
    /// sending a different one is a validation error. Validation happens before
    /// any field is touched, so a rejected update leaves the product unchanged.
    pub fn apply_update(
        &mut self,
        update: ProductUpdate,
        now: DateTime<Utc>,
    ) -> Result<ProductChanges, DomainError> {
        if let Some(sku) = &update.sku {
            if Sku::parse(sku)? != self.sku {
                return Err(DomainError::validation("SKU cannot be changed once assigned"));
            }
        }
        let name = update.name.as_deref().map(validate_name).transpose()?;
        let price = update.price.map(validate_price).transpose()?;
        let quantity = update.quantity.map(validate_quantity).transpose()?;
        let discount = update.discount_percentage.map(DiscountPercentage::new).transpose()?;

        let mut changes = ProductChanges::default();
        if let Some(name) = name {
            changes.name = name != self.name;
            if changes.name {
                self.name = name;
                // Embedding was derived from the old name.
                self.embedding = None;
            }
        }
        if let Some(price) = price {
            changes.price = price != self.price;
            self.price = price;
        }
        if let Some(quantity) = quantity {
            changes.quantity = quantity != self.quantity;
            self.quantity = quantity;
        }
        if let Some(discount) = discount {
            changes.discount = discount != self.discount;
            self.discount = discount;
        }

        self.last_updated = now;
        Ok(changes)
    }

    /// Set the discount percentage (0-100).
    pub fn set_discount(&mut self, pct: Decimal, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.discount = DiscountPercentage::new(pct)?;
        self.last_updated = now;
        Ok(())
    }

    /// Overwrite the quantity on hand. Used by the inventory-update path, which
    /// records the matching ledger entry in the same unit of work.
    pub fn set_quantity(&mut self, quantity: u32, now: DateTime<Utc>) {
        self.quantity = quantity;
        self.last_updated = now;
    }

    pub fn set_embedding(&mut self, embedding: Vec<f32>) {
        self.embedding = Some(embedding);
    }

    /// Drop the owner reference (the owning profile was deleted).
    pub fn release_owner(&mut self) {
        self.created_by = None;
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl core::fmt::Display for Product {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} ({})", self.name, self.sku)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_product(sku: &str, name: &str) -> NewProduct {
        NewProduct {
            sku: sku.to_string(),
            name: name.to_string(),
            price: Decimal::new(2999, 2),
            quantity: 5,
            discount_percentage: None,
            created_by: None,
        }
    }

    #[test]
    fn create_product_applies_defaults() {
        let now = Utc::now();
        let product = Product::create(new_product("SP001", "Blue Wireless Mouse"), now).unwrap();

        assert_eq!(product.sku().as_str(), "SP001");
        assert_eq!(product.name(), "Blue Wireless Mouse");
        assert_eq!(product.quantity(), 5);
        assert_eq!(product.discount(), DiscountPercentage::ZERO);
        assert_eq!(product.last_updated(), now);
        assert!(product.embedding().is_none());
    }

    #[test]
    fn create_product_rejects_empty_name() {
        let err = Product::create(new_product("SP001", "   "), Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn create_product_rejects_empty_sku() {
        let err = Product::create(new_product("  ", "Mouse"), Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn create_product_rejects_negative_price_and_quantity() {
        let mut input = new_product("SP001", "Mouse");
        input.price = Decimal::new(-1, 2);
        assert!(Product::create(input, Utc::now()).is_err());

        let mut input = new_product("SP001", "Mouse");
        input.quantity = -3;
        assert!(Product::create(input, Utc::now()).is_err());
    }

    #[test]
    fn create_product_rejects_out_of_range_discount() {
        let mut input = new_product("SP001", "Mouse");
        input.discount_percentage = Some(Decimal::from(101));
        assert!(Product::create(input, Utc::now()).is_err());
    }

    #[test]
    fn discounted_price_uses_discount_percentage() {
        let mut input = new_product("SP001", "Mouse");
        input.discount_percentage = Some(Decimal::from(10));
        let product = Product::create(input, Utc::now()).unwrap();

        // 29.99 * 0.9 = 26.991 -> 26.99
        assert_eq!(product.discounted_price(), Decimal::new(2699, 2));
    }

    #[test]
    fn update_reports_changed_fields() {
        let mut product = Product::create(new_product("SP001", "Mouse"), Utc::now()).unwrap();
        product.set_embedding(vec![0.1, 0.2]);

        let changes = product
            .apply_update(
                ProductUpdate {
                    name: Some("Wireless Mouse".to_string()),
                    discount_percentage: Some(Decimal::from(15)),
                    quantity: Some(5),
                    ..Default::default()
                },
                Utc::now(),
            )
            .unwrap();

        assert!(changes.name);
        assert!(changes.discount);
        assert!(!changes.quantity);
        assert!(!changes.price);
        assert!(product.embedding().is_none());
    }

    #[test]
    fn update_rejects_sku_change_without_side_effects() {
        let mut product = Product::create(new_product("SP001", "Mouse"), Utc::now()).unwrap();
        let before = product.clone();

        let err = product
            .apply_update(
                ProductUpdate {
                    sku: Some("SP999".to_string()),
                    name: Some("Other".to_string()),
                    ..Default::default()
                },
                Utc::now(),
            )
            .unwrap_err();

        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(product, before);
    }

    #[test]
    fn update_accepts_unchanged_sku() {
        let mut product = Product::create(new_product("SP001", "Mouse"), Utc::now()).unwrap();
        let changes = product
            .apply_update(
                ProductUpdate {
                    sku: Some(" SP001 ".to_string()),
                    ..Default::default()
                },
                Utc::now(),
            )
            .unwrap();
        assert!(!changes.any());
    }

    #[test]
    fn release_owner_clears_profile() {
        let mut input = new_product("SP001", "Mouse");
        input.created_by = Some(ProfileId::new());
        let mut product = Product::create(input, Utc::now()).unwrap();

        product.release_owner();
        assert!(product.created_by().is_none());
    }

    #[test]
    fn parts_round_trip_preserves_state() {
        let mut product = Product::create(new_product("SP001", "Mouse"), Utc::now()).unwrap();
        product.set_embedding(vec![1.0, 0.0, 0.5]);
        let restored = Product::from_parts(product.clone().into_parts());
        assert_eq!(restored, product);
        assert!(restored.same_identity(&product));
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 500,
                ..ProptestConfig::default()
            })]

            /// Property: a rejected update never mutates the product.
            #[test]
            fn rejected_update_is_side_effect_free(
                name in "[A-Za-z][A-Za-z0-9 ]{0,40}",
                bad_quantity in i64::MIN..0,
            ) {
                let mut product = Product::create(new_product("SP001", "Mouse"), Utc::now()).unwrap();
                let before = product.clone();

                let result = product.apply_update(
                    ProductUpdate {
                        name: Some(name),
                        quantity: Some(bad_quantity),
                        ..Default::default()
                    },
                    Utc::now(),
                );

                prop_assert!(result.is_err());
                prop_assert_eq!(product, before);
            }

            /// Property: any valid quantity is accepted verbatim.
            #[test]
            fn valid_quantities_are_stored(quantity in 0i64..=u32::MAX as i64) {
                let mut input = new_product("SP001", "Mouse");
                input.quantity = quantity;
                let product = Product::create(input, Utc::now()).unwrap();
                prop_assert_eq!(product.quantity() as i64, quantity);
            }
        }
    }
}
