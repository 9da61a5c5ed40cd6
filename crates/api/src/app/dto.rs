use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockpulse_ai::ScoredMatch;
use stockpulse_products::Product;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct DiscountRequest {
    pub discount_percentage: Decimal,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct ProductDto {
    pub id: String,
    pub name: String,
    pub sku: String,
    pub price: Decimal,
    pub discount_percentage: Decimal,
    pub discounted_price: Decimal,
    pub quantity: u32,
    pub last_updated: DateTime<Utc>,
    pub created_by: Option<String>,
}

impl From<&Product> for ProductDto {
    fn from(p: &Product) -> Self {
        Self {
            id: p.id_typed().to_string(),
            name: p.name().to_string(),
            sku: p.sku().to_string(),
            price: p.price(),
            discount_percentage: p.discount().value(),
            discounted_price: p.discounted_price(),
            quantity: p.quantity(),
            last_updated: p.last_updated(),
            created_by: p.created_by().map(|id| id.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SearchHitDto {
    #[serde(flatten)]
    pub product: ProductDto,
    pub score: f64,
}

impl From<&ScoredMatch<Product>> for SearchHitDto {
    fn from(m: &ScoredMatch<Product>) -> Self {
        Self {
            product: ProductDto::from(&m.item),
            score: m.score,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub status: &'static str,
    pub sku: String,
    pub old_quantity: u32,
    pub new_quantity: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockpulse_products::NewProduct;

    #[test]
    fn product_dto_carries_discounted_price() {
        let product = Product::create(
            NewProduct {
                sku: "SP001".to_string(),
                name: "Blue Wireless Mouse".to_string(),
                price: Decimal::from(100),
                quantity: 5,
                discount_percentage: Some(Decimal::from(25)),
                created_by: None,
            },
            Utc::now(),
        )
        .unwrap();

        let json = serde_json::to_value(ProductDto::from(&product)).unwrap();
        assert_eq!(json["sku"], "SP001");
        assert_eq!(json["quantity"], 5);
        let discounted: Decimal = json["discounted_price"].as_str().unwrap().parse().unwrap();
        assert_eq!(discounted, Decimal::from(75));
        assert!(json["created_by"].is_null());
    }

    #[test]
    fn search_hit_flattens_product_fields() {
        let product = Product::create(
            NewProduct {
                sku: "SP002".to_string(),
                name: "Keyboard".to_string(),
                price: Decimal::ONE,
                quantity: 1,
                discount_percentage: None,
                created_by: None,
            },
            Utc::now(),
        )
        .unwrap();
        let hit = ScoredMatch { item: product, score: 0.5 };

        let json = serde_json::to_value(SearchHitDto::from(&hit)).unwrap();
        assert_eq!(json["name"], "Keyboard");
        assert_eq!(json["score"], 0.5);
    }
}
