use axum::{
    http::StatusCode,
    routing::post,
    Router,
};

use stockpulse_core::ProductId;

use crate::app::errors;

pub mod products;
pub mod system;
pub mod webhooks;

/// Router for every API endpoint except `/health`.
pub fn router() -> Router {
    Router::new()
        .nest("/products", products::router())
        .route("/webhooks/shopify/inventory", post(webhooks::shopify_inventory))
}

pub(crate) fn parse_product_id(raw: &str) -> Result<ProductId, axum::response::Response> {
    raw.parse()
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid product id"))
}

/// Extractor rejections (bad JSON, bad query string) share the API error shape.
pub(crate) fn bad_request(rejection: impl std::fmt::Display) -> axum::response::Response {
    errors::json_error(StatusCode::BAD_REQUEST, "invalid_request", rejection.to_string())
}
