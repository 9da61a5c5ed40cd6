use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;

use stockpulse_inventory::InventoryUpdate;

use crate::app::dto::WebhookAck;
use crate::app::errors;
use crate::app::routes::bad_request;
use crate::app::services::AppServices;

/// Store inventory-level webhook: `{sku, inventory_quantity}`.
pub async fn shopify_inventory(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<InventoryUpdate>, JsonRejection>,
) -> axum::response::Response {
    let Json(update) = match body {
        Ok(b) => b,
        Err(e) => return bad_request(e),
    };

    match services.sync.apply(&update, Utc::now()).await {
        Ok(change) => (
            StatusCode::OK,
            Json(WebhookAck {
                status: "Inventory updated successfully",
                sku: change.sku.to_string(),
                old_quantity: change.old_quantity,
                new_quantity: change.new_quantity,
            }),
        )
            .into_response(),
        Err(e) => errors::sync_error_to_response(e),
    }
}
