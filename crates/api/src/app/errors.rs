use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use stockpulse_core::DomainError;
use stockpulse_infra::{InventorySyncError, RepositoryError, ServiceError};

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
    }
}

fn repository_error_to_response(err: RepositoryError) -> axum::response::Response {
    match err {
        RepositoryError::NotFound(msg) => json_error(StatusCode::NOT_FOUND, "not_found", msg),
        RepositoryError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        RepositoryError::Domain(e) => domain_error_to_response(e),
        RepositoryError::Storage(msg) => {
            tracing::error!(error = %msg, "storage failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "storage_error", msg)
        }
    }
}

pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    match err {
        ServiceError::NotFound(what) => {
            json_error(StatusCode::NOT_FOUND, "not_found", format!("{what} not found"))
        }
        ServiceError::Domain(e) => domain_error_to_response(e),
        ServiceError::Repository(e) => repository_error_to_response(e),
        ServiceError::Embedding(e) => {
            tracing::warn!(error = %e, "embedding service failure");
            json_error(StatusCode::BAD_GATEWAY, "embedding_error", e.to_string())
        }
    }
}

pub fn sync_error_to_response(err: InventorySyncError) -> axum::response::Response {
    match err {
        InventorySyncError::Invalid(e) => domain_error_to_response(e),
        InventorySyncError::UnknownSku(sku) => json_error(
            StatusCode::NOT_FOUND,
            "not_found",
            format!("product with sku {sku} not found"),
        ),
        InventorySyncError::Repository(e) => repository_error_to_response(e),
        other => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "inventory_sync_error",
            other.to_string(),
        ),
    }
}
