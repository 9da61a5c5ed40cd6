use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Extension, Path, Query,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;

use stockpulse_products::{NewProduct, ProductFilter, ProductUpdate};

use crate::app::dto::{self, ProductDto, SearchHitDto};
use crate::app::errors;
use crate::app::routes::{bad_request, parse_product_id};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/search", get(search_products))
        .route("/insights", get(product_insights))
        .route(
            "/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/:id/discount", post(apply_discount))
        .route("/:id/history", get(product_history))
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    filter: Result<Query<ProductFilter>, QueryRejection>,
) -> axum::response::Response {
    let Query(filter) = match filter {
        Ok(f) => f,
        Err(e) => return bad_request(e),
    };
    match services.catalog.list(&filter).await {
        Ok(products) => {
            let items = products.iter().map(ProductDto::from).collect::<Vec<_>>();
            (StatusCode::OK, Json(items)).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<NewProduct>, JsonRejection>,
) -> axum::response::Response {
    let Json(input) = match body {
        Ok(b) => b,
        Err(e) => return bad_request(e),
    };
    match services.catalog.create(input, Utc::now()).await {
        Ok(product) => (StatusCode::CREATED, Json(ProductDto::from(&product))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_product_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.catalog.get(id).await {
        Ok(product) => (StatusCode::OK, Json(ProductDto::from(&product))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<ProductUpdate>, JsonRejection>,
) -> axum::response::Response {
    let id = match parse_product_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Json(update) = match body {
        Ok(b) => b,
        Err(e) => return bad_request(e),
    };
    match services.catalog.update(id, update, Utc::now()).await {
        Ok(product) => (StatusCode::OK, Json(ProductDto::from(&product))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_product_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.catalog.delete(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn apply_discount(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<dto::DiscountRequest>, JsonRejection>,
) -> axum::response::Response {
    let id = match parse_product_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return bad_request(e),
    };
    match services
        .catalog
        .apply_discount(id, body.discount_percentage, Utc::now())
        .await
    {
        Ok(product) => (StatusCode::OK, Json(ProductDto::from(&product))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn product_history(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_product_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.catalog.history(id).await {
        Ok(entries) => (StatusCode::OK, Json(entries)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn search_products(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<dto::SearchQuery>, QueryRejection>,
) -> axum::response::Response {
    let Query(query) = match query {
        Ok(q) => q,
        Err(e) => return bad_request(e),
    };
    match services.search.search(&query.q).await {
        Ok(hits) => {
            let items = hits.iter().map(SearchHitDto::from).collect::<Vec<_>>();
            (StatusCode::OK, Json(items)).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn product_insights(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.insights.snapshot(Utc::now()).await {
        Ok(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
