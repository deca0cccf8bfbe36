use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use stockflow_catalog::{CatalogEntry, ProductCatalog, ProductId};
use stockflow_core::AggregateId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/products", post(create_product).get(list_products))
        .route("/products/:id", get(get_product))
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateProductRequest>,
) -> axum::response::Response {
    if body.name.trim().is_empty() {
        return errors::json_error(StatusCode::BAD_REQUEST, "validation_error", "name cannot be empty");
    }
    if body.on_hand < 0 {
        return errors::json_error(StatusCode::BAD_REQUEST, "validation_error", "on_hand cannot be negative");
    }

    let entry = services.catalog().upsert(CatalogEntry {
        product_id: ProductId::new(AggregateId::new()),
        name: body.name,
        price: body.price,
        on_hand: body.on_hand,
    });
    tracing::info!(product_id = %entry.product_id, on_hand = entry.on_hand, "catalog product added");

    (StatusCode::CREATED, Json(dto::catalog_entry_to_json(&entry))).into_response()
}

pub async fn list_products(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    let items: Vec<_> = services
        .catalog()
        .list()
        .iter()
        .map(dto::catalog_entry_to_json)
        .collect();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let product_id = match errors::parse_id(&id, "product") {
        Ok(v) => ProductId::new(v),
        Err(resp) => return resp,
    };

    match services.catalog().get(&product_id) {
        Ok(entry) => (StatusCode::OK, Json(dto::catalog_entry_to_json(&entry))).into_response(),
        Err(e) => errors::dispatch_error_to_response(e.into()),
    }
}
