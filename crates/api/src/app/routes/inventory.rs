use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use stockflow_catalog::ProductId;
use stockflow_infra::ledger::{NewStockRecord, StockUpdateRequest};
use stockflow_inventory::StockRecordId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_record).get(list_records))
        .route("/low-stock", get(list_low_stock))
        .route("/stats", get(get_stats))
        .route("/product/:product_id", get(get_by_product))
        .route("/:id", get(get_record))
        .route("/:id/stock", post(update_stock))
        .route("/:id/movements", get(get_movements))
}

fn record_id(id: &str) -> Result<StockRecordId, axum::response::Response> {
    errors::parse_id(id, "stock record").map(StockRecordId::new)
}

pub async fn create_record(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateStockRecordRequest>,
) -> axum::response::Response {
    let req = NewStockRecord {
        product_id: body.product_id,
        quantity: body.quantity,
        min_level: body.min_level,
        max_level: body.max_level,
        cost_per_unit: body.cost_per_unit,
        warehouse_location: body.warehouse_location,
        shelf_location: body.shelf_location,
    };

    match services.run(move |s| s.ledger().create(req)).await {
        Ok(record) => (StatusCode::CREATED, Json(dto::stock_record_to_json(&record))).into_response(),
        Err(resp) => resp,
    }
}

pub async fn update_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateStockRequest>,
) -> axum::response::Response {
    let record_id = match record_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let req = StockUpdateRequest {
        update_type: body.update_type,
        quantity: body.quantity,
        reason: body.reason,
        reference: body.reference,
    };

    match services.run(move |s| s.ledger().update_stock(record_id, req)).await {
        Ok(record) => (StatusCode::OK, Json(dto::stock_record_to_json(&record))).into_response(),
        Err(resp) => resp,
    }
}

pub async fn get_record(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let record_id = match record_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.run(move |s| s.ledger().get(record_id)).await {
        Ok(record) => (StatusCode::OK, Json(dto::stock_record_to_json(&record))).into_response(),
        Err(resp) => resp,
    }
}

pub async fn get_by_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(product_id): Path<String>,
) -> axum::response::Response {
    let product_id = match errors::parse_id(&product_id, "product") {
        Ok(v) => ProductId::new(v),
        Err(resp) => return resp,
    };

    match services.run(move |s| s.ledger().get_by_product(product_id)).await {
        Ok(record) => (StatusCode::OK, Json(dto::stock_record_to_json(&record))).into_response(),
        Err(resp) => resp,
    }
}

pub async fn get_movements(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Query(q): Query<dto::WindowQuery>,
) -> axum::response::Response {
    let record_id = match record_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let (from, to) = match (
        errors::parse_timestamp(q.from.as_deref(), "from"),
        errors::parse_timestamp(q.to.as_deref(), "to"),
    ) {
        (Ok(from), Ok(to)) => (from, to),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };

    match services.run(move |s| s.ledger().movements(record_id, from, to)).await {
        Ok(window) => {
            let movements: Vec<_> = window.iter().map(dto::movement_to_json).collect();
            (
                StatusCode::OK,
                Json(serde_json::json!({
                    "record_id": record_id.to_string(),
                    "count": movements.len(),
                    "movements": movements,
                })),
            )
                .into_response()
        }
        Err(resp) => resp,
    }
}

pub async fn list_records(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.run(|s| s.ledger().list()).await {
        Ok(records) => {
            let items: Vec<_> = records.iter().map(dto::stock_record_to_json).collect();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(resp) => resp,
    }
}

pub async fn list_low_stock(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.run(|s| s.ledger().list_low_stock()).await {
        Ok(records) => {
            let items: Vec<_> = records.iter().map(dto::stock_record_to_json).collect();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(resp) => resp,
    }
}

pub async fn get_stats(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.run(|s| s.ledger().stats()).await {
        Ok(stats) => (StatusCode::OK, Json(dto::stats_to_json(&stats))).into_response(),
        Err(resp) => resp,
    }
}
