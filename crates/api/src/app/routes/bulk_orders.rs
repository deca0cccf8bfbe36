use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use chrono::{DateTime, Utc};

use stockflow_bulk_orders::{
    BulkOrderId, BulkOrderPriority, BulkOrderStatus, PaymentDetailsPatch, ShippingDetailsPatch,
};
use stockflow_infra::workflow::{BulkOrderFilter, NewBulkOrder, OrderLineRequest};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::UserContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_order).get(list_orders))
        .route("/summary", get(get_summary))
        .route("/:id", get(get_order))
        .route("/:id/status", patch(update_status))
        .route("/:id/shipping", patch(update_shipping))
        .route("/:id/payment", patch(update_payment))
}

fn order_id(id: &str) -> Result<BulkOrderId, axum::response::Response> {
    errors::parse_id(id, "bulk order").map(BulkOrderId::new)
}

pub async fn create_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Json(body): Json<dto::CreateBulkOrderRequest>,
) -> axum::response::Response {
    let req = NewBulkOrder {
        user_id: user.user_id(),
        items: body
            .items
            .into_iter()
            .map(|l| OrderLineRequest {
                product_id: l.product_id,
                quantity: l.quantity,
            })
            .collect(),
        shipping: body.shipping_details,
        priority: body.priority,
        notes: body.notes,
    };

    match services.run(move |s| s.workflow().create(req)).await {
        Ok(order) => (StatusCode::CREATED, Json(dto::bulk_order_to_json(&order))).into_response(),
        Err(resp) => resp,
    }
}

pub async fn list_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Query(q): Query<dto::ListBulkOrdersQuery>,
) -> axum::response::Response {
    let status: Option<BulkOrderStatus> = match q.status.as_deref().map(|s| {
        errors::parse_enum(
            s,
            "invalid_status",
            "draft, pending, approved, processing, shipped, delivered, cancelled",
        )
    }) {
        Some(Err(resp)) => return resp,
        Some(Ok(v)) => Some(v),
        None => None,
    };
    let priority: Option<BulkOrderPriority> = match q
        .priority
        .as_deref()
        .map(|s| errors::parse_enum(s, "invalid_priority", "low, medium, high, urgent"))
    {
        Some(Err(resp)) => return resp,
        Some(Ok(v)) => Some(v),
        None => None,
    };

    let filter = BulkOrderFilter {
        status,
        priority,
        user_id: Some(user.user_id()),
    };

    match services.run(move |s| s.workflow().list(filter)).await {
        Ok(orders) => {
            let items: Vec<_> = orders.iter().map(dto::bulk_order_to_json).collect();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(resp) => resp,
    }
}

pub async fn get_summary(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Query(q): Query<dto::WindowQuery>,
) -> axum::response::Response {
    let (from, to) = match (
        errors::parse_timestamp(q.from.as_deref(), "from"),
        errors::parse_timestamp(q.to.as_deref(), "to"),
    ) {
        (Ok(from), Ok(to)) => (from.unwrap_or(DateTime::<Utc>::MIN_UTC), to.unwrap_or_else(Utc::now)),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };
    let user_id = user.user_id();

    match services.run(move |s| s.workflow().summary(user_id, from, to)).await {
        Ok(summary) => (StatusCode::OK, Json(dto::summary_to_json(&summary))).into_response(),
        Err(resp) => resp,
    }
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order_id = match order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.run(move |s| s.workflow().get(order_id)).await {
        Ok(order) => (StatusCode::OK, Json(dto::bulk_order_to_json(&order))).into_response(),
        Err(resp) => resp,
    }
}

pub async fn update_status(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateStatusRequest>,
) -> axum::response::Response {
    let order_id = match order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services
        .run(move |s| s.workflow().update_status(order_id, body.status, body.note))
        .await
    {
        Ok(order) => (StatusCode::OK, Json(dto::bulk_order_to_json(&order))).into_response(),
        Err(resp) => resp,
    }
}

pub async fn update_shipping(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(patch): Json<ShippingDetailsPatch>,
) -> axum::response::Response {
    let order_id = match order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services
        .run(move |s| s.workflow().update_shipping_details(order_id, patch))
        .await
    {
        Ok(order) => (StatusCode::OK, Json(dto::bulk_order_to_json(&order))).into_response(),
        Err(resp) => resp,
    }
}

pub async fn update_payment(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(patch): Json<PaymentDetailsPatch>,
) -> axum::response::Response {
    let order_id = match order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services
        .run(move |s| s.workflow().update_payment_details(order_id, patch))
        .await
    {
        Ok(order) => (StatusCode::OK, Json(dto::bulk_order_to_json(&order))).into_response(),
        Err(resp) => resp,
    }
}
