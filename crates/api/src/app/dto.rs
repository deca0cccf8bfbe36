use serde::Deserialize;

use stockflow_bulk_orders::{
    BulkOrder, BulkOrderPriority, BulkOrderStatus, BulkOrderSummary, PaymentDetails, ShippingDetails,
};
use stockflow_catalog::{CatalogEntry, ProductId};
use stockflow_infra::ledger::StockStats;
use stockflow_inventory::{StockMovement, StockRecord, StockUpdateType};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub price: u64,
    #[serde(default)]
    pub on_hand: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateStockRecordRequest {
    pub product_id: ProductId,
    pub quantity: i64,
    pub min_level: i64,
    pub max_level: i64,
    pub cost_per_unit: Option<u64>,
    pub warehouse_location: Option<String>,
    pub shelf_location: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStockRequest {
    #[serde(rename = "type")]
    pub update_type: StockUpdateType,
    pub quantity: i64,
    pub reason: Option<String>,
    pub reference: Option<String>,
}

/// `from`/`to` are RFC 3339 and inclusive.
#[derive(Debug, Default, Deserialize)]
pub struct WindowQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OrderLineDto {
    pub product_id: ProductId,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateBulkOrderRequest {
    pub items: Vec<OrderLineDto>,
    pub shipping_details: ShippingDetails,
    pub priority: Option<BulkOrderPriority>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListBulkOrdersQuery {
    pub status: Option<String>,
    pub priority: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: BulkOrderStatus,
    pub note: Option<String>,
}

// -------------------------
// Response mapping
// -------------------------

pub fn catalog_entry_to_json(entry: &CatalogEntry) -> serde_json::Value {
    serde_json::json!({
        "id": entry.product_id.to_string(),
        "name": entry.name,
        "price": entry.price,
        "on_hand": entry.on_hand,
    })
}

pub fn stock_record_to_json(record: &StockRecord) -> serde_json::Value {
    serde_json::json!({
        "id": record.id_typed().to_string(),
        "product_id": record.product_id().map(|p| p.to_string()),
        "quantity": record.quantity(),
        "reserved": record.reserved(),
        "damaged": record.damaged(),
        "returned": record.returned(),
        "min_level": record.min_level(),
        "max_level": record.max_level(),
        "cost_per_unit": record.cost_per_unit(),
        "warehouse_location": record.warehouse_location(),
        "shelf_location": record.shelf_location(),
        "status": record.status().as_str(),
        "last_restock_date": record.last_restock_date().map(|d| d.to_rfc3339()),
        "created_at": record.created_at().map(|d| d.to_rfc3339()),
        "updated_at": record.updated_at().map(|d| d.to_rfc3339()),
        "movement_count": record.movements().len(),
    })
}

pub fn movement_to_json(m: &StockMovement) -> serde_json::Value {
    serde_json::json!({
        "timestamp": m.timestamp.to_rfc3339(),
        "direction": m.direction,
        "quantity": m.quantity,
        "reason": m.reason,
        "reference": m.reference,
    })
}

pub fn stats_to_json(stats: &StockStats) -> serde_json::Value {
    serde_json::json!({
        "total_records": stats.total_records,
        "in_stock": stats.in_stock,
        "low_stock": stats.low_stock,
        "out_of_stock": stats.out_of_stock,
        "total_value": stats.total_value,
        "total_reserved": stats.total_reserved,
        "total_damaged": stats.total_damaged,
    })
}

fn shipping_to_json(s: &ShippingDetails) -> serde_json::Value {
    serde_json::json!({
        "address": s.address,
        "method": s.method,
        "tracking_number": s.tracking_number,
        "estimated_delivery_date": s.estimated_delivery_date.map(|d| d.to_rfc3339()),
        "actual_delivery_date": s.actual_delivery_date.map(|d| d.to_rfc3339()),
        "instructions": s.instructions,
    })
}

fn payment_to_json(p: &PaymentDetails) -> serde_json::Value {
    serde_json::json!({
        "method": p.method,
        "status": p.status,
        "transaction_id": p.transaction_id,
        "paid_amount": p.paid_amount,
        "paid_date": p.paid_date.map(|d| d.to_rfc3339()),
    })
}

pub fn bulk_order_to_json(order: &BulkOrder) -> serde_json::Value {
    serde_json::json!({
        "id": order.id_typed().to_string(),
        "order_number": order.order_number().map(|n| n.to_string()),
        "user_id": order.user_id().map(|u| u.to_string()),
        "status": order.status().as_str(),
        "priority": order.priority().as_str(),
        "items": order.items().iter().map(|i| serde_json::json!({
            "product_id": i.product_id.to_string(),
            "quantity": i.quantity,
            "unit_price": i.unit_price,
            "subtotal": i.subtotal,
        })).collect::<Vec<_>>(),
        "total_quantity": order.total_quantity(),
        "total_amount": order.total_amount(),
        "discount_percentage": order.discount_percentage(),
        "discount_amount": order.discount_amount(),
        "final_amount": order.final_amount(),
        "shipping_details": order.shipping().map(shipping_to_json),
        "payment_details": order.payment().map(payment_to_json),
        "notes": order.notes(),
        "status_history": order.history().iter().map(|h| serde_json::json!({
            "status": h.status.as_str(),
            "timestamp": h.timestamp.to_rfc3339(),
            "note": h.note,
        })).collect::<Vec<_>>(),
        "approved_at": order.approved_at().map(|d| d.to_rfc3339()),
        "processed_at": order.processed_at().map(|d| d.to_rfc3339()),
        "shipped_at": order.shipped_at().map(|d| d.to_rfc3339()),
        "delivered_at": order.delivered_at().map(|d| d.to_rfc3339()),
        "cancelled_at": order.cancelled_at().map(|d| d.to_rfc3339()),
        "created_at": order.created_at().map(|d| d.to_rfc3339()),
        "updated_at": order.updated_at().map(|d| d.to_rfc3339()),
    })
}

pub fn summary_to_json(summary: &BulkOrderSummary) -> serde_json::Value {
    let status_counts: serde_json::Map<String, serde_json::Value> = summary
        .status_counts
        .iter()
        .map(|(status, count)| (status.as_str().to_string(), serde_json::json!(count)))
        .collect();

    serde_json::json!({
        "total_orders": summary.total_orders,
        "total_amount": summary.total_amount,
        "total_discount": summary.total_discount,
        "status_counts": status_counts,
        "orders": summary.orders.iter().map(bulk_order_to_json).collect::<Vec<_>>(),
    })
}
