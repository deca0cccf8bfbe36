//! Bulk order domain: the order aggregate, its status machine, discount
//! tiers, order numbers and per-user summaries. Pure, no IO.

pub mod details;
pub mod discount;
pub mod order;
pub mod order_number;
pub mod status;
pub mod summary;

pub use details::{PaymentDetails, PaymentDetailsPatch, ShippingDetails, ShippingDetailsPatch};
pub use discount::{bulk_discount_percentage, final_amount};
pub use order::{
    BulkOrder, BulkOrderCommand, BulkOrderCreated, BulkOrderEvent, BulkOrderId, BulkOrderStatusChanged,
    CatalogEffect, ChangeStatus, CreateBulkOrder, OrderItem, PaymentDetailsUpdated, PricedLine,
    ShippingDetailsUpdated, StatusHistoryEntry, UpdatePaymentDetails, UpdateShippingDetails,
};
pub use order_number::{OrderNumber, OrderNumberPrefix, MAX_SEQUENCE};
pub use status::{BulkOrderPriority, BulkOrderStatus};
pub use summary::BulkOrderSummary;
