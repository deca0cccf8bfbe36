use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockflow_catalog::ProductId;
use stockflow_core::{Aggregate, AggregateId, AggregateRoot, DomainError, UserId};
use stockflow_events::Event;

use crate::details::{PaymentDetails, PaymentDetailsPatch, ShippingDetails, ShippingDetailsPatch};
use crate::discount::{bulk_discount_percentage, final_amount};
use crate::order_number::OrderNumber;
use crate::status::{BulkOrderPriority, BulkOrderStatus};

/// Bulk order identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BulkOrderId(pub AggregateId);

impl BulkOrderId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for BulkOrderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Requested line, priced from the catalog at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedLine {
    pub product_id: ProductId,
    pub quantity: i64,
    /// Price in smallest currency unit (e.g., cents).
    pub unit_price: u64,
}

/// Order line. Immutable once the order is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_price: u64,
    pub subtotal: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    pub status: BulkOrderStatus,
    pub timestamp: DateTime<Utc>,
    pub note: Option<String>,
}

/// What a status transition requires from the product catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogEffect {
    None,
    /// Every item must still be available in full.
    ValidateAvailability,
    /// Decrement every item's on-hand quantity.
    Commit,
    /// Give committed quantities back.
    Restock,
}

/// Aggregate root: BulkOrder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkOrder {
    id: BulkOrderId,
    order_number: Option<OrderNumber>,
    user_id: Option<UserId>,
    status: BulkOrderStatus,
    priority: BulkOrderPriority,
    items: Vec<OrderItem>,
    total_amount: u64,
    discount_percentage: u8,
    final_amount: u64,
    shipping: Option<ShippingDetails>,
    payment: Option<PaymentDetails>,
    notes: Option<String>,
    history: Vec<StatusHistoryEntry>,
    approved_at: Option<DateTime<Utc>>,
    processed_at: Option<DateTime<Utc>>,
    shipped_at: Option<DateTime<Utc>>,
    delivered_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    stock_committed: bool,
    version: u64,
    created: bool,
}

impl BulkOrder {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: BulkOrderId) -> Self {
        Self {
            id,
            order_number: None,
            user_id: None,
            status: BulkOrderStatus::Draft,
            priority: BulkOrderPriority::default(),
            items: Vec::new(),
            total_amount: 0,
            discount_percentage: 0,
            final_amount: 0,
            shipping: None,
            payment: None,
            notes: None,
            history: Vec::new(),
            approved_at: None,
            processed_at: None,
            shipped_at: None,
            delivered_at: None,
            cancelled_at: None,
            created_at: None,
            updated_at: None,
            stock_committed: false,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> BulkOrderId {
        self.id
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    pub fn order_number(&self) -> Option<&OrderNumber> {
        self.order_number.as_ref()
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    pub fn status(&self) -> BulkOrderStatus {
        self.status
    }

    pub fn priority(&self) -> BulkOrderPriority {
        self.priority
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn total_amount(&self) -> u64 {
        self.total_amount
    }

    pub fn total_quantity(&self) -> u64 {
        self.items
            .iter()
            .map(|i| u64::try_from(i.quantity).unwrap_or(0))
            .sum()
    }

    pub fn discount_percentage(&self) -> u8 {
        self.discount_percentage
    }

    pub fn final_amount(&self) -> u64 {
        self.final_amount
    }

    pub fn discount_amount(&self) -> u64 {
        self.total_amount.saturating_sub(self.final_amount)
    }

    pub fn shipping(&self) -> Option<&ShippingDetails> {
        self.shipping.as_ref()
    }

    pub fn payment(&self) -> Option<&PaymentDetails> {
        self.payment.as_ref()
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn history(&self) -> &[StatusHistoryEntry] {
        &self.history
    }

    pub fn approved_at(&self) -> Option<DateTime<Utc>> {
        self.approved_at
    }

    pub fn processed_at(&self) -> Option<DateTime<Utc>> {
        self.processed_at
    }

    pub fn shipped_at(&self) -> Option<DateTime<Utc>> {
        self.shipped_at
    }

    pub fn delivered_at(&self) -> Option<DateTime<Utc>> {
        self.delivered_at
    }

    pub fn cancelled_at(&self) -> Option<DateTime<Utc>> {
        self.cancelled_at
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// Whether the catalog has been decremented for this order's items.
    pub fn stock_committed(&self) -> bool {
        self.stock_committed
    }

    /// Catalog work that must accompany a transition to `to`.
    ///
    /// Does not check legality; call `handle` for that.
    pub fn catalog_effect(&self, to: BulkOrderStatus) -> CatalogEffect {
        match to {
            BulkOrderStatus::Approved => CatalogEffect::ValidateAvailability,
            BulkOrderStatus::Processing if !self.stock_committed => CatalogEffect::Commit,
            BulkOrderStatus::Cancelled
                if self.stock_committed && self.status == BulkOrderStatus::Processing =>
            {
                CatalogEffect::Restock
            }
            _ => CatalogEffect::None,
        }
    }
}

impl AggregateRoot for BulkOrder {
    type Id = BulkOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateBulkOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateBulkOrder {
    pub order_id: BulkOrderId,
    pub order_number: OrderNumber,
    pub user_id: UserId,
    pub priority: BulkOrderPriority,
    pub lines: Vec<PricedLine>,
    pub shipping: ShippingDetails,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ChangeStatus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeStatus {
    pub order_id: BulkOrderId,
    pub status: BulkOrderStatus,
    pub note: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateShippingDetails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateShippingDetails {
    pub order_id: BulkOrderId,
    pub patch: ShippingDetailsPatch,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdatePaymentDetails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatePaymentDetails {
    pub order_id: BulkOrderId,
    pub patch: PaymentDetailsPatch,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BulkOrderCommand {
    CreateBulkOrder(CreateBulkOrder),
    ChangeStatus(ChangeStatus),
    UpdateShippingDetails(UpdateShippingDetails),
    UpdatePaymentDetails(UpdatePaymentDetails),
}

/// Event: BulkOrderCreated. Totals are computed once, here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkOrderCreated {
    pub order_id: BulkOrderId,
    pub order_number: OrderNumber,
    pub user_id: UserId,
    pub priority: BulkOrderPriority,
    pub items: Vec<OrderItem>,
    pub total_amount: u64,
    pub discount_percentage: u8,
    pub final_amount: u64,
    pub shipping: ShippingDetails,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: BulkOrderStatusChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkOrderStatusChanged {
    pub order_id: BulkOrderId,
    pub from: BulkOrderStatus,
    pub to: BulkOrderStatus,
    pub note: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ShippingDetailsUpdated (carries the merged result).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingDetailsUpdated {
    pub order_id: BulkOrderId,
    pub shipping: ShippingDetails,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PaymentDetailsUpdated (carries the merged result).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDetailsUpdated {
    pub order_id: BulkOrderId,
    pub payment: PaymentDetails,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BulkOrderEvent {
    BulkOrderCreated(BulkOrderCreated),
    StatusChanged(BulkOrderStatusChanged),
    ShippingDetailsUpdated(ShippingDetailsUpdated),
    PaymentDetailsUpdated(PaymentDetailsUpdated),
}

impl Event for BulkOrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            BulkOrderEvent::BulkOrderCreated(_) => "bulk_orders.order.created",
            BulkOrderEvent::StatusChanged(_) => "bulk_orders.order.status_changed",
            BulkOrderEvent::ShippingDetailsUpdated(_) => "bulk_orders.order.shipping_updated",
            BulkOrderEvent::PaymentDetailsUpdated(_) => "bulk_orders.order.payment_updated",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            BulkOrderEvent::BulkOrderCreated(e) => e.occurred_at,
            BulkOrderEvent::StatusChanged(e) => e.occurred_at,
            BulkOrderEvent::ShippingDetailsUpdated(e) => e.occurred_at,
            BulkOrderEvent::PaymentDetailsUpdated(e) => e.occurred_at,
        }
    }
}

impl Aggregate for BulkOrder {
    type Command = BulkOrderCommand;
    type Event = BulkOrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            BulkOrderEvent::BulkOrderCreated(e) => {
                self.id = e.order_id;
                self.order_number = Some(e.order_number.clone());
                self.user_id = Some(e.user_id);
                self.status = BulkOrderStatus::Draft;
                self.priority = e.priority;
                self.items = e.items.clone();
                self.total_amount = e.total_amount;
                self.discount_percentage = e.discount_percentage;
                self.final_amount = e.final_amount;
                self.shipping = Some(e.shipping.clone());
                self.notes = e.notes.clone();
                self.history = vec![StatusHistoryEntry {
                    status: BulkOrderStatus::Draft,
                    timestamp: e.occurred_at,
                    note: None,
                }];
                self.created_at = Some(e.occurred_at);
                self.updated_at = Some(e.occurred_at);
                self.created = true;
            }
            BulkOrderEvent::StatusChanged(e) => {
                match e.to {
                    BulkOrderStatus::Approved => self.approved_at = Some(e.occurred_at),
                    BulkOrderStatus::Processing => {
                        self.processed_at = Some(e.occurred_at);
                        self.stock_committed = true;
                    }
                    BulkOrderStatus::Shipped => self.shipped_at = Some(e.occurred_at),
                    BulkOrderStatus::Delivered => self.delivered_at = Some(e.occurred_at),
                    BulkOrderStatus::Cancelled => self.cancelled_at = Some(e.occurred_at),
                    BulkOrderStatus::Draft | BulkOrderStatus::Pending => {}
                }
                self.status = e.to;
                self.history.push(StatusHistoryEntry {
                    status: e.to,
                    timestamp: e.occurred_at,
                    note: e.note.clone(),
                });
                self.updated_at = Some(e.occurred_at);
            }
            BulkOrderEvent::ShippingDetailsUpdated(e) => {
                self.shipping = Some(e.shipping.clone());
                self.updated_at = Some(e.occurred_at);
            }
            BulkOrderEvent::PaymentDetailsUpdated(e) => {
                self.payment = Some(e.payment.clone());
                self.updated_at = Some(e.occurred_at);
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            BulkOrderCommand::CreateBulkOrder(cmd) => self.handle_create(cmd),
            BulkOrderCommand::ChangeStatus(cmd) => self.handle_change_status(cmd),
            BulkOrderCommand::UpdateShippingDetails(cmd) => self.handle_update_shipping(cmd),
            BulkOrderCommand::UpdatePaymentDetails(cmd) => self.handle_update_payment(cmd),
        }
    }
}

impl BulkOrder {
    fn ensure_created(&self) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found(format!("bulk order {}", self.id)));
        }
        Ok(())
    }

    fn ensure_order_id(&self, order_id: BulkOrderId) -> Result<(), DomainError> {
        if self.id != order_id {
            return Err(DomainError::invariant("order_id mismatch"));
        }
        Ok(())
    }

    /// Detail patches are closed once the order is delivered or cancelled.
    fn ensure_mutable(&self, what: &str) -> Result<(), DomainError> {
        if self.status.is_terminal() {
            return Err(DomainError::invalid_transition(
                self.status,
                format!("{} ({what} update)", self.status),
            ));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateBulkOrder) -> Result<Vec<BulkOrderEvent>, DomainError> {
        if self.created {
            return Err(DomainError::already_exists(format!(
                "bulk order {} already exists",
                self.id
            )));
        }
        if cmd.lines.is_empty() {
            return Err(DomainError::validation("bulk order must contain at least one item"));
        }
        cmd.shipping.validate()?;

        let overflow = || DomainError::validation("order total overflow");
        let mut seen = HashSet::with_capacity(cmd.lines.len());
        let mut items = Vec::with_capacity(cmd.lines.len());
        let mut total_amount: u64 = 0;
        let mut total_quantity: u64 = 0;

        for line in &cmd.lines {
            if line.quantity <= 0 {
                return Err(DomainError::validation(format!(
                    "quantity for product {} must be positive",
                    line.product_id
                )));
            }
            if !seen.insert(line.product_id) {
                return Err(DomainError::validation(format!(
                    "product {} appears more than once",
                    line.product_id
                )));
            }

            let qty = line.quantity as u64;
            let subtotal = line.unit_price.checked_mul(qty).ok_or_else(overflow)?;
            total_amount = total_amount.checked_add(subtotal).ok_or_else(overflow)?;
            total_quantity = total_quantity.checked_add(qty).ok_or_else(overflow)?;

            items.push(OrderItem {
                product_id: line.product_id,
                quantity: line.quantity,
                unit_price: line.unit_price,
                subtotal,
            });
        }

        let discount_percentage = bulk_discount_percentage(total_amount, total_quantity);

        Ok(vec![BulkOrderEvent::BulkOrderCreated(BulkOrderCreated {
            order_id: cmd.order_id,
            order_number: cmd.order_number.clone(),
            user_id: cmd.user_id,
            priority: cmd.priority,
            items,
            total_amount,
            discount_percentage,
            final_amount: final_amount(total_amount, discount_percentage),
            shipping: cmd.shipping.clone(),
            notes: cmd.notes.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_change_status(&self, cmd: &ChangeStatus) -> Result<Vec<BulkOrderEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_order_id(cmd.order_id)?;
        self.status.ensure_transition(cmd.status)?;

        Ok(vec![BulkOrderEvent::StatusChanged(BulkOrderStatusChanged {
            order_id: cmd.order_id,
            from: self.status,
            to: cmd.status,
            note: cmd.note.clone().filter(|n| !n.trim().is_empty()),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_shipping(&self, cmd: &UpdateShippingDetails) -> Result<Vec<BulkOrderEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_order_id(cmd.order_id)?;
        self.ensure_mutable("shipping")?;
        if cmd.patch.is_empty() {
            return Err(DomainError::validation("shipping update contains no fields"));
        }

        let current = self
            .shipping
            .as_ref()
            .ok_or_else(|| DomainError::invariant("created order has no shipping details"))?;
        let shipping = current.merged(&cmd.patch)?;

        Ok(vec![BulkOrderEvent::ShippingDetailsUpdated(ShippingDetailsUpdated {
            order_id: cmd.order_id,
            shipping,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_payment(&self, cmd: &UpdatePaymentDetails) -> Result<Vec<BulkOrderEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_order_id(cmd.order_id)?;
        self.ensure_mutable("payment")?;
        if cmd.patch.is_empty() {
            return Err(DomainError::validation("payment update contains no fields"));
        }

        let payment = cmd.patch.merged_onto(self.payment.as_ref())?;

        Ok(vec![BulkOrderEvent::PaymentDetailsUpdated(PaymentDetailsUpdated {
            order_id: cmd.order_id,
            payment,
            occurred_at: cmd.occurred_at,
        })])
    }
}
