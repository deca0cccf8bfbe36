//! Bulk order workflow: creation against the catalog and status transitions
//! that commit or restock catalog quantities as one unit of work.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;

use stockflow_bulk_orders::{
    BulkOrder, BulkOrderCommand, BulkOrderId, BulkOrderPriority, BulkOrderStatus, BulkOrderSummary,
    CatalogEffect, ChangeStatus, CreateBulkOrder, PaymentDetailsPatch, PricedLine, ShippingDetails,
    ShippingDetailsPatch, UpdatePaymentDetails, UpdateShippingDetails,
};
use stockflow_catalog::{ProductCatalog, ProductId};
use stockflow_core::{Aggregate, AggregateId, Clock, UserId};
use stockflow_events::{EventBus, EventEnvelope};

use crate::command_dispatcher::{CommandDispatcher, DispatchError};
use crate::event_store::EventStore;
use crate::keyed_lock::KeyedLocks;
use crate::sequencer::OrderNumberSequencer;

pub const BULK_ORDER_AGGREGATE: &str = "bulk_orders.order";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLineRequest {
    pub product_id: ProductId,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBulkOrder {
    pub user_id: UserId,
    pub items: Vec<OrderLineRequest>,
    pub shipping: ShippingDetails,
    pub priority: Option<BulkOrderPriority>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkOrderFilter {
    pub status: Option<BulkOrderStatus>,
    pub priority: Option<BulkOrderPriority>,
    pub user_id: Option<UserId>,
}

impl BulkOrderFilter {
    pub fn matches(&self, order: &BulkOrder) -> bool {
        self.status.is_none_or(|s| order.status() == s)
            && self.priority.is_none_or(|p| order.priority() == p)
            && self.user_id.is_none_or(|u| order.user_id() == Some(u))
    }
}

/// Catalog adjustments already applied within one unit of work.
type Applied = Vec<(ProductId, i64)>;

pub struct BulkOrderWorkflow<S, B> {
    dispatcher: Arc<CommandDispatcher<S, B>>,
    catalog: Arc<dyn ProductCatalog>,
    clock: Arc<dyn Clock>,
    order_locks: KeyedLocks<BulkOrderId>,
    sequencer: OrderNumberSequencer,
}

impl<S, B> BulkOrderWorkflow<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// Build the workflow and seed the sequencer from orders already stored.
    pub fn new(
        dispatcher: Arc<CommandDispatcher<S, B>>,
        catalog: Arc<dyn ProductCatalog>,
        clock: Arc<dyn Clock>,
        lock_timeout: Duration,
    ) -> Result<Self, DispatchError> {
        let workflow = Self {
            dispatcher,
            catalog,
            clock,
            order_locks: KeyedLocks::new(lock_timeout),
            sequencer: OrderNumberSequencer::new(),
        };

        let existing = workflow.load_all()?;
        workflow
            .sequencer
            .seed(existing.iter().filter_map(|o| o.order_number()));

        Ok(workflow)
    }

    #[tracing::instrument(skip(self, req), fields(user_id = %req.user_id, lines = req.items.len()))]
    pub fn create(&self, req: NewBulkOrder) -> Result<BulkOrder, DispatchError> {
        let mut lines = Vec::with_capacity(req.items.len());
        for item in &req.items {
            let entry = self.catalog.get(&item.product_id)?;
            if entry.on_hand < item.quantity {
                tracing::warn!(
                    product_id = %item.product_id,
                    requested = item.quantity,
                    available = entry.on_hand,
                    "bulk order rejected: not enough stock"
                );
                return Err(DispatchError::InsufficientStock(format!(
                    "not enough stock for product {} ({}): requested {}, available {}",
                    entry.name, item.product_id, item.quantity, entry.on_hand
                )));
            }
            lines.push(PricedLine {
                product_id: item.product_id,
                quantity: item.quantity,
                unit_price: entry.price,
            });
        }

        let occurred_at = self.clock.now();
        let order_number = self.sequencer.next(occurred_at)?;
        let order_id = BulkOrderId::new(AggregateId::new());

        let command = BulkOrderCommand::CreateBulkOrder(CreateBulkOrder {
            order_id,
            order_number,
            user_id: req.user_id,
            priority: req.priority.unwrap_or_default(),
            lines,
            shipping: req.shipping,
            notes: req.notes,
            occurred_at,
        });

        let order = self
            .dispatcher
            .dispatch(order_id.0, BULK_ORDER_AGGREGATE, &command, make_order)?
            .aggregate;

        tracing::info!(
            order_id = %order_id,
            order_number = %order.order_number().map(|n| n.to_string()).unwrap_or_default(),
            total_amount = order.total_amount(),
            discount_percentage = order.discount_percentage(),
            final_amount = order.final_amount(),
            "bulk order created"
        );
        Ok(order)
    }

    /// Move an order along its lifecycle.
    ///
    /// Catalog side effects and the status change are applied together: if the
    /// order event cannot be appended every catalog adjustment is reversed.
    #[tracing::instrument(skip(self, note), fields(order_id = %order_id, to = %to))]
    pub fn update_status(
        &self,
        order_id: BulkOrderId,
        to: BulkOrderStatus,
        note: Option<String>,
    ) -> Result<BulkOrder, DispatchError> {
        let _guard = self.order_locks.acquire(&order_id)?;

        let mut attempt = 1;
        loop {
            let loaded = self.dispatcher.load(order_id.0, make_order)?;
            let from = loaded.aggregate.status();
            let command = BulkOrderCommand::ChangeStatus(ChangeStatus {
                order_id,
                status: to,
                note: note.clone(),
                occurred_at: self.clock.now(),
            });

            let decided = loaded.aggregate.handle(&command)?;
            let effect = loaded.aggregate.catalog_effect(to);
            let applied = self.apply_catalog_effect(&loaded.aggregate, effect)?;

            match self.dispatcher.commit(loaded, BULK_ORDER_AGGREGATE, decided) {
                Ok(committed) => {
                    tracing::info!(
                        from = %from,
                        effect = ?effect,
                        adjusted_products = applied.len(),
                        "bulk order status changed"
                    );
                    return Ok(committed.aggregate);
                }
                Err(err @ DispatchError::Publish(_)) => {
                    // Appended already; the catalog change stands with it.
                    tracing::warn!(error = %err, "status change stored but not published");
                    return Err(err);
                }
                Err(err) => {
                    if let Err(unreverted) = self.compensate(order_id, &applied) {
                        return Err(DispatchError::CompensationFailed {
                            cause: Box::new(err),
                            unreverted,
                        });
                    }
                    if matches!(err, DispatchError::Concurrency(_)) && attempt < self.dispatcher.max_attempts() {
                        tracing::debug!(attempt, "status change conflicted, retrying");
                        attempt += 1;
                        continue;
                    }
                    return Err(err);
                }
            }
        }
    }

    #[tracing::instrument(skip(self, patch), fields(order_id = %order_id))]
    pub fn update_shipping_details(
        &self,
        order_id: BulkOrderId,
        patch: ShippingDetailsPatch,
    ) -> Result<BulkOrder, DispatchError> {
        let _guard = self.order_locks.acquire(&order_id)?;
        let command = BulkOrderCommand::UpdateShippingDetails(UpdateShippingDetails {
            order_id,
            patch,
            occurred_at: self.clock.now(),
        });
        let order = self
            .dispatcher
            .dispatch(order_id.0, BULK_ORDER_AGGREGATE, &command, make_order)?
            .aggregate;
        tracing::info!("shipping details updated");
        Ok(order)
    }

    #[tracing::instrument(skip(self, patch), fields(order_id = %order_id))]
    pub fn update_payment_details(
        &self,
        order_id: BulkOrderId,
        patch: PaymentDetailsPatch,
    ) -> Result<BulkOrder, DispatchError> {
        let _guard = self.order_locks.acquire(&order_id)?;
        let command = BulkOrderCommand::UpdatePaymentDetails(UpdatePaymentDetails {
            order_id,
            patch,
            occurred_at: self.clock.now(),
        });
        let order = self
            .dispatcher
            .dispatch(order_id.0, BULK_ORDER_AGGREGATE, &command, make_order)?
            .aggregate;
        tracing::info!("payment details updated");
        Ok(order)
    }

    pub fn get(&self, order_id: BulkOrderId) -> Result<BulkOrder, DispatchError> {
        let loaded = self.dispatcher.load(order_id.0, make_order)?;
        if !loaded.aggregate.is_created() {
            return Err(DispatchError::NotFound(format!("bulk order {order_id}")));
        }
        Ok(loaded.aggregate)
    }

    /// Matching orders, newest first.
    pub fn list(&self, filter: BulkOrderFilter) -> Result<Vec<BulkOrder>, DispatchError> {
        let mut orders: Vec<BulkOrder> = self
            .load_all()?
            .into_iter()
            .filter(|o| filter.matches(o))
            .collect();
        orders.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| b.order_number().cmp(&a.order_number()))
        });
        Ok(orders)
    }

    pub fn summary(
        &self,
        user_id: UserId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<BulkOrderSummary, DispatchError> {
        if from > to {
            return Err(DispatchError::Validation("summary window starts after it ends".to_string()));
        }
        let orders = self.load_all()?;
        Ok(BulkOrderSummary::build(&orders, user_id, from, to))
    }

    fn load_all(&self) -> Result<Vec<BulkOrder>, DispatchError> {
        let orders = self.dispatcher.load_all(BULK_ORDER_AGGREGATE, make_order)?;
        Ok(orders.into_iter().filter(|o| o.is_created()).collect())
    }

    fn apply_catalog_effect(&self, order: &BulkOrder, effect: CatalogEffect) -> Result<Applied, DispatchError> {
        match effect {
            CatalogEffect::None => Ok(vec![]),
            CatalogEffect::ValidateAvailability => {
                for item in order.items() {
                    let entry = self.catalog.get(&item.product_id)?;
                    if entry.on_hand < item.quantity {
                        tracing::warn!(
                            product_id = %item.product_id,
                            required = item.quantity,
                            available = entry.on_hand,
                            "approval rejected: stock drifted since creation"
                        );
                        return Err(DispatchError::InsufficientStock(format!(
                            "not enough stock for product {} ({}): required {}, available {}",
                            entry.name, item.product_id, item.quantity, entry.on_hand
                        )));
                    }
                }
                Ok(vec![])
            }
            CatalogEffect::Commit => self.adjust_all(order, -1),
            CatalogEffect::Restock => self.adjust_all(order, 1),
        }
    }

    /// Adjust every item by `sign × quantity`; all or nothing.
    fn adjust_all(&self, order: &BulkOrder, sign: i64) -> Result<Applied, DispatchError> {
        let mut applied: Applied = Vec::with_capacity(order.items().len());
        for item in order.items() {
            let delta = sign * item.quantity;
            if let Err(err) = self.catalog.adjust_quantity(&item.product_id, delta) {
                tracing::warn!(
                    product_id = %item.product_id,
                    delta,
                    error = %err,
                    "catalog adjustment failed, reverting"
                );
                let cause = DispatchError::from(err);
                if let Err(unreverted) = self.compensate(order.id_typed(), &applied) {
                    return Err(DispatchError::CompensationFailed {
                        cause: Box::new(cause),
                        unreverted,
                    });
                }
                return Err(cause);
            }
            applied.push((item.product_id, delta));
        }
        Ok(applied)
    }

    /// Reverse `applied` newest first. Every entry is attempted; the ones that
    /// could not be reversed come back as `product:delta` pairs.
    fn compensate(&self, order_id: BulkOrderId, applied: &[(ProductId, i64)]) -> Result<(), String> {
        let mut unreverted = Vec::new();
        for (product_id, delta) in applied.iter().rev() {
            match self.catalog.adjust_quantity(product_id, -delta) {
                Ok(_) => tracing::warn!(%order_id, %product_id, delta = -delta, "catalog adjustment reverted"),
                Err(err) => {
                    tracing::error!(
                        %order_id,
                        %product_id,
                        delta = -delta,
                        error = %err,
                        "failed to revert catalog adjustment"
                    );
                    unreverted.push(format!("{product_id}:{delta:+}"));
                }
            }
        }
        if unreverted.is_empty() {
            Ok(())
        } else {
            Err(unreverted.join(", "))
        }
    }
}

fn make_order(id: AggregateId) -> BulkOrder {
    BulkOrder::empty(BulkOrderId::new(id))
}
