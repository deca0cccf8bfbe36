//! Stock ledger service: serialized mutations and snapshot queries over
//! `StockRecord` streams.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use serde_json::Value as JsonValue;

use stockflow_catalog::{ProductCatalog, ProductId};
use stockflow_core::{AggregateId, Clock};
use stockflow_events::{EventBus, EventEnvelope};
use stockflow_inventory::{
    CreateStockRecord, MovementWindow, StockCommand, StockRecord, StockRecordId, StockStatus,
    StockUpdateType, UpdateStock,
};

use crate::command_dispatcher::{CommandDispatcher, DispatchError};
use crate::event_store::EventStore;
use crate::keyed_lock::KeyedLocks;

pub const STOCK_RECORD_AGGREGATE: &str = "inventory.stock_record";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStockRecord {
    pub product_id: ProductId,
    pub quantity: i64,
    pub min_level: i64,
    pub max_level: i64,
    pub cost_per_unit: Option<u64>,
    pub warehouse_location: Option<String>,
    pub shelf_location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockUpdateRequest {
    pub update_type: StockUpdateType,
    pub quantity: i64,
    pub reason: Option<String>,
    pub reference: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StockStats {
    pub total_records: usize,
    pub in_stock: usize,
    pub low_stock: usize,
    pub out_of_stock: usize,
    /// Σ quantity × cost_per_unit, smallest currency unit.
    pub total_value: u64,
    pub total_reserved: i64,
    pub total_damaged: i64,
}

impl StockStats {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a StockRecord>) -> Self {
        records.into_iter().fold(StockStats::default(), |mut acc, r| {
            acc.total_records += 1;
            match r.status() {
                StockStatus::InStock => acc.in_stock += 1,
                StockStatus::LowStock => acc.low_stock += 1,
                StockStatus::OutOfStock => acc.out_of_stock += 1,
            }
            acc.total_value = acc.total_value.saturating_add(r.on_hand_value());
            acc.total_reserved = acc.total_reserved.saturating_add(r.reserved());
            acc.total_damaged = acc.total_damaged.saturating_add(r.damaged());
            acc
        })
    }
}

/// One stock record per product, every mutation serialized per record.
pub struct StockLedgerService<S, B> {
    dispatcher: Arc<CommandDispatcher<S, B>>,
    catalog: Arc<dyn ProductCatalog>,
    clock: Arc<dyn Clock>,
    record_locks: KeyedLocks<StockRecordId>,
    product_locks: KeyedLocks<ProductId>,
    by_product: DashMap<ProductId, StockRecordId>,
}

impl<S, B> StockLedgerService<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// Build the service and index the records already in the store.
    pub fn new(
        dispatcher: Arc<CommandDispatcher<S, B>>,
        catalog: Arc<dyn ProductCatalog>,
        clock: Arc<dyn Clock>,
        lock_timeout: Duration,
    ) -> Result<Self, DispatchError> {
        let service = Self {
            dispatcher,
            catalog,
            clock,
            record_locks: KeyedLocks::new(lock_timeout),
            product_locks: KeyedLocks::new(lock_timeout),
            by_product: DashMap::new(),
        };

        for record in service.load_all()? {
            if let Some(product_id) = record.product_id() {
                service.by_product.insert(product_id, record.id_typed());
            }
        }

        Ok(service)
    }

    #[tracing::instrument(skip(self, req), fields(product_id = %req.product_id))]
    pub fn create(&self, req: NewStockRecord) -> Result<StockRecord, DispatchError> {
        self.catalog.get(&req.product_id)?;

        let _guard = self.product_locks.acquire(&req.product_id)?;
        if let Some(existing) = self.by_product.get(&req.product_id) {
            return Err(DispatchError::AlreadyExists(format!(
                "stock record {} already exists for product {}",
                *existing, req.product_id
            )));
        }

        let record_id = StockRecordId::new(AggregateId::new());
        let command = StockCommand::CreateStockRecord(CreateStockRecord {
            record_id,
            product_id: req.product_id,
            quantity: req.quantity,
            min_level: req.min_level,
            max_level: req.max_level,
            cost_per_unit: req.cost_per_unit,
            warehouse_location: req.warehouse_location,
            shelf_location: req.shelf_location,
            occurred_at: self.clock.now(),
        });

        let committed = self
            .dispatcher
            .dispatch(record_id.0, STOCK_RECORD_AGGREGATE, &command, make_record)?;
        self.by_product.insert(req.product_id, record_id);

        let record = committed.aggregate;
        tracing::info!(
            record_id = %record_id,
            quantity = record.quantity(),
            status = record.status().as_str(),
            "stock record created"
        );
        Ok(record)
    }

    #[tracing::instrument(
        skip(self, req),
        fields(record_id = %record_id, update_type = %req.update_type, quantity = req.quantity)
    )]
    pub fn update_stock(&self, record_id: StockRecordId, req: StockUpdateRequest) -> Result<StockRecord, DispatchError> {
        let _guard = self.record_locks.acquire(&record_id)?;

        let command = StockCommand::UpdateStock(UpdateStock {
            record_id,
            update_type: req.update_type,
            quantity: req.quantity,
            reason: req.reason,
            reference: req.reference,
            occurred_at: self.clock.now(),
        });

        match self
            .dispatcher
            .dispatch(record_id.0, STOCK_RECORD_AGGREGATE, &command, make_record)
        {
            Ok(committed) => {
                let record = committed.aggregate;
                tracing::info!(
                    quantity = record.quantity(),
                    reserved = record.reserved(),
                    status = record.status().as_str(),
                    "stock updated"
                );
                Ok(record)
            }
            Err(err @ (DispatchError::InsufficientStock(_) | DispatchError::InvalidRelease(_))) => {
                tracing::warn!(error = %err, "stock update rejected");
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    pub fn get(&self, record_id: StockRecordId) -> Result<StockRecord, DispatchError> {
        let loaded = self.dispatcher.load(record_id.0, make_record)?;
        if !loaded.aggregate.is_created() {
            return Err(DispatchError::NotFound(format!("stock record {record_id}")));
        }
        Ok(loaded.aggregate)
    }

    pub fn get_by_product(&self, product_id: ProductId) -> Result<StockRecord, DispatchError> {
        let record_id = self
            .by_product
            .get(&product_id)
            .map(|r| *r)
            .ok_or_else(|| DispatchError::NotFound(format!("stock record for product {product_id}")))?;
        self.get(record_id)
    }

    /// Movement log of one record, bounded inclusively by `from`/`to`.
    pub fn movements(
        &self,
        record_id: StockRecordId,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<MovementWindow, DispatchError> {
        Ok(self.get(record_id)?.movement_window(from, to))
    }

    /// All records, oldest first.
    pub fn list(&self) -> Result<Vec<StockRecord>, DispatchError> {
        let mut records = self.load_all()?;
        records.sort_by_key(|r| (r.created_at(), r.id_typed().0));
        Ok(records)
    }

    pub fn list_low_stock(&self) -> Result<Vec<StockRecord>, DispatchError> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|r| r.status() == StockStatus::LowStock)
            .collect())
    }

    pub fn stats(&self) -> Result<StockStats, DispatchError> {
        Ok(StockStats::from_records(&self.load_all()?))
    }

    fn load_all(&self) -> Result<Vec<StockRecord>, DispatchError> {
        let records = self.dispatcher.load_all(STOCK_RECORD_AGGREGATE, make_record)?;
        Ok(records.into_iter().filter(|r| r.is_created()).collect())
    }
}

fn make_record(id: AggregateId) -> StockRecord {
    StockRecord::empty(StockRecordId::new(id))
}
