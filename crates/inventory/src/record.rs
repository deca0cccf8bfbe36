use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockflow_catalog::ProductId;
use stockflow_core::{Aggregate, AggregateId, AggregateRoot, DomainError};
use stockflow_events::Event;

use crate::movement::{MovementDirection, MovementWindow, StockMovement};

/// Stock record identifier (one record per product).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StockRecordId(pub AggregateId);

impl StockRecordId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for StockRecordId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Derived stock status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    InStock,
    LowStock,
    OutOfStock,
}

impl StockStatus {
    /// `OutOfStock` at or below zero, `LowStock` up to and including `min_level`.
    pub fn derive(quantity: i64, min_level: i64) -> Self {
        if quantity <= 0 {
            StockStatus::OutOfStock
        } else if quantity <= min_level {
            StockStatus::LowStock
        } else {
            StockStatus::InStock
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StockStatus::InStock => "in_stock",
            StockStatus::LowStock => "low_stock",
            StockStatus::OutOfStock => "out_of_stock",
        }
    }
}

/// Kind of stock update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockUpdateType {
    Add,
    Remove,
    Damage,
    Return,
    Reserve,
    Release,
}

impl StockUpdateType {
    pub fn as_str(self) -> &'static str {
        match self {
            StockUpdateType::Add => "add",
            StockUpdateType::Remove => "remove",
            StockUpdateType::Damage => "damage",
            StockUpdateType::Return => "return",
            StockUpdateType::Reserve => "reserve",
            StockUpdateType::Release => "release",
        }
    }

    pub fn direction(self) -> MovementDirection {
        match self {
            StockUpdateType::Add | StockUpdateType::Return | StockUpdateType::Release => {
                MovementDirection::In
            }
            StockUpdateType::Remove | StockUpdateType::Damage | StockUpdateType::Reserve => {
                MovementDirection::Out
            }
        }
    }

    /// Reference used when the caller supplies none, e.g. `RESERVE_1718000000000`.
    pub fn default_reference(self, at: DateTime<Utc>) -> String {
        format!("{}_{}", self.as_str().to_uppercase(), at.timestamp_millis())
    }
}

impl core::fmt::Display for StockUpdateType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for StockUpdateType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "add" => Ok(Self::Add),
            "remove" => Ok(Self::Remove),
            "damage" => Ok(Self::Damage),
            "return" => Ok(Self::Return),
            "reserve" => Ok(Self::Reserve),
            "release" => Ok(Self::Release),
            other => Err(DomainError::validation(format!("unknown stock update type '{other}'"))),
        }
    }
}

/// Aggregate root: StockRecord.
///
/// Owns the counters of one product. `status()` is derived from `quantity`
/// and `min_level` on every read, so it cannot drift from the counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockRecord {
    id: StockRecordId,
    product_id: Option<ProductId>,
    quantity: i64,
    reserved: i64,
    damaged: i64,
    returned: i64,
    min_level: i64,
    max_level: i64,
    cost_per_unit: Option<u64>,
    warehouse_location: Option<String>,
    shelf_location: Option<String>,
    last_restock_date: Option<DateTime<Utc>>,
    movements: Vec<StockMovement>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
}

impl StockRecord {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: StockRecordId) -> Self {
        Self {
            id,
            product_id: None,
            quantity: 0,
            reserved: 0,
            damaged: 0,
            returned: 0,
            min_level: 0,
            max_level: 0,
            cost_per_unit: None,
            warehouse_location: None,
            shelf_location: None,
            last_restock_date: None,
            movements: Vec::new(),
            created_at: None,
            updated_at: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> StockRecordId {
        self.id
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    pub fn product_id(&self) -> Option<ProductId> {
        self.product_id
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn reserved(&self) -> i64 {
        self.reserved
    }

    pub fn damaged(&self) -> i64 {
        self.damaged
    }

    pub fn returned(&self) -> i64 {
        self.returned
    }

    pub fn min_level(&self) -> i64 {
        self.min_level
    }

    pub fn max_level(&self) -> i64 {
        self.max_level
    }

    pub fn cost_per_unit(&self) -> Option<u64> {
        self.cost_per_unit
    }

    pub fn warehouse_location(&self) -> Option<&str> {
        self.warehouse_location.as_deref()
    }

    pub fn shelf_location(&self) -> Option<&str> {
        self.shelf_location.as_deref()
    }

    pub fn last_restock_date(&self) -> Option<DateTime<Utc>> {
        self.last_restock_date
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn status(&self) -> StockStatus {
        StockStatus::derive(self.quantity, self.min_level)
    }

    pub fn movements(&self) -> &[StockMovement] {
        &self.movements
    }

    /// Movement log restricted to `[from, to]` (inclusive, open when `None`).
    pub fn movement_window(&self, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> MovementWindow {
        MovementWindow::new(self.movements.clone(), from, to)
    }

    /// On-hand value in smallest currency unit; a missing cost counts as zero.
    pub fn on_hand_value(&self) -> u64 {
        let qty = u64::try_from(self.quantity).unwrap_or(0);
        qty.saturating_mul(self.cost_per_unit.unwrap_or(0))
    }
}

impl AggregateRoot for StockRecord {
    type Id = StockRecordId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateStockRecord.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateStockRecord {
    pub record_id: StockRecordId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub min_level: i64,
    pub max_level: i64,
    pub cost_per_unit: Option<u64>,
    pub warehouse_location: Option<String>,
    pub shelf_location: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateStock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateStock {
    pub record_id: StockRecordId,
    pub update_type: StockUpdateType,
    pub quantity: i64,
    pub reason: Option<String>,
    pub reference: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockCommand {
    CreateStockRecord(CreateStockRecord),
    UpdateStock(UpdateStock),
}

/// Event: StockRecordCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRecordCreated {
    pub record_id: StockRecordId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub min_level: i64,
    pub max_level: i64,
    pub cost_per_unit: Option<u64>,
    pub warehouse_location: Option<String>,
    pub shelf_location: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockUpdated.
///
/// `reason` and `reference` are already resolved to their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockUpdated {
    pub record_id: StockRecordId,
    pub update_type: StockUpdateType,
    pub quantity: i64,
    pub reason: String,
    pub reference: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockEvent {
    StockRecordCreated(StockRecordCreated),
    StockUpdated(StockUpdated),
}

impl Event for StockEvent {
    fn event_type(&self) -> &'static str {
        match self {
            StockEvent::StockRecordCreated(_) => "inventory.stock_record.created",
            StockEvent::StockUpdated(_) => "inventory.stock_record.updated",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            StockEvent::StockRecordCreated(e) => e.occurred_at,
            StockEvent::StockUpdated(e) => e.occurred_at,
        }
    }
}

pub const INITIAL_STOCK_REASON: &str = "Initial stock";
pub const INITIAL_STOCK_REFERENCE: &str = "INIT";

impl Aggregate for StockRecord {
    type Command = StockCommand;
    type Event = StockEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            StockEvent::StockRecordCreated(e) => {
                self.id = e.record_id;
                self.product_id = Some(e.product_id);
                self.quantity = e.quantity;
                self.reserved = 0;
                self.damaged = 0;
                self.returned = 0;
                self.min_level = e.min_level;
                self.max_level = e.max_level;
                self.cost_per_unit = e.cost_per_unit;
                self.warehouse_location = e.warehouse_location.clone();
                self.shelf_location = e.shelf_location.clone();
                self.movements = vec![StockMovement {
                    timestamp: e.occurred_at,
                    direction: MovementDirection::In,
                    quantity: e.quantity,
                    reason: INITIAL_STOCK_REASON.to_string(),
                    reference: INITIAL_STOCK_REFERENCE.to_string(),
                }];
                self.created_at = Some(e.occurred_at);
                self.updated_at = Some(e.occurred_at);
                self.created = true;
            }
            StockEvent::StockUpdated(e) => {
                let n = e.quantity;
                match e.update_type {
                    StockUpdateType::Add => {
                        self.quantity += n;
                        self.last_restock_date = Some(e.occurred_at);
                    }
                    StockUpdateType::Remove => {
                        self.quantity -= n;
                    }
                    StockUpdateType::Damage => {
                        self.quantity -= n;
                        self.damaged += n;
                    }
                    StockUpdateType::Return => {
                        self.quantity += n;
                        self.returned += n;
                    }
                    StockUpdateType::Reserve => {
                        self.quantity -= n;
                        self.reserved += n;
                    }
                    StockUpdateType::Release => {
                        self.quantity += n;
                        self.reserved -= n;
                    }
                }
                self.movements.push(StockMovement {
                    timestamp: e.occurred_at,
                    direction: e.update_type.direction(),
                    quantity: n,
                    reason: e.reason.clone(),
                    reference: e.reference.clone(),
                });
                self.updated_at = Some(e.occurred_at);
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            StockCommand::CreateStockRecord(cmd) => self.handle_create(cmd),
            StockCommand::UpdateStock(cmd) => self.handle_update(cmd),
        }
    }
}

impl StockRecord {
    fn ensure_record_id(&self, record_id: StockRecordId) -> Result<(), DomainError> {
        if self.id != record_id {
            return Err(DomainError::invariant("record_id mismatch"));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateStockRecord) -> Result<Vec<StockEvent>, DomainError> {
        if self.created {
            return Err(DomainError::already_exists(format!(
                "stock record {} already exists",
                self.id
            )));
        }
        if cmd.quantity < 0 {
            return Err(DomainError::validation("quantity cannot be negative"));
        }
        if cmd.min_level < 0 || cmd.max_level < 0 {
            return Err(DomainError::validation("stock levels cannot be negative"));
        }
        if cmd.min_level > cmd.max_level {
            return Err(DomainError::validation("min_level cannot exceed max_level"));
        }

        Ok(vec![StockEvent::StockRecordCreated(StockRecordCreated {
            record_id: cmd.record_id,
            product_id: cmd.product_id,
            quantity: cmd.quantity,
            min_level: cmd.min_level,
            max_level: cmd.max_level,
            cost_per_unit: cmd.cost_per_unit,
            warehouse_location: cmd.warehouse_location.clone(),
            shelf_location: cmd.shelf_location.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update(&self, cmd: &UpdateStock) -> Result<Vec<StockEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found(format!("stock record {}", cmd.record_id)));
        }
        self.ensure_record_id(cmd.record_id)?;

        let n = cmd.quantity;
        if n <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }

        let overflow = || DomainError::validation("quantity overflow");
        match cmd.update_type {
            StockUpdateType::Add => {
                self.quantity.checked_add(n).ok_or_else(overflow)?;
            }
            StockUpdateType::Return => {
                self.quantity.checked_add(n).ok_or_else(overflow)?;
                self.returned.checked_add(n).ok_or_else(overflow)?;
            }
            StockUpdateType::Remove | StockUpdateType::Damage | StockUpdateType::Reserve => {
                if self.quantity - n < 0 {
                    return Err(DomainError::insufficient_stock(format!(
                        "cannot {} {n} units of product {}: {} on hand",
                        cmd.update_type,
                        self.product_label(),
                        self.quantity
                    )));
                }
                // Removed units move into the damaged or reserved counter.
                match cmd.update_type {
                    StockUpdateType::Damage => {
                        self.damaged.checked_add(n).ok_or_else(overflow)?;
                    }
                    StockUpdateType::Reserve => {
                        self.reserved.checked_add(n).ok_or_else(overflow)?;
                    }
                    _ => {}
                }
            }
            StockUpdateType::Release => {
                if self.reserved - n < 0 {
                    return Err(DomainError::invalid_release(format!(
                        "cannot release {n} units: only {} reserved",
                        self.reserved
                    )));
                }
                self.quantity.checked_add(n).ok_or_else(overflow)?;
            }
        }

        let reason = cmd
            .reason
            .clone()
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| cmd.update_type.as_str().to_string());
        let reference = cmd
            .reference
            .clone()
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| cmd.update_type.default_reference(cmd.occurred_at));

        Ok(vec![StockEvent::StockUpdated(StockUpdated {
            record_id: cmd.record_id,
            update_type: cmd.update_type,
            quantity: n,
            reason,
            reference,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn product_label(&self) -> String {
        self.product_id
            .map(|p| p.to_string())
            .unwrap_or_else(|| "<unknown>".to_string())
    }
}
