//! Stock ledger domain module (event-sourced).
//!
//! One `StockRecord` per product owns the on-hand, reserved, damaged and
//! returned counters plus the append-only movement log. Business rules are
//! deterministic domain logic (no IO, no locking, no storage).

pub mod movement;
pub mod record;

pub use movement::{MovementDirection, MovementWindow, StockMovement, WindowIter};
pub use record::{
    CreateStockRecord, StockCommand, StockEvent, StockRecord, StockRecordCreated, StockRecordId,
    StockStatus, StockUpdateType, StockUpdated, UpdateStock, INITIAL_STOCK_REASON,
    INITIAL_STOCK_REFERENCE,
};
