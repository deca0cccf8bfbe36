//! Infrastructure layer: event store, command dispatch, locking, the
//! catalog adapter, application services and configuration.

pub mod catalog;
pub mod command_dispatcher;
pub mod config;
pub mod event_store;
pub mod keyed_lock;
pub mod ledger;
pub mod sequencer;
pub mod workflow;


pub use catalog::InMemoryProductCatalog;
pub use command_dispatcher::{CommandDispatcher, Committed, DispatchError, Loaded};
pub use keyed_lock::KeyedLocks;
pub use ledger::{NewStockRecord, StockLedgerService, StockStats, StockUpdateRequest};
pub use sequencer::OrderNumberSequencer;
pub use workflow::{BulkOrderFilter, BulkOrderWorkflow, NewBulkOrder, OrderLineRequest};
