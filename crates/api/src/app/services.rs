//! Service wiring for the HTTP layer.
//!
//! Ledger and workflow share one dispatcher (store + bus). Their methods are
//! synchronous and may back off while waiting for a key lock, so handlers call
//! them through [`AppServices::run`] on the blocking pool.

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::Response;
use serde_json::Value as JsonValue;

use stockflow_core::SystemClock;
use stockflow_events::{EventEnvelope, InMemoryEventBus};
use stockflow_infra::{
    catalog::InMemoryProductCatalog,
    command_dispatcher::{CommandDispatcher, DispatchError},
    config::ConcurrencyConfig,
    event_store::InMemoryEventStore,
    ledger::StockLedgerService,
    workflow::BulkOrderWorkflow,
};

use crate::app::errors;

pub type Bus = Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>;
pub type Store = InMemoryEventStore;

pub struct AppServices {
    catalog: Arc<InMemoryProductCatalog>,
    ledger: StockLedgerService<Store, Bus>,
    workflow: BulkOrderWorkflow<Store, Bus>,
}

pub fn build_services(concurrency: &ConcurrencyConfig) -> Result<AppServices, DispatchError> {
    let bus: Bus = Arc::new(InMemoryEventBus::new());
    let dispatcher = Arc::new(
        CommandDispatcher::new(InMemoryEventStore::new(), bus).with_max_attempts(concurrency.max_attempts),
    );
    let catalog = Arc::new(InMemoryProductCatalog::new());
    let clock = Arc::new(SystemClock);

    let ledger = StockLedgerService::new(
        dispatcher.clone(),
        catalog.clone(),
        clock.clone(),
        concurrency.lock_timeout(),
    )?;
    let workflow = BulkOrderWorkflow::new(dispatcher, catalog.clone(), clock, concurrency.lock_timeout())?;

    tracing::info!(
        lock_timeout_ms = concurrency.lock_timeout_ms,
        max_attempts = concurrency.max_attempts,
        "services ready"
    );

    Ok(AppServices {
        catalog,
        ledger,
        workflow,
    })
}

impl AppServices {
    pub fn catalog(&self) -> &InMemoryProductCatalog {
        &self.catalog
    }

    pub fn ledger(&self) -> &StockLedgerService<Store, Bus> {
        &self.ledger
    }

    pub fn workflow(&self) -> &BulkOrderWorkflow<Store, Bus> {
        &self.workflow
    }

    /// Run a service call on the blocking pool, mapping failures to responses.
    pub async fn run<T, F>(self: Arc<Self>, f: F) -> Result<T, Response>
    where
        F: FnOnce(&AppServices) -> Result<T, DispatchError> + Send + 'static,
        T: Send + 'static,
    {
        match tokio::task::spawn_blocking(move || f(&self)).await {
            Ok(result) => result.map_err(errors::dispatch_error_to_response),
            Err(join_err) => {
                tracing::error!(error = %join_err, "service task failed");
                Err(errors::json_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "service task failed",
                ))
            }
        }
    }
}
