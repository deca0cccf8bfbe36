//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: event store/bus, catalog, ledger and workflow wiring
//! - `routes/`: HTTP routes + handlers (one file per domain area)
//! - `dto.rs`: request DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use stockflow_infra::command_dispatcher::DispatchError;
use stockflow_infra::config::ConcurrencyConfig;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(concurrency: &ConcurrencyConfig) -> Result<Router, DispatchError> {
    let services = Arc::new(services::build_services(concurrency)?);

    Ok(Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::router())
        .layer(ServiceBuilder::new().layer(Extension(services))))
}
