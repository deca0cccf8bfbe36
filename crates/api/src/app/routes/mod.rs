use axum::Router;

use crate::middleware;

pub mod bulk_orders;
pub mod catalog;
pub mod inventory;
pub mod system;

/// Router for every domain endpoint; bulk order routes need a caller identity.
pub fn router() -> Router {
    let bulk_orders = bulk_orders::router()
        .layer(axum::middleware::from_fn(middleware::user_context_middleware));

    Router::new()
        .nest("/catalog", catalog::router())
        .nest("/inventory", inventory::router())
        .nest("/bulk-orders", bulk_orders)
}
