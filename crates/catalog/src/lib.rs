//! Product catalog collaborator.
//!
//! Pricing and catalog management live outside this system. The ledger and
//! the bulk-order workflow only need per-product price and on-hand quantity,
//! and the ability to move that quantity when an order commits or cancels.

pub mod product;

pub use product::{CatalogEntry, CatalogError, ProductCatalog, ProductId};
