use serde::{Deserialize, Serialize};
use thiserror::Error;

use stockflow_core::{AggregateId, DomainError};
use std::sync::Arc;

/// Product identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub AggregateId);

impl ProductId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ProductId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl core::str::FromStr for ProductId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// What the catalog knows about a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub product_id: ProductId,
    pub name: String,
    /// Price in smallest currency unit (e.g., cents).
    pub price: u64,
    /// Sellable on-hand quantity.
    pub on_hand: i64,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("product {0} not found")]
    NotFound(ProductId),

    #[error("not enough stock for product {product_id} (requested: {requested}, available: {available})")]
    InsufficientStock {
        product_id: ProductId,
        requested: i64,
        available: i64,
    },

    #[error("catalog unavailable: {0}")]
    Unavailable(String),
}

impl From<CatalogError> for DomainError {
    fn from(value: CatalogError) -> Self {
        match value {
            CatalogError::NotFound(id) => DomainError::not_found(format!("product {id}")),
            e @ CatalogError::InsufficientStock { .. } => {
                DomainError::insufficient_stock(e.to_string())
            }
            CatalogError::Unavailable(msg) => DomainError::invariant(msg),
        }
    }
}

/// Read/write access to per-product price and on-hand quantity.
///
/// `adjust_quantity` must be atomic per call and must refuse to take the
/// on-hand quantity below zero.
pub trait ProductCatalog: Send + Sync {
    fn get(&self, product_id: &ProductId) -> Result<CatalogEntry, CatalogError>;

    /// Apply `delta` to the on-hand quantity and return the updated entry.
    fn adjust_quantity(&self, product_id: &ProductId, delta: i64) -> Result<CatalogEntry, CatalogError>;
}

impl<C> ProductCatalog for Arc<C>
where
    C: ProductCatalog + ?Sized,
{
    fn get(&self, product_id: &ProductId) -> Result<CatalogEntry, CatalogError> {
        (**self).get(product_id)
    }

    fn adjust_quantity(&self, product_id: &ProductId, delta: i64) -> Result<CatalogEntry, CatalogError> {
        (**self).adjust_quantity(product_id, delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_errors_map_onto_domain_taxonomy() {
        let pid = ProductId::new(AggregateId::new());

        let err: DomainError = CatalogError::NotFound(pid).into();
        assert!(matches!(err, DomainError::NotFound(_)));

        let err: DomainError = CatalogError::InsufficientStock {
            product_id: pid,
            requested: 5,
            available: 2,
        }
        .into();
        match err {
            DomainError::InsufficientStock(msg) => assert!(msg.contains("available: 2")),
            other => panic!("expected InsufficientStock, got {other:?}"),
        }
    }
}
