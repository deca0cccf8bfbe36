//! In-memory product catalog collaborator.

use dashmap::DashMap;

use stockflow_catalog::{CatalogEntry, CatalogError, ProductCatalog, ProductId};

/// Price and on-hand quantity per product.
///
/// Each `adjust_quantity` runs under the product's map entry, so it is atomic
/// and never takes on-hand below zero.
#[derive(Debug, Default)]
pub struct InMemoryProductCatalog {
    entries: DashMap<ProductId, CatalogEntry>,
}

impl InMemoryProductCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a product.
    pub fn upsert(&self, entry: CatalogEntry) -> CatalogEntry {
        self.entries.insert(entry.product_id, entry.clone());
        entry
    }

    pub fn list(&self) -> Vec<CatalogEntry> {
        let mut all: Vec<CatalogEntry> = self.entries.iter().map(|e| e.value().clone()).collect();
        all.sort_by(|a, b| a.name.cmp(&b.name).then(a.product_id.cmp(&b.product_id)));
        all
    }
}

impl ProductCatalog for InMemoryProductCatalog {
    fn get(&self, product_id: &ProductId) -> Result<CatalogEntry, CatalogError> {
        self.entries
            .get(product_id)
            .map(|e| e.value().clone())
            .ok_or(CatalogError::NotFound(*product_id))
    }

    fn adjust_quantity(&self, product_id: &ProductId, delta: i64) -> Result<CatalogEntry, CatalogError> {
        let mut entry = self
            .entries
            .get_mut(product_id)
            .ok_or(CatalogError::NotFound(*product_id))?;

        let next = entry
            .on_hand
            .checked_add(delta)
            .ok_or_else(|| CatalogError::Unavailable(format!("quantity overflow for product {product_id}")))?;
        if next < 0 {
            return Err(CatalogError::InsufficientStock {
                product_id: *product_id,
                requested: delta.saturating_neg(),
                available: entry.on_hand,
            });
        }

        entry.on_hand = next;
        Ok(entry.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use stockflow_core::AggregateId;

    fn product(on_hand: i64) -> CatalogEntry {
        CatalogEntry {
            product_id: ProductId::new(AggregateId::new()),
            name: "Pallet wrap".to_string(),
            price: 1_250,
            on_hand,
        }
    }

    #[test]
    fn adjust_refuses_to_go_negative() {
        let catalog = InMemoryProductCatalog::new();
        let p = catalog.upsert(product(5));

        assert_eq!(catalog.adjust_quantity(&p.product_id, -5).unwrap().on_hand, 0);
        let err = catalog.adjust_quantity(&p.product_id, -1).unwrap_err();
        assert_eq!(
            err,
            CatalogError::InsufficientStock {
                product_id: p.product_id,
                requested: 1,
                available: 0
            }
        );
        assert_eq!(catalog.adjust_quantity(&p.product_id, 3).unwrap().on_hand, 3);
    }

    #[test]
    fn unknown_product_is_not_found() {
        let catalog = InMemoryProductCatalog::new();
        let missing = ProductId::new(AggregateId::new());
        assert_eq!(catalog.get(&missing).unwrap_err(), CatalogError::NotFound(missing));
        assert!(catalog.adjust_quantity(&missing, 1).is_err());
    }

    #[test]
    fn concurrent_decrements_never_oversell() {
        let catalog = Arc::new(InMemoryProductCatalog::new());
        let p = catalog.upsert(product(100));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let catalog = catalog.clone();
                let id = p.product_id;
                std::thread::spawn(move || (0..50).filter(|_| catalog.adjust_quantity(&id, -1).is_ok()).count())
            })
            .collect();
        let sold: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

        assert_eq!(sold, 100);
        assert_eq!(catalog.get(&p.product_id).unwrap().on_hand, 0);
    }
}
