//! Month-scoped order number allocation.

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use stockflow_bulk_orders::{MAX_SEQUENCE, OrderNumber, OrderNumberPrefix};
use stockflow_core::DomainError;

/// Atomic counter per `BLK<YY><MM>` prefix.
///
/// `next` reads and bumps the counter while holding the map entry, so two
/// callers can never observe the same value.
#[derive(Debug, Default)]
pub struct OrderNumberSequencer {
    counters: DashMap<OrderNumberPrefix, u32>,
}

impl OrderNumberSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise counters to at least the highest sequence already issued per prefix.
    pub fn seed<'a>(&self, existing: impl IntoIterator<Item = &'a OrderNumber>) {
        for number in existing {
            let mut entry = self.counters.entry(number.prefix()).or_insert(0);
            if *entry < number.sequence() {
                *entry = number.sequence();
            }
        }
    }

    pub fn next(&self, at: DateTime<Utc>) -> Result<OrderNumber, DomainError> {
        let prefix = OrderNumberPrefix::for_date(at);
        let mut entry = self.counters.entry(prefix).or_insert(0);
        let sequence = *entry + 1;
        if sequence > MAX_SEQUENCE {
            return Err(DomainError::invariant(format!(
                "order number sequence exhausted for {prefix}"
            )));
        }
        *entry = sequence;
        drop(entry);

        OrderNumber::new(prefix, sequence)
    }

    /// Last sequence issued for the month containing `at` (0 if none).
    pub fn current(&self, at: DateTime<Utc>) -> u32 {
        self.counters
            .get(&OrderNumberPrefix::for_date(at))
            .map(|c| *c)
            .unwrap_or(0)
    }
}
