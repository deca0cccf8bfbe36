use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use stockflow_core::UserId;

use crate::order::BulkOrder;
use crate::status::BulkOrderStatus;

/// Per-user rollup of bulk orders created inside an inclusive window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkOrderSummary {
    pub total_orders: usize,
    pub total_amount: u64,
    pub total_discount: u64,
    pub status_counts: BTreeMap<BulkOrderStatus, usize>,
    #[serde(skip)]
    pub orders: Vec<BulkOrder>,
}

impl BulkOrderSummary {
    pub fn build<'a, I>(orders: I, user_id: UserId, from: DateTime<Utc>, to: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = &'a BulkOrder>,
    {
        let mut summary = BulkOrderSummary {
            total_orders: 0,
            total_amount: 0,
            total_discount: 0,
            status_counts: BTreeMap::new(),
            orders: Vec::new(),
        };

        for order in orders {
            if order.user_id() != Some(user_id) {
                continue;
            }
            let Some(created_at) = order.created_at() else {
                continue;
            };
            if created_at < from || created_at > to {
                continue;
            }

            summary.total_orders += 1;
            summary.total_amount = summary.total_amount.saturating_add(order.total_amount());
            summary.total_discount = summary.total_discount.saturating_add(order.discount_amount());
            *summary.status_counts.entry(order.status()).or_insert(0) += 1;
            summary.orders.push(order.clone());
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::details::ShippingDetails;
    use crate::order::{BulkOrderCommand, BulkOrderId, ChangeStatus, CreateBulkOrder, PricedLine};
    use crate::order_number::{OrderNumber, OrderNumberPrefix};
    use crate::status::BulkOrderPriority;
    use chrono::{Duration, TimeZone};
    use stockflow_catalog::ProductId;
    use stockflow_core::{Aggregate, AggregateId};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()
    }

    fn order(user_id: UserId, at: DateTime<Utc>, unit_price: u64, seq: u32) -> BulkOrder {
        let order_id = BulkOrderId::new(AggregateId::new());
        let mut order = BulkOrder::empty(order_id);
        let events = order
            .handle(&BulkOrderCommand::CreateBulkOrder(CreateBulkOrder {
                order_id,
                order_number: OrderNumber::new(OrderNumberPrefix::for_date(at), seq).unwrap(),
                user_id,
                priority: BulkOrderPriority::High,
                lines: vec![PricedLine {
                    product_id: ProductId::new(AggregateId::new()),
                    quantity: 1,
                    unit_price,
                }],
                shipping: ShippingDetails::new("1 Dock Rd", "freight"),
                notes: None,
                occurred_at: at,
            }))
            .unwrap();
        for e in &events {
            order.apply(e);
        }
        order
    }

    #[test]
    fn window_is_inclusive_and_scoped_to_user() {
        let user = UserId::new();
        let other = UserId::new();
        let from = t0();
        let to = t0() + Duration::days(30);

        let mut cancelled = order(user, to, 100_000, 3);
        let events = cancelled
            .handle(&BulkOrderCommand::ChangeStatus(ChangeStatus {
                order_id: cancelled.id_typed(),
                status: BulkOrderStatus::Cancelled,
                note: None,
                occurred_at: to,
            }))
            .unwrap();
        for e in &events {
            cancelled.apply(e);
        }

        let orders = vec![
            order(user, from, 120_000, 1),
            order(user, from + Duration::days(3), 50_000, 2),
            cancelled,
            order(user, to + Duration::seconds(1), 999_999, 4),
            order(other, from + Duration::days(1), 999_999, 5),
        ];

        let summary = BulkOrderSummary::build(&orders, user, from, to);

        assert_eq!(summary.total_orders, 3);
        assert_eq!(summary.total_amount, 270_000);
        // 5% of 1200.00 + 0% of 500.00 + 5% of 1000.00
        assert_eq!(summary.total_discount, 6_000 + 5_000);
        assert_eq!(summary.status_counts.get(&BulkOrderStatus::Draft), Some(&2));
        assert_eq!(summary.status_counts.get(&BulkOrderStatus::Cancelled), Some(&1));
        assert_eq!(summary.orders.len(), 3);
    }

    #[test]
    fn empty_window_yields_zeroes() {
        let summary = BulkOrderSummary::build(
            std::iter::empty::<&BulkOrder>(),
            UserId::new(),
            t0(),
            t0(),
        );
        assert_eq!(summary.total_orders, 0);
        assert!(summary.status_counts.is_empty());
    }
}
