use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

use stockflow_bulk_orders::{BulkOrderStatus, ShippingDetails};
use stockflow_catalog::{CatalogEntry, ProductId};
use stockflow_core::{AggregateId, FixedClock, UserId};
use stockflow_events::{EventEnvelope, InMemoryEventBus};
use stockflow_infra::catalog::InMemoryProductCatalog;
use stockflow_infra::command_dispatcher::CommandDispatcher;
use stockflow_infra::event_store::InMemoryEventStore;
use stockflow_infra::ledger::{NewStockRecord, StockLedgerService, StockUpdateRequest};
use stockflow_infra::workflow::{BulkOrderWorkflow, NewBulkOrder, OrderLineRequest};
use stockflow_inventory::{StockRecordId, StockUpdateType};

type Bus = Arc<InMemoryEventBus<EventEnvelope<serde_json::Value>>>;
type Dispatcher = Arc<CommandDispatcher<InMemoryEventStore, Bus>>;

struct Fixture {
    dispatcher: Dispatcher,
    catalog: Arc<InMemoryProductCatalog>,
    clock: Arc<FixedClock>,
}

impl Fixture {
    fn new() -> Self {
        let bus: Bus = Arc::new(InMemoryEventBus::new());
        Self {
            dispatcher: Arc::new(CommandDispatcher::new(InMemoryEventStore::new(), bus)),
            catalog: Arc::new(InMemoryProductCatalog::new()),
            clock: Arc::new(FixedClock::new(Utc::now())),
        }
    }

    fn ledger(&self) -> StockLedgerService<InMemoryEventStore, Bus> {
        StockLedgerService::new(
            self.dispatcher.clone(),
            self.catalog.clone(),
            self.clock.clone(),
            Duration::from_secs(1),
        )
        .unwrap()
    }

    fn workflow(&self) -> BulkOrderWorkflow<InMemoryEventStore, Bus> {
        BulkOrderWorkflow::new(
            self.dispatcher.clone(),
            self.catalog.clone(),
            self.clock.clone(),
            Duration::from_secs(1),
        )
        .unwrap()
    }

    fn product(&self, on_hand: i64) -> ProductId {
        self.catalog
            .upsert(CatalogEntry {
                product_id: ProductId::new(AggregateId::new()),
                name: "Bench crate".to_string(),
                price: 2_500,
                on_hand,
            })
            .product_id
    }
}

fn new_record(product_id: ProductId, quantity: i64) -> NewStockRecord {
    NewStockRecord {
        product_id,
        quantity,
        min_level: 10,
        max_level: 1_000_000,
        cost_per_unit: Some(1_200),
        warehouse_location: None,
        shelf_location: None,
    }
}

fn update(update_type: StockUpdateType, quantity: i64) -> StockUpdateRequest {
    StockUpdateRequest {
        update_type,
        quantity,
        reason: None,
        reference: None,
    }
}

fn seeded_record(
    fixture: &Fixture,
    ledger: &StockLedgerService<InMemoryEventStore, Bus>,
    history: usize,
) -> StockRecordId {
    let id = ledger.create(new_record(fixture.product(0), 100)).unwrap().id_typed();
    for _ in 0..history {
        ledger.update_stock(id, update(StockUpdateType::Add, 1)).unwrap();
    }
    id
}

fn bench_stock_update_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("stock_update_latency");

    for history in [0usize, 100, 1_000].iter() {
        group.bench_with_input(BenchmarkId::new("add_with_history", history), history, |b, &history| {
            let fixture = Fixture::new();
            let ledger = fixture.ledger();
            let id = seeded_record(&fixture, &ledger, history);

            b.iter(|| {
                black_box(ledger.update_stock(id, update(StockUpdateType::Add, 1)).unwrap());
            });
        });
    }

    group.bench_function("reserve_then_release", |b| {
        let fixture = Fixture::new();
        let ledger = fixture.ledger();
        let id = seeded_record(&fixture, &ledger, 0);

        b.iter(|| {
            ledger.update_stock(id, update(StockUpdateType::Reserve, 5)).unwrap();
            black_box(ledger.update_stock(id, update(StockUpdateType::Release, 5)).unwrap());
        });
    });

    group.finish();
}

fn bench_stats_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("stats_snapshot");

    for records in [10usize, 100, 1_000].iter() {
        group.throughput(Throughput::Elements(*records as u64));
        group.bench_with_input(BenchmarkId::new("stats", records), records, |b, &records| {
            let fixture = Fixture::new();
            let ledger = fixture.ledger();
            for i in 0..records {
                ledger
                    .create(new_record(fixture.product(0), (i % 25) as i64))
                    .unwrap();
            }

            b.iter(|| black_box(ledger.stats().unwrap()));
        });
    }

    group.finish();
}

fn bench_bulk_order_lifecycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("bulk_order_lifecycle");

    // Fresh workflow per iteration keeps the monthly order number sequence from running out.
    group.bench_function("create_to_processing", |b| {
        b.iter_batched(
            || {
                let fixture = Fixture::new();
                let workflow = fixture.workflow();
                let products: Vec<ProductId> = (0..5).map(|_| fixture.product(1_000)).collect();
                (fixture, workflow, products)
            },
            |(_fixture, workflow, products)| {
                let order = workflow
                    .create(NewBulkOrder {
                        user_id: UserId::new(),
                        items: products
                            .iter()
                            .map(|p| OrderLineRequest {
                                product_id: *p,
                                quantity: 3,
                            })
                            .collect(),
                        shipping: ShippingDetails::new("Bench Street 1", "freight"),
                        priority: None,
                        notes: None,
                    })
                    .unwrap();
                let id = order.id_typed();
                for status in [
                    BulkOrderStatus::Pending,
                    BulkOrderStatus::Approved,
                    BulkOrderStatus::Processing,
                ] {
                    workflow.update_status(id, status, None).unwrap();
                }
                black_box(id)
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_stock_update_latency,
    bench_stats_snapshot,
    bench_bulk_order_lifecycle
);
criterion_main!(benches);
