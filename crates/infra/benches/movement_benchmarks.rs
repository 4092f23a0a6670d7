use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use chrono::Utc;
use serde_json::Value as JsonValue;
use wareflow_core::{AggregateId, WarehouseId};
use wareflow_events::{EventEnvelope, InMemoryEventBus};
use wareflow_infra::command_dispatcher::CommandDispatcher;
use wareflow_infra::event_store::{EventStore, InMemoryEventStore};
use wareflow_infra::projections::{MovementLedgerProjection, ProductCatalogProjection};
use wareflow_infra::read_model::InMemoryWarehouseStore;
use wareflow_inventory::{
    AlarmAssessment, CreateProduct, MovementDetails, MovementId, MovementRequest, PRODUCT_AGGREGATE_TYPE,
    Product, ProductCommand, ProductId, RecordMovement, StockLocation,
};
use std::sync::Arc;

type Dispatcher = CommandDispatcher<InMemoryEventStore, Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>>;

fn dispatcher() -> Dispatcher {
    CommandDispatcher::new(InMemoryEventStore::new(), Arc::new(InMemoryEventBus::new()))
}

fn run(d: &Dispatcher, w: WarehouseId, p: ProductId, command: ProductCommand) {
    d.dispatch::<Product>(w, p.0, PRODUCT_AGGREGATE_TYPE, command, |_, id| {
        Product::empty(ProductId::new(id))
    })
    .unwrap();
}

fn create(d: &Dispatcher, w: WarehouseId) -> ProductId {
    let p = ProductId::new(AggregateId::new());
    run(
        d,
        w,
        p,
        ProductCommand::CreateProduct(CreateProduct {
            warehouse_id: w,
            product_id: p,
            code: "BENCH".to_string(),
            name: "Bench product".to_string(),
            stock_min: 10,
            location: StockLocation::new("A1", "S1").unwrap(),
            occurred_at: Utc::now(),
        }),
    );
    p
}

fn stock_in(w: WarehouseId, p: ProductId, quantity: u64) -> ProductCommand {
    ProductCommand::RecordMovement(RecordMovement {
        warehouse_id: w,
        product_id: p,
        movement_id: MovementId::new(),
        request: MovementRequest::In {
            quantity,
            location: None,
        },
        details: MovementDetails::with_reason("bench"),
        recorded_by: None,
        occurred_at: Utc::now(),
    })
}

/// Dispatch latency grows with stream length (rehydration on every command).
fn bench_movement_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("movement_dispatch");
    group.throughput(Throughput::Elements(1));

    for history in [0usize, 100, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(history), &history, |b, &history| {
            let d = dispatcher();
            let w = WarehouseId::new();
            let p = create(&d, w);
            for _ in 0..history {
                run(&d, w, p, stock_in(w, p, 1));
            }
            b.iter(|| run(&d, w, p, black_box(stock_in(w, p, 1))));
        });
    }
    group.finish();
}

fn bench_projection_rebuild(c: &mut Criterion) {
    let mut group = c.benchmark_group("projection_rebuild");

    for movements in [100usize, 1000] {
        let d = dispatcher();
        let w = WarehouseId::new();
        for _ in 0..10 {
            let p = create(&d, w);
            for _ in 0..movements / 10 {
                run(&d, w, p, stock_in(w, p, 2));
            }
        }
        let envelopes: Vec<_> = d
            .store()
            .load_warehouse(w)
            .unwrap()
            .iter()
            .map(|e| e.to_envelope())
            .collect();

        group.throughput(Throughput::Elements(envelopes.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(movements), &envelopes, |b, envelopes| {
            b.iter(|| {
                let catalog = ProductCatalogProjection::new(InMemoryWarehouseStore::new());
                let ledger = MovementLedgerProjection::new(InMemoryWarehouseStore::new());
                catalog.rebuild(w, envelopes.clone()).unwrap();
                ledger.rebuild(w, envelopes.clone()).unwrap();
                black_box(catalog.alarms(w, None).len())
            });
        });
    }
    group.finish();
}

fn bench_alarm_assessment(c: &mut Criterion) {
    c.bench_function("alarm_assess", |b| {
        b.iter(|| {
            let mut in_alarm = 0u32;
            for current in 0..200u64 {
                if AlarmAssessment::assess(black_box(current), black_box(100)).is_some() {
                    in_alarm += 1;
                }
            }
            in_alarm
        });
    });
}

criterion_group!(
    benches,
    bench_movement_dispatch,
    bench_projection_rebuild,
    bench_alarm_assessment
);
criterion_main!(benches);
