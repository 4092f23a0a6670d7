use std::sync::Arc;

use serde_json::Value as JsonValue;

use wareflow_core::{AggregateId, WarehouseId};
use wareflow_events::{EventBus, EventEnvelope, InMemoryEventBus};
use wareflow_infra::{
    command_dispatcher::{CommandDispatcher, DispatchError},
    event_store::{EventStore, InMemoryEventStore, StoredEvent},
    projections::{
        AlarmEntry, MovementFilter, MovementLedgerProjection, ProductCatalogProjection, ProductReadModel,
        ProjectionError,
    },
    read_model::InMemoryWarehouseStore,
    reports::{Report, ReportError, ReportRequest, ReportService},
};
use wareflow_inventory::{
    AlarmLevel, MovementId, MovementRecord, PRODUCT_AGGREGATE_TYPE, Product, ProductCommand, ProductId,
};

type Bus = InMemoryEventBus<EventEnvelope<JsonValue>>;
type InMemoryDispatcher = CommandDispatcher<Arc<InMemoryEventStore>, Arc<Bus>>;
type CatalogProjection = ProductCatalogProjection<Arc<InMemoryWarehouseStore<ProductId, ProductReadModel>>>;
type LedgerProjection = MovementLedgerProjection<Arc<InMemoryWarehouseStore<MovementId, MovementRecord>>>;

/// Everything the handlers need, built once and shared via `Extension`.
#[derive(Clone)]
pub struct AppServices {
    dispatcher: Arc<InMemoryDispatcher>,
    catalog: Arc<CatalogProjection>,
    ledger: Arc<LedgerProjection>,
}

/// In-memory wiring: store + bus + projections, with a background subscriber
/// applying committed events to the read models.
///
/// Must be called from within a Tokio runtime.
pub fn build_services() -> AppServices {
    let store = Arc::new(InMemoryEventStore::new());
    let bus: Arc<Bus> = Arc::new(InMemoryEventBus::new());
    let dispatcher = Arc::new(CommandDispatcher::new(store.clone(), bus.clone()));

    let catalog: Arc<CatalogProjection> =
        Arc::new(ProductCatalogProjection::new(Arc::new(InMemoryWarehouseStore::new())));
    let ledger: Arc<LedgerProjection> =
        Arc::new(MovementLedgerProjection::new(Arc::new(InMemoryWarehouseStore::new())));

    // Background subscriber: bus -> projections
    {
        let sub = bus.subscribe();
        let catalog = catalog.clone();
        let ledger = ledger.clone();
        tokio::task::spawn_blocking(move || {
            while let Ok(env) = sub.recv() {
                if env.aggregate_type() != PRODUCT_AGGREGATE_TYPE {
                    continue;
                }
                let applied = catalog
                    .apply_envelope(&env)
                    .and_then(|()| ledger.apply_envelope(&env));
                match applied {
                    Ok(()) => {}
                    // Concurrent commands on one product can publish out of order.
                    Err(ProjectionError::NonMonotonicSequence { .. }) => {
                        catch_up(&*store, &catalog, &ledger, &env);
                    }
                    Err(e) => {
                        tracing::warn!(aggregate_id = %env.aggregate_id(), error = %e, "projection apply failed");
                    }
                }
            }
            tracing::debug!("projection subscriber stopped");
        });
    }

    AppServices {
        dispatcher,
        catalog,
        ledger,
    }
}

/// Re-read the envelope's stream from the store and apply whatever the
/// projections have not seen yet.
fn catch_up(
    store: &impl EventStore,
    catalog: &CatalogProjection,
    ledger: &LedgerProjection,
    env: &EventEnvelope<JsonValue>,
) {
    let stream = match store.load_stream(env.warehouse_id(), env.aggregate_id()) {
        Ok(stream) => stream,
        Err(e) => {
            tracing::warn!(aggregate_id = %env.aggregate_id(), error = %e, "projection catch-up failed");
            return;
        }
    };

    for stored in &stream {
        let env = stored.to_envelope();
        if let Err(e) = catalog.apply_envelope(&env).and_then(|()| ledger.apply_envelope(&env)) {
            tracing::warn!(aggregate_id = %env.aggregate_id(), error = %e, "projection catch-up failed");
            return;
        }
    }
}

impl AppServices {
    /// Run a product command through the event-sourced pipeline.
    pub fn dispatch_product(
        &self,
        warehouse_id: WarehouseId,
        product_id: ProductId,
        command: ProductCommand,
    ) -> Result<Vec<StoredEvent>, DispatchError> {
        self.dispatcher.dispatch::<Product>(
            warehouse_id,
            product_id.0,
            PRODUCT_AGGREGATE_TYPE,
            command,
            |_warehouse_id, aggregate_id: AggregateId| Product::empty(ProductId::new(aggregate_id)),
        )
    }

    pub fn product_get(&self, warehouse_id: WarehouseId, product_id: &ProductId) -> Option<ProductReadModel> {
        self.catalog.get(warehouse_id, product_id)
    }

    pub fn products_list(&self, warehouse_id: WarehouseId, include_inactive: bool) -> Vec<ProductReadModel> {
        self.catalog.list(warehouse_id, include_inactive)
    }

    pub fn alarms(&self, warehouse_id: WarehouseId, min_level: Option<AlarmLevel>) -> Vec<AlarmEntry> {
        self.catalog.alarms(warehouse_id, min_level)
    }

    /// Movement history; the filter must already be validated.
    pub fn movements(&self, warehouse_id: WarehouseId, filter: &MovementFilter) -> Vec<MovementRecord> {
        self.ledger.query(warehouse_id, filter)
    }

    pub fn run_report(&self, warehouse_id: WarehouseId, request: &ReportRequest) -> Result<Report, ReportError> {
        ReportService::new(&*self.catalog, &*self.ledger).run(warehouse_id, request)
    }
}
