use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;

use wareflow_core::WarehouseId;
use wareflow_events::EventEnvelope;
use wareflow_inventory::movement::apply_record;
use wareflow_inventory::{
    AlarmAssessment, AlarmLevel, ProductEvent, ProductId, StockLocation, StockPosition,
};

use super::{ProjectionError, StreamCursors, replay_order};
use crate::read_model::WarehouseStore;

/// Catalog view of one product: thresholds, current stock and where it sits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductReadModel {
    pub product_id: ProductId,
    pub code: String,
    pub name: String,
    pub stock_min: u64,
    pub position: StockPosition,
    pub active: bool,
    pub updated_at: DateTime<Utc>,
    pub last_movement_at: Option<DateTime<Utc>>,
}

impl ProductReadModel {
    pub fn stock_current(&self) -> u64 {
        self.position.total()
    }

    pub fn location(&self) -> &StockLocation {
        self.position.primary()
    }

    /// Alarm view (`None` when not in alarm or inactive).
    pub fn alarm(&self) -> Option<AlarmAssessment> {
        if !self.active {
            return None;
        }
        AlarmAssessment::assess(self.stock_current(), self.stock_min)
    }
}

/// One row of the alarm listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlarmEntry {
    pub product: ProductReadModel,
    pub assessment: AlarmAssessment,
}

/// Product catalog projection (current stock per product).
#[derive(Debug)]
pub struct ProductCatalogProjection<S>
where
    S: WarehouseStore<ProductId, ProductReadModel>,
{
    store: S,
    cursors: StreamCursors,
}

impl<S> ProductCatalogProjection<S>
where
    S: WarehouseStore<ProductId, ProductReadModel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: StreamCursors::default(),
        }
    }

    pub fn get(&self, warehouse_id: WarehouseId, product_id: &ProductId) -> Option<ProductReadModel> {
        self.store.get(warehouse_id, product_id)
    }

    /// Catalog listing ordered by product code.
    pub fn list(&self, warehouse_id: WarehouseId, include_inactive: bool) -> Vec<ProductReadModel> {
        let mut products: Vec<_> = self
            .store
            .list(warehouse_id)
            .into_iter()
            .filter(|p| include_inactive || p.active)
            .collect();
        products.sort_by(|a, b| a.code.cmp(&b.code).then(a.product_id.cmp(&b.product_id)));
        products
    }

    /// Active products in alarm, most urgent first.
    ///
    /// `min_level` keeps only entries at least that severe.
    pub fn alarms(&self, warehouse_id: WarehouseId, min_level: Option<AlarmLevel>) -> Vec<AlarmEntry> {
        let mut entries: Vec<AlarmEntry> = self
            .store
            .list(warehouse_id)
            .into_iter()
            .filter_map(|product| {
                let assessment = product.alarm()?;
                Some(AlarmEntry { product, assessment })
            })
            .filter(|e| min_level.is_none_or(|min| e.assessment.level.at_least(min)))
            .collect();

        entries.sort_by(|a, b| {
            a.assessment
                .priority_cmp(&b.assessment)
                .then_with(|| a.product.code.cmp(&b.product.code))
        });
        entries
    }

    pub fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        self.cursors
            .apply_next(envelope, |warehouse_id, event| self.apply_event(warehouse_id, event))
    }

    fn apply_event(&self, warehouse_id: WarehouseId, event: ProductEvent) {
        if let ProductEvent::ProductCreated(e) = event {
            self.store.upsert(
                warehouse_id,
                e.product_id,
                ProductReadModel {
                    product_id: e.product_id,
                    code: e.code,
                    name: e.name,
                    stock_min: e.stock_min,
                    position: StockPosition::empty(e.location),
                    active: true,
                    updated_at: e.occurred_at,
                    last_movement_at: None,
                },
            );
            return;
        }

        let Some(mut rm) = self.store.get(warehouse_id, &event.product_id()) else {
            tracing::warn!(product_id = %event.product_id(), "catalog update for unknown product ignored");
            return;
        };

        match event {
            ProductEvent::ProductCreated(_) => {}
            ProductEvent::StockMinimumChanged(e) => {
                rm.stock_min = e.stock_min;
                rm.updated_at = e.occurred_at;
            }
            ProductEvent::ProductRelocated(e) => {
                rm.position = rm.position.clone().with_primary(e.location);
                rm.updated_at = e.occurred_at;
            }
            ProductEvent::ProductDeactivated(e) => {
                rm.active = false;
                rm.updated_at = e.occurred_at;
            }
            ProductEvent::ProductReactivated(e) => {
                rm.active = true;
                rm.updated_at = e.occurred_at;
            }
            ProductEvent::MovementRecorded(e) => {
                rm.position = apply_record(&rm.position, &e.record);
                rm.updated_at = e.occurred_at;
                rm.last_movement_at = Some(e.record.occurred_at);
            }
        }

        self.store.upsert(warehouse_id, rm.product_id, rm);
    }

    /// Rebuild one warehouse's catalog from its full event history.
    pub fn rebuild(
        &self,
        warehouse_id: WarehouseId,
        envelopes: impl IntoIterator<Item = EventEnvelope<JsonValue>>,
    ) -> Result<(), ProjectionError> {
        self.store.clear_warehouse(warehouse_id);
        self.cursors.clear_warehouse(warehouse_id);

        let envelopes = envelopes
            .into_iter()
            .filter(|e| e.warehouse_id() == warehouse_id)
            .collect();
        for env in replay_order(envelopes) {
            self.apply_envelope(&env)?;
        }
        Ok(())
    }
}
