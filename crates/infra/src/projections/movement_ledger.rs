use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use wareflow_core::WarehouseId;
use wareflow_events::EventEnvelope;
use wareflow_inventory::{MovementId, MovementRecord, MovementType, ProductEvent, ProductId};

use super::{ProjectionError, StreamCursors, replay_order};
use crate::read_model::WarehouseStore;

/// Upper bound on `MovementFilter::limit`.
pub const MAX_HISTORY_LIMIT: usize = 1000;

/// Movement history query. All criteria are optional and combined with AND.
///
/// `from` is inclusive and `to` is exclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementFilter {
    #[serde(default)]
    pub product_id: Option<ProductId>,
    #[serde(default)]
    pub movement_type: Option<MovementType>,
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl MovementFilter {
    pub fn for_product(product_id: ProductId) -> Self {
        Self {
            product_id: Some(product_id),
            ..Self::default()
        }
    }

    /// Reject empty ranges and out-of-bounds limits.
    pub fn validate(&self) -> Result<(), String> {
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                return Err(format!("'from' ({from}) must not be later than 'to' ({to})"));
            }
        }
        match self.limit {
            Some(0) => Err("limit must be greater than zero".to_string()),
            Some(n) if n > MAX_HISTORY_LIMIT => Err(format!("limit cannot exceed {MAX_HISTORY_LIMIT}")),
            _ => Ok(()),
        }
    }

    pub fn matches(&self, record: &MovementRecord) -> bool {
        self.product_id.is_none_or(|p| p == record.product_id)
            && self.movement_type.is_none_or(|t| t == record.movement_type)
            && self.from.is_none_or(|from| record.occurred_at >= from)
            && self.to.is_none_or(|to| record.occurred_at < to)
    }
}

/// Append-only movement history per warehouse.
#[derive(Debug)]
pub struct MovementLedgerProjection<S>
where
    S: WarehouseStore<MovementId, MovementRecord>,
{
    store: S,
    cursors: StreamCursors,
}

impl<S> MovementLedgerProjection<S>
where
    S: WarehouseStore<MovementId, MovementRecord>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: StreamCursors::default(),
        }
    }

    pub fn get(&self, warehouse_id: WarehouseId, movement_id: &MovementId) -> Option<MovementRecord> {
        self.store.get(warehouse_id, movement_id)
    }

    /// Matching movements, newest first. The caller validates the filter.
    pub fn query(&self, warehouse_id: WarehouseId, filter: &MovementFilter) -> Vec<MovementRecord> {
        let mut records: Vec<MovementRecord> = self
            .store
            .list(warehouse_id)
            .into_iter()
            .filter(|r| filter.matches(r))
            .collect();

        records.sort_by(|a, b| {
            b.occurred_at
                .cmp(&a.occurred_at)
                .then(b.movement_id.cmp(&a.movement_id))
        });
        records.truncate(filter.limit.unwrap_or(MAX_HISTORY_LIMIT));
        records
    }

    pub fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        self.cursors.apply_next(envelope, |warehouse_id, event| {
            // Catalog-only events still advance the cursor.
            if let ProductEvent::MovementRecorded(e) = event {
                self.store.upsert(warehouse_id, e.record.movement_id, e.record);
            }
        })
    }

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

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;
    use wareflow_core::AggregateId;

    fn record_at(hour: u32, movement_type: MovementType) -> MovementRecord {
        MovementRecord {
            movement_id: MovementId(Uuid::from_u128(hour as u128)),
            product_id: ProductId::new(AggregateId::from_uuid(Uuid::from_u128(1))),
            movement_type,
            quantity: 1,
            quantity_before: 0,
            quantity_after: 1,
            location: None,
            drawn_from: Vec::new(),
            from_location: None,
            to_location: None,
            reason: "test".to_string(),
            reason_category: None,
            comments: None,
            reference_document: None,
            recorded_by: None,
            occurred_at: Utc.with_ymd_and_hms(2026, 2, 1, hour, 0, 0).unwrap(),
        }
    }

    #[test]
    fn range_is_half_open() {
        let filter = MovementFilter {
            from: Some(Utc.with_ymd_and_hms(2026, 2, 1, 8, 0, 0).unwrap()),
            to: Some(Utc.with_ymd_and_hms(2026, 2, 1, 10, 0, 0).unwrap()),
            ..MovementFilter::default()
        };
        assert!(filter.matches(&record_at(8, MovementType::In)));
        assert!(filter.matches(&record_at(9, MovementType::In)));
        assert!(!filter.matches(&record_at(10, MovementType::In)));
    }

    #[test]
    fn type_filter_and_validation() {
        let filter = MovementFilter {
            movement_type: Some(MovementType::Out),
            ..MovementFilter::default()
        };
        assert!(!filter.matches(&record_at(1, MovementType::In)));
        assert!(filter.matches(&record_at(1, MovementType::Out)));

        let bad = MovementFilter {
            limit: Some(0),
            ..MovementFilter::default()
        };
        assert!(bad.validate().is_err());

        let inverted = MovementFilter {
            from: Some(Utc.with_ymd_and_hms(2026, 2, 2, 0, 0, 0).unwrap()),
            to: Some(Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap()),
            ..MovementFilter::default()
        };
        assert!(inverted.validate().is_err());
        assert!(MovementFilter::default().validate().is_ok());
    }
}
