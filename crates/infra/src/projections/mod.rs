//! Read models built from product event streams.
//!
//! Every projection here is:
//! - rebuildable from the event store
//! - warehouse-isolated
//! - idempotent under at-least-once delivery (per-stream cursors)

use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value as JsonValue;
use thiserror::Error;

use wareflow_core::{AggregateId, WarehouseId};
use wareflow_events::EventEnvelope;
use wareflow_inventory::ProductEvent;

pub mod catalog;
pub mod movement_ledger;

pub use catalog::{AlarmEntry, ProductCatalogProjection, ProductReadModel};
pub use movement_ledger::{MovementFilter, MovementLedgerProjection};

#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("failed to deserialize product event: {0}")]
    Deserialize(String),

    #[error("warehouse isolation violation: {0}")]
    WarehouseIsolation(String),

    #[error("non-monotonic sequence number (last={last}, found={found})")]
    NonMonotonicSequence { last: u64, found: u64 },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct CursorKey {
    warehouse_id: WarehouseId,
    aggregate_id: AggregateId,
}

/// Last applied sequence number per `(warehouse, aggregate)` stream.
#[derive(Debug, Default)]
pub(crate) struct StreamCursors {
    inner: RwLock<HashMap<CursorKey, u64>>,
}

impl StreamCursors {
    /// Decode `envelope` and hand it to `apply` if it is the next event of its stream.
    ///
    /// Replays at or below the cursor are skipped; gaps are rejected. The cursor
    /// lock is held while `apply` runs so concurrent deliveries cannot interleave.
    pub(crate) fn apply_next(
        &self,
        envelope: &EventEnvelope<JsonValue>,
        apply: impl FnOnce(WarehouseId, ProductEvent),
    ) -> Result<(), ProjectionError> {
        let warehouse_id = envelope.warehouse_id();
        let aggregate_id = envelope.aggregate_id();
        let seq = envelope.sequence_number();

        let mut cursors = self
            .inner
            .write()
            .map_err(|_| ProjectionError::WarehouseIsolation("cursor lock poisoned".to_string()))?;
        let key = CursorKey {
            warehouse_id,
            aggregate_id,
        };
        let last = cursors.get(&key).copied().unwrap_or(0);

        if seq == 0 {
            return Err(ProjectionError::NonMonotonicSequence { last, found: seq });
        }
        if seq <= last {
            return Ok(());
        }
        if seq != last + 1 {
            return Err(ProjectionError::NonMonotonicSequence { last, found: seq });
        }

        let event: ProductEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| ProjectionError::Deserialize(e.to_string()))?;

        if event.warehouse_id() != warehouse_id {
            return Err(ProjectionError::WarehouseIsolation(
                "event warehouse_id does not match envelope warehouse_id".to_string(),
            ));
        }
        if event.product_id().0 != aggregate_id {
            return Err(ProjectionError::WarehouseIsolation(
                "event product_id does not match envelope aggregate_id".to_string(),
            ));
        }

        apply(warehouse_id, event);
        cursors.insert(key, seq);
        Ok(())
    }

    pub(crate) fn clear_warehouse(&self, warehouse_id: WarehouseId) {
        if let Ok(mut cursors) = self.inner.write() {
            cursors.retain(|k, _| k.warehouse_id != warehouse_id);
        }
    }
}

/// Order envelopes for replay: aggregate, then sequence.
pub(crate) fn replay_order(mut envelopes: Vec<EventEnvelope<JsonValue>>) -> Vec<EventEnvelope<JsonValue>> {
    envelopes.sort_by_key(|e| (e.aggregate_id(), e.sequence_number()));
    envelopes
}
