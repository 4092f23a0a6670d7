use std::collections::BTreeMap;
use std::sync::RwLock;

use wareflow_core::{AggregateId, ExpectedVersion, WarehouseId};

use super::r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct StreamKey {
    warehouse_id: [u8; 16],
    aggregate_id: AggregateId,
}

impl StreamKey {
    fn new(warehouse_id: WarehouseId, aggregate_id: AggregateId) -> Self {
        Self {
            warehouse_id: *warehouse_id.as_uuid().as_bytes(),
            aggregate_id,
        }
    }
}

/// In-memory append-only event store.
///
/// Streams are kept in a `BTreeMap` so warehouse scans come back in a stable order.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    streams: RwLock<BTreeMap<StreamKey, Vec<StoredEvent>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn current_version(stream: &[StoredEvent]) -> u64 {
        stream.last().map(|e| e.sequence_number).unwrap_or(0)
    }
}

impl EventStore for InMemoryEventStore {
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        let Some(first) = events.first() else {
            return Ok(vec![]);
        };

        let warehouse_id = first.warehouse_id;
        let aggregate_id = first.aggregate_id;
        let aggregate_type = first.aggregate_type.clone();

        for (idx, e) in events.iter().enumerate() {
            if e.warehouse_id != warehouse_id {
                return Err(EventStoreError::WarehouseIsolation(format!(
                    "batch contains multiple warehouse_ids (index {idx})"
                )));
            }
            if e.aggregate_id != aggregate_id {
                return Err(EventStoreError::InvalidAppend(format!(
                    "batch contains multiple aggregate_ids (index {idx})"
                )));
            }
            if e.aggregate_type != aggregate_type {
                return Err(EventStoreError::AggregateTypeMismatch(format!(
                    "batch contains multiple aggregate_types (index {idx})"
                )));
            }
        }

        let mut streams = self
            .streams
            .write()
            .map_err(|_| EventStoreError::Unavailable("lock poisoned".to_string()))?;

        let stream = streams.entry(StreamKey::new(warehouse_id, aggregate_id)).or_default();
        let current = Self::current_version(stream);

        if !expected_version.matches(current) {
            return Err(EventStoreError::Concurrency(format!(
                "expected {expected_version:?}, found {current}"
            )));
        }

        if let Some(existing) = stream.first() {
            if existing.aggregate_type != aggregate_type {
                return Err(EventStoreError::AggregateTypeMismatch(format!(
                    "stream aggregate_type is '{}', attempted append with '{}'",
                    existing.aggregate_type, aggregate_type
                )));
            }
        }

        let committed: Vec<StoredEvent> = events
            .into_iter()
            .zip(current + 1..)
            .map(|(e, sequence_number)| StoredEvent {
                event_id: e.event_id,
                warehouse_id: e.warehouse_id,
                aggregate_id: e.aggregate_id,
                aggregate_type: e.aggregate_type,
                sequence_number,
                event_type: e.event_type,
                event_version: e.event_version,
                occurred_at: e.occurred_at,
                payload: e.payload,
            })
            .collect();

        stream.extend(committed.iter().cloned());
        Ok(committed)
    }

    fn load_stream(
        &self,
        warehouse_id: WarehouseId,
        aggregate_id: AggregateId,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        let streams = self
            .streams
            .read()
            .map_err(|_| EventStoreError::Unavailable("lock poisoned".to_string()))?;

        Ok(streams
            .get(&StreamKey::new(warehouse_id, aggregate_id))
            .cloned()
            .unwrap_or_default())
    }

    fn load_warehouse(&self, warehouse_id: WarehouseId) -> Result<Vec<StoredEvent>, EventStoreError> {
        let streams = self
            .streams
            .read()
            .map_err(|_| EventStoreError::Unavailable("lock poisoned".to_string()))?;

        let wanted = *warehouse_id.as_uuid().as_bytes();
        Ok(streams
            .iter()
            .filter(|(k, _)| k.warehouse_id == wanted)
            .flat_map(|(_, stream)| stream.iter().cloned())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    fn uncommitted(warehouse_id: WarehouseId, aggregate_id: AggregateId) -> UncommittedEvent {
        UncommittedEvent {
            event_id: Uuid::now_v7(),
            warehouse_id,
            aggregate_id,
            aggregate_type: "inventory.product".to_string(),
            event_type: "inventory.product.created".to_string(),
            event_version: 1,
            occurred_at: Utc::now(),
            payload: json!({}),
        }
    }

    #[test]
    fn append_assigns_consecutive_sequence_numbers() {
        let store = InMemoryEventStore::new();
        let w = WarehouseId::new();
        let a = AggregateId::new();

        let first = store
            .append(vec![uncommitted(w, a), uncommitted(w, a)], ExpectedVersion::Exact(0))
            .unwrap();
        assert_eq!(first.iter().map(|e| e.sequence_number).collect::<Vec<_>>(), vec![1, 2]);

        let next = store.append(vec![uncommitted(w, a)], ExpectedVersion::Exact(2)).unwrap();
        assert_eq!(next[0].sequence_number, 3);
        assert_eq!(store.load_stream(w, a).unwrap().len(), 3);
    }

    #[test]
    fn stale_expected_version_is_rejected_and_nothing_is_written() {
        let store = InMemoryEventStore::new();
        let w = WarehouseId::new();
        let a = AggregateId::new();
        store.append(vec![uncommitted(w, a)], ExpectedVersion::Exact(0)).unwrap();

        let err = store.append(vec![uncommitted(w, a)], ExpectedVersion::Exact(0)).unwrap_err();
        assert!(matches!(err, EventStoreError::Concurrency(_)));
        assert_eq!(store.load_stream(w, a).unwrap().len(), 1);
    }

    #[test]
    fn mixed_warehouse_batch_is_rejected() {
        let store = InMemoryEventStore::new();
        let a = AggregateId::new();
        let err = store
            .append(
                vec![uncommitted(WarehouseId::new(), a), uncommitted(WarehouseId::new(), a)],
                ExpectedVersion::Any,
            )
            .unwrap_err();
        assert!(matches!(err, EventStoreError::WarehouseIsolation(_)));
    }

    #[test]
    fn warehouse_scan_only_returns_own_streams() {
        let store = InMemoryEventStore::new();
        let w1 = WarehouseId::new();
        let w2 = WarehouseId::new();
        store.append(vec![uncommitted(w1, AggregateId::new())], ExpectedVersion::Any).unwrap();
        store.append(vec![uncommitted(w1, AggregateId::new())], ExpectedVersion::Any).unwrap();
        store.append(vec![uncommitted(w2, AggregateId::new())], ExpectedVersion::Any).unwrap();

        let events = store.load_warehouse(w1).unwrap();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.warehouse_id == w1));
    }
}
