//! Command execution pipeline for event-sourced aggregates.
//!
//! ```text
//! command
//!   -> load stream (warehouse-scoped)
//!   -> rehydrate aggregate
//!   -> handle (pure decision, may reject)
//!   -> append with ExpectedVersion::Exact(loaded version)
//!   -> publish committed envelopes
//! ```
//!
//! Rejections from `handle` happen before anything is appended. A concurrent
//! writer on the same stream makes the append fail with `Concurrency`; the
//! dispatcher never retries.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

use wareflow_core::{Aggregate, AggregateId, AggregateRoot, DomainError, ExpectedVersion, WarehouseId};
use wareflow_events::{EventBus, EventEnvelope};

use crate::event_store::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

#[derive(Debug, Error)]
pub enum DispatchError {
    /// Stale aggregate version (concurrent modification) or duplicate creation.
    #[error("conflict: {0}")]
    Concurrency(String),
    /// A loaded stream contained events from another warehouse or aggregate.
    #[error("warehouse isolation violation: {0}")]
    WarehouseIsolation(String),
    /// User-correctable input problem.
    #[error("{0}")]
    Validation(String),
    /// The current state forbids the command.
    #[error("{0}")]
    InvariantViolation(String),
    #[error("not found")]
    NotFound,
    /// Stored payloads could not be decoded into the aggregate's event type.
    #[error("failed to deserialize stored event: {0}")]
    Deserialize(String),
    #[error(transparent)]
    Store(EventStoreError),
}

impl From<EventStoreError> for DispatchError {
    fn from(value: EventStoreError) -> Self {
        match value {
            EventStoreError::Concurrency(msg) => DispatchError::Concurrency(msg),
            EventStoreError::WarehouseIsolation(msg) => DispatchError::WarehouseIsolation(msg),
            other => DispatchError::Store(other),
        }
    }
}

impl From<DomainError> for DispatchError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => DispatchError::Validation(msg),
            DomainError::InvariantViolation(msg) => DispatchError::InvariantViolation(msg),
            DomainError::Conflict(msg) => DispatchError::Concurrency(msg),
            DomainError::NotFound => DispatchError::NotFound,
            DomainError::InvalidId(msg) => DispatchError::Validation(msg),
        }
    }
}

/// Reusable command execution engine.
///
/// Store and bus are injected, so tests run against the in-memory
/// implementations and the server wiring decides the real ones.
#[derive(Debug)]
pub struct CommandDispatcher<S, B> {
    store: S,
    bus: B,
}

impl<S, B> CommandDispatcher<S, B> {
    pub fn new(store: S, bus: B) -> Self {
        Self { store, bus }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_parts(self) -> (S, B) {
        (self.store, self.bus)
    }
}

impl<S, B> CommandDispatcher<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// Run `command` against the aggregate `(warehouse_id, aggregate_id)`.
    ///
    /// Returns the committed events (empty when the command was a no-op).
    pub fn dispatch<A>(
        &self,
        warehouse_id: WarehouseId,
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        command: A::Command,
        make_aggregate: impl FnOnce(WarehouseId, AggregateId) -> A,
    ) -> Result<Vec<StoredEvent>, DispatchError>
    where
        A: Aggregate<Error = DomainError>,
        A::Event: wareflow_events::Event + Serialize + DeserializeOwned,
    {
        let aggregate = self.load::<A>(warehouse_id, aggregate_id, make_aggregate)?;
        let expected = ExpectedVersion::Exact(AggregateRoot::version(&aggregate));

        let decided = aggregate.handle(&command).map_err(DispatchError::from)?;
        if decided.is_empty() {
            return Ok(vec![]);
        }

        let aggregate_type = aggregate_type.into();
        let uncommitted = decided
            .iter()
            .map(|ev| {
                UncommittedEvent::from_typed(
                    warehouse_id,
                    aggregate_id,
                    aggregate_type.clone(),
                    Uuid::now_v7(),
                    ev,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        let committed = self.store.append(uncommitted, expected)?;
        tracing::debug!(
            warehouse_id = %warehouse_id,
            aggregate_id = %aggregate_id,
            aggregate_type = %aggregate_type,
            committed = committed.len(),
            "events appended"
        );

        // The append is the commit; subscribers recover missed events from the store.
        for stored in &committed {
            if let Err(e) = self.bus.publish(stored.to_envelope()) {
                tracing::warn!(
                    warehouse_id = %warehouse_id,
                    aggregate_id = %aggregate_id,
                    sequence_number = stored.sequence_number,
                    error = ?e,
                    "event publication failed after commit"
                );
            }
        }

        Ok(committed)
    }

    /// Rehydrate an aggregate from its stream without handling a command.
    pub fn load<A>(
        &self,
        warehouse_id: WarehouseId,
        aggregate_id: AggregateId,
        make_aggregate: impl FnOnce(WarehouseId, AggregateId) -> A,
    ) -> Result<A, DispatchError>
    where
        A: Aggregate,
        A::Event: DeserializeOwned,
    {
        let history = self.store.load_stream(warehouse_id, aggregate_id)?;
        validate_loaded_stream(warehouse_id, aggregate_id, &history)?;

        let mut aggregate = make_aggregate(warehouse_id, aggregate_id);
        for stored in history {
            let ev: A::Event = serde_json::from_value(stored.payload)
                .map_err(|e| DispatchError::Deserialize(e.to_string()))?;
            aggregate.apply(&ev);
        }
        Ok(aggregate)
    }
}

fn validate_loaded_stream(
    warehouse_id: WarehouseId,
    aggregate_id: AggregateId,
    stream: &[StoredEvent],
) -> Result<(), DispatchError> {
    // Sequence numbers must run 1, 2, 3, ... so aggregate.version() equals the stream version.
    for (idx, e) in stream.iter().enumerate() {
        if e.warehouse_id != warehouse_id {
            return Err(DispatchError::WarehouseIsolation(format!(
                "loaded stream contains wrong warehouse_id at index {idx}"
            )));
        }
        if e.aggregate_id != aggregate_id {
            return Err(DispatchError::WarehouseIsolation(format!(
                "loaded stream contains wrong aggregate_id at index {idx}"
            )));
        }
        let expected = idx as u64 + 1;
        if e.sequence_number != expected {
            return Err(DispatchError::Store(EventStoreError::InvalidAppend(format!(
                "unexpected sequence_number in loaded stream (expected {expected}, found {})",
                e.sequence_number
            ))));
        }
    }
    Ok(())
}
