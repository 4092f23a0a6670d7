//! Append-only event store boundary.
//!
//! Warehouse-scoped event streams without storage assumptions. The in-memory
//! store backs tests and the default server wiring.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryEventStore;
pub use r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};
