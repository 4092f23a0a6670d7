//! Infrastructure layer: event store, command pipeline, read models and reports.
//!
//! Everything here is in-memory and injected; the API crate decides the wiring.

pub mod command_dispatcher;
pub mod event_store;
pub mod projections;
pub mod read_model;
pub mod reports;
