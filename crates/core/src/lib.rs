//! `wareflow-core`: domain foundation building blocks.
//!
//! Pure domain primitives shared by the warehouse crates (no IO, no storage).

pub mod aggregate;
pub mod error;
pub mod id;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use error::{DomainError, DomainResult};
pub use id::{AggregateId, UserId, WarehouseId};
