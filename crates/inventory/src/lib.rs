//! Inventory domain module (event-sourced).
//!
//! Business rules for the warehouse catalog: products, stock movements and
//! stock alarms. Pure deterministic logic only (no IO, no HTTP, no storage).

pub mod alarm;
pub mod location;
pub mod movement;
pub mod product;

pub use alarm::{AlarmAssessment, AlarmLevel, classify_alarm, deficit, is_in_alarm, stock_percentage};
pub use location::{StockLocation, StockPosition};
pub use movement::{
    BucketDraw, MovementDetails, MovementId, MovementRecord, MovementRequest, MovementStamp, MovementType,
    RecordedMovement, record_movement,
};
pub use product::{
    ChangeStockMinimum, CreateProduct, DeactivateProduct, MovementRecorded, PRODUCT_AGGREGATE_TYPE,
    Product, ProductCommand, ProductCreated, ProductDeactivated, ProductEvent, ProductId,
    ProductReactivated, ProductRelocated, ReactivateProduct, RecordMovement, RelocateProduct,
    StockMinimumChanged,
};
