//! Product aggregate: catalog commands and the stock movements recorded against it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wareflow_core::{Aggregate, AggregateId, AggregateRoot, DomainError, UserId, WarehouseId};
use wareflow_events::Event;

use crate::alarm::{self, AlarmAssessment};
use crate::location::{StockLocation, StockPosition};
use crate::movement::{
    self, MovementDetails, MovementId, MovementRecord, MovementRequest, MovementStamp,
};

/// Aggregate type name used for product streams.
pub const PRODUCT_AGGREGATE_TYPE: &str = "inventory.product";

/// Product identifier (warehouse-scoped via `warehouse_id` fields in events/commands).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub AggregateId);

impl ProductId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ProductId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Aggregate root: Product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    id: ProductId,
    warehouse_id: Option<WarehouseId>,
    code: String,
    name: String,
    stock_min: u64,
    position: StockPosition,
    active: bool,
    version: u64,
    created: bool,
}

impl Product {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: ProductId) -> Self {
        Self {
            id,
            warehouse_id: None,
            code: String::new(),
            name: String::new(),
            stock_min: 0,
            position: StockPosition::empty(StockLocation::unassigned()),
            active: false,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn warehouse_id(&self) -> Option<WarehouseId> {
        self.warehouse_id
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stock_current(&self) -> u64 {
        self.position.total()
    }

    pub fn stock_min(&self) -> u64 {
        self.stock_min
    }

    pub fn position(&self) -> &StockPosition {
        &self.position
    }

    pub fn location(&self) -> &StockLocation {
        self.position.primary()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    /// Alarm view of the current stock (`None` when not in alarm).
    pub fn alarm(&self) -> Option<AlarmAssessment> {
        AlarmAssessment::assess(self.stock_current(), self.stock_min)
    }

    pub fn is_in_alarm(&self) -> bool {
        alarm::is_in_alarm(self.stock_current(), self.stock_min)
    }
}

impl AggregateRoot for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateProduct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProduct {
    pub warehouse_id: WarehouseId,
    pub product_id: ProductId,
    pub code: String,
    pub name: String,
    pub stock_min: u64,
    pub location: StockLocation,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ChangeStockMinimum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeStockMinimum {
    pub warehouse_id: WarehouseId,
    pub product_id: ProductId,
    pub stock_min: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RelocateProduct (changes the primary location only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelocateProduct {
    pub warehouse_id: WarehouseId,
    pub product_id: ProductId,
    pub location: StockLocation,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DeactivateProduct (soft delete).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeactivateProduct {
    pub warehouse_id: WarehouseId,
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReactivateProduct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactivateProduct {
    pub warehouse_id: WarehouseId,
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RecordMovement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMovement {
    pub warehouse_id: WarehouseId,
    pub product_id: ProductId,
    pub movement_id: MovementId,
    pub request: MovementRequest,
    pub details: MovementDetails,
    pub recorded_by: Option<UserId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductCommand {
    CreateProduct(CreateProduct),
    ChangeStockMinimum(ChangeStockMinimum),
    RelocateProduct(RelocateProduct),
    DeactivateProduct(DeactivateProduct),
    ReactivateProduct(ReactivateProduct),
    RecordMovement(RecordMovement),
}

/// Event: ProductCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCreated {
    pub warehouse_id: WarehouseId,
    pub product_id: ProductId,
    pub code: String,
    pub name: String,
    pub stock_min: u64,
    pub location: StockLocation,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockMinimumChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMinimumChanged {
    pub warehouse_id: WarehouseId,
    pub product_id: ProductId,
    pub previous: u64,
    pub stock_min: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProductRelocated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRelocated {
    pub warehouse_id: WarehouseId,
    pub product_id: ProductId,
    pub location: StockLocation,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProductDeactivated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDeactivated {
    pub warehouse_id: WarehouseId,
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProductReactivated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductReactivated {
    pub warehouse_id: WarehouseId,
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: MovementRecorded. Carries the ledger entry and, through it, the new stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementRecorded {
    pub warehouse_id: WarehouseId,
    pub product_id: ProductId,
    pub record: MovementRecord,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductEvent {
    ProductCreated(ProductCreated),
    StockMinimumChanged(StockMinimumChanged),
    ProductRelocated(ProductRelocated),
    ProductDeactivated(ProductDeactivated),
    ProductReactivated(ProductReactivated),
    MovementRecorded(MovementRecorded),
}

impl ProductEvent {
    pub fn warehouse_id(&self) -> WarehouseId {
        match self {
            ProductEvent::ProductCreated(e) => e.warehouse_id,
            ProductEvent::StockMinimumChanged(e) => e.warehouse_id,
            ProductEvent::ProductRelocated(e) => e.warehouse_id,
            ProductEvent::ProductDeactivated(e) => e.warehouse_id,
            ProductEvent::ProductReactivated(e) => e.warehouse_id,
            ProductEvent::MovementRecorded(e) => e.warehouse_id,
        }
    }

    pub fn product_id(&self) -> ProductId {
        match self {
            ProductEvent::ProductCreated(e) => e.product_id,
            ProductEvent::StockMinimumChanged(e) => e.product_id,
            ProductEvent::ProductRelocated(e) => e.product_id,
            ProductEvent::ProductDeactivated(e) => e.product_id,
            ProductEvent::ProductReactivated(e) => e.product_id,
            ProductEvent::MovementRecorded(e) => e.product_id,
        }
    }
}

impl Event for ProductEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ProductEvent::ProductCreated(_) => "inventory.product.created",
            ProductEvent::StockMinimumChanged(_) => "inventory.product.stock_minimum_changed",
            ProductEvent::ProductRelocated(_) => "inventory.product.relocated",
            ProductEvent::ProductDeactivated(_) => "inventory.product.deactivated",
            ProductEvent::ProductReactivated(_) => "inventory.product.reactivated",
            ProductEvent::MovementRecorded(_) => "inventory.product.movement_recorded",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ProductEvent::ProductCreated(e) => e.occurred_at,
            ProductEvent::StockMinimumChanged(e) => e.occurred_at,
            ProductEvent::ProductRelocated(e) => e.occurred_at,
            ProductEvent::ProductDeactivated(e) => e.occurred_at,
            ProductEvent::ProductReactivated(e) => e.occurred_at,
            ProductEvent::MovementRecorded(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Product {
    type Command = ProductCommand;
    type Event = ProductEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ProductEvent::ProductCreated(e) => {
                self.id = e.product_id;
                self.warehouse_id = Some(e.warehouse_id);
                self.code = e.code.clone();
                self.name = e.name.clone();
                self.stock_min = e.stock_min;
                self.position = StockPosition::empty(e.location.clone());
                self.active = true;
                self.created = true;
            }
            ProductEvent::StockMinimumChanged(e) => {
                self.stock_min = e.stock_min;
            }
            ProductEvent::ProductRelocated(e) => {
                self.position.set_primary(e.location.clone());
            }
            ProductEvent::ProductDeactivated(_) => {
                self.active = false;
            }
            ProductEvent::ProductReactivated(_) => {
                self.active = true;
            }
            ProductEvent::MovementRecorded(e) => {
                self.position = movement::apply_record(&self.position, &e.record);
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ProductCommand::CreateProduct(cmd) => self.handle_create(cmd),
            ProductCommand::ChangeStockMinimum(cmd) => self.handle_change_minimum(cmd),
            ProductCommand::RelocateProduct(cmd) => self.handle_relocate(cmd),
            ProductCommand::DeactivateProduct(cmd) => self.handle_deactivate(cmd),
            ProductCommand::ReactivateProduct(cmd) => self.handle_reactivate(cmd),
            ProductCommand::RecordMovement(cmd) => self.handle_record_movement(cmd),
        }
    }
}

impl Product {
    fn ensure_existing(&self, warehouse_id: WarehouseId, product_id: ProductId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        if self.warehouse_id != Some(warehouse_id) {
            return Err(DomainError::invariant("warehouse mismatch"));
        }
        if self.id != product_id {
            return Err(DomainError::invariant("product_id mismatch"));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateProduct) -> Result<Vec<ProductEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("product already exists"));
        }
        if cmd.product_id != self.id {
            return Err(DomainError::invariant("product_id mismatch"));
        }
        let code = cmd.code.trim();
        if code.is_empty() {
            return Err(DomainError::validation("code cannot be empty"));
        }
        let name = cmd.name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }

        Ok(vec![ProductEvent::ProductCreated(ProductCreated {
            warehouse_id: cmd.warehouse_id,
            product_id: cmd.product_id,
            code: code.to_string(),
            name: name.to_string(),
            stock_min: cmd.stock_min,
            location: cmd.location.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_change_minimum(&self, cmd: &ChangeStockMinimum) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_existing(cmd.warehouse_id, cmd.product_id)?;
        if cmd.stock_min == self.stock_min {
            return Ok(vec![]);
        }
        Ok(vec![ProductEvent::StockMinimumChanged(StockMinimumChanged {
            warehouse_id: cmd.warehouse_id,
            product_id: cmd.product_id,
            previous: self.stock_min,
            stock_min: cmd.stock_min,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_relocate(&self, cmd: &RelocateProduct) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_existing(cmd.warehouse_id, cmd.product_id)?;
        if &cmd.location == self.location() {
            return Ok(vec![]);
        }
        Ok(vec![ProductEvent::ProductRelocated(ProductRelocated {
            warehouse_id: cmd.warehouse_id,
            product_id: cmd.product_id,
            location: cmd.location.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_deactivate(&self, cmd: &DeactivateProduct) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_existing(cmd.warehouse_id, cmd.product_id)?;
        if !self.active {
            return Ok(vec![]);
        }
        Ok(vec![ProductEvent::ProductDeactivated(ProductDeactivated {
            warehouse_id: cmd.warehouse_id,
            product_id: cmd.product_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reactivate(&self, cmd: &ReactivateProduct) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_existing(cmd.warehouse_id, cmd.product_id)?;
        if self.active {
            return Ok(vec![]);
        }
        Ok(vec![ProductEvent::ProductReactivated(ProductReactivated {
            warehouse_id: cmd.warehouse_id,
            product_id: cmd.product_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_record_movement(&self, cmd: &RecordMovement) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_existing(cmd.warehouse_id, cmd.product_id)?;
        if !self.active {
            return Err(DomainError::invariant("product is deactivated"));
        }

        let recorded = movement::record_movement(
            self.id,
            &self.position,
            &cmd.request,
            &cmd.details,
            MovementStamp {
                movement_id: cmd.movement_id,
                recorded_by: cmd.recorded_by,
                occurred_at: cmd.occurred_at,
            },
        )?;

        Ok(vec![ProductEvent::MovementRecorded(MovementRecorded {
            warehouse_id: cmd.warehouse_id,
            product_id: cmd.product_id,
            record: recorded.record,
            occurred_at: cmd.occurred_at,
        })])
    }
}
