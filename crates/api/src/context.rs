use wareflow_core::{UserId, WarehouseId};

/// Warehouse context for a request.
///
/// This is immutable and must be present for all domain routes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct WarehouseContext {
    warehouse_id: WarehouseId,
}

impl WarehouseContext {
    pub fn new(warehouse_id: WarehouseId) -> Self {
        Self { warehouse_id }
    }

    pub fn warehouse_id(&self) -> WarehouseId {
        self.warehouse_id
    }
}

/// Who is acting, when the caller says so. Recorded on movements.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct ActorContext {
    user_id: Option<UserId>,
}

impl ActorContext {
    pub fn new(user_id: Option<UserId>) -> Self {
        Self { user_id }
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }
}
