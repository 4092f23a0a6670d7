use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query, rejection::QueryRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use chrono::Utc;

use wareflow_core::AggregateId;
use wareflow_infra::event_store::StoredEvent;
use wareflow_inventory::{
    ChangeStockMinimum, CreateProduct, DeactivateProduct, MovementId, MovementRequest, ProductCommand,
    ProductEvent, ProductId, ReactivateProduct, RecordMovement, RelocateProduct,
};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::{ActorContext, WarehouseContext};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_product).get(list_products))
        .route("/:id", get(get_product))
        .route("/:id/stock-min", put(change_stock_min))
        .route("/:id/relocate", post(relocate_product))
        .route("/:id/deactivate", post(deactivate_product))
        .route("/:id/reactivate", post(reactivate_product))
        .route("/:id/movements", post(record_movement).get(product_movements))
}

fn parse_product_id(id: &str) -> Result<ProductId, axum::response::Response> {
    id.parse::<AggregateId>()
        .map(ProductId::new)
        .map_err(|_| errors::invalid_id("product"))
}

fn committed_response(status: StatusCode, product_id: ProductId, committed: &[StoredEvent]) -> axum::response::Response {
    (
        status,
        Json(serde_json::json!({
            "id": product_id.0.to_string(),
            "events_committed": committed.len(),
            "stream_version": committed.last().map(|e| e.sequence_number),
        })),
    )
        .into_response()
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(warehouse): Extension<WarehouseContext>,
    Json(body): Json<serde_json::Value>,
) -> axum::response::Response {
    let body: dto::CreateProductRequest = match dto::parse_body(body) {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    let product_id = ProductId::new(AggregateId::new());
    let cmd = ProductCommand::CreateProduct(CreateProduct {
        warehouse_id: warehouse.warehouse_id(),
        product_id,
        code: body.code,
        name: body.name,
        stock_min: body.stock_min,
        location: body.location,
        occurred_at: Utc::now(),
    });

    match services.dispatch_product(warehouse.warehouse_id(), product_id, cmd) {
        Ok(committed) => committed_response(StatusCode::CREATED, product_id, &committed),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(warehouse): Extension<WarehouseContext>,
    query: Result<Query<dto::ListProductsQuery>, QueryRejection>,
) -> axum::response::Response {
    let query = match dto::parse_query(query) {
        Ok(q) => q,
        Err(resp) => return resp,
    };
    let items: Vec<_> = services
        .products_list(warehouse.warehouse_id(), query.include_inactive)
        .iter()
        .map(dto::product_to_json)
        .collect();

    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(warehouse): Extension<WarehouseContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let product_id = match parse_product_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.product_get(warehouse.warehouse_id(), &product_id) {
        Some(rm) => (StatusCode::OK, Json(dto::product_to_json(&rm))).into_response(),
        None => errors::json_error(StatusCode::NOT_FOUND, "not_found", "product not found"),
    }
}

pub async fn change_stock_min(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(warehouse): Extension<WarehouseContext>,
    Path(id): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> axum::response::Response {
    let product_id = match parse_product_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let body: dto::ChangeStockMinimumRequest = match dto::parse_body(body) {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    let cmd = ProductCommand::ChangeStockMinimum(ChangeStockMinimum {
        warehouse_id: warehouse.warehouse_id(),
        product_id,
        stock_min: body.stock_min,
        occurred_at: Utc::now(),
    });

    match services.dispatch_product(warehouse.warehouse_id(), product_id, cmd) {
        Ok(committed) => committed_response(StatusCode::OK, product_id, &committed),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn relocate_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(warehouse): Extension<WarehouseContext>,
    Path(id): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> axum::response::Response {
    let product_id = match parse_product_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let body: dto::RelocateProductRequest = match dto::parse_body(body) {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    let cmd = ProductCommand::RelocateProduct(RelocateProduct {
        warehouse_id: warehouse.warehouse_id(),
        product_id,
        location: body.location,
        occurred_at: Utc::now(),
    });

    match services.dispatch_product(warehouse.warehouse_id(), product_id, cmd) {
        Ok(committed) => committed_response(StatusCode::OK, product_id, &committed),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn deactivate_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(warehouse): Extension<WarehouseContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let product_id = match parse_product_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let cmd = ProductCommand::DeactivateProduct(DeactivateProduct {
        warehouse_id: warehouse.warehouse_id(),
        product_id,
        occurred_at: Utc::now(),
    });

    match services.dispatch_product(warehouse.warehouse_id(), product_id, cmd) {
        Ok(committed) => committed_response(StatusCode::OK, product_id, &committed),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn reactivate_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(warehouse): Extension<WarehouseContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let product_id = match parse_product_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let cmd = ProductCommand::ReactivateProduct(ReactivateProduct {
        warehouse_id: warehouse.warehouse_id(),
        product_id,
        occurred_at: Utc::now(),
    });

    match services.dispatch_product(warehouse.warehouse_id(), product_id, cmd) {
        Ok(committed) => committed_response(StatusCode::OK, product_id, &committed),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

/// Record a stock movement. The body carries `type` plus the fields of that
/// movement kind, and the free-text details (`reason` is required).
pub async fn record_movement(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(warehouse): Extension<WarehouseContext>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> axum::response::Response {
    let product_id = match parse_product_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let request: MovementRequest = match dto::parse_body(body.clone()) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let details: dto::MovementDetailsRequest = match dto::parse_body(body) {
        Ok(d) => d,
        Err(resp) => return resp,
    };

    let warehouse_id = warehouse.warehouse_id();
    let movement_type = request.movement_type();
    let cmd = ProductCommand::RecordMovement(RecordMovement {
        warehouse_id,
        product_id,
        movement_id: MovementId::new(),
        request,
        details: details.into(),
        recorded_by: actor.user_id(),
        occurred_at: Utc::now(),
    });

    let committed = match services.dispatch_product(warehouse_id, product_id, cmd) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(
                warehouse_id = %warehouse_id,
                product_id = %product_id,
                movement_type = %movement_type,
                error = %e,
                "movement rejected"
            );
            return errors::dispatch_error_to_response(e);
        }
    };

    let record = committed.iter().find_map(|stored| {
        match serde_json::from_value::<ProductEvent>(stored.payload.clone()) {
            Ok(ProductEvent::MovementRecorded(e)) => Some(e.record),
            _ => None,
        }
    });
    let Some(record) = record else {
        return errors::json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "store_error",
            "movement was not committed",
        );
    };

    tracing::info!(
        warehouse_id = %warehouse_id,
        product_id = %product_id,
        movement_id = %record.movement_id,
        movement_type = %record.movement_type,
        quantity = record.quantity,
        before = record.quantity_before,
        after = record.quantity_after,
        "movement recorded"
    );

    (
        StatusCode::CREATED,
        Json(serde_json::json!({
            "movement": record,
            "stock_current": record.quantity_after,
        })),
    )
        .into_response()
}

pub async fn product_movements(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(warehouse): Extension<WarehouseContext>,
    Path(id): Path<String>,
    query: Result<Query<dto::MovementsQuery>, QueryRejection>,
) -> axum::response::Response {
    let query = match dto::parse_query(query) {
        Ok(q) => q,
        Err(resp) => return resp,
    };
    let product_id = match parse_product_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let mut filter = match query.into_filter() {
        Ok(f) => f,
        Err(resp) => return resp,
    };
    filter.product_id = Some(product_id);

    let items = services.movements(warehouse.warehouse_id(), &filter);
    (
        StatusCode::OK,
        Json(serde_json::json!({ "count": items.len(), "items": items })),
    )
        .into_response()
}
