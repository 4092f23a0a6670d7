use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Query, rejection::QueryRejection},
    http::StatusCode,
    response::IntoResponse,
};

use crate::app::dto;
use crate::app::services::AppServices;
use crate::context::WarehouseContext;

/// Ledger query, newest first. Query parameters: `product_id`, `type`,
/// `from` (inclusive), `to` (exclusive), `limit`.
pub async fn list_movements(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(warehouse): Extension<WarehouseContext>,
    query: Result<Query<dto::MovementsQuery>, QueryRejection>,
) -> axum::response::Response {
    let query = match dto::parse_query(query) {
        Ok(q) => q,
        Err(resp) => return resp,
    };
    let filter = match query.into_filter() {
        Ok(f) => f,
        Err(resp) => return resp,
    };

    let items = services.movements(warehouse.warehouse_id(), &filter);
    (
        StatusCode::OK,
        Json(serde_json::json!({ "count": items.len(), "items": items })),
    )
        .into_response()
}
