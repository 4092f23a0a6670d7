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

pub async fn list_alarms(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(warehouse): Extension<WarehouseContext>,
    query: Result<Query<dto::AlarmsQuery>, QueryRejection>,
) -> axum::response::Response {
    let query = match dto::parse_query(query) {
        Ok(q) => q,
        Err(resp) => return resp,
    };
    let min_level = match query.min_level() {
        Ok(l) => l,
        Err(resp) => return resp,
    };

    let items: Vec<_> = services
        .alarms(warehouse.warehouse_id(), min_level)
        .iter()
        .map(dto::alarm_to_json)
        .collect();

    (
        StatusCode::OK,
        Json(serde_json::json!({ "count": items.len(), "items": items })),
    )
        .into_response()
}
