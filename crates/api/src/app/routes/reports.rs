use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};

use wareflow_infra::reports::ReportRequest;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::WarehouseContext;

pub fn router() -> Router {
    Router::new().route("/", post(run_report))
}

pub async fn run_report(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(warehouse): Extension<WarehouseContext>,
    Json(body): Json<serde_json::Value>,
) -> axum::response::Response {
    let request: ReportRequest = match dto::parse_body(body) {
        Ok(r) => r,
        Err(resp) => return resp,
    };

    match services.run_report(warehouse.warehouse_id(), &request) {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => errors::report_error_to_response(e),
    }
}
