use axum::{
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use wareflow_core::{UserId, WarehouseId};

use crate::app::errors::json_error;
use crate::context::{ActorContext, WarehouseContext};

pub const WAREHOUSE_HEADER: &str = "x-warehouse-id";
pub const ACTOR_HEADER: &str = "x-actor-id";

/// Resolve warehouse and actor context from request headers.
pub async fn warehouse_middleware(
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let raw = header_value(req.headers(), WAREHOUSE_HEADER).ok_or_else(|| {
        json_error(
            StatusCode::BAD_REQUEST,
            "missing_warehouse",
            format!("{WAREHOUSE_HEADER} header is required"),
        )
    })?;
    let warehouse_id: WarehouseId = raw
        .parse()
        .map_err(|e: wareflow_core::DomainError| json_error(StatusCode::BAD_REQUEST, "invalid_warehouse", e.to_string()))?;

    let actor = match header_value(req.headers(), ACTOR_HEADER) {
        Some(raw) => Some(
            raw.parse::<UserId>()
                .map_err(|e| json_error(StatusCode::BAD_REQUEST, "invalid_actor", e.to_string()))?,
        ),
        None => None,
    };

    req.extensions_mut().insert(WarehouseContext::new(warehouse_id));
    req.extensions_mut().insert(ActorContext::new(actor));

    Ok(next.run(req).await)
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
