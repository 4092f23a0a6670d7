use axum::{Router, routing::get};

pub mod alarms;
pub mod movements;
pub mod products;
pub mod reports;
pub mod system;

/// Router for all warehouse-scoped endpoints.
pub fn router() -> Router {
    Router::new()
        .nest("/products", products::router())
        .route("/movements", get(movements::list_movements))
        .route("/alarms", get(alarms::list_alarms))
        .nest("/reports", reports::router())
}
