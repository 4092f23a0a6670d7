use axum::extract::Query;
use axum::extract::rejection::QueryRejection;
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use wareflow_core::AggregateId;
use wareflow_infra::projections::{AlarmEntry, MovementFilter, ProductReadModel};
use wareflow_inventory::{AlarmLevel, MovementDetails, MovementType, ProductId, StockLocation};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub stock_min: u64,
    /// `AISLE/SHELF`
    pub location: StockLocation,
}

#[derive(Debug, Deserialize)]
pub struct ChangeStockMinimumRequest {
    pub stock_min: u64,
}

#[derive(Debug, Deserialize)]
pub struct RelocateProductRequest {
    pub location: StockLocation,
}

/// Text fields of a movement body. The movement itself (`type` plus its
/// quantities/locations) is decoded separately from the same body.
#[derive(Debug, Deserialize)]
pub struct MovementDetailsRequest {
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub reason_category: Option<String>,
    #[serde(default)]
    pub comments: Option<String>,
    #[serde(default)]
    pub reference_document: Option<String>,
}

impl From<MovementDetailsRequest> for MovementDetails {
    fn from(r: MovementDetailsRequest) -> Self {
        MovementDetails {
            reason: r.reason,
            reason_category: r.reason_category,
            comments: r.comments,
            reference_document: r.reference_document,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListProductsQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct AlarmsQuery {
    pub min_level: Option<String>,
}

/// Query string of `GET /movements`; everything arrives as text.
#[derive(Debug, Default, Deserialize)]
pub struct MovementsQuery {
    pub product_id: Option<String>,
    #[serde(rename = "type")]
    pub movement_type: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub limit: Option<usize>,
}

impl MovementsQuery {
    pub fn into_filter(self) -> Result<MovementFilter, axum::response::Response> {
        let product_id = self
            .product_id
            .map(|raw| raw.parse::<AggregateId>().map(ProductId::new))
            .transpose()
            .map_err(|_| errors::invalid_id("product"))?;
        let movement_type = self
            .movement_type
            .map(|raw| raw.parse::<MovementType>())
            .transpose()
            .map_err(|e| errors::json_error(StatusCode::BAD_REQUEST, "invalid_filter", e.to_string()))?;

        let filter = MovementFilter {
            product_id,
            movement_type,
            from: parse_timestamp("from", self.from)?,
            to: parse_timestamp("to", self.to)?,
            limit: self.limit,
        };
        filter
            .validate()
            .map_err(|msg| errors::json_error(StatusCode::BAD_REQUEST, "invalid_filter", msg))?;
        Ok(filter)
    }
}

impl AlarmsQuery {
    pub fn min_level(&self) -> Result<Option<AlarmLevel>, axum::response::Response> {
        self.min_level
            .as_deref()
            .map(|raw| raw.parse::<AlarmLevel>())
            .transpose()
            .map_err(|msg| errors::json_error(StatusCode::BAD_REQUEST, "invalid_filter", msg))
    }
}

fn parse_timestamp(
    field: &'static str,
    raw: Option<String>,
) -> Result<Option<DateTime<Utc>>, axum::response::Response> {
    raw.map(|s| {
        DateTime::parse_from_rfc3339(s.trim())
            .map(|t| t.with_timezone(&Utc))
            .map_err(|_| {
                errors::json_error(
                    StatusCode::BAD_REQUEST,
                    "invalid_filter",
                    format!("'{field}' must be an RFC 3339 timestamp"),
                )
            })
    })
    .transpose()
}

/// Decode a JSON body, reporting shape errors as 400 rather than axum's 422.
/// Unwrap a query-string extraction, reporting failures in the JSON error shape.
pub fn parse_query<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, axum::response::Response> {
    query
        .map(|Query(q)| q)
        .map_err(|e| errors::json_error(StatusCode::BAD_REQUEST, "invalid_query", e.body_text()))
}

pub fn parse_body<T: DeserializeOwned>(body: serde_json::Value) -> Result<T, axum::response::Response> {
    serde_json::from_value(body)
        .map_err(|e| errors::json_error(StatusCode::BAD_REQUEST, "invalid_body", e.to_string()))
}

// -------------------------
// JSON mapping helpers
// -------------------------

pub fn product_to_json(rm: &ProductReadModel) -> serde_json::Value {
    let alarm = rm.alarm();
    serde_json::json!({
        "id": rm.product_id.0.to_string(),
        "code": rm.code,
        "name": rm.name,
        "stock_current": rm.stock_current(),
        "stock_min": rm.stock_min,
        "location": rm.location().to_string(),
        "buckets": rm.position.buckets(),
        "active": rm.active,
        "in_alarm": alarm.is_some(),
        "alarm": alarm,
        "updated_at": rm.updated_at,
        "last_movement_at": rm.last_movement_at,
    })
}

pub fn alarm_to_json(entry: &AlarmEntry) -> serde_json::Value {
    serde_json::json!({
        "product_id": entry.product.product_id.0.to_string(),
        "code": entry.product.code,
        "name": entry.product.name,
        "location": entry.product.location().to_string(),
        "level": entry.assessment.level,
        "stock_current": entry.assessment.stock_current,
        "stock_min": entry.assessment.stock_min,
        "stock_percentage": entry.assessment.stock_percentage,
        "deficit": entry.assessment.deficit,
    })
}
