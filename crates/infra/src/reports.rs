//! Typed report requests over the catalog and ledger read models.
//!
//! Each report kind is its own variant with its own validated parameters; no
//! free-form option bags.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use wareflow_core::WarehouseId;
use wareflow_inventory::{
    AlarmLevel, MovementId, MovementRecord, MovementType, ProductId, deficit, stock_percentage,
};

use crate::projections::{
    AlarmEntry, MovementFilter, MovementLedgerProjection, ProductCatalogProjection, ProductReadModel,
};
use crate::read_model::WarehouseStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportRequest {
    /// Current stock of every product.
    StockLevels {
        #[serde(default)]
        include_inactive: bool,
    },
    /// Raw ledger entries matching a filter.
    MovementHistory {
        #[serde(default)]
        filter: MovementFilter,
    },
    /// Per-product movement totals over an optional `[from, to)` window.
    MovementSummary {
        #[serde(default)]
        from: Option<DateTime<Utc>>,
        #[serde(default)]
        to: Option<DateTime<Utc>>,
    },
    /// Alarm listing, optionally only at or above a severity.
    Alarms {
        #[serde(default)]
        min_level: Option<AlarmLevel>,
    },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReportError {
    #[error("invalid report parameters: {0}")]
    InvalidParameters(String),
}

impl ReportRequest {
    pub fn validate(&self) -> Result<(), ReportError> {
        match self {
            ReportRequest::StockLevels { .. } | ReportRequest::Alarms { .. } => Ok(()),
            ReportRequest::MovementHistory { filter } => {
                filter.validate().map_err(ReportError::InvalidParameters)
            }
            ReportRequest::MovementSummary { from, to } => MovementFilter {
                from: *from,
                to: *to,
                ..MovementFilter::default()
            }
            .validate()
            .map_err(ReportError::InvalidParameters),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockLevelRow {
    pub product_id: ProductId,
    pub code: String,
    pub name: String,
    pub location: String,
    pub stock_current: u64,
    pub stock_min: u64,
    pub stock_percentage: u64,
    pub deficit: u64,
    pub alarm_level: Option<AlarmLevel>,
    pub active: bool,
}

impl From<&ProductReadModel> for StockLevelRow {
    fn from(p: &ProductReadModel) -> Self {
        Self {
            product_id: p.product_id,
            code: p.code.clone(),
            name: p.name.clone(),
            location: p.location().to_string(),
            stock_current: p.stock_current(),
            stock_min: p.stock_min,
            stock_percentage: stock_percentage(p.stock_current(), p.stock_min),
            deficit: deficit(p.stock_current(), p.stock_min),
            alarm_level: p.alarm().map(|a| a.level),
            active: p.active,
        }
    }
}

/// Totals saturate at the bounds of their integer types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MovementSummaryRow {
    pub product_id: ProductId,
    pub code: String,
    pub total_in: u64,
    pub total_out: u64,
    /// Signed sum of ADJUSTMENT changes.
    pub net_adjustment: i64,
    pub transfers: u64,
    pub movements: u64,
}

impl MovementSummaryRow {
    fn empty(product_id: ProductId) -> Self {
        Self {
            product_id,
            code: String::new(),
            total_in: 0,
            total_out: 0,
            net_adjustment: 0,
            transfers: 0,
            movements: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "rows", rename_all = "snake_case")]
pub enum Report {
    StockLevels(Vec<StockLevelRow>),
    MovementHistory(Vec<MovementRecord>),
    MovementSummary(Vec<MovementSummaryRow>),
    Alarms(Vec<AlarmEntry>),
}

impl Report {
    pub fn row_count(&self) -> usize {
        match self {
            Report::StockLevels(rows) => rows.len(),
            Report::MovementHistory(rows) => rows.len(),
            Report::MovementSummary(rows) => rows.len(),
            Report::Alarms(rows) => rows.len(),
        }
    }
}

/// Runs reports against injected read models.
pub struct ReportService<'a, C, L>
where
    C: WarehouseStore<ProductId, ProductReadModel>,
    L: WarehouseStore<MovementId, MovementRecord>,
{
    catalog: &'a ProductCatalogProjection<C>,
    ledger: &'a MovementLedgerProjection<L>,
}

impl<'a, C, L> ReportService<'a, C, L>
where
    C: WarehouseStore<ProductId, ProductReadModel>,
    L: WarehouseStore<MovementId, MovementRecord>,
{
    pub fn new(catalog: &'a ProductCatalogProjection<C>, ledger: &'a MovementLedgerProjection<L>) -> Self {
        Self { catalog, ledger }
    }

    pub fn run(&self, warehouse_id: WarehouseId, request: &ReportRequest) -> Result<Report, ReportError> {
        request.validate()?;

        let report = match request {
            ReportRequest::StockLevels { include_inactive } => Report::StockLevels(
                self.catalog
                    .list(warehouse_id, *include_inactive)
                    .iter()
                    .map(StockLevelRow::from)
                    .collect(),
            ),
            ReportRequest::MovementHistory { filter } => {
                Report::MovementHistory(self.ledger.query(warehouse_id, filter))
            }
            ReportRequest::MovementSummary { from, to } => {
                Report::MovementSummary(self.summarize(warehouse_id, *from, *to))
            }
            ReportRequest::Alarms { min_level } => Report::Alarms(self.catalog.alarms(warehouse_id, *min_level)),
        };

        tracing::debug!(warehouse_id = %warehouse_id, rows = report.row_count(), "report generated");
        Ok(report)
    }

    fn summarize(
        &self,
        warehouse_id: WarehouseId,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Vec<MovementSummaryRow> {
        let filter = MovementFilter {
            from,
            to,
            limit: Some(usize::MAX),
            ..MovementFilter::default()
        };

        let mut by_product: BTreeMap<ProductId, MovementSummaryRow> = BTreeMap::new();
        for record in self.ledger.query(warehouse_id, &filter) {
            let row = by_product
                .entry(record.product_id)
                .or_insert_with(|| MovementSummaryRow::empty(record.product_id));
            row.movements += 1;
            match record.movement_type {
                MovementType::In => row.total_in = row.total_in.saturating_add(record.quantity),
                MovementType::Out => row.total_out = row.total_out.saturating_add(record.quantity),
                MovementType::Adjustment => {
                    let change = record.net_change().clamp(i64::MIN as i128, i64::MAX as i128) as i64;
                    row.net_adjustment = row.net_adjustment.saturating_add(change);
                }
                MovementType::Transfer => row.transfers += 1,
            }
        }

        let mut rows: Vec<MovementSummaryRow> = by_product
            .into_values()
            .map(|mut row| {
                if let Some(product) = self.catalog.get(warehouse_id, &row.product_id) {
                    row.code = product.code;
                }
                row
            })
            .collect();
        rows.sort_by(|a, b| a.code.cmp(&b.code).then(a.product_id.cmp(&b.product_id)));
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_are_tagged_by_kind() {
        let req: ReportRequest = serde_json::from_str(r#"{"kind":"alarms","min_level":"high"}"#).unwrap();
        assert_eq!(
            req,
            ReportRequest::Alarms {
                min_level: Some(AlarmLevel::High)
            }
        );

        let req: ReportRequest = serde_json::from_str(r#"{"kind":"stock_levels"}"#).unwrap();
        assert_eq!(req, ReportRequest::StockLevels { include_inactive: false });

        let req: ReportRequest =
            serde_json::from_str(r#"{"kind":"movement_history","filter":{"movement_type":"OUT","limit":5}}"#)
                .unwrap();
        assert!(req.validate().is_ok());

        assert!(serde_json::from_str::<ReportRequest>(r#"{"kind":"pie_chart"}"#).is_err());
    }

    #[test]
    fn summary_rejects_inverted_range() {
        let req: ReportRequest = serde_json::from_str(
            r#"{"kind":"movement_summary","from":"2026-05-02T00:00:00Z","to":"2026-05-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert!(matches!(req.validate(), Err(ReportError::InvalidParameters(_))));
    }
}
