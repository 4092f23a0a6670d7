//! Stock movement recording.
//!
//! `record_movement` validates a requested movement against the product's
//! current stock, then returns the immutable ledger record together with the
//! resulting stock position. Nothing is persisted here: the caller appends the
//! record and the new stock as one event, so either both exist or neither does.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use wareflow_core::{DomainError, UserId};

use crate::location::{StockLocation, StockPosition};
use crate::product::ProductId;

/// Identifier of a movement ledger entry.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MovementId(pub Uuid);

impl MovementId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for MovementId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for MovementId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementType {
    In,
    Out,
    Adjustment,
    Transfer,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::In => "IN",
            MovementType::Out => "OUT",
            MovementType::Adjustment => "ADJUSTMENT",
            MovementType::Transfer => "TRANSFER",
        }
    }
}

impl core::fmt::Display for MovementType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for MovementType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "IN" => Ok(MovementType::In),
            "OUT" => Ok(MovementType::Out),
            "ADJUSTMENT" => Ok(MovementType::Adjustment),
            "TRANSFER" => Ok(MovementType::Transfer),
            other => Err(DomainError::validation(format!(
                "unknown movement type '{other}' (expected IN, OUT, ADJUSTMENT or TRANSFER)"
            ))),
        }
    }
}

/// What the caller wants to happen to the stock.
///
/// ADJUSTMENT always carries the absolute target stock, never a delta.
/// `location` defaults to the product's primary location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementRequest {
    In {
        quantity: u64,
        #[serde(default)]
        location: Option<StockLocation>,
    },
    Out {
        quantity: u64,
        #[serde(default)]
        location: Option<StockLocation>,
    },
    Adjustment {
        target: u64,
        #[serde(default)]
        location: Option<StockLocation>,
    },
    Transfer {
        quantity: u64,
        from: StockLocation,
        to: StockLocation,
    },
}

impl MovementRequest {
    pub fn movement_type(&self) -> MovementType {
        match self {
            MovementRequest::In { .. } => MovementType::In,
            MovementRequest::Out { .. } => MovementType::Out,
            MovementRequest::Adjustment { .. } => MovementType::Adjustment,
            MovementRequest::Transfer { .. } => MovementType::Transfer,
        }
    }
}

/// Free-text metadata attached to a movement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementDetails {
    pub reason: String,
    #[serde(default)]
    pub reason_category: Option<String>,
    #[serde(default)]
    pub comments: Option<String>,
    #[serde(default)]
    pub reference_document: Option<String>,
}

impl MovementDetails {
    pub fn with_reason(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            ..Self::default()
        }
    }
}

/// Who/when/which id for a movement being recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovementStamp {
    pub movement_id: MovementId,
    pub recorded_by: Option<UserId>,
    pub occurred_at: DateTime<Utc>,
}

/// Quantity taken from one bucket by a stock decrease.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketDraw {
    pub location: StockLocation,
    pub quantity: u64,
}

/// Immutable ledger entry. Never updated or deleted once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementRecord {
    pub movement_id: MovementId,
    pub product_id: ProductId,
    pub movement_type: MovementType,
    /// Units moved; for ADJUSTMENT, `|quantity_after - quantity_before|`.
    pub quantity: u64,
    pub quantity_before: u64,
    pub quantity_after: u64,
    /// Bucket touched by IN/OUT/ADJUSTMENT. `None` for TRANSFER, and for an
    /// unlocated decrease that had to span several buckets.
    pub location: Option<StockLocation>,
    /// Buckets a decrease was taken from, in draw order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub drawn_from: Vec<BucketDraw>,
    pub from_location: Option<StockLocation>,
    pub to_location: Option<StockLocation>,
    pub reason: String,
    pub reason_category: Option<String>,
    pub comments: Option<String>,
    pub reference_document: Option<String>,
    pub recorded_by: Option<UserId>,
    pub occurred_at: DateTime<Utc>,
}

impl MovementRecord {
    /// Signed stock change (`quantity_after - quantity_before`).
    pub fn net_change(&self) -> i128 {
        self.quantity_after as i128 - self.quantity_before as i128
    }
}

/// Result of an accepted movement: the record plus the product's new stock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedMovement {
    pub record: MovementRecord,
    pub updated_stock: u64,
    pub position: StockPosition,
}

/// Validate and compute a movement. Rejections happen before any state exists.
pub fn record_movement(
    product_id: ProductId,
    current: &StockPosition,
    request: &MovementRequest,
    details: &MovementDetails,
    stamp: MovementStamp,
) -> Result<RecordedMovement, DomainError> {
    let reason = details.reason.trim();
    if reason.is_empty() {
        return Err(DomainError::validation("reason cannot be empty"));
    }

    let before = current.total();
    let resolve = |l: &Option<StockLocation>| l.clone().unwrap_or_else(|| current.primary().clone());

    let mut drawn_from = Vec::new();
    let (quantity, after, location, from_location, to_location) = match request {
        MovementRequest::In { quantity, location } => {
            ensure_positive(*quantity)?;
            let after = before
                .checked_add(*quantity)
                .ok_or_else(|| DomainError::validation("quantity exceeds the maximum storable stock"))?;
            (*quantity, after, Some(resolve(location)), None, None)
        }
        MovementRequest::Out { quantity, location } => {
            ensure_positive(*quantity)?;
            if *quantity > before {
                return Err(DomainError::validation(format!(
                    "insufficient stock: requested {quantity}, current stock is {before}"
                )));
            }
            drawn_from = plan_draw(current, location.as_ref(), *quantity)?;
            (*quantity, before - quantity, draw_location(&drawn_from), None, None)
        }
        MovementRequest::Adjustment { target, location } => {
            if *target == before {
                return Err(DomainError::validation(format!(
                    "adjustment target equals current stock ({before}); nothing to adjust"
                )));
            }
            let location = if *target < before {
                drawn_from = plan_draw(current, location.as_ref(), before - target)?;
                draw_location(&drawn_from)
            } else {
                Some(resolve(location))
            };
            (before.abs_diff(*target), *target, location, None, None)
        }
        MovementRequest::Transfer { quantity, from, to } => {
            ensure_positive(*quantity)?;
            if from == to {
                return Err(DomainError::validation("transfer source and destination must differ"));
            }
            ensure_bucket(current, from, *quantity)?;
            (*quantity, before, None, Some(from.clone()), Some(to.clone()))
        }
    };

    let record = MovementRecord {
        movement_id: stamp.movement_id,
        product_id,
        movement_type: request.movement_type(),
        quantity,
        quantity_before: before,
        quantity_after: after,
        location,
        drawn_from,
        from_location,
        to_location,
        reason: reason.to_string(),
        reason_category: non_blank(&details.reason_category),
        comments: non_blank(&details.comments),
        reference_document: non_blank(&details.reference_document),
        recorded_by: stamp.recorded_by,
        occurred_at: stamp.occurred_at,
    };

    let position = apply_record(current, &record);
    Ok(RecordedMovement {
        updated_stock: position.total(),
        record,
        position,
    })
}

/// Replay a recorded movement onto a stock position.
pub fn apply_record(current: &StockPosition, record: &MovementRecord) -> StockPosition {
    let mut next = current.clone();
    let location = record.location.as_ref().unwrap_or(current.primary());
    let take = |next: &mut StockPosition| {
        if record.drawn_from.is_empty() {
            next.remove(location, record.quantity);
        }
        for draw in &record.drawn_from {
            next.remove(&draw.location, draw.quantity);
        }
    };

    match record.movement_type {
        MovementType::In => next.add(location, record.quantity),
        MovementType::Out => take(&mut next),
        MovementType::Adjustment => {
            if record.quantity_after >= record.quantity_before {
                next.add(location, record.quantity);
            } else {
                take(&mut next);
            }
        }
        MovementType::Transfer => {
            if let (Some(from), Some(to)) = (&record.from_location, &record.to_location) {
                next.relocate(from, to, record.quantity);
            }
        }
    }

    next
}

fn ensure_positive(quantity: u64) -> Result<(), DomainError> {
    if quantity == 0 {
        return Err(DomainError::validation("quantity must be greater than zero"));
    }
    Ok(())
}

/// Decide which buckets a decrease comes out of.
///
/// An explicit location must cover the whole quantity. Otherwise the primary
/// bucket is drained first, then the remaining buckets in location order.
fn plan_draw(
    current: &StockPosition,
    location: Option<&StockLocation>,
    quantity: u64,
) -> Result<Vec<BucketDraw>, DomainError> {
    if let Some(location) = location {
        ensure_bucket(current, location, quantity)?;
        return Ok(vec![BucketDraw {
            location: location.clone(),
            quantity,
        }]);
    }

    let primary = current.primary();
    let order = std::iter::once((primary, current.at(primary)))
        .chain(current.buckets().iter().filter(|(l, _)| *l != primary).map(|(l, q)| (l, *q)));

    let mut draws = Vec::new();
    let mut remaining = quantity;
    for (location, held) in order {
        if remaining == 0 {
            break;
        }
        let taken = remaining.min(held);
        if taken > 0 {
            draws.push(BucketDraw {
                location: location.clone(),
                quantity: taken,
            });
            remaining -= taken;
        }
    }

    if remaining > 0 {
        return Err(DomainError::validation(format!(
            "insufficient stock across locations: requested {quantity}, short by {remaining}"
        )));
    }
    Ok(draws)
}

fn draw_location(draws: &[BucketDraw]) -> Option<StockLocation> {
    match draws {
        [single] => Some(single.location.clone()),
        _ => None,
    }
}

fn ensure_bucket(current: &StockPosition, location: &StockLocation, quantity: u64) -> Result<(), DomainError> {
    let held = current.at(location);
    if quantity > held {
        return Err(DomainError::validation(format!(
            "insufficient stock at {location}: requested {quantity}, location holds {held}"
        )));
    }
    Ok(())
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use wareflow_core::AggregateId;

    fn loc(s: &str) -> StockLocation {
        s.parse().unwrap()
    }

    fn product() -> ProductId {
        ProductId::new(AggregateId::from_uuid(Uuid::from_u128(7)))
    }

    fn stamp() -> MovementStamp {
        MovementStamp {
            movement_id: MovementId(Uuid::from_u128(1)),
            recorded_by: None,
            occurred_at: Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
        }
    }

    fn stocked(quantity: u64) -> StockPosition {
        let mut pos = StockPosition::empty(loc("A/1"));
        pos.add(&loc("A/1"), quantity);
        pos
    }

    fn record(pos: &StockPosition, req: MovementRequest, reason: &str) -> Result<RecordedMovement, DomainError> {
        record_movement(product(), pos, &req, &MovementDetails::with_reason(reason), stamp())
    }

    #[test]
    fn inbound_adds_quantity() {
        let out = record(&stocked(5), MovementRequest::In { quantity: 3, location: None }, "purchase").unwrap();
        assert_eq!(out.record.quantity_before, 5);
        assert_eq!(out.record.quantity_after, 8);
        assert_eq!(out.updated_stock, 8);
        assert_eq!(out.record.location, Some(loc("A/1")));
    }

    #[test]
    fn outbound_of_entire_stock_reaches_zero() {
        let out = record(&stocked(5), MovementRequest::Out { quantity: 5, location: None }, "sale").unwrap();
        assert_eq!(out.record.quantity_after, 0);
        assert_eq!(out.updated_stock, 0);
        assert!(out.position.buckets().is_empty());
    }

    #[test]
    fn outbound_beyond_stock_is_rejected_with_current_stock_in_message() {
        let pos = stocked(5);
        let err = record(&pos, MovementRequest::Out { quantity: 6, location: None }, "sale").unwrap_err();
        match err {
            DomainError::Validation(msg) => assert!(msg.contains("current stock is 5"), "{msg}"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(pos.total(), 5);
    }

    #[test]
    fn blank_reason_is_rejected_for_every_type() {
        let pos = stocked(5);
        let requests = [
            MovementRequest::In { quantity: 1, location: None },
            MovementRequest::Out { quantity: 1, location: None },
            MovementRequest::Adjustment { target: 2, location: None },
            MovementRequest::Transfer { quantity: 1, from: loc("A/1"), to: loc("B/1") },
        ];
        for req in requests {
            let err = record(&pos, req, "   ").unwrap_err();
            assert_eq!(err, DomainError::validation("reason cannot be empty"));
        }
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let err = record(&stocked(5), MovementRequest::In { quantity: 0, location: None }, "x").unwrap_err();
        assert_eq!(err, DomainError::validation("quantity must be greater than zero"));
    }

    #[test]
    fn adjustment_sets_absolute_target_and_records_magnitude() {
        let down = record(&stocked(10), MovementRequest::Adjustment { target: 7, location: None }, "count").unwrap();
        assert_eq!(down.record.quantity, 3);
        assert_eq!(down.record.quantity_after, 7);
        assert_eq!(down.record.net_change(), -3);

        let up = record(&stocked(10), MovementRequest::Adjustment { target: 12, location: None }, "count").unwrap();
        assert_eq!(up.record.quantity, 2);
        assert_eq!(up.updated_stock, 12);
    }

    #[test]
    fn adjustment_to_same_value_is_rejected() {
        assert!(record(&stocked(4), MovementRequest::Adjustment { target: 4, location: None }, "count").is_err());
    }

    #[test]
    fn transfer_moves_between_buckets_and_keeps_total() {
        let out = record(
            &stocked(10),
            MovementRequest::Transfer { quantity: 4, from: loc("A/1"), to: loc("C/3") },
            "reslot",
        )
        .unwrap();
        assert_eq!(out.record.quantity_before, 10);
        assert_eq!(out.record.quantity_after, 10);
        assert_eq!(out.record.location, None);
        assert_eq!(out.position.at(&loc("A/1")), 6);
        assert_eq!(out.position.at(&loc("C/3")), 4);
    }

    #[test]
    fn transfer_requires_distinct_locations_and_enough_at_source() {
        let pos = stocked(3);
        assert!(record(&pos, MovementRequest::Transfer { quantity: 1, from: loc("A/1"), to: loc("A/1") }, "x").is_err());
        let err = record(&pos, MovementRequest::Transfer { quantity: 4, from: loc("A/1"), to: loc("B/1") }, "x")
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(ref m) if m.contains("location holds 3")));
    }

    #[test]
    fn outbound_from_empty_bucket_is_rejected_even_with_total_stock() {
        let pos = stocked(5);
        let err = record(&pos, MovementRequest::Out { quantity: 1, location: Some(loc("Z/9")) }, "sale").unwrap_err();
        assert!(matches!(err, DomainError::Validation(ref m) if m.contains("Z/9")));
    }

    #[test]
    fn unlocated_outbound_drains_primary_then_other_buckets() {
        let mut pos = stocked(3);
        pos.add(&loc("C/2"), 4);
        pos.add(&loc("B/5"), 2);

        let out = record(&pos, MovementRequest::Out { quantity: 8, location: None }, "sale").unwrap();
        assert_eq!(out.updated_stock, 1);
        assert_eq!(out.record.location, None);
        assert_eq!(
            out.record.drawn_from,
            vec![
                BucketDraw { location: loc("A/1"), quantity: 3 },
                BucketDraw { location: loc("B/5"), quantity: 2 },
                BucketDraw { location: loc("C/2"), quantity: 3 },
            ]
        );
        assert_eq!(out.position.at(&loc("C/2")), 1);
        assert_eq!(apply_record(&pos, &out.record), out.position);
    }

    #[test]
    fn unlocated_decrease_works_when_primary_bucket_is_empty() {
        let pos = stocked(10).with_primary(loc("B/9"));

        let out = record(&pos, MovementRequest::Out { quantity: 5, location: None }, "sale").unwrap();
        assert_eq!(out.record.quantity_after, 5);
        assert_eq!(out.record.location, Some(loc("A/1")));
        assert_eq!(out.position.at(&loc("A/1")), 5);

        let down = record(&pos, MovementRequest::Adjustment { target: 4, location: None }, "count").unwrap();
        assert_eq!(down.position.at(&loc("A/1")), 4);
        assert_eq!(down.updated_stock, 4);
    }

    #[test]
    fn optional_details_are_trimmed_and_blank_dropped() {
        let details = MovementDetails {
            reason: "  sale ".into(),
            reason_category: Some("  ".into()),
            comments: Some(" urgent ".into()),
            reference_document: None,
        };
        let out = record_movement(
            product(),
            &stocked(2),
            &MovementRequest::Out { quantity: 1, location: None },
            &details,
            stamp(),
        )
        .unwrap();
        assert_eq!(out.record.reason, "sale");
        assert_eq!(out.record.reason_category, None);
        assert_eq!(out.record.comments.as_deref(), Some("urgent"));
    }

    #[test]
    fn request_uses_tagged_wire_shape() {
        let req: MovementRequest = serde_json::from_value(serde_json::json!({
            "type": "ADJUSTMENT",
            "target": 3
        }))
        .unwrap();
        assert_eq!(req, MovementRequest::Adjustment { target: 3, location: None });
        assert_eq!("transfer".parse::<MovementType>().unwrap(), MovementType::Transfer);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 500,
                ..ProptestConfig::default()
            })]

            /// Property: IN adds exactly the quantity.
            #[test]
            fn inbound_is_additive(before in 0u64..1_000_000, quantity in 1u64..1_000_000) {
                let out = record(&stocked(before), MovementRequest::In { quantity, location: None }, "in").unwrap();
                prop_assert_eq!(out.record.quantity_after, before + quantity);
            }

            /// Property: OUT is accepted iff it fits, and never goes negative.
            #[test]
            fn outbound_never_goes_negative(before in 0u64..10_000, quantity in 1u64..10_000) {
                let pos = stocked(before);
                match record(&pos, MovementRequest::Out { quantity, location: None }, "out") {
                    Ok(out) => {
                        prop_assert!(quantity <= before);
                        prop_assert_eq!(out.record.quantity_after, before - quantity);
                    }
                    Err(_) => {
                        prop_assert!(quantity > before);
                        prop_assert_eq!(pos.total(), before);
                    }
                }
            }

            /// Property: buckets always sum to the recorded stock.
            #[test]
            fn buckets_sum_to_total(before in 0u64..10_000, target in 0u64..10_000) {
                prop_assume!(before != target);
                let out = record(&stocked(before), MovementRequest::Adjustment { target, location: None }, "count").unwrap();
                let sum: u64 = out.position.buckets().values().sum();
                prop_assert_eq!(sum, out.updated_stock);
                prop_assert_eq!(out.updated_stock, target);
            }
        }
    }
}
