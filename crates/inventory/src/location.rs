//! Aisle/shelf locations and per-location stock buckets.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use wareflow_core::DomainError;

/// A storage slot inside the warehouse, written `AISLE/SHELF` (e.g. `A03/2`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StockLocation {
    aisle: String,
    shelf: String,
}

impl StockLocation {
    pub fn new(aisle: impl Into<String>, shelf: impl Into<String>) -> Result<Self, DomainError> {
        let aisle = aisle.into().trim().to_string();
        let shelf = shelf.into().trim().to_string();
        if aisle.is_empty() || shelf.is_empty() {
            return Err(DomainError::validation("location needs both an aisle and a shelf"));
        }
        if aisle.contains('/') || shelf.contains('/') {
            return Err(DomainError::validation("aisle and shelf cannot contain '/'"));
        }
        Ok(Self { aisle, shelf })
    }

    /// Placeholder used by not-yet-created aggregates.
    pub(crate) fn unassigned() -> Self {
        Self {
            aisle: "-".to_string(),
            shelf: "-".to_string(),
        }
    }

    pub fn aisle(&self) -> &str {
        &self.aisle
    }

    pub fn shelf(&self) -> &str {
        &self.shelf
    }
}

impl core::fmt::Display for StockLocation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}/{}", self.aisle, self.shelf)
    }
}

impl core::str::FromStr for StockLocation {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (aisle, shelf) = s
            .split_once('/')
            .ok_or_else(|| DomainError::validation(format!("location '{s}' must look like AISLE/SHELF")))?;
        Self::new(aisle, shelf)
    }
}

impl TryFrom<String> for StockLocation {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<StockLocation> for String {
    fn from(value: StockLocation) -> Self {
        value.to_string()
    }
}

/// Stock of one product: the total plus how it is spread over locations.
///
/// Invariant: the bucket quantities sum to `total`; empty buckets are dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockPosition {
    total: u64,
    primary: StockLocation,
    buckets: BTreeMap<StockLocation, u64>,
}

impl StockPosition {
    /// An empty position whose default location is `primary`.
    pub fn empty(primary: StockLocation) -> Self {
        Self {
            total: 0,
            primary,
            buckets: BTreeMap::new(),
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn primary(&self) -> &StockLocation {
        &self.primary
    }

    pub fn buckets(&self) -> &BTreeMap<StockLocation, u64> {
        &self.buckets
    }

    /// Quantity held at one location (0 if none).
    pub fn at(&self, location: &StockLocation) -> u64 {
        self.buckets.get(location).copied().unwrap_or(0)
    }

    /// Same stock with a different default location.
    pub fn with_primary(mut self, primary: StockLocation) -> Self {
        self.set_primary(primary);
        self
    }

    pub(crate) fn set_primary(&mut self, primary: StockLocation) {
        self.primary = primary;
    }

    pub(crate) fn add(&mut self, location: &StockLocation, quantity: u64) {
        if quantity == 0 {
            return;
        }
        *self.buckets.entry(location.clone()).or_insert(0) += quantity;
        self.total = self.total.saturating_add(quantity);
    }

    pub(crate) fn remove(&mut self, location: &StockLocation, quantity: u64) {
        if quantity == 0 {
            return;
        }
        if let Some(held) = self.buckets.get_mut(location) {
            let taken = quantity.min(*held);
            *held -= taken;
            self.total = self.total.saturating_sub(taken);
            if *held == 0 {
                self.buckets.remove(location);
            }
        }
    }

    pub(crate) fn relocate(&mut self, from: &StockLocation, to: &StockLocation, quantity: u64) {
        let moved = quantity.min(self.at(from));
        self.remove(from, moved);
        self.add(to, moved);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(s: &str) -> StockLocation {
        s.parse().unwrap()
    }

    #[test]
    fn location_parses_and_trims() {
        let l = loc(" A03 / 2 ");
        assert_eq!(l.aisle(), "A03");
        assert_eq!(l.shelf(), "2");
        assert_eq!(l.to_string(), "A03/2");
    }

    #[test]
    fn location_rejects_missing_parts() {
        assert!("A03".parse::<StockLocation>().is_err());
        assert!("/2".parse::<StockLocation>().is_err());
        assert!(StockLocation::new("A", "").is_err());
    }

    #[test]
    fn location_serializes_as_string_map_key() {
        let mut pos = StockPosition::empty(loc("A/1"));
        pos.add(&loc("B/2"), 4);
        let json = serde_json::to_value(&pos).unwrap();
        assert_eq!(json["buckets"]["B/2"], 4);
        let back: StockPosition = serde_json::from_value(json).unwrap();
        assert_eq!(back, pos);
    }

    #[test]
    fn buckets_track_total_and_drop_empties() {
        let a = loc("A/1");
        let b = loc("B/1");
        let mut pos = StockPosition::empty(a.clone());
        pos.add(&a, 10);
        pos.relocate(&a, &b, 4);
        assert_eq!(pos.total(), 10);
        assert_eq!(pos.at(&a), 6);
        assert_eq!(pos.at(&b), 4);

        pos.remove(&a, 6);
        assert_eq!(pos.total(), 4);
        assert!(!pos.buckets().contains_key(&a));
    }
}
