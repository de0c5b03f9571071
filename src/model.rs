//! Data models for the pack calculator.
//!
//! This module defines the values exchanged between the optimizer, the
//! calculation service and the HTTP layer:
//! - `PackSizes`: A validated, descending snapshot of the available pack sizes
//! - `Shipment`: The concrete packs chosen for an order

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Serialize, Serializer};
#[allow(unused_imports)]
use serde_json::json;
use utoipa::ToSchema;

/// Validation error for pack size configurations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("At least one pack size is required")]
    Empty,
    #[error("Pack sizes must be positive, got: {0}")]
    NonPositive(i64),
}

/// Helper function to validate a single pack size.
fn validate_pack_size(value: i64) -> Result<u64, ValidationError> {
    if value <= 0 {
        return Err(ValidationError::NonPositive(value));
    }
    Ok(value as u64)
}

/// Immutable, validated set of pack sizes in descending order.
///
/// Cloning only bumps a reference count, so a `PackSizes` value doubles as
/// the configuration snapshot stored in cache keys.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PackSizes(Arc<[u64]>);

impl PackSizes {
    /// Validates and sorts a raw list of pack sizes.
    ///
    /// # Parameters
    /// * `sizes` - Pack sizes in any order, duplicates allowed
    ///
    /// # Returns
    /// `Ok(PackSizes)` sorted largest first, otherwise the first offending value
    pub fn new(sizes: Vec<i64>) -> Result<Self, ValidationError> {
        if sizes.is_empty() {
            return Err(ValidationError::Empty);
        }

        let mut validated = sizes
            .into_iter()
            .map(validate_pack_size)
            .collect::<Result<Vec<_>, _>>()?;
        validated.sort_unstable_by(|a, b| b.cmp(a));

        Ok(Self(validated.into()))
    }

    /// Largest available pack size (the first element).
    #[inline]
    pub fn largest(&self) -> u64 {
        self.0[0]
    }

    #[inline]
    pub fn as_slice(&self) -> &[u64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Copies the sizes into an owned vector.
    pub fn to_vec(&self) -> Vec<u64> {
        self.0.to_vec()
    }
}

impl Serialize for PackSizes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_slice().serialize(serializer)
    }
}

impl std::fmt::Display for PackSizes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.as_slice())
    }
}

/// The packs shipped for one order.
///
/// # Fields
/// * `packs` - Pack size mapped to the number of packs of that size (never zero)
/// * `total_items` - Sum of size × quantity over all entries
/// * `total_packs` - Sum of all quantities
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({ "packs": { "250": 1, "500": 1 }, "totalItems": 750, "totalPacks": 2 }))]
pub struct Shipment {
    pub packs: BTreeMap<u64, u64>,
    pub total_items: u64,
    pub total_packs: u64,
}

impl Shipment {
    /// Shipment without any packs, used for orders of zero or fewer items.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a shipment from individual packs, deriving both totals.
    pub fn from_packs(packs: impl IntoIterator<Item = u64>) -> Self {
        let mut shipment = Self::empty();
        for size in packs {
            shipment.add_pack(size);
        }
        shipment
    }

    fn add_pack(&mut self, size: u64) {
        *self.packs.entry(size).or_insert(0) += 1;
        self.total_items += size;
        self.total_packs += 1;
    }
}
