//! Builds the numeric row the regression model consumes.
//!
//! Layout (35 columns):
//!
//! | columns | content |
//! |---------|---------|
//! | 0..4    | floor area, lease commencement year, postal code, current year |
//! | 4..30   | one-hot town, in [`Town`] declaration order |
//! | 30..35  | one-hot flat type, in [`FlatType`] declaration order |

use strum::VariantArray;

use crate::catalog::{FlatType, Town};
use crate::property::PropertyInput;

pub const NUMERIC_FEATURES: [&str; 4] = [
    "floor_area_sqm",
    "lease_commence_date",
    "postal_code",
    "current_year",
];

pub const TOWN_OFFSET: usize = NUMERIC_FEATURES.len();
pub const FLAT_TYPE_OFFSET: usize = TOWN_OFFSET + Town::VARIANTS.len();
pub const FEATURE_COUNT: usize = FLAT_TYPE_OFFSET + FlatType::VARIANTS.len();

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector([f32; FEATURE_COUNT]);

impl FeatureVector {
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn town_block(&self) -> &[f32] {
        &self.0[TOWN_OFFSET..FLAT_TYPE_OFFSET]
    }

    pub fn flat_type_block(&self) -> &[f32] {
        &self.0[FLAT_TYPE_OFFSET..]
    }
}

/// Encode a validated property. Pure: identical input gives bit-identical output.
pub fn encode(input: &PropertyInput) -> FeatureVector {
    let mut row = [0.0f32; FEATURE_COUNT];

    row[0] = input.floor_area_sqm as f32;
    row[1] = input.lease_commence_year as f32;
    row[2] = input.postal_code as f32;
    row[3] = input.current_year as f32;

    row[TOWN_OFFSET + input.town.position()] = 1.0;
    row[FLAT_TYPE_OFFSET + input.flat_type.position()] = 1.0;

    FeatureVector(row)
}

/// Column names in model order, with one-hot columns named `town_<literal>`
/// and `flat_type_<literal>`.
pub fn feature_names() -> Vec<String> {
    let mut names: Vec<String> = NUMERIC_FEATURES.iter().map(|n| n.to_string()).collect();
    names.extend(Town::VARIANTS.iter().map(|t| format!("town_{t}")));
    names.extend(FlatType::VARIANTS.iter().map(|f| format!("flat_type_{f}")));
    names
}
