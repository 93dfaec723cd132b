use serde::{Deserialize, Serialize};

use crate::catalog::{FlatType, Town};
use crate::error::PredictError;

/// The model was trained with this value in the `current_year` column.
pub const ASSUMED_CURRENT_YEAR: i32 = 2024;

pub const FLOOR_AREA_RANGE: (f64, f64) = (1.0, 500.0);
pub const LEASE_COMMENCE_RANGE: (i32, i32) = (1960, 2024);
/// Six-digit postal codes held as integers; central-district codes such as
/// `018956` lose their leading zero and sit below 100000.
pub const POSTAL_CODE_RANGE: (u32, u32) = (10_000, 999_999);

/// Unvalidated property details, as submitted by a caller.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PropertyRequest {
    pub floor_area_sqm: f64,
    pub lease_commence_year: i32,
    pub postal_code: u32,
    pub town: String,
    pub flat_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_year: Option<i32>,
}

/// Property details that passed validation and can be encoded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PropertyInput {
    pub floor_area_sqm: f64,
    pub lease_commence_year: i32,
    pub postal_code: u32,
    pub current_year: i32,
    pub town: Town,
    pub flat_type: FlatType,
}

/// Echo of the submitted property returned alongside a prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySummary {
    pub floor_area_sqm: f64,
    pub town: String,
    pub flat_type: String,
    pub lease_commence_year: i32,
    pub postal_code: u32,
    pub assumed_current_year: i32,
}

impl PropertyRequest {
    pub fn validate(&self) -> Result<PropertyInput, PredictError> {
        let (min, max) = FLOOR_AREA_RANGE;
        if !self.floor_area_sqm.is_finite() || self.floor_area_sqm < min || self.floor_area_sqm > max
        {
            return Err(out_of_range("floor_area_sqm", self.floor_area_sqm, min, max));
        }

        check_range(
            "lease_commence_year",
            self.lease_commence_year as f64,
            LEASE_COMMENCE_RANGE.0 as f64,
            LEASE_COMMENCE_RANGE.1 as f64,
        )?;

        check_range(
            "postal_code",
            self.postal_code as f64,
            POSTAL_CODE_RANGE.0 as f64,
            POSTAL_CODE_RANGE.1 as f64,
        )?;

        let current_year = self.current_year.unwrap_or(ASSUMED_CURRENT_YEAR);
        check_range(
            "current_year",
            current_year as f64,
            ASSUMED_CURRENT_YEAR as f64,
            ASSUMED_CURRENT_YEAR as f64,
        )?;

        Ok(PropertyInput {
            floor_area_sqm: self.floor_area_sqm,
            lease_commence_year: self.lease_commence_year,
            postal_code: self.postal_code,
            current_year,
            town: Town::parse(&self.town)?,
            flat_type: FlatType::parse(&self.flat_type)?,
        })
    }
}

impl Default for PropertyRequest {
    /// The values the input form starts with.
    fn default() -> Self {
        PropertyRequest {
            floor_area_sqm: 148.0,
            lease_commence_year: 1992,
            postal_code: 520_329,
            town: Town::AngMoKio.to_string(),
            flat_type: FlatType::ThreeRoom.to_string(),
            current_year: None,
        }
    }
}

impl PropertyInput {
    pub fn summary(&self) -> PropertySummary {
        PropertySummary {
            floor_area_sqm: self.floor_area_sqm,
            town: self.town.to_string(),
            flat_type: self.flat_type.to_string(),
            lease_commence_year: self.lease_commence_year,
            postal_code: self.postal_code,
            assumed_current_year: self.current_year,
        }
    }
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), PredictError> {
    if value < min || value > max {
        return Err(out_of_range(field, value, min, max));
    }
    Ok(())
}

fn out_of_range(field: &'static str, value: f64, min: f64, max: f64) -> PredictError {
    PredictError::OutOfRange {
        field,
        value,
        min,
        max,
    }
}
