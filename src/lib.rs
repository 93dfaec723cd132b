//! Resale price estimates for Singapore HDB flats.
//!
//! Property details are validated into a [`PropertyInput`], encoded into the
//! fixed 35-column [`FeatureVector`] the regression model was trained on, and
//! passed to a [`PriceModel`]. The raw output is rounded to the nearest
//! thousand dollars.

pub mod api;
pub mod catalog;
pub mod encoder;
pub mod error;
pub mod model;
pub mod predictor;
pub mod property;

pub use catalog::{FlatType, Town};
pub use encoder::{encode, FeatureVector, FEATURE_COUNT};
pub use error::PredictError;
pub use model::{fetch_model_artifact, load_model, PriceModel};
pub use predictor::{format_price, round_price, PredictionResult, Predictor};
pub use property::{PropertyInput, PropertyRequest, PropertySummary};
