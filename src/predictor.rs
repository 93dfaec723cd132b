use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::encoder::{encode, FeatureVector};
use crate::error::PredictError;
use crate::model::PriceModel;
use crate::property::{PropertyInput, PropertySummary};

/// Prices are reported to the nearest multiple of this amount.
pub const PRICE_STEP: f64 = 1000.0;

/// Reported evaluation metrics of the trained artifact.
pub const REPORTED_MAE: f64 = 15_749.0;
pub const REPORTED_R2: f64 = 0.982;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub predicted_price: f64,
    pub formatted_price: String,
    pub raw_prediction: f64,
    pub property: PropertySummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub algorithm: String,
    pub available: bool,
    pub detail: String,
    pub mean_absolute_error: f64,
    pub r_squared: f64,
}

/// Process-wide handle on the price model.
///
/// A failed load is remembered rather than retried: every prediction then
/// fails fast with [`PredictError::ModelUnavailable`] without touching a
/// model.
#[derive(Clone)]
pub struct Predictor {
    model: Result<Arc<dyn PriceModel>, String>,
}

impl Predictor {
    pub fn new(model: Arc<dyn PriceModel>) -> Self {
        Predictor { model: Ok(model) }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Predictor {
            model: Err(reason.into()),
        }
    }

    /// Build a predictor from the outcome of loading the artifact.
    pub fn from_load(result: anyhow::Result<Arc<dyn PriceModel>>) -> Self {
        match result {
            Ok(model) => Predictor::new(model),
            Err(e) => {
                tracing::error!(error = ?e, "model could not be loaded");
                Predictor::unavailable(format!("{e:#}"))
            }
        }
    }

    pub fn ensure_available(&self) -> Result<&Arc<dyn PriceModel>, PredictError> {
        self.model
            .as_ref()
            .map_err(|reason| PredictError::ModelUnavailable(reason.clone()))
    }

    pub fn is_available(&self) -> bool {
        self.model.is_ok()
    }

    /// Run the model on one encoded row and return its raw output.
    pub fn predict_raw(&self, features: &FeatureVector) -> Result<f64, PredictError> {
        let model = self.ensure_available()?;

        let output = model
            .predict(std::slice::from_ref(features))
            .map_err(|e| PredictError::InferenceError(format!("{e:#}")))?;

        let raw = output
            .first()
            .copied()
            .ok_or_else(|| PredictError::InferenceError("model returned no output".to_string()))?;

        if !raw.is_finite() {
            return Err(PredictError::InferenceError(format!(
                "model returned a non-finite value: {raw}"
            )));
        }

        Ok(raw as f64)
    }

    #[tracing::instrument(skip(self), fields(town = %input.town, flat_type = %input.flat_type))]
    pub fn predict(&self, input: &PropertyInput) -> Result<PredictionResult, PredictError> {
        self.ensure_available()?;

        let features = encode(input);
        let raw = self.predict_raw(&features)?;
        let price = round_price(raw);

        tracing::debug!(raw, price, "prediction complete");

        Ok(PredictionResult {
            predicted_price: price,
            formatted_price: format_price(price),
            raw_prediction: raw,
            property: input.summary(),
        })
    }

    pub fn info(&self) -> ModelInfo {
        let (available, detail) = match &self.model {
            Ok(model) => (true, model.describe()),
            Err(reason) => (false, reason.clone()),
        };

        ModelInfo {
            algorithm: "XGBoost Regression".to_string(),
            available,
            detail,
            mean_absolute_error: REPORTED_MAE,
            r_squared: REPORTED_R2,
        }
    }
}

/// Round to the nearest [`PRICE_STEP`], ties to even: 412,500 becomes 412,000
/// and 413,500 becomes 414,000.
pub fn round_price(raw: f64) -> f64 {
    (raw / PRICE_STEP).round_ties_even() * PRICE_STEP
}

/// Whole-dollar display with thousands separators, e.g. `$412,000`.
pub fn format_price(price: f64) -> String {
    let rounded = price.round();
    let digits = (rounded.abs() as u64).to_string();
    let chars: Vec<char> = digits.chars().collect();

    let mut result = String::new();
    if rounded < 0.0 {
        result.push('-');
    }
    result.push('$');

    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }

    result
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use rand::Rng;

    use super::*;
    use crate::catalog::{FlatType, Town};
    use crate::encoder::FEATURE_COUNT;

    struct CountingModel {
        output: f32,
        calls: AtomicUsize,
    }

    impl PriceModel for CountingModel {
        fn predict(&self, batch: &[FeatureVector]) -> anyhow::Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(batch.len(), 1);
            assert_eq!(batch[0].len(), FEATURE_COUNT);
            Ok(vec![self.output])
        }

        fn describe(&self) -> String {
            "counting".to_string()
        }
    }

    struct EmptyModel;

    impl PriceModel for EmptyModel {
        fn predict(&self, _batch: &[FeatureVector]) -> anyhow::Result<Vec<f32>> {
            Ok(Vec::new())
        }

        fn describe(&self) -> String {
            "empty".to_string()
        }
    }

    fn input() -> PropertyInput {
        PropertyInput {
            floor_area_sqm: 148.0,
            lease_commence_year: 1992,
            postal_code: 520_329,
            current_year: 2024,
            town: Town::AngMoKio,
            flat_type: FlatType::FourRoom,
        }
    }

    #[test]
    fn rounds_to_nearest_thousand() {
        assert_eq!(round_price(412_374.5), 412_000.0);
        assert_eq!(round_price(412_501.0), 413_000.0);
        assert_eq!(round_price(499.0), 0.0);
    }

    #[test]
    fn ties_round_to_even() {
        assert_eq!(round_price(412_500.0), 412_000.0);
        assert_eq!(round_price(413_500.0), 414_000.0);
        assert_eq!(round_price(500.0), 0.0);
        assert_eq!(round_price(1_500.0), 2_000.0);
    }

    #[test]
    fn rounded_prices_are_multiples_of_a_thousand() {
        let mut rng = rand::thread_rng();
        for _ in 0..1_000 {
            let raw: f64 = rng.gen_range(100_000.0..1_500_000.0);
            let price = round_price(raw);
            assert_eq!(price % 1000.0, 0.0, "raw {raw}");
            assert!((price - raw).abs() <= 500.0);
        }
    }

    #[test]
    fn formats_with_separators() {
        assert_eq!(format_price(412_000.0), "$412,000");
        assert_eq!(format_price(1_250_000.0), "$1,250,000");
        assert_eq!(format_price(0.0), "$0");
        assert_eq!(format_price(999.0), "$999");
    }

    #[test]
    fn predict_rounds_model_output() {
        let model = Arc::new(CountingModel {
            output: 412_374.5,
            calls: AtomicUsize::new(0),
        });
        let predictor = Predictor::new(model.clone());

        let result = predictor.predict(&input()).unwrap();
        assert_eq!(result.predicted_price, 412_000.0);
        assert_eq!(result.formatted_price, "$412,000");
        assert_eq!(result.raw_prediction, 412_374.5);
        assert_eq!(result.property.town, "ANG MO KIO");
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unavailable_model_fails_fast() {
        let predictor = Predictor::unavailable("model file missing");
        match predictor.predict(&input()) {
            Err(PredictError::ModelUnavailable(reason)) => {
                assert_eq!(reason, "model file missing")
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(!predictor.info().available);
    }

    #[test]
    fn failed_load_is_remembered() {
        let predictor = Predictor::from_load(Err(anyhow::anyhow!("bad magic")));
        assert!(!predictor.is_available());
        assert!(matches!(
            predictor.predict(&input()),
            Err(PredictError::ModelUnavailable(_))
        ));
    }

    #[test]
    fn empty_output_is_an_inference_error() {
        let predictor = Predictor::new(Arc::new(EmptyModel));
        assert!(matches!(
            predictor.predict(&input()),
            Err(PredictError::InferenceError(_))
        ));
    }

    #[test]
    fn non_finite_output_is_an_inference_error() {
        let predictor = Predictor::new(Arc::new(CountingModel {
            output: f32::NAN,
            calls: AtomicUsize::new(0),
        }));
        assert!(matches!(
            predictor.predict(&input()),
            Err(PredictError::InferenceError(_))
        ));
    }
}
