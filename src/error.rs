use thiserror::Error;

/// Failures surfaced by validation and by the predictor.
#[derive(Debug, Error)]
pub enum PredictError {
    /// The model artifact could not be loaded at startup. Every prediction
    /// fails with this error until the process is restarted.
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    /// The model raised during a single prediction call.
    #[error("inference failed: {0}")]
    InferenceError(String),

    /// The request body could not be read as a property. `status` is the
    /// HTTP status the body extractor chose (400 for syntax, 415 for content
    /// type, 422 for shape).
    #[error("malformed request: {message}")]
    MalformedRequest { status: u16, message: String },

    #[error("unrecognised {field}: {value:?}")]
    InvalidCategory { field: &'static str, value: String },

    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

impl PredictError {
    /// Stable identifier used in JSON error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            PredictError::ModelUnavailable(_) => "model_unavailable",
            PredictError::InferenceError(_) => "inference_error",
            PredictError::MalformedRequest { .. } => "malformed_request",
            PredictError::InvalidCategory { .. } => "invalid_category",
            PredictError::OutOfRange { .. } => "out_of_range",
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            PredictError::InvalidCategory { .. } | PredictError::OutOfRange { .. }
        )
    }
}
