use std::net::SocketAddr;

use anyhow::Context;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use crate::catalog::{flat_type_names, town_names};
use crate::encoder::feature_names;
use crate::error::PredictError;
use crate::predictor::{ModelInfo, PredictionResult, Predictor};
use crate::property::{
    PropertyRequest, ASSUMED_CURRENT_YEAR, FLOOR_AREA_RANGE, LEASE_COMMENCE_RANGE,
    POSTAL_CODE_RANGE,
};

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for PredictError {
    fn into_response(self) -> Response {
        let status_code = match &self {
            e if e.is_validation() => StatusCode::UNPROCESSABLE_ENTITY,
            PredictError::MalformedRequest { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_REQUEST)
            }
            PredictError::InferenceError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            PredictError::ModelUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            PredictError::InvalidCategory { .. } | PredictError::OutOfRange { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
        };

        (
            status_code,
            Json(ErrorResponse {
                error: self.kind().to_string(),
                message: self.to_string(),
            }),
        )
            .into_response()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NumericBounds<T> {
    pub min: T,
    pub max: T,
    pub default: T,
}

/// Everything a client needs to render the input form.
#[derive(Debug, Serialize, Deserialize)]
pub struct FormOptions {
    pub towns: Vec<String>,
    pub flat_types: Vec<String>,
    pub floor_area_sqm: NumericBounds<f64>,
    pub lease_commence_year: NumericBounds<i32>,
    pub postal_code: NumericBounds<u32>,
    pub current_year: i32,
}

pub fn router(predictor: Predictor) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/predict", post(predict_handler))
        .route("/options", get(options_handler))
        .route("/features", get(features_handler))
        .route("/model", get(model_handler))
        .with_state(predictor)
        .layer(TraceLayer::new_for_http())
}

pub async fn serve(addr: SocketAddr, predictor: Predictor) -> anyhow::Result<()> {
    let app = router(predictor);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("could not bind {addr}"))?;
    tracing::info!("service is up and running on {}", addr);

    axum::serve(listener, app)
        .await
        .context("error running service")
}

async fn health_handler() -> String {
    "healthy".to_string()
}

#[tracing::instrument(skip(predictor))]
async fn predict_handler(
    State(predictor): State<Predictor>,
    body: Result<Json<PropertyRequest>, JsonRejection>,
) -> Result<Json<PredictionResult>, PredictError> {
    let Json(request) = body.map_err(|rejection| {
        tracing::warn!(error = %rejection.body_text(), "unreadable prediction request");
        PredictError::MalformedRequest {
            status: rejection.status().as_u16(),
            message: rejection.body_text(),
        }
    })?;

    let input = request.validate().inspect_err(|e| {
        tracing::warn!(error = %e, "rejected prediction request");
    })?;

    let result = predictor.predict(&input).inspect_err(|e| {
        tracing::error!(error = %e, "prediction failed");
    })?;

    Ok(Json(result))
}

async fn options_handler() -> Json<FormOptions> {
    let defaults = PropertyRequest::default();

    Json(FormOptions {
        towns: town_names().into_iter().map(String::from).collect(),
        flat_types: flat_type_names().into_iter().map(String::from).collect(),
        floor_area_sqm: NumericBounds {
            min: FLOOR_AREA_RANGE.0,
            max: FLOOR_AREA_RANGE.1,
            default: defaults.floor_area_sqm,
        },
        lease_commence_year: NumericBounds {
            min: LEASE_COMMENCE_RANGE.0,
            max: LEASE_COMMENCE_RANGE.1,
            default: defaults.lease_commence_year,
        },
        postal_code: NumericBounds {
            min: POSTAL_CODE_RANGE.0,
            max: POSTAL_CODE_RANGE.1,
            default: defaults.postal_code,
        },
        current_year: ASSUMED_CURRENT_YEAR,
    })
}

async fn features_handler() -> Json<Vec<String>> {
    Json(feature_names())
}

async fn model_handler(State(predictor): State<Predictor>) -> Json<ModelInfo> {
    Json(predictor.info())
}
