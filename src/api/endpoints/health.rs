//! Liveness and feature-list endpoints.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub model_loaded: bool,
    pub speech_available: bool,
    pub features_count: usize,
    pub version: &'static str,
    pub started_at: String,
}

/// `GET /health`. Always 200; `status` is `"error"` when the model is
/// not loaded.
pub async fn check(State(ctx): State<ApiContext>) -> Json<HealthResponse> {
    let features_count = ctx
        .core
        .prediction()
        .map(|p| p.feature_names().len())
        .unwrap_or(0);
    let model_loaded = ctx.core.is_model_loaded();

    Json(HealthResponse {
        status: if model_loaded { "ok" } else { "error" },
        model_loaded,
        speech_available: ctx.core.qa().speech().is_available(),
        features_count,
        version: crate::config::APP_VERSION,
        started_at: ctx.core.started_at().to_rfc3339(),
    })
}

#[derive(Serialize)]
pub struct FeaturesResponse {
    pub features: Vec<String>,
    pub count: usize,
}

/// `GET /features`: expected input keys, in model order.
pub async fn features(State(ctx): State<ApiContext>) -> Result<Json<FeaturesResponse>, ApiError> {
    let features = ctx.core.prediction()?.feature_names().to_vec();
    Ok(Json(FeaturesResponse {
        count: features.len(),
        features,
    }))
}
