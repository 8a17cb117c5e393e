//! Service and model metadata.

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::prediction::ModelInfo;

/// `GET /api`: service description and route list.
pub async fn index() -> Json<Value> {
    Json(json!({
        "message": "Cardiovascular disease risk prediction API",
        "name": crate::config::APP_NAME,
        "version": crate::config::APP_VERSION,
        "endpoints": {
            "health": "/health",
            "features": "/features",
            "predict": "/predict",
            "predict_batch": "/predict/batch",
            "predict_explain": "/predict/explain",
            "model_info": "/api/model/info",
            "qa_audio": "/qa_audio",
            "chat": "/api/chat",
            "health_advice": "/api/health/advice",
        }
    }))
}

#[derive(Serialize)]
pub struct ModelInfoResponse {
    pub success: bool,
    pub data: ModelInfo,
}

/// `GET /api/model/info`
pub async fn model(State(ctx): State<ApiContext>) -> Result<Json<ModelInfoResponse>, ApiError> {
    let data = ctx.core.prediction()?.model_info();
    Ok(Json(ModelInfoResponse {
        success: true,
        data,
    }))
}
