//! Prediction endpoints.
//!
//! - `POST /predict`: one feature map
//! - `POST /predict/batch`: `{rows: [...]}`, one result per row
//! - `POST /predict/explain`: prediction plus most influential features

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde_json::{Map, Value};

use crate::api::error::ApiError;
use crate::api::types::{
    ApiContext, BatchItem, BatchRequest, BatchResponse, ExplainResponse, PredictionBody,
};

/// `POST /predict`
pub async fn single(
    State(ctx): State<ApiContext>,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<Json<PredictionBody>, ApiError> {
    let Json(features) = payload?;
    let result = ctx.core.prediction()?.predict(&features)?;
    tracing::info!(
        risk = %result.risk_tier,
        p_disease = result.probability.positive,
        "Prediction served"
    );
    Ok(Json(PredictionBody::from(&result)))
}

/// `POST /predict/batch`: row failures are reported in place; the
/// request itself only fails when the body or the model is unusable.
pub async fn batch(
    State(ctx): State<ApiContext>,
    payload: Result<Json<BatchRequest>, JsonRejection>,
) -> Result<Json<BatchResponse>, ApiError> {
    let Json(request) = payload?;
    let service = ctx.core.prediction()?;

    let results: Vec<BatchItem> = service
        .predict_batch(&request.rows)
        .into_iter()
        .map(|row| match row {
            Ok(result) => BatchItem::Ok(PredictionBody::from(&result)),
            Err(e) => BatchItem::Err(ApiError::from(e).body()),
        })
        .collect();

    Ok(Json(BatchResponse {
        success: true,
        count: results.len(),
        results,
    }))
}

/// `POST /predict/explain`
pub async fn explain(
    State(ctx): State<ApiContext>,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<Json<ExplainResponse>, ApiError> {
    let Json(features) = payload?;
    let explanation = ctx.core.prediction()?.explain(&features)?;
    Ok(Json(ExplainResponse {
        prediction: PredictionBody::from(&explanation.result),
        top_features: explanation.top_features,
        input_features: explanation.input_features,
    }))
}
