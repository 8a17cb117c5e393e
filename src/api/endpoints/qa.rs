//! Health Q&A endpoints.
//!
//! Collaborator calls block, so each handler hands its work to
//! `spawn_blocking`. The router wraps these routes in a request deadline.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{
    AdviceRequest, AdviceResponse, ApiContext, ChatResponse, PredictionBody, QuestionRequest,
};
use crate::assistant::QaResult;

/// Longest accepted question, in characters.
const MAX_QUESTION_CHARS: usize = 2000;

fn require_question(request: &QuestionRequest) -> Result<String, ApiError> {
    let question = request
        .question
        .as_deref()
        .map(str::trim)
        .unwrap_or_default();
    if question.is_empty() {
        return Err(ApiError::BadRequest(
            "question is required and cannot be empty".into(),
        ));
    }
    if question.chars().count() > MAX_QUESTION_CHARS {
        return Err(ApiError::BadRequest(format!(
            "question too long (max {MAX_QUESTION_CHARS} chars)"
        )));
    }
    Ok(question.to_string())
}

/// `POST /qa_audio`: text answer plus synthesized audio when available.
pub async fn qa_audio(
    State(ctx): State<ApiContext>,
    payload: Result<Json<QuestionRequest>, JsonRejection>,
) -> Result<Json<QaResult>, ApiError> {
    let Json(request) = payload?;
    let question = require_question(&request)?;
    tracing::info!(chars = question.chars().count(), "QA request received");

    let core = ctx.core.clone();
    let result = tokio::task::spawn_blocking(move || {
        let result = core.qa().pipeline_with_context(&question, request.context.as_deref());
        if result.audio_url.is_some() {
            core.enforce_audio_retention();
        }
        result
    })
    .await?;

    if !result.success {
        let reason = result
            .error
            .unwrap_or_else(|| "generation failed".to_string());
        return Err(ApiError::GenerationFailed(reason));
    }
    Ok(Json(result))
}

/// `POST /api/chat`: text-only answer.
pub async fn chat(
    State(ctx): State<ApiContext>,
    payload: Result<Json<QuestionRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(request) = payload?;
    let question = require_question(&request)?;

    let core = ctx.core.clone();
    let asked = question.clone();
    let answer = tokio::task::spawn_blocking(move || {
        core.qa().answers().try_ask(&asked, request.context.as_deref())
    })
    .await?
    .map_err(|e| {
        tracing::error!(error = %e, "Chat generation failed");
        ApiError::GenerationFailed(format!("generation failed: {e}"))
    })?;

    Ok(Json(ChatResponse {
        success: true,
        question,
        answer,
    }))
}

/// `POST /api/health/advice`: predict from `user_data`, then ask for
/// lifestyle advice grounded in the result.
pub async fn advice(
    State(ctx): State<ApiContext>,
    payload: Result<Json<AdviceRequest>, JsonRejection>,
) -> Result<Json<AdviceResponse>, ApiError> {
    let Json(request) = payload?;
    let result = ctx.core.prediction()?.predict(&request.user_data)?;

    let core = ctx.core.clone();
    let for_advice = result.clone();
    let advice = tokio::task::spawn_blocking(move || {
        core.qa().answers().health_advice(&request.user_data, &for_advice)
    })
    .await?;

    Ok(Json(AdviceResponse {
        success: true,
        prediction: PredictionBody::from(&result),
        advice,
    }))
}
