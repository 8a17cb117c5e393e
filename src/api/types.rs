//! Shared types for the HTTP layer.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::api::error::ErrorBody;
use crate::core_state::CoreState;
use crate::prediction::service::FeatureValue;
use crate::prediction::{FeatureImportance, PredictionResult, RiskTier};

// ═══════════════════════════════════════════════════════════
// API context
// ═══════════════════════════════════════════════════════════

/// Router state. Cheap to clone.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        Self { core }
    }
}

// ═══════════════════════════════════════════════════════════
// Requests
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub rows: Vec<Value>,
}

#[derive(Debug, Deserialize)]
pub struct QuestionRequest {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AdviceRequest {
    pub user_data: Map<String, Value>,
}

// ═══════════════════════════════════════════════════════════
// Responses
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Serialize)]
pub struct ClassProbabilities {
    pub healthy: f64,
    pub disease: f64,
}

/// Wire form of a single prediction.
#[derive(Debug, Serialize)]
pub struct PredictionBody {
    pub success: bool,
    pub prediction: u8,
    pub prediction_label: &'static str,
    pub probability: ClassProbabilities,
    pub risk_level: RiskTier,
    pub confidence: f64,
    pub message: &'static str,
}

impl From<&PredictionResult> for PredictionBody {
    fn from(result: &PredictionResult) -> Self {
        Self {
            success: true,
            prediction: result.label,
            prediction_label: result.label_text(),
            probability: ClassProbabilities {
                healthy: result.probability.negative,
                disease: result.probability.positive,
            },
            risk_level: result.risk_tier,
            confidence: result.confidence,
            message: "Prediction succeeded",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub success: bool,
    pub count: usize,
    pub results: Vec<BatchItem>,
}

/// One entry per input row, in input order.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum BatchItem {
    Ok(PredictionBody),
    Err(ErrorBody),
}

#[derive(Debug, Serialize)]
pub struct ExplainResponse {
    #[serde(flatten)]
    pub prediction: PredictionBody,
    pub top_features: Vec<FeatureImportance>,
    pub input_features: Vec<FeatureValue>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub success: bool,
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Serialize)]
pub struct AdviceResponse {
    pub success: bool,
    pub prediction: PredictionBody,
    pub advice: String,
}
