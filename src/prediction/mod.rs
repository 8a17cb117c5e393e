//! Disease-risk prediction: schema validation → standardization →
//! boosted-tree classifier → risk tier.
//!
//! Everything in here is pure with respect to the loaded `ModelArtifact`:
//! the artifact is read-only once loaded and a single `PredictionService`
//! is shared across concurrent requests.

pub mod artifact;
pub mod classifier;
pub mod preprocess;
pub mod risk;
pub mod schema;
pub mod service;

pub use artifact::{ArtifactLayout, ModelArtifact};
pub use classifier::{
    Classifier, ClassifierSpec, GradientBoostedTrees, LogisticModel, ProbabilityPair,
    RegressionTree, TreeNode,
};
pub use preprocess::StandardScaler;
pub use risk::{RiskTier, RiskTierPolicy};
pub use schema::{FeatureSchema, FeatureVector, UnknownKeyPolicy};
pub use service::{Explanation, FeatureImportance, ModelInfo, PredictionResult, PredictionService};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PredictionError {
    #[error("Missing required features: {}", .0.join(", "))]
    MissingFeatures(Vec<String>),

    #[error("Invalid value for feature '{feature}': {reason}")]
    InvalidValue { feature: String, reason: String },

    #[error("Unknown features: {}", .0.join(", "))]
    UnknownFeatures(Vec<String>),

    #[error("Row {index} is not a feature object")]
    InvalidRow { index: usize },

    #[error("Expected {expected} features, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Probability {0} is outside [0, 1]")]
    InvalidProbability(f64),

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Feature {index} has zero variance in the training data")]
    DegenerateFeature { index: usize },

    #[error("Cannot fit on an empty training set")]
    EmptyTrainingSet,

    #[error("Invalid model artifact: {0}")]
    InvalidArtifact(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PredictionError {
    /// Caller-side input problems. Never retried, reported as 4xx.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            PredictionError::MissingFeatures(_)
                | PredictionError::InvalidValue { .. }
                | PredictionError::UnknownFeatures(_)
                | PredictionError::InvalidRow { .. }
        )
    }

    /// Stable machine-readable reason for API clients.
    pub fn code(&self) -> &'static str {
        match self {
            PredictionError::MissingFeatures(_) => "MISSING_FEATURES",
            PredictionError::InvalidValue { .. } => "INVALID_VALUE",
            PredictionError::UnknownFeatures(_) => "UNKNOWN_FEATURES",
            PredictionError::InvalidRow { .. } => "INVALID_ROW",
            PredictionError::ModelUnavailable(_) => "MODEL_UNAVAILABLE",
            _ => "PREDICTION_FAILED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_features_message_lists_all_names() {
        let err = PredictionError::MissingFeatures(vec!["age".into(), "ap_hi".into()]);
        assert_eq!(err.to_string(), "Missing required features: age, ap_hi");
        assert!(err.is_validation());
        assert_eq!(err.code(), "MISSING_FEATURES");
    }

    #[test]
    fn model_unavailable_is_not_validation() {
        let err = PredictionError::ModelUnavailable("not loaded".into());
        assert!(!err.is_validation());
        assert_eq!(err.code(), "MODEL_UNAVAILABLE");
    }
}
