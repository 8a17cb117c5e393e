//! Request/response cycle for disease-risk prediction.
//!
//! `FeatureSchema::validate_and_order` → `StandardScaler::transform` →
//! `Classifier::predict_proba` → `RiskTierPolicy::apply`.
//!
//! Validation runs before anything touches the classifier, and a failed
//! step returns the error with no partial result.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use super::artifact::ModelArtifact;
use super::classifier::{Classifier, ClassifierSpec, ProbabilityPair};
use super::preprocess::StandardScaler;
use super::risk::{RiskBand, RiskTier, RiskTierPolicy};
use super::schema::{FeatureSchema, UnknownKeyPolicy};
use super::PredictionError;

/// Number of features reported by `explain`.
const TOP_FEATURES: usize = 5;

// ═══════════════════════════════════════════════════════════
// Result types
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    /// 0 = healthy, 1 = disease.
    pub label: u8,
    pub probability: ProbabilityPair,
    pub risk_tier: RiskTier,
    pub confidence: f64,
}

impl PredictionResult {
    pub fn label_text(&self) -> &'static str {
        if self.label == 1 {
            "disease"
        } else {
            "healthy"
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeatureValue {
    pub feature: String,
    pub value: f64,
}

/// Prediction plus the model's most influential features.
#[derive(Debug, Clone, Serialize)]
pub struct Explanation {
    pub result: PredictionResult,
    pub top_features: Vec<FeatureImportance>,
    pub input_features: Vec<FeatureValue>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub model_type: &'static str,
    pub feature_count: usize,
    pub feature_names: Vec<String>,
    pub risk_tiers: Vec<RiskBand>,
}

// ═══════════════════════════════════════════════════════════
// PredictionService
// ═══════════════════════════════════════════════════════════

/// Stateless at call time; share one instance behind an `Arc`.
#[derive(Debug)]
pub struct PredictionService {
    schema: FeatureSchema,
    scaler: StandardScaler,
    classifier: Arc<dyn Classifier>,
    policy: RiskTierPolicy,
}

impl PredictionService {
    /// Build from a loaded artifact. The artifact's feature order becomes
    /// the schema.
    pub fn from_artifact(
        artifact: ModelArtifact,
        policy: RiskTierPolicy,
        unknown_keys: UnknownKeyPolicy,
    ) -> Result<Self, PredictionError> {
        let schema = FeatureSchema::new(artifact.feature_names().to_vec(), unknown_keys)?;
        let classifier: Arc<dyn Classifier> = match artifact.classifier_spec().clone() {
            ClassifierSpec::GradientBoostedTrees(m) => Arc::new(m),
            ClassifierSpec::LogisticRegression(m) => Arc::new(m),
        };
        Self::from_parts(schema, artifact.scaler().clone(), classifier, policy)
    }

    /// Assemble from individual parts, e.g. a custom `Classifier`.
    pub fn from_parts(
        schema: FeatureSchema,
        scaler: StandardScaler,
        classifier: Arc<dyn Classifier>,
        policy: RiskTierPolicy,
    ) -> Result<Self, PredictionError> {
        let n = schema.len();
        if scaler.n_features() != n || classifier.n_features() != n {
            return Err(PredictionError::InvalidArtifact(format!(
                "schema has {n} features, scaler {}, classifier {}",
                scaler.n_features(),
                classifier.n_features()
            )));
        }
        Ok(Self {
            schema,
            scaler,
            classifier,
            policy,
        })
    }

    pub fn feature_names(&self) -> &[String] {
        self.schema.names()
    }

    pub fn policy(&self) -> &RiskTierPolicy {
        &self.policy
    }

    pub fn model_info(&self) -> ModelInfo {
        ModelInfo {
            model_type: self.classifier.kind(),
            feature_count: self.schema.len(),
            feature_names: self.schema.names().to_vec(),
            risk_tiers: self.policy.bands(),
        }
    }

    pub fn predict(&self, input: &Map<String, Value>) -> Result<PredictionResult, PredictionError> {
        let vector = self.schema.validate_and_order(input)?;
        let scaled = self.scaler.transform(&vector)?;
        self.classify(&scaled)
    }

    fn classify(&self, scaled: &[f64]) -> Result<PredictionResult, PredictionError> {
        let probability = self.classifier.predict_proba(scaled)?;
        let label = self.classifier.predict(scaled)?;
        let risk_tier = self.policy.apply(probability.positive)?;

        tracing::debug!(
            label,
            p_disease = probability.positive,
            tier = %risk_tier,
            "Prediction complete"
        );

        Ok(PredictionResult {
            label,
            probability,
            risk_tier,
            confidence: probability.confidence(),
        })
    }

    /// Predict each row independently.
    ///
    /// The output has the same length and order as `rows`; a failing row
    /// yields an `Err` in its slot and does not affect its neighbours.
    pub fn predict_batch(&self, rows: &[Value]) -> Vec<Result<PredictionResult, PredictionError>> {
        let results: Vec<_> = rows
            .iter()
            .enumerate()
            .map(|(index, row)| match row.as_object() {
                Some(map) => self.predict(map),
                None => Err(PredictionError::InvalidRow { index }),
            })
            .collect();

        let failed = results.iter().filter(|r| r.is_err()).count();
        tracing::info!(rows = rows.len(), failed, "Batch prediction complete");
        results
    }

    /// Prediction plus the top features by model importance.
    pub fn explain(&self, input: &Map<String, Value>) -> Result<Explanation, PredictionError> {
        let vector = self.schema.validate_and_order(input)?;
        let scaled = self.scaler.transform(&vector)?;
        let result = self.classify(&scaled)?;

        let mut top_features: Vec<FeatureImportance> = self
            .classifier
            .feature_importances()
            .unwrap_or_default()
            .into_iter()
            .zip(self.schema.names())
            .map(|(importance, feature)| FeatureImportance {
                feature: feature.clone(),
                importance,
            })
            .collect();
        top_features.sort_by(|a, b| b.importance.total_cmp(&a.importance));
        top_features.truncate(TOP_FEATURES);

        let input_features = vector
            .iter()
            .map(|(feature, value)| FeatureValue {
                feature: feature.to_string(),
                value,
            })
            .collect();

        Ok(Explanation {
            result,
            top_features,
            input_features,
        })
    }
}
