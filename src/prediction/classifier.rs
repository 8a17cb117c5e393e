//! Probabilistic binary classifiers consumed through `predict_proba` /
//! `predict`.
//!
//! The service only depends on the `Classifier` trait. Two serializable
//! implementations ship with the crate:
//! - `GradientBoostedTrees`: XGBoost-style `binary:logistic` tree ensemble
//!   (the production model).
//! - `LogisticModel`: a linear model with sigmoid link, handy as a
//!   baseline and for artifacts exported from simpler trainers.

use serde::{Deserialize, Serialize};

use super::PredictionError;

/// Tolerance used when checking `negative + positive == 1`.
pub const PROBABILITY_EPSILON: f64 = 1e-9;

// ═══════════════════════════════════════════════════════════
// Probability pair
// ═══════════════════════════════════════════════════════════

/// `(p_negative, p_positive)`; always sums to 1 within `PROBABILITY_EPSILON`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProbabilityPair {
    pub negative: f64,
    pub positive: f64,
}

impl ProbabilityPair {
    pub fn from_positive(positive: f64) -> Result<Self, PredictionError> {
        if !(0.0..=1.0).contains(&positive) {
            return Err(PredictionError::InvalidProbability(positive));
        }
        Ok(Self {
            negative: 1.0 - positive,
            positive,
        })
    }

    /// Argmax label; a tie at exactly 0.5 resolves to the negative class.
    pub fn label(&self) -> u8 {
        u8::from(self.positive > self.negative)
    }

    pub fn confidence(&self) -> f64 {
        self.negative.max(self.positive)
    }
}

// ═══════════════════════════════════════════════════════════
// Classifier trait
// ═══════════════════════════════════════════════════════════

/// A trained binary classifier over standardized feature vectors.
///
/// Implementations must be pure at call time: the same input always
/// yields the same probabilities and no internal state changes.
pub trait Classifier: Send + Sync + std::fmt::Debug {
    /// Short identifier reported by model-info endpoints.
    fn kind(&self) -> &'static str;

    /// Input width the classifier was trained on.
    fn n_features(&self) -> usize;

    fn predict_proba(&self, x: &[f64]) -> Result<ProbabilityPair, PredictionError>;

    /// Class label at the fixed 0.5 threshold.
    fn predict(&self, x: &[f64]) -> Result<u8, PredictionError> {
        Ok(self.predict_proba(x)?.label())
    }

    /// Relative per-feature importance summing to 1, when the model has one.
    fn feature_importances(&self) -> Option<Vec<f64>> {
        None
    }
}

fn check_width(expected: usize, x: &[f64]) -> Result<(), PredictionError> {
    if x.len() != expected {
        return Err(PredictionError::DimensionMismatch {
            expected,
            actual: x.len(),
        });
    }
    Ok(())
}

fn sigmoid(margin: f64) -> f64 {
    1.0 / (1.0 + (-margin).exp())
}

// ═══════════════════════════════════════════════════════════
// Gradient-boosted trees
// ═══════════════════════════════════════════════════════════

/// One node of a regression tree. Children always sit at higher indices
/// than their parent; node 0 is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        /// Branch taken when the input value is missing (NaN).
        #[serde(default)]
        missing_left: bool,
    },
    Leaf {
        value: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    pub nodes: Vec<TreeNode>,
}

impl RegressionTree {
    pub fn new(nodes: Vec<TreeNode>) -> Self {
        Self { nodes }
    }

    fn validate(&self, tree_index: usize, n_features: usize) -> Result<(), PredictionError> {
        let bad = |msg: String| PredictionError::InvalidArtifact(format!("tree {tree_index}: {msg}"));

        if self.nodes.is_empty() {
            return Err(bad("no nodes".into()));
        }
        for (i, node) in self.nodes.iter().enumerate() {
            match *node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    if feature >= n_features {
                        return Err(bad(format!(
                            "node {i} splits on feature {feature}, model has {n_features}"
                        )));
                    }
                    if !threshold.is_finite() {
                        return Err(bad(format!("node {i} has a non-finite threshold")));
                    }
                    for child in [left, right] {
                        // Forward-only edges rule out cycles.
                        if child <= i || child >= self.nodes.len() {
                            return Err(bad(format!("node {i} has invalid child {child}")));
                        }
                    }
                }
                TreeNode::Leaf { value } => {
                    if !value.is_finite() {
                        return Err(bad(format!("leaf {i} is not finite")));
                    }
                }
            }
        }
        Ok(())
    }

    /// Walk from the root; `x < threshold` goes left, NaN follows
    /// `missing_left`.
    fn leaf_value(&self, x: &[f64]) -> f64 {
        let mut index = 0;
        loop {
            match self.nodes[index] {
                TreeNode::Leaf { value } => return value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    missing_left,
                } => {
                    let value = x[feature];
                    let go_left = if value.is_nan() {
                        missing_left
                    } else {
                        value < threshold
                    };
                    index = if go_left { left } else { right };
                }
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct RawTrees {
    n_features: usize,
    #[serde(default)]
    base_margin: f64,
    trees: Vec<RegressionTree>,
}

/// Additive tree ensemble with a logistic link:
/// `p = sigmoid(base_margin + Σ leaf(tree, x))`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTrees")]
pub struct GradientBoostedTrees {
    n_features: usize,
    base_margin: f64,
    trees: Vec<RegressionTree>,
}

impl GradientBoostedTrees {
    pub fn new(
        n_features: usize,
        base_margin: f64,
        trees: Vec<RegressionTree>,
    ) -> Result<Self, PredictionError> {
        if n_features == 0 {
            return Err(PredictionError::InvalidArtifact(
                "ensemble has zero features".into(),
            ));
        }
        if !base_margin.is_finite() {
            return Err(PredictionError::InvalidArtifact(
                "base margin is not finite".into(),
            ));
        }
        for (i, tree) in trees.iter().enumerate() {
            tree.validate(i, n_features)?;
        }
        Ok(Self {
            n_features,
            base_margin,
            trees,
        })
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Raw log-odds before the sigmoid.
    pub fn margin(&self, x: &[f64]) -> Result<f64, PredictionError> {
        check_width(self.n_features, x)?;
        Ok(self.base_margin + self.trees.iter().map(|t| t.leaf_value(x)).sum::<f64>())
    }
}

impl TryFrom<RawTrees> for GradientBoostedTrees {
    type Error = PredictionError;

    fn try_from(raw: RawTrees) -> Result<Self, Self::Error> {
        Self::new(raw.n_features, raw.base_margin, raw.trees)
    }
}

impl Classifier for GradientBoostedTrees {
    fn kind(&self) -> &'static str {
        "gradient_boosted_trees"
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_proba(&self, x: &[f64]) -> Result<ProbabilityPair, PredictionError> {
        ProbabilityPair::from_positive(sigmoid(self.margin(x)?))
    }

    /// Split-count importance ("weight" in XGBoost terms).
    fn feature_importances(&self) -> Option<Vec<f64>> {
        let mut counts = vec![0.0; self.n_features];
        for tree in &self.trees {
            for node in &tree.nodes {
                if let TreeNode::Split { feature, .. } = node {
                    counts[*feature] += 1.0;
                }
            }
        }
        let total: f64 = counts.iter().sum();
        if total > 0.0 {
            for c in &mut counts {
                *c /= total;
            }
        }
        Some(counts)
    }
}

// ═══════════════════════════════════════════════════════════
// Logistic model
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Deserialize)]
struct RawLogistic {
    coefficients: Vec<f64>,
    intercept: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawLogistic")]
pub struct LogisticModel {
    coefficients: Vec<f64>,
    intercept: f64,
}

impl LogisticModel {
    pub fn new(coefficients: Vec<f64>, intercept: f64) -> Result<Self, PredictionError> {
        if coefficients.is_empty() {
            return Err(PredictionError::InvalidArtifact(
                "logistic model has no coefficients".into(),
            ));
        }
        if !intercept.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
            return Err(PredictionError::InvalidArtifact(
                "logistic model has non-finite weights".into(),
            ));
        }
        Ok(Self {
            coefficients,
            intercept,
        })
    }
}

impl TryFrom<RawLogistic> for LogisticModel {
    type Error = PredictionError;

    fn try_from(raw: RawLogistic) -> Result<Self, Self::Error> {
        Self::new(raw.coefficients, raw.intercept)
    }
}

impl Classifier for LogisticModel {
    fn kind(&self) -> &'static str {
        "logistic_regression"
    }

    fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    fn predict_proba(&self, x: &[f64]) -> Result<ProbabilityPair, PredictionError> {
        check_width(self.coefficients.len(), x)?;
        let margin = self.intercept
            + self
                .coefficients
                .iter()
                .zip(x)
                .map(|(w, v)| w * v)
                .sum::<f64>();
        ProbabilityPair::from_positive(sigmoid(margin))
    }

    /// Normalized absolute coefficients.
    fn feature_importances(&self) -> Option<Vec<f64>> {
        let total: f64 = self.coefficients.iter().map(|c| c.abs()).sum();
        if total == 0.0 {
            return Some(vec![0.0; self.coefficients.len()]);
        }
        Some(self.coefficients.iter().map(|c| c.abs() / total).collect())
    }
}

// ═══════════════════════════════════════════════════════════
// Serialized form
// ═══════════════════════════════════════════════════════════

/// Tagged classifier payload stored inside a model artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifierSpec {
    GradientBoostedTrees(GradientBoostedTrees),
    LogisticRegression(LogisticModel),
}

impl ClassifierSpec {
    pub fn as_classifier(&self) -> &dyn Classifier {
        match self {
            ClassifierSpec::GradientBoostedTrees(m) => m,
            ClassifierSpec::LogisticRegression(m) => m,
        }
    }
}
