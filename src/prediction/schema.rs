//! Canonical feature schema: validates an arbitrary JSON feature map and
//! reorders it into the exact vector the model was trained on.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::PredictionError;

/// Features of the cardiovascular dataset, in training column order.
pub const CARDIO_FEATURES: &[&str] = &[
    "age",
    "gender",
    "height",
    "weight",
    "ap_hi",
    "ap_lo",
    "cholesterol",
    "gluc",
    "smoke",
    "alco",
    "active",
];

/// What to do with input keys the schema does not know about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownKeyPolicy {
    /// Drop extraneous keys silently.
    #[default]
    Ignore,
    /// Fail with `UnknownFeatures`.
    Reject,
}

/// Ordered, validated feature values. Only `FeatureSchema` constructs these.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    names: Arc<[String]>,
    values: Vec<f64>,
}

impl FeatureVector {
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// `(name, value)` pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }
}

/// Canonical ordered list of required feature names.
#[derive(Debug, Clone)]
pub struct FeatureSchema {
    names: Arc<[String]>,
    policy: UnknownKeyPolicy,
}

impl FeatureSchema {
    /// Build a schema. Names must be non-empty and unique.
    pub fn new(names: Vec<String>, policy: UnknownKeyPolicy) -> Result<Self, PredictionError> {
        if names.is_empty() {
            return Err(PredictionError::InvalidArtifact(
                "feature schema is empty".into(),
            ));
        }
        let mut seen = HashSet::with_capacity(names.len());
        for name in &names {
            if name.trim().is_empty() {
                return Err(PredictionError::InvalidArtifact(
                    "feature schema contains a blank name".into(),
                ));
            }
            if !seen.insert(name.as_str()) {
                return Err(PredictionError::InvalidArtifact(format!(
                    "duplicate feature name '{name}'"
                )));
            }
        }
        Ok(Self {
            names: names.into(),
            policy,
        })
    }

    /// The eleven-feature cardiovascular schema.
    pub fn cardio(policy: UnknownKeyPolicy) -> Self {
        Self {
            names: CARDIO_FEATURES.iter().map(|s| s.to_string()).collect(),
            policy,
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn policy(&self) -> UnknownKeyPolicy {
        self.policy
    }

    pub fn with_policy(mut self, policy: UnknownKeyPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Validate `input` and return its values in canonical order.
    ///
    /// Every absent name is reported at once. Missing features win over
    /// invalid values; unknown keys are checked last.
    pub fn validate_and_order(
        &self,
        input: &Map<String, Value>,
    ) -> Result<FeatureVector, PredictionError> {
        let missing: Vec<String> = self
            .names
            .iter()
            .filter(|name| !input.contains_key(name.as_str()))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(PredictionError::MissingFeatures(missing));
        }

        let mut values = Vec::with_capacity(self.names.len());
        for name in self.names.iter() {
            let value = coerce_number(name, &input[name.as_str()])?;
            values.push(value);
        }

        if self.policy == UnknownKeyPolicy::Reject {
            let known: HashSet<&str> = self.names.iter().map(String::as_str).collect();
            let mut unknown: Vec<String> = input
                .keys()
                .filter(|k| !known.contains(k.as_str()))
                .cloned()
                .collect();
            if !unknown.is_empty() {
                unknown.sort();
                return Err(PredictionError::UnknownFeatures(unknown));
            }
        }

        Ok(FeatureVector {
            names: Arc::clone(&self.names),
            values,
        })
    }

    /// Wrap already-ordered values (training rows, tests).
    pub fn vector_from_values(&self, values: Vec<f64>) -> Result<FeatureVector, PredictionError> {
        if values.len() != self.names.len() {
            return Err(PredictionError::DimensionMismatch {
                expected: self.names.len(),
                actual: values.len(),
            });
        }
        if let Some(i) = values.iter().position(|v| !v.is_finite()) {
            return Err(PredictionError::InvalidValue {
                feature: self.names[i].clone(),
                reason: "value is not finite".into(),
            });
        }
        Ok(FeatureVector {
            names: Arc::clone(&self.names),
            values,
        })
    }
}

fn coerce_number(feature: &str, value: &Value) -> Result<f64, PredictionError> {
    let invalid = |reason: &str| PredictionError::InvalidValue {
        feature: feature.to_string(),
        reason: reason.to_string(),
    };

    let number = match value {
        Value::Null => return Err(invalid("value is null")),
        Value::Number(n) => n.as_f64().ok_or_else(|| invalid("not representable as f64"))?,
        // Form posts often carry numbers as strings.
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| invalid("not a number"))?,
        Value::Bool(_) => return Err(invalid("expected a number, got a boolean")),
        Value::Array(_) => return Err(invalid("expected a number, got an array")),
        Value::Object(_) => return Err(invalid("expected a number, got an object")),
    };

    if !number.is_finite() {
        return Err(invalid("value is not finite"));
    }
    Ok(number)
}
