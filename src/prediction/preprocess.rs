//! Per-feature standardization, fitted once at training time and applied
//! unchanged at serving time.

use serde::{Deserialize, Serialize};

use super::schema::FeatureVector;
use super::PredictionError;

/// Serialized scaler parameters (`mean[i]`, `std[i]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    pub mean: Vec<f64>,
    pub std: Vec<f64>,
}

/// Fitted `(x - mean) / std` transform.
///
/// Construction guarantees equal lengths, finite means and strictly
/// positive finite stds, so `transform` never divides by zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ScalerParams", into = "ScalerParams")]
pub struct StandardScaler {
    mean: Vec<f64>,
    std: Vec<f64>,
}

impl StandardScaler {
    /// Fit population mean / std (ddof = 0) over training rows.
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self, PredictionError> {
        let first = rows.first().ok_or(PredictionError::EmptyTrainingSet)?;
        let width = first.len();
        if width == 0 {
            return Err(PredictionError::EmptyTrainingSet);
        }

        for (i, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(PredictionError::InvalidArtifact(format!(
                    "training row {i} has {} values, expected {width}",
                    row.len()
                )));
            }
            if let Some(j) = row.iter().position(|v| !v.is_finite()) {
                return Err(PredictionError::InvalidArtifact(format!(
                    "training row {i} has a non-finite value in column {j}"
                )));
            }
        }

        let n = rows.len() as f64;
        let mut mean = vec![0.0; width];
        for row in rows {
            for (m, x) in mean.iter_mut().zip(row) {
                *m += x;
            }
        }
        for m in &mut mean {
            *m /= n;
        }

        let mut var = vec![0.0; width];
        for row in rows {
            for ((v, x), m) in var.iter_mut().zip(row).zip(&mean) {
                let d = x - m;
                *v += d * d;
            }
        }

        let mut std = Vec::with_capacity(width);
        for (index, v) in var.into_iter().enumerate() {
            let s = (v / n).sqrt();
            if s == 0.0 {
                return Err(PredictionError::DegenerateFeature { index });
            }
            std.push(s);
        }

        tracing::debug!(rows = rows.len(), features = width, "Scaler fitted");
        Ok(Self { mean, std })
    }

    /// Rebuild from stored parameters, enforcing the same invariants as `fit`.
    pub fn from_parameters(mean: Vec<f64>, std: Vec<f64>) -> Result<Self, PredictionError> {
        if mean.len() != std.len() {
            return Err(PredictionError::InvalidArtifact(format!(
                "scaler has {} means but {} stds",
                mean.len(),
                std.len()
            )));
        }
        if mean.is_empty() {
            return Err(PredictionError::InvalidArtifact("scaler is empty".into()));
        }
        if mean.iter().any(|m| !m.is_finite()) {
            return Err(PredictionError::InvalidArtifact(
                "scaler mean is not finite".into(),
            ));
        }
        if let Some(index) = std.iter().position(|s| !(s.is_finite() && *s > 0.0)) {
            return Err(PredictionError::DegenerateFeature { index });
        }
        Ok(Self { mean, std })
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn std(&self) -> &[f64] {
        &self.std
    }

    pub fn transform(&self, vector: &FeatureVector) -> Result<Vec<f64>, PredictionError> {
        self.transform_values(vector.values())
    }

    pub fn transform_values(&self, values: &[f64]) -> Result<Vec<f64>, PredictionError> {
        if values.len() != self.mean.len() {
            return Err(PredictionError::DimensionMismatch {
                expected: self.mean.len(),
                actual: values.len(),
            });
        }
        Ok(values
            .iter()
            .zip(self.mean.iter().zip(&self.std))
            .map(|(x, (m, s))| (x - m) / s)
            .collect())
    }
}

impl TryFrom<ScalerParams> for StandardScaler {
    type Error = PredictionError;

    fn try_from(params: ScalerParams) -> Result<Self, Self::Error> {
        Self::from_parameters(params.mean, params.std)
    }
}

impl From<StandardScaler> for ScalerParams {
    fn from(scaler: StandardScaler) -> Self {
        ScalerParams {
            mean: scaler.mean,
            std: scaler.std,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_computes_population_statistics() {
        let rows = vec![vec![1.0, 10.0], vec![3.0, 20.0], vec![5.0, 30.0]];
        let scaler = StandardScaler::fit(&rows).unwrap();
        assert_eq!(scaler.mean(), &[3.0, 20.0]);
        let expected = (8.0f64 / 3.0).sqrt();
        assert!((scaler.std()[0] - expected).abs() < 1e-12);
        assert!((scaler.std()[1] - 5.0 * expected).abs() < 1e-12);
    }

    #[test]
    fn transform_standardizes() {
        let scaler = StandardScaler::from_parameters(vec![2.0, 0.0], vec![2.0, 0.5]).unwrap();
        let out = scaler.transform_values(&[6.0, -1.0]).unwrap();
        assert_eq!(out, vec![2.0, -2.0]);
    }

    #[test]
    fn transform_is_reproducible() {
        let scaler = StandardScaler::fit(&[vec![0.3, 7.1], vec![1.9, 2.2], vec![0.7, 5.5]]).unwrap();
        let a = scaler.transform_values(&[0.41, 3.33]).unwrap();
        let b = scaler.transform_values(&[0.41, 3.33]).unwrap();
        assert_eq!(
            a.iter().map(|v| v.to_bits()).collect::<Vec<_>>(),
            b.iter().map(|v| v.to_bits()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn constant_column_is_degenerate() {
        let rows = vec![vec![1.0, 4.0], vec![2.0, 4.0]];
        assert!(matches!(
            StandardScaler::fit(&rows),
            Err(PredictionError::DegenerateFeature { index: 1 })
        ));
    }

    #[test]
    fn fit_rejects_empty_and_ragged_rows() {
        assert!(matches!(
            StandardScaler::fit(&[]),
            Err(PredictionError::EmptyTrainingSet)
        ));
        assert!(StandardScaler::fit(&[vec![1.0, 2.0], vec![1.0]]).is_err());
        assert!(StandardScaler::fit(&[vec![1.0], vec![f64::NAN]]).is_err());
    }

    #[test]
    fn stored_parameters_validated() {
        assert!(StandardScaler::from_parameters(vec![0.0], vec![0.0]).is_err());
        assert!(StandardScaler::from_parameters(vec![0.0, 1.0], vec![1.0]).is_err());
        assert!(StandardScaler::from_parameters(vec![0.0], vec![-1.0]).is_err());
    }

    #[test]
    fn dimension_mismatch_rejected() {
        let scaler = StandardScaler::from_parameters(vec![0.0, 0.0], vec![1.0, 1.0]).unwrap();
        assert!(matches!(
            scaler.transform_values(&[1.0]),
            Err(PredictionError::DimensionMismatch { expected: 2, actual: 1 })
        ));
    }

    #[test]
    fn deserialization_enforces_invariants() {
        let ok: StandardScaler = serde_json::from_str(r#"{"mean":[1.0],"std":[2.0]}"#).unwrap();
        assert_eq!(ok.n_features(), 1);
        let bad = serde_json::from_str::<StandardScaler>(r#"{"mean":[1.0],"std":[0.0]}"#);
        assert!(bad.is_err());
    }
}
