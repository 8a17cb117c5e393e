//! Trained model bundle: classifier + scaler parameters + feature order.
//!
//! The three parts are produced by one training run and are only ever
//! loaded together. `ModelArtifact::new` cross-checks their dimensions so
//! parts from different runs fail loudly instead of predicting garbage.
//!
//! Two on-disk layouts are supported:
//! - `Bundle` (canonical): a single `model_artifact.json`.
//! - `SplitFiles`: `classifier.json`, `scaler.json`, `feature_names.json`
//!   side by side in one directory.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::classifier::{Classifier, ClassifierSpec};
use super::preprocess::StandardScaler;
use super::schema::{FeatureSchema, UnknownKeyPolicy};
use super::PredictionError;

pub const BUNDLE_FILE: &str = "model_artifact.json";
pub const CLASSIFIER_FILE: &str = "classifier.json";
pub const SCALER_FILE: &str = "scaler.json";
pub const FEATURE_NAMES_FILE: &str = "feature_names.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactLayout {
    Bundle,
    SplitFiles,
}

#[derive(Deserialize)]
struct RawArtifact {
    feature_names: Vec<String>,
    scaler: StandardScaler,
    classifier: ClassifierSpec,
}

/// Immutable, validated model bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawArtifact")]
pub struct ModelArtifact {
    feature_names: Vec<String>,
    scaler: StandardScaler,
    classifier: ClassifierSpec,
}

impl ModelArtifact {
    pub fn new(
        feature_names: Vec<String>,
        scaler: StandardScaler,
        classifier: ClassifierSpec,
    ) -> Result<Self, PredictionError> {
        // Reuses schema validation for blank / duplicate names.
        FeatureSchema::new(feature_names.clone(), UnknownKeyPolicy::Ignore)?;

        let n = feature_names.len();
        if scaler.n_features() != n {
            return Err(PredictionError::InvalidArtifact(format!(
                "scaler expects {} features, feature list has {n}",
                scaler.n_features()
            )));
        }
        let model_width = classifier.as_classifier().n_features();
        if model_width != n {
            return Err(PredictionError::InvalidArtifact(format!(
                "classifier expects {model_width} features, feature list has {n}"
            )));
        }
        Ok(Self {
            feature_names,
            scaler,
            classifier,
        })
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_classifier()
    }

    pub fn classifier_spec(&self) -> &ClassifierSpec {
        &self.classifier
    }

    /// Load using an explicit layout. `path` is the bundle file for
    /// `Bundle` and the directory for `SplitFiles`.
    pub fn load(path: &Path, layout: ArtifactLayout) -> Result<Self, PredictionError> {
        let artifact = match layout {
            ArtifactLayout::Bundle => Self::load_bundle(path)?,
            ArtifactLayout::SplitFiles => Self::load_split(path)?,
        };
        tracing::info!(
            path = %path.display(),
            ?layout,
            kind = artifact.classifier().kind(),
            features = artifact.feature_names.len(),
            "Model artifact loaded"
        );
        Ok(artifact)
    }

    /// Load from a model directory, preferring the bundle when both exist.
    pub fn load_auto(dir: &Path) -> Result<Self, PredictionError> {
        let bundle = dir.join(BUNDLE_FILE);
        if bundle.is_file() {
            return Self::load(&bundle, ArtifactLayout::Bundle);
        }
        if dir.join(CLASSIFIER_FILE).is_file() {
            return Self::load(dir, ArtifactLayout::SplitFiles);
        }
        Err(PredictionError::ModelUnavailable(format!(
            "no model artifact found in {}",
            dir.display()
        )))
    }

    fn load_bundle(path: &Path) -> Result<Self, PredictionError> {
        let bytes = fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn load_split(dir: &Path) -> Result<Self, PredictionError> {
        let feature_names: Vec<String> =
            serde_json::from_slice(&fs::read(dir.join(FEATURE_NAMES_FILE))?)?;
        let scaler: StandardScaler = serde_json::from_slice(&fs::read(dir.join(SCALER_FILE))?)?;
        let classifier: ClassifierSpec =
            serde_json::from_slice(&fs::read(dir.join(CLASSIFIER_FILE))?)?;
        Self::new(feature_names, scaler, classifier)
    }

    /// Write the canonical single-file form. Returns the written path.
    pub fn save_bundle(&self, dir: &Path) -> Result<PathBuf, PredictionError> {
        fs::create_dir_all(dir)?;
        let path = dir.join(BUNDLE_FILE);
        fs::write(&path, serde_json::to_vec_pretty(self)?)?;
        Ok(path)
    }

    pub fn save_split(&self, dir: &Path) -> Result<(), PredictionError> {
        fs::create_dir_all(dir)?;
        fs::write(
            dir.join(FEATURE_NAMES_FILE),
            serde_json::to_vec_pretty(&self.feature_names)?,
        )?;
        fs::write(dir.join(SCALER_FILE), serde_json::to_vec_pretty(&self.scaler)?)?;
        fs::write(
            dir.join(CLASSIFIER_FILE),
            serde_json::to_vec_pretty(&self.classifier)?,
        )?;
        Ok(())
    }
}

impl TryFrom<RawArtifact> for ModelArtifact {
    type Error = PredictionError;

    fn try_from(raw: RawArtifact) -> Result<Self, Self::Error> {
        Self::new(raw.feature_names, raw.scaler, raw.classifier)
    }
}
