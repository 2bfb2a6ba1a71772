//! Serialized classifier and scaler artifacts produced by the training pipeline.
//!
//! Both are JSON documents. The model artifact is required; the scaler is optional and, when
//! present, must apply the same element-wise transform the training pipeline used.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use super::schema::SchemaRegistry;
use crate::config::ArtifactConfig;

/// Which of the two artifacts an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Model,
    Scaler,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::Model => f.write_str("model"),
            ArtifactKind::Scaler => f.write_str("scaler"),
        }
    }
}

/// Load-time failures.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("{kind} artifact not found at {}", .path.display())]
    NotFound { kind: ArtifactKind, path: PathBuf },
    #[error("failed to read {kind} artifact at {}", .path.display())]
    Io {
        kind: ArtifactKind,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{kind} artifact is not valid JSON")]
    Parse {
        kind: ArtifactKind,
        #[source]
        source: serde_json::Error,
    },
    #[error("{kind} artifact rejected: {reason}")]
    Invalid { kind: ArtifactKind, reason: String },
}

impl ArtifactError {
    fn invalid(kind: ArtifactKind, reason: impl Into<String>) -> Self {
        Self::Invalid {
            kind,
            reason: reason.into(),
        }
    }
}

/// Failure while applying the scaler or evaluating the classifier.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InferenceFailure {
    #[error("{stage} expects {expected} features, received {found}")]
    DimensionMismatch {
        stage: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("tree {tree} references feature {feature} outside a vector of {width}")]
    FeatureOutOfRange {
        tree: usize,
        feature: usize,
        width: usize,
    },
    #[error("{stage} produced a non-finite value")]
    NonFinite { stage: &'static str },
}

/// Versioned model document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_names: Option<Vec<String>>,
    pub classifier: Classifier,
}

impl ModelArtifact {
    pub fn from_json(raw: &str) -> Result<Self, ArtifactError> {
        let artifact: Self = serde_json::from_str(raw).map_err(|source| ArtifactError::Parse {
            kind: ArtifactKind::Model,
            source,
        })?;
        artifact.validate(SchemaRegistry::global())?;
        Ok(artifact)
    }

    /// Structural checks that do not depend on the vector being scored.
    pub fn validate(&self, registry: &SchemaRegistry) -> Result<(), ArtifactError> {
        if let Some(names) = &self.feature_names {
            let expected = registry.feature_names();
            if names.iter().map(String::as_str).ne(expected.iter().copied()) {
                return Err(ArtifactError::invalid(
                    ArtifactKind::Model,
                    format!("feature_names {names:?} do not match schema order {expected:?}"),
                ));
            }
        }
        self.classifier.validate()
    }

    pub fn predict_proba(&self, features: &[f64]) -> Result<f64, InferenceFailure> {
        self.classifier.predict_proba(features)
    }
}

/// Supported classifier families.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Classifier {
    LogisticRegression {
        coefficients: Vec<f64>,
        intercept: f64,
    },
    RandomForest {
        trees: Vec<DecisionTree>,
    },
}

impl Classifier {
    pub fn kind(&self) -> &'static str {
        match self {
            Classifier::LogisticRegression { .. } => "logistic_regression",
            Classifier::RandomForest { .. } => "random_forest",
        }
    }

    fn validate(&self) -> Result<(), ArtifactError> {
        match self {
            Classifier::LogisticRegression {
                coefficients,
                intercept,
            } => {
                if coefficients.is_empty() {
                    return Err(ArtifactError::invalid(
                        ArtifactKind::Model,
                        "logistic regression has no coefficients",
                    ));
                }
                if !intercept.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
                    return Err(ArtifactError::invalid(
                        ArtifactKind::Model,
                        "logistic regression weights must be finite",
                    ));
                }
                Ok(())
            }
            Classifier::RandomForest { trees } => {
                if trees.is_empty() {
                    return Err(ArtifactError::invalid(
                        ArtifactKind::Model,
                        "random forest has no trees",
                    ));
                }
                trees
                    .iter()
                    .enumerate()
                    .try_for_each(|(index, tree)| tree.validate(index))
            }
        }
    }

    /// Probability of the positive ("will churn") class.
    pub fn predict_proba(&self, features: &[f64]) -> Result<f64, InferenceFailure> {
        let probability = match self {
            Classifier::LogisticRegression {
                coefficients,
                intercept,
            } => {
                if coefficients.len() != features.len() {
                    return Err(InferenceFailure::DimensionMismatch {
                        stage: "logistic regression",
                        expected: coefficients.len(),
                        found: features.len(),
                    });
                }
                let logit = coefficients
                    .iter()
                    .zip(features)
                    .fold(*intercept, |acc, (weight, value)| acc + weight * value);
                sigmoid(logit)
            }
            Classifier::RandomForest { trees } => {
                let mut total = 0.0;
                for (index, tree) in trees.iter().enumerate() {
                    total += tree.leaf_probability(index, features)?;
                }
                total / trees.len() as f64
            }
        };

        if probability.is_finite() {
            Ok(probability.clamp(0.0, 1.0))
        } else {
            Err(InferenceFailure::NonFinite {
                stage: self.kind(),
            })
        }
    }
}

fn sigmoid(logit: f64) -> f64 {
    1.0 / (1.0 + (-logit).exp())
}

/// Flattened binary tree; node 0 is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        probability: f64,
    },
}

impl DecisionTree {
    fn validate(&self, index: usize) -> Result<(), ArtifactError> {
        if self.nodes.is_empty() {
            return Err(ArtifactError::invalid(
                ArtifactKind::Model,
                format!("tree {index} has no nodes"),
            ));
        }

        for (position, node) in self.nodes.iter().enumerate() {
            match node {
                // Children must point forward, which also rules out cycles.
                TreeNode::Split { left, right, .. } => {
                    if *left <= position
                        || *right <= position
                        || *left >= self.nodes.len()
                        || *right >= self.nodes.len()
                    {
                        return Err(ArtifactError::invalid(
                            ArtifactKind::Model,
                            format!("tree {index} node {position} has dangling children"),
                        ));
                    }
                }
                TreeNode::Leaf { probability } => {
                    if !(0.0..=1.0).contains(probability) {
                        return Err(ArtifactError::invalid(
                            ArtifactKind::Model,
                            format!("tree {index} leaf {position} probability out of range"),
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    fn leaf_probability(&self, index: usize, features: &[f64]) -> Result<f64, InferenceFailure> {
        let mut cursor = 0;
        loop {
            match &self.nodes[cursor] {
                TreeNode::Leaf { probability } => return Ok(*probability),
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let value =
                        features
                            .get(*feature)
                            .ok_or(InferenceFailure::FeatureOutOfRange {
                                tree: index,
                                feature: *feature,
                                width: features.len(),
                            })?;
                    cursor = if *value <= *threshold { *left } else { *right };
                }
            }
        }
    }
}

/// Per-feature normalisation fitted at training time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScalerArtifact {
    /// `(x - mean) / scale`
    Standard { mean: Vec<f64>, scale: Vec<f64> },
    /// `x * scale + min`
    MinMax { min: Vec<f64>, scale: Vec<f64> },
}

impl ScalerArtifact {
    pub fn from_json(raw: &str) -> Result<Self, ArtifactError> {
        let scaler: Self = serde_json::from_str(raw).map_err(|source| ArtifactError::Parse {
            kind: ArtifactKind::Scaler,
            source,
        })?;
        scaler.validate()?;
        Ok(scaler)
    }

    pub fn validate(&self) -> Result<(), ArtifactError> {
        let (offsets, scale) = self.parts();
        if offsets.is_empty() || offsets.len() != scale.len() {
            return Err(ArtifactError::invalid(
                ArtifactKind::Scaler,
                format!(
                    "statistics have mismatched lengths ({} vs {})",
                    offsets.len(),
                    scale.len()
                ),
            ));
        }
        if offsets.iter().chain(scale).any(|value| !value.is_finite()) {
            return Err(ArtifactError::invalid(
                ArtifactKind::Scaler,
                "statistics must be finite",
            ));
        }
        Ok(())
    }

    pub fn width(&self) -> usize {
        self.parts().0.len()
    }

    fn parts(&self) -> (&[f64], &[f64]) {
        match self {
            ScalerArtifact::Standard { mean, scale } => (mean.as_slice(), scale.as_slice()),
            ScalerArtifact::MinMax { min, scale } => (min.as_slice(), scale.as_slice()),
        }
    }

    pub fn transform(&self, features: &[f64]) -> Result<Vec<f64>, InferenceFailure> {
        if features.len() != self.width() {
            return Err(InferenceFailure::DimensionMismatch {
                stage: "scaler",
                expected: self.width(),
                found: features.len(),
            });
        }

        let scaled: Vec<f64> = match self {
            ScalerArtifact::Standard { mean, scale } => features
                .iter()
                .zip(mean.iter().zip(scale))
                .map(|(value, (mean, scale))| {
                    // Constant training features carry a zero scale.
                    let scale = if *scale == 0.0 { 1.0 } else { *scale };
                    (value - mean) / scale
                })
                .collect(),
            ScalerArtifact::MinMax { min, scale } => features
                .iter()
                .zip(min.iter().zip(scale))
                .map(|(value, (min, scale))| value * scale + min)
                .collect(),
        };

        if scaled.iter().all(|value| value.is_finite()) {
            Ok(scaled)
        } else {
            Err(InferenceFailure::NonFinite { stage: "scaler" })
        }
    }
}

/// Source of the model/scaler pair. Implementations are called at most once per successful load.
pub trait ArtifactStore: Send + Sync {
    fn load_model(&self) -> Result<ModelArtifact, ArtifactError>;
    /// `Ok(None)` means scoring proceeds without scaling.
    fn load_scaler(&self) -> Result<Option<ScalerArtifact>, ArtifactError>;
    /// Human-readable origin for logs.
    fn describe(&self) -> String;
}

/// Reads artifacts from the filesystem paths in [`ArtifactConfig`].
#[derive(Debug, Clone)]
pub struct FileArtifactStore {
    model_path: PathBuf,
    scaler_path: Option<PathBuf>,
    scaler_required: bool,
}

impl FileArtifactStore {
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            scaler_path: None,
            scaler_required: false,
        }
    }

    pub fn with_scaler(mut self, path: impl Into<PathBuf>, required: bool) -> Self {
        self.scaler_path = Some(path.into());
        self.scaler_required = required;
        self
    }

    pub fn from_config(config: &ArtifactConfig) -> Self {
        let store = Self::new(&config.model_path);
        match &config.scaler_path {
            Some(path) => store.with_scaler(path, config.scaler_required),
            None => store,
        }
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    pub fn scaler_path(&self) -> Option<&Path> {
        self.scaler_path.as_deref()
    }
}

fn read_artifact(kind: ArtifactKind, path: &Path) -> Result<String, ArtifactError> {
    fs::read_to_string(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            ArtifactError::NotFound {
                kind,
                path: path.to_path_buf(),
            }
        } else {
            ArtifactError::Io {
                kind,
                path: path.to_path_buf(),
                source,
            }
        }
    })
}

impl ArtifactStore for FileArtifactStore {
    fn load_model(&self) -> Result<ModelArtifact, ArtifactError> {
        let raw = read_artifact(ArtifactKind::Model, &self.model_path)?;
        ModelArtifact::from_json(&raw)
    }

    fn load_scaler(&self) -> Result<Option<ScalerArtifact>, ArtifactError> {
        let Some(path) = &self.scaler_path else {
            return Ok(None);
        };

        match read_artifact(ArtifactKind::Scaler, path) {
            Ok(raw) => ScalerArtifact::from_json(&raw).map(Some),
            Err(ArtifactError::NotFound { .. }) if !self.scaler_required => {
                tracing::warn!(path = %path.display(), "optional scaler artifact absent; scoring unscaled");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    fn describe(&self) -> String {
        match &self.scaler_path {
            Some(scaler) => format!(
                "model={} scaler={}",
                self.model_path.display(),
                scaler.display()
            ),
            None => format!("model={}", self.model_path.display()),
        }
    }
}

/// Artifacts already held in memory. Counts loads so single initialization can be observed.
#[derive(Debug, Default)]
pub struct InMemoryArtifactStore {
    model: Option<ModelArtifact>,
    scaler: Option<ScalerArtifact>,
    loads: AtomicUsize,
}

impl InMemoryArtifactStore {
    pub fn new(model: ModelArtifact) -> Self {
        Self {
            model: Some(model),
            scaler: None,
            loads: AtomicUsize::new(0),
        }
    }

    /// A store with no model, which always fails to load.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_scaler(mut self, scaler: ScalerArtifact) -> Self {
        self.scaler = Some(scaler);
        self
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl ArtifactStore for InMemoryArtifactStore {
    fn load_model(&self) -> Result<ModelArtifact, ArtifactError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let model = self.model.clone().ok_or_else(|| ArtifactError::NotFound {
            kind: ArtifactKind::Model,
            path: PathBuf::from("<memory>"),
        })?;
        model.validate(SchemaRegistry::global())?;
        Ok(model)
    }

    fn load_scaler(&self) -> Result<Option<ScalerArtifact>, ArtifactError> {
        if let Some(scaler) = &self.scaler {
            scaler.validate()?;
        }
        Ok(self.scaler.clone())
    }

    fn describe(&self) -> String {
        "in-memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forest_json() -> &'static str {
        r#"{
            "name": "forest",
            "version": "1",
            "classifier": {
                "kind": "random_forest",
                "trees": [
                    { "nodes": [
                        { "feature": 14, "threshold": 0.5, "left": 1, "right": 2 },
                        { "probability": 0.8 },
                        { "probability": 0.1 }
                    ] },
                    { "nodes": [
                        { "feature": 4, "threshold": 12.0, "left": 1, "right": 2 },
                        { "probability": 0.6 },
                        { "probability": 0.2 }
                    ] }
                ]
            }
        }"#
    }

    #[test]
    fn random_forest_averages_leaf_probabilities() {
        let artifact = ModelArtifact::from_json(forest_json()).expect("forest parses");
        let mut features = vec![0.0; 19];
        features[14] = 0.0;
        features[4] = 3.0;
        let probability = artifact.predict_proba(&features).expect("scores");
        assert!((probability - 0.7).abs() < 1e-12);

        features[14] = 2.0;
        features[4] = 40.0;
        let probability = artifact.predict_proba(&features).expect("scores");
        assert!((probability - 0.15).abs() < 1e-12);
    }

    #[test]
    fn random_forest_reports_short_vectors() {
        let artifact = ModelArtifact::from_json(forest_json()).expect("forest parses");
        let err = artifact.predict_proba(&[0.0; 3]).expect_err("feature 14 missing");
        assert_eq!(
            err,
            InferenceFailure::FeatureOutOfRange {
                tree: 0,
                feature: 14,
                width: 3
            }
        );
    }

    #[test]
    fn rejects_trees_with_backward_children() {
        let raw = r#"{
            "name": "broken", "version": "1",
            "classifier": { "kind": "random_forest", "trees": [
                { "nodes": [ { "feature": 0, "threshold": 0.5, "left": 0, "right": 1 }, { "probability": 0.5 } ] }
            ] }
        }"#;
        let err = ModelArtifact::from_json(raw).expect_err("cycle rejected");
        assert!(matches!(
            err,
            ArtifactError::Invalid {
                kind: ArtifactKind::Model,
                ..
            }
        ));
    }

    #[test]
    fn rejects_feature_names_out_of_schema_order() {
        let mut names: Vec<String> = SchemaRegistry::global()
            .feature_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        names.sort();
        let artifact = ModelArtifact {
            name: "sorted-names".to_string(),
            version: "1".to_string(),
            feature_names: Some(names),
            classifier: Classifier::LogisticRegression {
                coefficients: vec![0.0; 19],
                intercept: 0.0,
            },
        };
        assert!(artifact.validate(SchemaRegistry::global()).is_err());
    }

    #[test]
    fn standard_scaler_treats_zero_scale_as_identity() {
        let scaler = ScalerArtifact::Standard {
            mean: vec![1.0, 10.0],
            scale: vec![0.0, 5.0],
        };
        let scaled = scaler.transform(&[3.0, 20.0]).expect("same width");
        assert_eq!(scaled, vec![2.0, 2.0]);
    }

    #[test]
    fn min_max_scaler_applies_offset_after_scale() {
        let scaler = ScalerArtifact::from_json(r#"{"kind":"min_max","min":[-1.0],"scale":[0.5]}"#)
            .expect("scaler parses");
        assert_eq!(scaler.transform(&[4.0]).expect("same width"), vec![1.0]);
        assert!(matches!(
            scaler.transform(&[1.0, 2.0]),
            Err(InferenceFailure::DimensionMismatch {
                stage: "scaler",
                expected: 1,
                found: 2
            })
        ));
    }

    #[test]
    fn scaler_lengths_must_agree() {
        let err = ScalerArtifact::from_json(r#"{"kind":"standard","mean":[0.0,1.0],"scale":[1.0]}"#)
            .expect_err("mismatch rejected");
        assert!(matches!(
            err,
            ArtifactError::Invalid {
                kind: ArtifactKind::Scaler,
                ..
            }
        ));
    }

    #[test]
    fn file_store_maps_missing_model_to_not_found() {
        let store = FileArtifactStore::new("/nonexistent/churn/model.json");
        let err = store.load_model().expect_err("model missing");
        assert!(matches!(
            err,
            ArtifactError::NotFound {
                kind: ArtifactKind::Model,
                ..
            }
        ));
    }

    #[test]
    fn file_store_tolerates_missing_optional_scaler() {
        let optional = FileArtifactStore::new("unused.json")
            .with_scaler("/nonexistent/churn/scaler.json", false);
        assert_eq!(optional.load_scaler().expect("optional scaler"), None);

        let required = FileArtifactStore::new("unused.json")
            .with_scaler("/nonexistent/churn/scaler.json", true);
        assert!(matches!(
            required.load_scaler(),
            Err(ArtifactError::NotFound {
                kind: ArtifactKind::Scaler,
                ..
            })
        ));
    }
}
