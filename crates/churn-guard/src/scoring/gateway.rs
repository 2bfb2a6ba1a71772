use serde::Serialize;
use std::sync::{Mutex, OnceLock, PoisonError};
use tracing::{error, info};

use super::artifacts::{ArtifactStore, InferenceFailure, ModelArtifact, ScalerArtifact};
use super::domain::EncodedFeatureVector;
use super::service::ScoringError;

/// Probabilities at or above this value are labelled as churn.
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Classifier output for one feature vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prediction {
    pub label: u8,
    pub probability: f64,
}

/// Identity of the loaded artifacts, for logs and the model endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelInfo {
    pub name: String,
    pub version: String,
    pub classifier: &'static str,
    pub scaled: bool,
}

struct LoadedArtifacts {
    model: ModelArtifact,
    scaler: Option<ScalerArtifact>,
}

impl LoadedArtifacts {
    fn info(&self) -> ModelInfo {
        ModelInfo {
            name: self.model.name.clone(),
            version: self.model.version.clone(),
            classifier: self.model.classifier.kind(),
            scaled: self.scaler.is_some(),
        }
    }

    fn inference_error(&self, source: InferenceFailure) -> ScoringError {
        error!(model = %self.model.name, version = %self.model.version, %source, "churn inference failed");
        ScoringError::Inference {
            model: format!("{}@{}", self.model.name, self.model.version),
            source,
        }
    }
}

/// Owns the classifier/scaler pair and scores encoded vectors against it.
///
/// Artifacts are loaded on first use and then shared read-only. The load runs under a mutex so
/// concurrent first callers trigger exactly one load; afterwards reads go through the `OnceLock`
/// without locking. A failed load is not remembered, so the next call tries again.
pub struct ModelGateway<S> {
    store: S,
    loaded: OnceLock<LoadedArtifacts>,
    init: Mutex<()>,
}

impl<S> ModelGateway<S>
where
    S: ArtifactStore,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            loaded: OnceLock::new(),
            init: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.get().is_some()
    }

    /// Load eagerly so the first request does not pay for it.
    pub fn warm_up(&self) -> Result<ModelInfo, ScoringError> {
        self.artifacts().map(LoadedArtifacts::info)
    }

    pub fn model_info(&self) -> Result<ModelInfo, ScoringError> {
        self.warm_up()
    }

    /// Scale (when a scaler is loaded) and classify `vector`.
    pub fn score(&self, vector: &EncodedFeatureVector) -> Result<Prediction, ScoringError> {
        let artifacts = self.artifacts()?;

        let scaled;
        let features = match &artifacts.scaler {
            Some(scaler) => {
                scaled = scaler
                    .transform(vector.as_slice())
                    .map_err(|source| artifacts.inference_error(source))?;
                scaled.as_slice()
            }
            None => vector.as_slice(),
        };

        let probability = artifacts
            .model
            .predict_proba(features)
            .map_err(|source| artifacts.inference_error(source))?;

        Ok(Prediction {
            label: u8::from(probability >= DECISION_THRESHOLD),
            probability,
        })
    }

    fn artifacts(&self) -> Result<&LoadedArtifacts, ScoringError> {
        if let Some(loaded) = self.loaded.get() {
            return Ok(loaded);
        }

        let _guard = self.init.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(loaded) = self.loaded.get() {
            return Ok(loaded);
        }

        let loaded = self.load()?;
        Ok(self.loaded.get_or_init(|| loaded))
    }

    fn load(&self) -> Result<LoadedArtifacts, ScoringError> {
        info!(source = %self.store.describe(), "loading churn artifacts");
        let model = self.store.load_model().map_err(|err| {
            error!(error = %err, "churn model artifact unavailable");
            err
        })?;
        let scaler = self.store.load_scaler()?;

        let loaded = LoadedArtifacts { model, scaler };
        let info = loaded.info();
        info!(
            model = %info.name,
            version = %info.version,
            classifier = info.classifier,
            scaled = info.scaled,
            "churn artifacts loaded"
        );
        Ok(loaded)
    }
}
