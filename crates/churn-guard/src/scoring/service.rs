use std::path::PathBuf;
use tracing::debug;

use super::artifacts::{ArtifactError, ArtifactKind, ArtifactStore, InferenceFailure};
use super::domain::{CustomerRecord, EncodedFeatureVector, ScoringResult};
use super::encoder::{FeatureEncoder, ValidationError};
use super::factors;
use super::gateway::{ModelGateway, ModelInfo};
use super::recommendations;
use super::risk::RiskTier;

/// Service composing the encoder, model gateway, and rule tables into one scoring call.
///
/// Construct one per process and share it (typically behind an `Arc`); the gateway inside holds
/// the only long-lived state.
pub struct ChurnScoringService<S> {
    encoder: FeatureEncoder,
    gateway: ModelGateway<S>,
}

impl<S> ChurnScoringService<S>
where
    S: ArtifactStore,
{
    pub fn new(store: S) -> Self {
        Self {
            encoder: FeatureEncoder::default(),
            gateway: ModelGateway::new(store),
        }
    }

    pub fn gateway(&self) -> &ModelGateway<S> {
        &self.gateway
    }

    pub fn encoder(&self) -> &FeatureEncoder {
        &self.encoder
    }

    pub fn encode(&self, record: &CustomerRecord) -> Result<EncodedFeatureVector, ScoringError> {
        Ok(self.encoder.encode(record)?)
    }

    /// Score a single customer. Records failing validation never reach the model.
    pub fn score(&self, record: &CustomerRecord) -> Result<ScoringResult, ScoringError> {
        let vector = self.encoder.encode(record)?;
        let prediction = self.gateway.score(&vector)?;

        let risk_tier = RiskTier::classify(prediction.probability);
        let factors = factors::analyze(record)
            .into_iter()
            .map(str::to_string)
            .collect();
        let recommendation = recommendations::select(risk_tier);

        debug!(
            probability = prediction.probability,
            label = prediction.label,
            tier = %risk_tier,
            "scored customer"
        );

        Ok(ScoringResult {
            predicted_label: prediction.label,
            probability: prediction.probability,
            risk_tier,
            factors,
            recommendation,
        })
    }

    pub fn warm_up(&self) -> Result<ModelInfo, ScoringError> {
        self.gateway.warm_up()
    }

    pub fn model_info(&self) -> Result<ModelInfo, ScoringError> {
        self.gateway.model_info()
    }

    pub fn is_loaded(&self) -> bool {
        self.gateway.is_loaded()
    }
}

/// Error raised by the scoring service.
#[derive(Debug, thiserror::Error)]
pub enum ScoringError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{kind} artifact not found at {}", .path.display())]
    ArtifactNotFound { kind: ArtifactKind, path: PathBuf },
    #[error("artifact could not be loaded: {0}")]
    InvalidArtifact(#[source] ArtifactError),
    #[error("inference failed for model {model}: {source}")]
    Inference {
        model: String,
        #[source]
        source: InferenceFailure,
    },
}

impl ScoringError {
    /// Stable machine-readable tag used in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            ScoringError::Validation(_) => "validation",
            ScoringError::ArtifactNotFound { .. } => "artifact_not_found",
            ScoringError::InvalidArtifact(_) => "invalid_artifact",
            ScoringError::Inference { .. } => "inference",
        }
    }

    /// Validation failures are the caller's to fix; everything else needs an operator.
    pub fn is_user_correctable(&self) -> bool {
        matches!(self, ScoringError::Validation(_))
    }
}

impl From<ArtifactError> for ScoringError {
    fn from(value: ArtifactError) -> Self {
        match value {
            ArtifactError::NotFound { kind, path } => Self::ArtifactNotFound { kind, path },
            other => Self::InvalidArtifact(other),
        }
    }
}
