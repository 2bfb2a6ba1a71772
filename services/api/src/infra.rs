use clap::Args;
use churn_guard::config::{AppConfig, ArtifactConfig};
use churn_guard::error::AppError;
use churn_guard::scoring::{
    ArtifactStore, ChurnScoringService, Classifier, FileArtifactStore, InMemoryArtifactStore,
    ModelArtifact, ScalerArtifact, SchemaRegistry,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) model: Arc<dyn ModelProbe>,
}

/// Lets the readiness probe check artifacts without knowing the store type.
pub(crate) trait ModelProbe: Send + Sync {
    /// Load the artifacts if needed and report whether scoring can proceed.
    fn ensure_loaded(&self) -> bool;
}

impl<S> ModelProbe for ChurnScoringService<S>
where
    S: ArtifactStore,
{
    fn ensure_loaded(&self) -> bool {
        self.is_loaded() || self.warm_up().is_ok()
    }
}

/// Artifact overrides shared by the offline commands.
#[derive(Args, Debug, Default)]
pub(crate) struct ArtifactArgs {
    /// Model artifact path (overrides CHURN_MODEL_PATH)
    #[arg(long)]
    pub(crate) model: Option<PathBuf>,
    /// Scaler artifact path (overrides CHURN_SCALER_PATH)
    #[arg(long)]
    pub(crate) scaler: Option<PathBuf>,
    /// Score unscaled even when a scaler is configured
    #[arg(long, conflicts_with = "scaler")]
    pub(crate) no_scaler: bool,
}

impl ArtifactArgs {
    pub(crate) fn store(&self) -> Result<FileArtifactStore, AppError> {
        let config = AppConfig::load()?;
        Ok(FileArtifactStore::from_config(&self.apply(config.artifacts)))
    }

    fn apply(&self, mut config: ArtifactConfig) -> ArtifactConfig {
        if let Some(model) = &self.model {
            config.model_path = model.clone();
        }
        if let Some(scaler) = &self.scaler {
            config.scaler_path = Some(scaler.clone());
        }
        if self.no_scaler {
            config.scaler_path = None;
        }
        config
    }
}

const REFERENCE_COEFFICIENTS: [f64; 19] = [
    -0.02, 0.09, -0.01, -0.08, -1.30, -0.08, 0.10, 0.18, -0.22, -0.10, -0.03, -0.20, 0.05, 0.06,
    -0.72, 0.18, 0.12, 0.75, 0.55,
];
const REFERENCE_INTERCEPT: f64 = -1.55;

const REFERENCE_MEAN: [f64; 19] = [
    0.505, 0.162, 0.483, 0.300, 32.37, 0.903, 0.941, 0.872, 0.790, 0.906, 0.904, 0.797, 0.985,
    0.992, 0.690, 0.592, 1.574, 64.76, 2279.73,
];
const REFERENCE_SCALE: [f64; 19] = [
    0.500, 0.369, 0.500, 0.458, 24.56, 0.296, 0.949, 0.737, 0.860, 0.880, 0.880, 0.861, 0.885,
    0.885, 0.834, 0.491, 1.068, 30.09, 2266.63,
];

/// Standardised logistic regression fitted on the public telecom export, kept in memory so the
/// demo runs without artifact files.
pub(crate) fn reference_store() -> InMemoryArtifactStore {
    let feature_names = SchemaRegistry::global()
        .feature_names()
        .into_iter()
        .map(str::to_string)
        .collect();

    let model = ModelArtifact {
        name: "reference-logreg".to_string(),
        version: "demo".to_string(),
        feature_names: Some(feature_names),
        classifier: Classifier::LogisticRegression {
            coefficients: REFERENCE_COEFFICIENTS.to_vec(),
            intercept: REFERENCE_INTERCEPT,
        },
    };
    let scaler = ScalerArtifact::Standard {
        mean: REFERENCE_MEAN.to_vec(),
        scale: REFERENCE_SCALE.to_vec(),
    };

    InMemoryArtifactStore::new(model).with_scaler(scaler)
}
