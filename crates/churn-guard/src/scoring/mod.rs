//! Customer feature encoding and churn scoring pipeline.
//!
//! Control flow for one request: [`FeatureEncoder`] turns a [`CustomerRecord`] into an
//! [`EncodedFeatureVector`], the [`ModelGateway`] scores it, [`RiskTier::classify`] buckets the
//! probability, [`factors::analyze`] explains it, and [`recommendations::select`] picks the
//! retention playbook. [`ChurnScoringService`] runs all of it.

pub mod artifacts;
pub mod batch;
pub mod domain;
pub mod encoder;
pub mod factors;
pub mod gateway;
pub mod recommendations;
pub mod risk;
pub mod router;
pub mod schema;
pub mod service;

#[cfg(test)]
mod tests;

pub use artifacts::{
    ArtifactError, ArtifactKind, ArtifactStore, Classifier, DecisionTree, FileArtifactStore,
    InMemoryArtifactStore, InferenceFailure, ModelArtifact, ScalerArtifact, TreeNode,
};
pub use batch::{BatchError, BatchOutcome, BatchReport, BatchSummary, TierCounts};
pub use domain::{CustomerRecord, EncodedFeatureVector, RawValue, ScoringResult, SeniorCitizen};
pub use encoder::{FeatureEncoder, ValidationError};
pub use factors::{FactorRule, FACTOR_RULES, STABLE_PROFILE};
pub use gateway::{ModelGateway, ModelInfo, Prediction, DECISION_THRESHOLD};
pub use recommendations::{ActionPlan, RecommendedAction};
pub use risk::RiskTier;
pub use router::{scoring_router, ScoreResponse};
pub use schema::{Field, FieldDescription, FieldDomain, FieldKind, SchemaEntry, SchemaRegistry};
pub use service::{ChurnScoringService, ScoringError};
