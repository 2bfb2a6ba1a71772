//! Customer churn scoring.
//!
//! Turns a raw [`scoring::CustomerRecord`] into a canonical feature vector, scores it against an
//! externally trained classifier, and packages the probability with a risk tier, the contributing
//! risk factors, and a retention action plan.

pub mod config;
pub mod error;
pub mod scoring;
pub mod telemetry;
