use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::error;

use super::artifacts::ArtifactStore;
use super::batch::{self, BatchError};
use super::domain::{CustomerRecord, ScoringResult};
use super::gateway::ModelInfo;
use super::schema::SchemaRegistry;
use super::service::{ChurnScoringService, ScoringError};

/// Response body for a single scored customer.
#[derive(Debug, Serialize)]
pub struct ScoreResponse {
    pub result: ScoringResult,
    pub model: ModelInfo,
    pub scored_at: DateTime<Utc>,
}

impl ScoreResponse {
    /// Stamp a fresh result with the current time.
    pub fn new(result: ScoringResult, model: ModelInfo) -> Self {
        Self {
            result,
            model,
            scored_at: Utc::now(),
        }
    }
}

/// Router builder exposing the scoring operations over HTTP.
pub fn scoring_router<S>(service: Arc<ChurnScoringService<S>>) -> Router
where
    S: ArtifactStore + 'static,
{
    Router::new()
        .route("/api/v1/churn/score", post(score_handler::<S>))
        .route("/api/v1/churn/batch", post(batch_handler::<S>))
        .route("/api/v1/churn/schema", get(schema_handler))
        .route("/api/v1/churn/model", get(model_handler::<S>))
        .with_state(service)
}

pub(crate) async fn score_handler<S>(
    State(service): State<Arc<ChurnScoringService<S>>>,
    Json(record): Json<CustomerRecord>,
) -> Response
where
    S: ArtifactStore + 'static,
{
    let scored = off_runtime(service, move |service| {
        service
            .score(&record)
            .and_then(|result| service.model_info().map(|model| (result, model)))
    })
    .await;

    match scored {
        Ok(Ok((result, model))) => {
            (StatusCode::OK, Json(ScoreResponse::new(result, model))).into_response()
        }
        Ok(Err(error)) => scoring_error_response(&error),
        Err(response) => response,
    }
}

pub(crate) async fn batch_handler<S>(
    State(service): State<Arc<ChurnScoringService<S>>>,
    body: String,
) -> Response
where
    S: ArtifactStore + 'static,
{
    let scored = off_runtime(service, move |service| {
        batch::score_reader(service, body.as_bytes())
    })
    .await;

    match scored {
        Ok(Ok(report)) => (StatusCode::OK, Json(report)).into_response(),
        Ok(Err(BatchError::Scoring(error))) => scoring_error_response(&error),
        Ok(Err(other)) => {
            let payload = json!({
                "error": other.to_string(),
                "kind": "batch_input",
            });
            (StatusCode::BAD_REQUEST, Json(payload)).into_response()
        }
        Err(response) => response,
    }
}

pub(crate) async fn schema_handler() -> Response {
    (StatusCode::OK, Json(SchemaRegistry::global().describe())).into_response()
}

pub(crate) async fn model_handler<S>(State(service): State<Arc<ChurnScoringService<S>>>) -> Response
where
    S: ArtifactStore + 'static,
{
    match off_runtime(service, |service| service.model_info()).await {
        Ok(Ok(info)) => (StatusCode::OK, Json(info)).into_response(),
        Ok(Err(error)) => scoring_error_response(&error),
        Err(response) => response,
    }
}

/// Scoring may read artifacts from disk on first use, so it runs on the blocking pool.
async fn off_runtime<S, T, F>(
    service: Arc<ChurnScoringService<S>>,
    work: F,
) -> Result<T, Response>
where
    S: ArtifactStore + 'static,
    T: Send + 'static,
    F: FnOnce(&ChurnScoringService<S>) -> T + Send + 'static,
{
    tokio::task::spawn_blocking(move || work(&service))
        .await
        .map_err(|err| {
            error!(error = %err, "scoring task did not complete");
            let payload = json!({
                "error": "scoring task did not complete",
                "kind": "internal",
            });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
        })
}

pub(crate) fn scoring_status(error: &ScoringError) -> StatusCode {
    match error {
        ScoringError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ScoringError::ArtifactNotFound { .. } | ScoringError::InvalidArtifact(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        ScoringError::Inference { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn scoring_error_response(error: &ScoringError) -> Response {
    let mut payload = json!({
        "error": error.to_string(),
        "kind": error.kind(),
    });
    if let ScoringError::Validation(validation) = error {
        payload["field"] = json!(validation.field.name());
    }
    (scoring_status(error), Json(payload)).into_response()
}
