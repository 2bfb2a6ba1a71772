use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use churn_guard::scoring::{scoring_router, ArtifactStore, ChurnScoringService};
use serde_json::json;
use std::sync::atomic::Ordering;
use std::sync::Arc;

pub(crate) fn with_scoring_routes<S>(service: Arc<ChurnScoringService<S>>) -> axum::Router
where
    S: ArtifactStore + 'static,
{
    scoring_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Ready once the listener is bound and the artifacts have loaded.
pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let bound = state.readiness.load(Ordering::Acquire);
    let (status, payload) = if !bound {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            json!({ "status": "initializing" }),
        )
    } else if !model_loaded(&state).await {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            json!({ "status": "model_unavailable" }),
        )
    } else {
        (StatusCode::OK, json!({ "status": "ready" }))
    };

    (status, Json(payload))
}

/// Artifact loads may touch the filesystem, so they run on the blocking pool.
async fn model_loaded(state: &AppState) -> bool {
    let model = state.model.clone();
    match tokio::task::spawn_blocking(move || model.ensure_loaded()).await {
        Ok(loaded) => loaded,
        Err(err) => {
            tracing::error!(error = %err, "readiness check did not complete");
            false
        }
    }
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
