use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::with_scoring_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use churn_guard::config::AppConfig;
use churn_guard::error::AppError;
use churn_guard::scoring::{ChurnScoringService, FileArtifactStore};
use churn_guard::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let store = FileArtifactStore::from_config(&config.artifacts);
    let service = Arc::new(ChurnScoringService::new(store));
    // Keep serving without artifacts: requests report 503 and the next one retries the load.
    match service.warm_up() {
        Ok(model) => info!(model = %model.name, version = %model.version, "churn model ready"),
        Err(err) => warn!(error = %err, "churn model not loaded at startup"),
    }

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        model: service.clone(),
    };

    let app = with_scoring_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "churn scoring service listening");

    axum::serve(listener, app).await?;
    Ok(())
}
