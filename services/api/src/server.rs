use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use release_gate::config::AppConfig;
use release_gate::error::AppError;
use release_gate::memory::MemoryStore;
use release_gate::telemetry;
use tracing::info;

use crate::cli::ServeArgs;
use crate::infra::{AppState, Services};
use crate::routes::with_service_routes;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = MemoryStore::new();
    let services = Services::in_memory(&store, &config.confidence);

    let app = with_service_routes(&services)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        explainer = ?config.confidence.explainer,
        "release gate service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
