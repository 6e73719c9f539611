use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use release_gate::bugs::bug_router;
use release_gate::releases::release_router;
use release_gate::requirements::requirement_router;
use release_gate::test_runs::test_run_router;
use serde_json::json;

use crate::infra::{AppState, Services};

pub(crate) fn with_service_routes(services: &Services) -> Router {
    bug_router(Arc::clone(&services.bugs))
        .merge(test_run_router(Arc::clone(&services.test_runs)))
        .merge(requirement_router(Arc::clone(&services.requirements)))
        .merge(release_router(Arc::clone(&services.releases)))
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    if state.readiness.load(Ordering::Relaxed) {
        (StatusCode::OK, Json(json!({ "status": "ready" })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "initializing" })),
        )
    }
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
