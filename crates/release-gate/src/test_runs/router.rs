use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use super::domain::{NewTestRun, TestResultInput, TestRunId, TestRunView};
use super::repository::TestRunRepository;
use super::service::{TestRunAction, TestRunService, TestRunServiceError};
use crate::events::EventStore;
use crate::http::{domain_status, error_response, repository_status};
use crate::tenant::TenantId;

#[derive(Debug, Deserialize)]
pub struct TestRunTransitionRequest {
    pub action: TestRunAction,
}

/// Router builder exposing test run execution endpoints.
pub fn test_run_router<R, E>(service: Arc<TestRunService<R, E>>) -> Router
where
    R: TestRunRepository + 'static,
    E: EventStore + 'static,
{
    Router::new()
        .route(
            "/api/v1/test-runs",
            post(create_handler::<R, E>).get(list_handler::<R, E>),
        )
        .route("/api/v1/test-runs/:run_id", get(fetch_handler::<R, E>))
        .route(
            "/api/v1/test-runs/:run_id/results",
            post(record_handler::<R, E>),
        )
        .route(
            "/api/v1/test-runs/:run_id/transitions",
            post(transition_handler::<R, E>),
        )
        .with_state(service)
}

pub(crate) async fn create_handler<R, E>(
    State(service): State<Arc<TestRunService<R, E>>>,
    tenant: TenantId,
    Json(input): Json<NewTestRun>,
) -> Result<(StatusCode, Json<TestRunView>), TestRunServiceError>
where
    R: TestRunRepository + 'static,
    E: EventStore + 'static,
{
    let run = service.create(&tenant, input)?;
    Ok((StatusCode::CREATED, Json(run.view())))
}

pub(crate) async fn list_handler<R, E>(
    State(service): State<Arc<TestRunService<R, E>>>,
    tenant: TenantId,
) -> Result<Json<Vec<TestRunView>>, TestRunServiceError>
where
    R: TestRunRepository + 'static,
    E: EventStore + 'static,
{
    let runs = service.list(&tenant)?;
    Ok(Json(runs.iter().map(|run| run.view()).collect()))
}

pub(crate) async fn fetch_handler<R, E>(
    State(service): State<Arc<TestRunService<R, E>>>,
    tenant: TenantId,
    Path(run_id): Path<String>,
) -> Result<Json<TestRunView>, TestRunServiceError>
where
    R: TestRunRepository + 'static,
    E: EventStore + 'static,
{
    let run = service.get(&tenant, &TestRunId(run_id))?;
    Ok(Json(run.view()))
}

pub(crate) async fn record_handler<R, E>(
    State(service): State<Arc<TestRunService<R, E>>>,
    tenant: TenantId,
    Path(run_id): Path<String>,
    Json(input): Json<TestResultInput>,
) -> Result<Json<TestRunView>, TestRunServiceError>
where
    R: TestRunRepository + 'static,
    E: EventStore + 'static,
{
    let run = service.record_result(&tenant, &TestRunId(run_id), input)?;
    Ok(Json(run.view()))
}

pub(crate) async fn transition_handler<R, E>(
    State(service): State<Arc<TestRunService<R, E>>>,
    tenant: TenantId,
    Path(run_id): Path<String>,
    Json(request): Json<TestRunTransitionRequest>,
) -> Result<Json<TestRunView>, TestRunServiceError>
where
    R: TestRunRepository + 'static,
    E: EventStore + 'static,
{
    let run = service.apply(&tenant, &TestRunId(run_id), request.action)?;
    Ok(Json(run.view()))
}

impl IntoResponse for TestRunServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            TestRunServiceError::Domain(err) => domain_status(err),
            TestRunServiceError::Repository(err) => repository_status(err),
        };
        error_response(status, self.to_string())
    }
}
