use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use super::domain::{BugId, BugView, NewBug, TriageUpdate};
use super::repository::BugRepository;
use super::service::{BugAction, BugService, BugServiceError};
use super::triage::{BugPriority, BugSeverity};
use crate::events::EventStore;
use crate::http::{domain_status, error_response, repository_status};
use crate::tenant::TenantId;

#[derive(Debug, Deserialize)]
pub struct TriageRequest {
    pub severity: BugSeverity,
    pub priority: BugPriority,
    pub assigned_to: String,
}

#[derive(Debug, Deserialize)]
pub struct BugTransitionRequest {
    pub action: BugAction,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Router builder exposing bug intake, triage, and lifecycle endpoints.
pub fn bug_router<R, E>(service: Arc<BugService<R, E>>) -> Router
where
    R: BugRepository + 'static,
    E: EventStore + 'static,
{
    Router::new()
        .route(
            "/api/v1/bugs",
            post(create_handler::<R, E>).get(list_handler::<R, E>),
        )
        .route("/api/v1/bugs/:bug_id", get(fetch_handler::<R, E>))
        .route(
            "/api/v1/bugs/:bug_id/triage",
            post(triage_handler::<R, E>).patch(update_triage_handler::<R, E>),
        )
        .route(
            "/api/v1/bugs/:bug_id/transitions",
            post(transition_handler::<R, E>),
        )
        .with_state(service)
}

pub(crate) async fn create_handler<R, E>(
    State(service): State<Arc<BugService<R, E>>>,
    tenant: TenantId,
    Json(input): Json<NewBug>,
) -> Result<(StatusCode, Json<BugView>), BugServiceError>
where
    R: BugRepository + 'static,
    E: EventStore + 'static,
{
    let bug = service.create(&tenant, input)?;
    Ok((StatusCode::CREATED, Json(bug.view())))
}

pub(crate) async fn list_handler<R, E>(
    State(service): State<Arc<BugService<R, E>>>,
    tenant: TenantId,
) -> Result<Json<Vec<BugView>>, BugServiceError>
where
    R: BugRepository + 'static,
    E: EventStore + 'static,
{
    let bugs = service.list(&tenant)?;
    Ok(Json(bugs.iter().map(|bug| bug.view()).collect()))
}

pub(crate) async fn fetch_handler<R, E>(
    State(service): State<Arc<BugService<R, E>>>,
    tenant: TenantId,
    Path(bug_id): Path<String>,
) -> Result<Json<BugView>, BugServiceError>
where
    R: BugRepository + 'static,
    E: EventStore + 'static,
{
    let bug = service.get(&tenant, &BugId(bug_id))?;
    Ok(Json(bug.view()))
}

pub(crate) async fn triage_handler<R, E>(
    State(service): State<Arc<BugService<R, E>>>,
    tenant: TenantId,
    Path(bug_id): Path<String>,
    Json(request): Json<TriageRequest>,
) -> Result<Json<BugView>, BugServiceError>
where
    R: BugRepository + 'static,
    E: EventStore + 'static,
{
    let bug = service.triage(
        &tenant,
        &BugId(bug_id),
        request.severity,
        request.priority,
        &request.assigned_to,
    )?;
    Ok(Json(bug.view()))
}

pub(crate) async fn update_triage_handler<R, E>(
    State(service): State<Arc<BugService<R, E>>>,
    tenant: TenantId,
    Path(bug_id): Path<String>,
    Json(update): Json<TriageUpdate>,
) -> Result<Json<BugView>, BugServiceError>
where
    R: BugRepository + 'static,
    E: EventStore + 'static,
{
    let bug = service.update_triage(&tenant, &BugId(bug_id), update)?;
    Ok(Json(bug.view()))
}

pub(crate) async fn transition_handler<R, E>(
    State(service): State<Arc<BugService<R, E>>>,
    tenant: TenantId,
    Path(bug_id): Path<String>,
    Json(request): Json<BugTransitionRequest>,
) -> Result<Json<BugView>, BugServiceError>
where
    R: BugRepository + 'static,
    E: EventStore + 'static,
{
    let bug = service.apply(&tenant, &BugId(bug_id), request.action, request.reason)?;
    Ok(Json(bug.view()))
}

impl IntoResponse for BugServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            BugServiceError::Domain(err) => domain_status(err),
            BugServiceError::Repository(err) => repository_status(err),
        };
        error_response(status, self.to_string())
    }
}
