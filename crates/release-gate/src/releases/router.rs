use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{FromRequest, Path, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::confidence::{
    ConfidenceServiceError, GateEvaluation, RcsResult, ReleaseConfidenceService,
};
use super::domain::{NewRelease, ReleaseAction, ReleaseId, ReleaseView};
use crate::http::{domain_status, error_response, repository_status};
use crate::tenant::TenantId;

#[derive(Debug, Deserialize)]
pub struct ReleaseTransitionRequest {
    pub action: ReleaseAction,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GateRequest {
    #[serde(default)]
    pub override_reason: Option<String>,
}

/// Gate/ship body: may be omitted entirely, but a body that is sent must parse.
#[derive(Debug)]
pub struct OverrideBody(pub Option<String>);

#[axum::async_trait]
impl<S> FromRequest<S> for OverrideBody
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(IntoResponse::into_response)?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self(None));
        }
        let request: GateRequest = serde_json::from_slice(&bytes).map_err(|err| {
            error_response(
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("invalid gate request: {err}"),
            )
        })?;
        Ok(Self(request.override_reason))
    }
}

#[derive(Debug, Serialize)]
pub struct ShipResponse {
    pub release: ReleaseView,
    pub evaluation: GateEvaluation,
}

type SharedService = Arc<ReleaseConfidenceService>;

/// Router builder exposing release lifecycle, scoring, and gate endpoints.
pub fn release_router(service: SharedService) -> Router {
    Router::new()
        .route("/api/v1/releases", post(create_handler).get(list_handler))
        .route("/api/v1/releases/:release_id", get(fetch_handler))
        .route(
            "/api/v1/releases/:release_id/transitions",
            post(transition_handler),
        )
        .route("/api/v1/releases/:release_id/rcs", post(rcs_handler))
        .route("/api/v1/releases/:release_id/gates", post(gates_handler))
        .route("/api/v1/releases/:release_id/ship", post(ship_handler))
        .with_state(service)
}

pub(crate) async fn create_handler(
    State(service): State<SharedService>,
    tenant: TenantId,
    Json(input): Json<NewRelease>,
) -> Result<(StatusCode, Json<ReleaseView>), ConfidenceServiceError> {
    let release = service.create_release(&tenant, input)?;
    Ok((StatusCode::CREATED, Json(release.view())))
}

pub(crate) async fn list_handler(
    State(service): State<SharedService>,
    tenant: TenantId,
) -> Result<Json<Vec<ReleaseView>>, ConfidenceServiceError> {
    let releases = service.list_releases(&tenant)?;
    Ok(Json(releases.iter().map(|release| release.view()).collect()))
}

pub(crate) async fn fetch_handler(
    State(service): State<SharedService>,
    tenant: TenantId,
    Path(release_id): Path<String>,
) -> Result<Json<ReleaseView>, ConfidenceServiceError> {
    let release = service.get_release(&tenant, &ReleaseId(release_id))?;
    Ok(Json(release.view()))
}

pub(crate) async fn transition_handler(
    State(service): State<SharedService>,
    tenant: TenantId,
    Path(release_id): Path<String>,
    Json(request): Json<ReleaseTransitionRequest>,
) -> Result<Json<ReleaseView>, ConfidenceServiceError> {
    let release = service.transition_release(&tenant, &ReleaseId(release_id), request.action)?;
    Ok(Json(release.view()))
}

pub(crate) async fn rcs_handler(
    State(service): State<SharedService>,
    tenant: TenantId,
    Path(release_id): Path<String>,
) -> Result<Json<RcsResult>, ConfidenceServiceError> {
    let result = service.calculate_rcs(&tenant, &ReleaseId(release_id))?;
    Ok(Json(result))
}

pub(crate) async fn gates_handler(
    State(service): State<SharedService>,
    tenant: TenantId,
    Path(release_id): Path<String>,
    OverrideBody(override_reason): OverrideBody,
) -> Result<Json<GateEvaluation>, ConfidenceServiceError> {
    let evaluation = service.evaluate_gates(&tenant, &ReleaseId(release_id), override_reason)?;
    Ok(Json(evaluation))
}

pub(crate) async fn ship_handler(
    State(service): State<SharedService>,
    tenant: TenantId,
    Path(release_id): Path<String>,
    OverrideBody(override_reason): OverrideBody,
) -> Result<Json<ShipResponse>, ConfidenceServiceError> {
    let (release, evaluation) =
        service.ship_release(&tenant, &ReleaseId(release_id), override_reason)?;
    Ok(Json(ShipResponse {
        release: release.view(),
        evaluation,
    }))
}

impl IntoResponse for ConfidenceServiceError {
    fn into_response(self) -> Response {
        match &self {
            ConfidenceServiceError::Domain(err) => {
                error_response(domain_status(err), self.to_string())
            }
            ConfidenceServiceError::Repository(err) => {
                error_response(repository_status(err), self.to_string())
            }
            ConfidenceServiceError::SecurityOps(_) => {
                error_response(StatusCode::SERVICE_UNAVAILABLE, self.to_string())
            }
            ConfidenceServiceError::GateBlocked { failing } => {
                let payload = json!({
                    "error": self.to_string(),
                    "failing_gates": failing,
                });
                (StatusCode::CONFLICT, Json(payload)).into_response()
            }
        }
    }
}
