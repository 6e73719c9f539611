//! Requirement readiness snapshots feeding the requirements & planning pillar.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::http::{domain_status, error_response, repository_status};
use crate::lifecycle::{require_text, DomainError};
use crate::repository::RepositoryError;
use crate::tenant::TenantId;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequirementId(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequirementStatus {
    Draft,
    InReview,
    Ready,
    Blocked,
}

impl RequirementStatus {
    pub const fn is_ready(self) -> bool {
        matches!(self, RequirementStatus::Ready)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRequirement {
    pub title: String,
    pub status: RequirementStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Requirement {
    pub id: RequirementId,
    pub tenant_id: TenantId,
    pub title: String,
    pub status: RequirementStatus,
    pub created_at: DateTime<Utc>,
}

/// Tenant-scoped requirement snapshot source.
pub trait RequirementRepository: Send + Sync {
    fn insert(
        &self,
        tenant: &TenantId,
        requirement: Requirement,
    ) -> Result<Requirement, RepositoryError>;
    fn list(&self, tenant: &TenantId) -> Result<Vec<Requirement>, RepositoryError>;
}

static REQUIREMENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

pub struct RequirementService<R> {
    repository: Arc<R>,
}

impl<R> RequirementService<R>
where
    R: RequirementRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    pub fn register(
        &self,
        tenant: &TenantId,
        input: NewRequirement,
    ) -> Result<Requirement, RequirementServiceError> {
        let title = require_text(&input.title, "title")?;
        let id = REQUIREMENT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let requirement = Requirement {
            id: RequirementId(format!("req-{id:06}")),
            tenant_id: tenant.clone(),
            title,
            status: input.status,
            created_at: Utc::now(),
        };
        Ok(self.repository.insert(tenant, requirement)?)
    }

    pub fn list(&self, tenant: &TenantId) -> Result<Vec<Requirement>, RequirementServiceError> {
        Ok(self.repository.list(tenant)?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RequirementServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl IntoResponse for RequirementServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            RequirementServiceError::Domain(err) => domain_status(err),
            RequirementServiceError::Repository(err) => repository_status(err),
        };
        error_response(status, self.to_string())
    }
}

pub fn requirement_router<R>(service: Arc<RequirementService<R>>) -> Router
where
    R: RequirementRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/requirements",
            post(register_handler::<R>).get(list_handler::<R>),
        )
        .with_state(service)
}

async fn register_handler<R>(
    State(service): State<Arc<RequirementService<R>>>,
    tenant: TenantId,
    Json(input): Json<NewRequirement>,
) -> Result<(StatusCode, Json<Requirement>), RequirementServiceError>
where
    R: RequirementRepository + 'static,
{
    let requirement = service.register(&tenant, input)?;
    Ok((StatusCode::CREATED, Json(requirement)))
}

async fn list_handler<R>(
    State(service): State<Arc<RequirementService<R>>>,
    tenant: TenantId,
) -> Result<Json<Vec<Requirement>>, RequirementServiceError>
where
    R: RequirementRepository + 'static,
{
    Ok(Json(service.list(&tenant)?))
}
