use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::confidence::RcsExplanation;
use super::domain::{Release, ReleaseId};
use crate::repository::RepositoryError;
use crate::tenant::TenantId;

/// Tenant-scoped storage for release aggregates.
pub trait ReleaseRepository: Send + Sync {
    fn insert(&self, tenant: &TenantId, release: Release) -> Result<Release, RepositoryError>;
    fn update(&self, tenant: &TenantId, release: Release) -> Result<(), RepositoryError>;
    fn fetch(&self, tenant: &TenantId, id: &ReleaseId) -> Result<Option<Release>, RepositoryError>;
    fn list(&self, tenant: &TenantId) -> Result<Vec<Release>, RepositoryError>;

    /// Sets the explanation in place if `calculated_at` still matches the stored score.
    /// Returns `false` when the score has been superseded. Must not touch any other field.
    fn attach_explanation(
        &self,
        tenant: &TenantId,
        id: &ReleaseId,
        calculated_at: DateTime<Utc>,
        explanation: RcsExplanation,
    ) -> Result<bool, RepositoryError>;
}

/// Opaque security & operations signal computed outside this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoScore {
    pub score: f64,
    #[serde(default)]
    pub details: BTreeMap<String, String>,
}

pub trait SecurityOpsScorer: Send + Sync {
    fn calculate_so_score(
        &self,
        tenant: &TenantId,
        release_id: &ReleaseId,
    ) -> Result<SoScore, SecurityOpsError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SecurityOpsError {
    #[error("security/ops scoring unavailable: {0}")]
    Unavailable(String),
}
