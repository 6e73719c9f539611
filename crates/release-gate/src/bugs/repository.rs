use super::domain::{Bug, BugId};
use crate::repository::RepositoryError;
use crate::tenant::TenantId;

/// Tenant-scoped storage for bug aggregates.
pub trait BugRepository: Send + Sync {
    fn insert(&self, tenant: &TenantId, bug: Bug) -> Result<Bug, RepositoryError>;
    fn update(&self, tenant: &TenantId, bug: Bug) -> Result<(), RepositoryError>;
    fn fetch(&self, tenant: &TenantId, id: &BugId) -> Result<Option<Bug>, RepositoryError>;
    fn list(&self, tenant: &TenantId) -> Result<Vec<Bug>, RepositoryError>;
}
