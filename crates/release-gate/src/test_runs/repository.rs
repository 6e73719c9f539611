use super::domain::{TestRun, TestRunId};
use crate::repository::RepositoryError;
use crate::tenant::TenantId;

/// Tenant-scoped storage for test run aggregates.
pub trait TestRunRepository: Send + Sync {
    fn insert(&self, tenant: &TenantId, run: TestRun) -> Result<TestRun, RepositoryError>;
    fn update(&self, tenant: &TenantId, run: TestRun) -> Result<(), RepositoryError>;
    fn fetch(&self, tenant: &TenantId, id: &TestRunId) -> Result<Option<TestRun>, RepositoryError>;
    fn list(&self, tenant: &TenantId) -> Result<Vec<TestRun>, RepositoryError>;
}
