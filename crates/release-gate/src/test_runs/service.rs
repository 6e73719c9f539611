use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info};

use super::domain::{NewTestRun, TestResultInput, TestRun, TestRunId, TestRunStatus};
use super::repository::TestRunRepository;
use crate::events::{publish_best_effort, EventStore};
use crate::lifecycle::DomainError;
use crate::repository::RepositoryError;
use crate::tenant::TenantId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestRunAction {
    Start,
    Complete,
    Stop,
    Cancel,
    Analyze,
}

pub struct TestRunService<R, E> {
    repository: Arc<R>,
    events: Arc<E>,
}

static TEST_RUN_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_test_run_id() -> TestRunId {
    let id = TEST_RUN_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    TestRunId(format!("run-{id:06}"))
}

impl<R, E> TestRunService<R, E>
where
    R: TestRunRepository + 'static,
    E: EventStore + 'static,
{
    pub fn new(repository: Arc<R>, events: Arc<E>) -> Self {
        Self { repository, events }
    }

    pub fn create(
        &self,
        tenant: &TenantId,
        input: NewTestRun,
    ) -> Result<TestRun, TestRunServiceError> {
        let mut run = TestRun::create(next_test_run_id(), tenant.clone(), input)?;
        let events = run.drain_events();
        let stored = self.repository.insert(tenant, run)?;
        publish_best_effort(&*self.events, tenant, events);
        info!(%tenant, test_run = %stored.id(), "test run created");
        Ok(stored)
    }

    pub fn get(&self, tenant: &TenantId, id: &TestRunId) -> Result<TestRun, TestRunServiceError> {
        let run = self
            .repository
            .fetch(tenant, id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(run)
    }

    pub fn list(&self, tenant: &TenantId) -> Result<Vec<TestRun>, TestRunServiceError> {
        Ok(self.repository.list(tenant)?)
    }

    pub fn record_result(
        &self,
        tenant: &TenantId,
        id: &TestRunId,
        input: TestResultInput,
    ) -> Result<TestRun, TestRunServiceError> {
        let run = self.mutate(tenant, id, |run| run.record_result(input))?;
        debug!(%tenant, test_run = %id, pass_rate = run.pass_rate(), "test result recorded");
        Ok(run)
    }

    pub fn apply(
        &self,
        tenant: &TenantId,
        id: &TestRunId,
        action: TestRunAction,
    ) -> Result<TestRun, TestRunServiceError> {
        let run = self.mutate(tenant, id, |run| match action {
            TestRunAction::Start => run.start(),
            TestRunAction::Complete => run.complete(),
            TestRunAction::Stop => run.stop(),
            TestRunAction::Cancel => run.cancel(),
            TestRunAction::Analyze => run.mark_analyzed(),
        })?;
        if run.status() == TestRunStatus::Completed {
            info!(
                %tenant,
                test_run = %id,
                pass_rate = run.pass_rate(),
                status = run.pass_rate_status().label(),
                "test run completed"
            );
        }
        Ok(run)
    }

    fn mutate<F>(
        &self,
        tenant: &TenantId,
        id: &TestRunId,
        change: F,
    ) -> Result<TestRun, TestRunServiceError>
    where
        F: FnOnce(&mut TestRun) -> Result<(), DomainError>,
    {
        let mut run = self.get(tenant, id)?;
        change(&mut run)?;
        let events = run.drain_events();
        self.repository.update(tenant, run.clone())?;
        publish_best_effort(&*self.events, tenant, events);
        Ok(run)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TestRunServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
