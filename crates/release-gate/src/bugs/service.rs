use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use super::domain::{Bug, BugId, NewBug, TriageUpdate};
use super::repository::BugRepository;
use super::triage::{BugPriority, BugSeverity};
use crate::events::{publish_best_effort, EventStore};
use crate::lifecycle::DomainError;
use crate::repository::RepositoryError;
use crate::tenant::TenantId;

/// Status actions accepted by [`BugService::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BugAction {
    Start,
    Resolve,
    Verify,
    Close,
    Defer,
    Invalidate,
    Reopen,
}

/// Service composing the bug repository with the event store.
pub struct BugService<R, E> {
    repository: Arc<R>,
    events: Arc<E>,
}

static BUG_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_bug_id() -> BugId {
    let id = BUG_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    BugId(format!("bug-{id:06}"))
}

impl<R, E> BugService<R, E>
where
    R: BugRepository + 'static,
    E: EventStore + 'static,
{
    pub fn new(repository: Arc<R>, events: Arc<E>) -> Self {
        Self { repository, events }
    }

    pub fn create(&self, tenant: &TenantId, input: NewBug) -> Result<Bug, BugServiceError> {
        let mut bug = Bug::create(next_bug_id(), tenant.clone(), input)?;
        let events = bug.drain_events();
        let stored = self.repository.insert(tenant, bug)?;
        publish_best_effort(&*self.events, tenant, events);
        info!(%tenant, bug = %stored.id(), "bug reported");
        Ok(stored)
    }

    pub fn get(&self, tenant: &TenantId, id: &BugId) -> Result<Bug, BugServiceError> {
        let bug = self
            .repository
            .fetch(tenant, id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(bug)
    }

    pub fn list(&self, tenant: &TenantId) -> Result<Vec<Bug>, BugServiceError> {
        Ok(self.repository.list(tenant)?)
    }

    pub fn triage(
        &self,
        tenant: &TenantId,
        id: &BugId,
        severity: BugSeverity,
        priority: BugPriority,
        assigned_to: &str,
    ) -> Result<Bug, BugServiceError> {
        self.mutate(tenant, id, |bug| {
            bug.triage(severity, priority, assigned_to)
        })
    }

    pub fn update_triage(
        &self,
        tenant: &TenantId,
        id: &BugId,
        update: TriageUpdate,
    ) -> Result<Bug, BugServiceError> {
        self.mutate(tenant, id, |bug| bug.update_triage(update))
    }

    pub fn apply(
        &self,
        tenant: &TenantId,
        id: &BugId,
        action: BugAction,
        reason: Option<String>,
    ) -> Result<Bug, BugServiceError> {
        self.mutate(tenant, id, |bug| match action {
            BugAction::Start => bug.mark_in_progress(),
            BugAction::Resolve => bug.mark_resolved(),
            BugAction::Verify => bug.mark_verified(),
            BugAction::Close => bug.mark_closed(),
            BugAction::Defer => bug.defer(),
            BugAction::Invalidate => bug.mark_invalid(),
            BugAction::Reopen => bug.reopen(reason),
        })
    }

    fn mutate<F>(&self, tenant: &TenantId, id: &BugId, change: F) -> Result<Bug, BugServiceError>
    where
        F: FnOnce(&mut Bug) -> Result<(), DomainError>,
    {
        let mut bug = self.get(tenant, id)?;
        change(&mut bug)?;
        let events = bug.drain_events();
        self.repository.update(tenant, bug.clone())?;
        publish_best_effort(&*self.events, tenant, events);
        info!(%tenant, bug = %id, status = ?bug.status(), "bug updated");
        Ok(bug)
    }
}

/// Error raised by the bug service.
#[derive(Debug, thiserror::Error)]
pub enum BugServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
