//! In-process adapters for every repository trait and the event store.
//!
//! Used by the API binary and the test suites. Records are keyed by `(tenant, id)` so one
//! tenant can never read another tenant's rows.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use crate::bugs::{Bug, BugId, BugRepository};
use crate::events::{DomainEvent, EventStore, EventStoreError};
use crate::releases::{RcsExplanation, Release, ReleaseId, ReleaseRepository};
use crate::repository::RepositoryError;
use crate::requirements::{Requirement, RequirementId, RequirementRepository};
use crate::tenant::TenantId;
use crate::test_runs::{TestRun, TestRunId, TestRunRepository};

type Table<K, V> = BTreeMap<(TenantId, K), V>;

#[derive(Default)]
struct Tables {
    bugs: Table<BugId, Bug>,
    test_runs: Table<TestRunId, TestRun>,
    releases: Table<ReleaseId, Release>,
    requirements: Table<RequirementId, Requirement>,
    events: Vec<DomainEvent>,
}

/// Shared, cloneable store. Clones see the same data.
#[derive(Default, Clone)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events appended for `tenant`, oldest first.
    pub fn events(&self, tenant: &TenantId) -> Vec<DomainEvent> {
        match self.tables.lock() {
            Ok(tables) => tables
                .events
                .iter()
                .filter(|event| &event.tenant_id == tenant)
                .cloned()
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, RepositoryError> {
        self.tables
            .lock()
            .map_err(|_| RepositoryError::Unavailable("memory store lock poisoned".to_string()))
    }
}

fn insert_row<K: Ord + Clone, V: Clone>(
    table: &mut Table<K, V>,
    tenant: &TenantId,
    id: &K,
    row: V,
) -> Result<V, RepositoryError> {
    let key = (tenant.clone(), id.clone());
    if table.contains_key(&key) {
        return Err(RepositoryError::Conflict);
    }
    table.insert(key, row.clone());
    Ok(row)
}

fn update_row<K: Ord + Clone, V>(
    table: &mut Table<K, V>,
    tenant: &TenantId,
    id: &K,
    row: V,
) -> Result<(), RepositoryError> {
    match table.get_mut(&(tenant.clone(), id.clone())) {
        Some(slot) => {
            *slot = row;
            Ok(())
        }
        None => Err(RepositoryError::NotFound),
    }
}

fn tenant_rows<K: Ord, V: Clone>(table: &Table<K, V>, tenant: &TenantId) -> Vec<V> {
    table
        .iter()
        .filter(|((owner, _), _)| owner == tenant)
        .map(|(_, row)| row.clone())
        .collect()
}

impl BugRepository for MemoryStore {
    fn insert(&self, tenant: &TenantId, bug: Bug) -> Result<Bug, RepositoryError> {
        let id = bug.id().clone();
        insert_row(&mut self.lock()?.bugs, tenant, &id, bug)
    }

    fn update(&self, tenant: &TenantId, bug: Bug) -> Result<(), RepositoryError> {
        let id = bug.id().clone();
        update_row(&mut self.lock()?.bugs, tenant, &id, bug)
    }

    fn fetch(&self, tenant: &TenantId, id: &BugId) -> Result<Option<Bug>, RepositoryError> {
        Ok(self.lock()?.bugs.get(&(tenant.clone(), id.clone())).cloned())
    }

    fn list(&self, tenant: &TenantId) -> Result<Vec<Bug>, RepositoryError> {
        Ok(tenant_rows(&self.lock()?.bugs, tenant))
    }
}

impl TestRunRepository for MemoryStore {
    fn insert(&self, tenant: &TenantId, run: TestRun) -> Result<TestRun, RepositoryError> {
        let id = run.id().clone();
        insert_row(&mut self.lock()?.test_runs, tenant, &id, run)
    }

    fn update(&self, tenant: &TenantId, run: TestRun) -> Result<(), RepositoryError> {
        let id = run.id().clone();
        update_row(&mut self.lock()?.test_runs, tenant, &id, run)
    }

    fn fetch(&self, tenant: &TenantId, id: &TestRunId) -> Result<Option<TestRun>, RepositoryError> {
        Ok(self
            .lock()?
            .test_runs
            .get(&(tenant.clone(), id.clone()))
            .cloned())
    }

    fn list(&self, tenant: &TenantId) -> Result<Vec<TestRun>, RepositoryError> {
        Ok(tenant_rows(&self.lock()?.test_runs, tenant))
    }
}

impl ReleaseRepository for MemoryStore {
    fn insert(&self, tenant: &TenantId, release: Release) -> Result<Release, RepositoryError> {
        let id = release.id().clone();
        insert_row(&mut self.lock()?.releases, tenant, &id, release)
    }

    fn update(&self, tenant: &TenantId, release: Release) -> Result<(), RepositoryError> {
        let id = release.id().clone();
        update_row(&mut self.lock()?.releases, tenant, &id, release)
    }

    fn fetch(&self, tenant: &TenantId, id: &ReleaseId) -> Result<Option<Release>, RepositoryError> {
        Ok(self
            .lock()?
            .releases
            .get(&(tenant.clone(), id.clone()))
            .cloned())
    }

    fn list(&self, tenant: &TenantId) -> Result<Vec<Release>, RepositoryError> {
        Ok(tenant_rows(&self.lock()?.releases, tenant))
    }

    fn attach_explanation(
        &self,
        tenant: &TenantId,
        id: &ReleaseId,
        calculated_at: DateTime<Utc>,
        explanation: RcsExplanation,
    ) -> Result<bool, RepositoryError> {
        let mut tables = self.lock()?;
        let release = tables
            .releases
            .get_mut(&(tenant.clone(), id.clone()))
            .ok_or(RepositoryError::NotFound)?;
        Ok(release.attach_explanation(explanation, calculated_at))
    }
}

impl RequirementRepository for MemoryStore {
    fn insert(
        &self,
        tenant: &TenantId,
        requirement: Requirement,
    ) -> Result<Requirement, RepositoryError> {
        let id = requirement.id.clone();
        insert_row(&mut self.lock()?.requirements, tenant, &id, requirement)
    }

    fn list(&self, tenant: &TenantId) -> Result<Vec<Requirement>, RepositoryError> {
        Ok(tenant_rows(&self.lock()?.requirements, tenant))
    }
}

impl EventStore for MemoryStore {
    fn append(&self, tenant: &TenantId, events: Vec<DomainEvent>) -> Result<(), EventStoreError> {
        if let Some(stray) = events.iter().find(|event| &event.tenant_id != tenant) {
            return Err(EventStoreError::TenantMismatch {
                batch_tenant: tenant.clone(),
                event_tenant: stray.tenant_id.clone(),
            });
        }
        let mut tables = self
            .tables
            .lock()
            .map_err(|_| EventStoreError::Unavailable("memory store lock poisoned".to_string()))?;
        tables.events.extend(events);
        Ok(())
    }
}
