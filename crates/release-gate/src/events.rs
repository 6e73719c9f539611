//! Append-only domain events emitted by the aggregates.
//!
//! Aggregates buffer events while they mutate; services drain the buffer after the state write
//! succeeds and hand the batch to an [`EventStore`]. Appending is best-effort from the service's
//! point of view: a failed append is logged and never undoes the write.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::bugs::{BugId, BugPriority, BugSeverity, BugStatus};
use crate::releases::{ReleaseId, ReleaseStatus};
use crate::tenant::TenantId;
use crate::test_runs::{TestOutcome, TestRunId, TestRunStatus};

/// Immutable record of a single state change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainEvent {
    pub tenant_id: TenantId,
    pub occurred_at: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl DomainEvent {
    pub fn new(tenant_id: TenantId, kind: EventKind) -> Self {
        Self {
            tenant_id,
            occurred_at: Utc::now(),
            kind,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    BugCreated {
        bug_id: BugId,
        title: String,
    },
    BugTriaged {
        bug_id: BugId,
        severity: BugSeverity,
        priority: BugPriority,
        assigned_to: String,
    },
    BugTriageUpdated {
        bug_id: BugId,
        severity: Option<BugSeverity>,
        priority: Option<BugPriority>,
        assigned_to: Option<String>,
    },
    BugStatusChanged {
        bug_id: BugId,
        from: BugStatus,
        to: BugStatus,
    },
    BugResolved {
        bug_id: BugId,
    },
    BugReopened {
        bug_id: BugId,
        reason: Option<String>,
    },
    TestRunCreated {
        test_run_id: TestRunId,
        expected_test_count: u32,
    },
    TestRunStarted {
        test_run_id: TestRunId,
    },
    TestResultRecorded {
        test_run_id: TestRunId,
        test_case_id: String,
        outcome: TestOutcome,
        pass_rate: u8,
    },
    TestRunCompleted {
        test_run_id: TestRunId,
        passed: u32,
        failed: u32,
        skipped: u32,
        pass_rate: u8,
    },
    TestRunStatusChanged {
        test_run_id: TestRunId,
        from: TestRunStatus,
        to: TestRunStatus,
    },
    ReleaseCreated {
        release_id: ReleaseId,
        version: String,
    },
    ReleaseStatusChanged {
        release_id: ReleaseId,
        from: ReleaseStatus,
        to: ReleaseStatus,
    },
    ReleaseScored {
        release_id: ReleaseId,
        score: f64,
    },
}

impl EventKind {
    pub const fn name(&self) -> &'static str {
        match self {
            EventKind::BugCreated { .. } => "bug_created",
            EventKind::BugTriaged { .. } => "bug_triaged",
            EventKind::BugTriageUpdated { .. } => "bug_triage_updated",
            EventKind::BugStatusChanged { .. } => "bug_status_changed",
            EventKind::BugResolved { .. } => "bug_resolved",
            EventKind::BugReopened { .. } => "bug_reopened",
            EventKind::TestRunCreated { .. } => "test_run_created",
            EventKind::TestRunStarted { .. } => "test_run_started",
            EventKind::TestResultRecorded { .. } => "test_result_recorded",
            EventKind::TestRunCompleted { .. } => "test_run_completed",
            EventKind::TestRunStatusChanged { .. } => "test_run_status_changed",
            EventKind::ReleaseCreated { .. } => "release_created",
            EventKind::ReleaseStatusChanged { .. } => "release_status_changed",
            EventKind::ReleaseScored { .. } => "release_scored",
        }
    }
}

/// Outbound sink for drained aggregate events (audit log, subscribers).
pub trait EventStore: Send + Sync {
    fn append(&self, tenant: &TenantId, events: Vec<DomainEvent>) -> Result<(), EventStoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum EventStoreError {
    #[error("event store unavailable: {0}")]
    Unavailable(String),
    #[error("event for tenant {event_tenant} submitted in a batch for tenant {batch_tenant}")]
    TenantMismatch {
        batch_tenant: TenantId,
        event_tenant: TenantId,
    },
}

pub(crate) fn publish_best_effort<S>(store: &S, tenant: &TenantId, events: Vec<DomainEvent>)
where
    S: EventStore + ?Sized,
{
    if events.is_empty() {
        return;
    }

    let count = events.len();
    if let Err(err) = store.append(tenant, events) {
        warn!(%tenant, count, error = %err, "dropping domain events after failed append");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_a_type_tag() {
        let tenant = TenantId::new("acme").expect("tenant");
        let event = DomainEvent::new(
            tenant,
            EventKind::BugResolved {
                bug_id: BugId("bug-000042".to_string()),
            },
        );

        let payload = serde_json::to_value(&event).expect("serializes");
        assert_eq!(payload["type"], "bug_resolved");
        assert_eq!(payload["tenant_id"], "acme");
        assert_eq!(payload["bug_id"], "bug-000042");

        let decoded: DomainEvent = serde_json::from_value(payload).expect("deserializes");
        assert_eq!(decoded, event);
        assert_eq!(decoded.name(), "bug_resolved");
    }
}
