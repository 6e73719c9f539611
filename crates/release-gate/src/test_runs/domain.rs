use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::pass_rate::{self, PassRateStatus};
use crate::events::{DomainEvent, EventKind};
use crate::lifecycle::{require_text, validate_transition, DomainError, LifecycleState};
use crate::tenant::TenantId;

/// Identifier wrapper for test runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TestRunId(pub String);

impl std::fmt::Display for TestRunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestRunStatus {
    Created,
    Running,
    Completed,
    Stopped,
    Analyzed,
    Cancelled,
}

impl TestRunStatus {
    pub const fn is_terminal(self) -> bool {
        matches!(self, TestRunStatus::Completed | TestRunStatus::Cancelled)
    }

    pub const fn accepts_results(self) -> bool {
        matches!(
            self,
            TestRunStatus::Created | TestRunStatus::Running | TestRunStatus::Stopped
        )
    }
}

impl LifecycleState for TestRunStatus {
    const ENTITY: &'static str = "test run";

    fn allowed_transitions(self) -> &'static [Self] {
        use TestRunStatus::*;
        match self {
            Created => &[Running, Cancelled],
            Running => &[Completed, Stopped, Cancelled],
            Stopped => &[Running, Completed, Analyzed, Cancelled],
            Completed => &[Analyzed],
            Analyzed => &[],
            Cancelled => &[],
        }
    }

    fn label(self) -> &'static str {
        match self {
            TestRunStatus::Created => "created",
            TestRunStatus::Running => "running",
            TestRunStatus::Completed => "completed",
            TestRunStatus::Stopped => "stopped",
            TestRunStatus::Analyzed => "analyzed",
            TestRunStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestOutcome {
    Passed,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTestRun {
    pub name: String,
    pub expected_test_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResultInput {
    pub test_case_id: String,
    pub outcome: TestOutcome,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// Individual execution result recorded against a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestResult {
    pub test_case_id: String,
    pub outcome: TestOutcome,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// Test run aggregate: counters and pass rate are recomputed after every result.
#[derive(Debug, Clone)]
pub struct TestRun {
    id: TestRunId,
    tenant_id: TenantId,
    name: String,
    status: TestRunStatus,
    expected_test_count: u32,
    passed: u32,
    failed: u32,
    skipped: u32,
    total_duration_ms: u64,
    pass_rate: u8,
    pass_rate_status: PassRateStatus,
    results: Vec<TestResult>,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    pending_events: Vec<DomainEvent>,
}

impl TestRun {
    pub fn create(
        id: TestRunId,
        tenant_id: TenantId,
        input: NewTestRun,
    ) -> Result<Self, DomainError> {
        let name = require_text(&input.name, "name")?;
        if input.expected_test_count == 0 {
            return Err(DomainError::Invalid(
                "expected test count must be greater than zero".to_string(),
            ));
        }

        let mut run = Self {
            id,
            tenant_id,
            name,
            status: TestRunStatus::Created,
            expected_test_count: input.expected_test_count,
            passed: 0,
            failed: 0,
            skipped: 0,
            total_duration_ms: 0,
            pass_rate: 0,
            pass_rate_status: PassRateStatus::from_rate(0),
            results: Vec::new(),
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            pending_events: Vec::new(),
        };
        run.record(EventKind::TestRunCreated {
            test_run_id: run.id.clone(),
            expected_test_count: run.expected_test_count,
        });
        Ok(run)
    }

    /// Starts a created run or resumes a stopped one.
    pub fn start(&mut self) -> Result<(), DomainError> {
        validate_transition(self.status, TestRunStatus::Running)?;
        self.status = TestRunStatus::Running;
        if self.started_at.is_none() {
            self.started_at = Some(Utc::now());
        }
        self.record(EventKind::TestRunStarted {
            test_run_id: self.id.clone(),
        });
        Ok(())
    }

    pub fn record_result(&mut self, input: TestResultInput) -> Result<(), DomainError> {
        if !self.status.accepts_results() {
            return Err(DomainError::TerminalState {
                entity: TestRunStatus::ENTITY,
                state: self.status.label(),
            });
        }
        let test_case_id = require_text(&input.test_case_id, "test_case_id")?;

        match input.outcome {
            TestOutcome::Passed => self.passed += 1,
            TestOutcome::Failed => self.failed += 1,
            TestOutcome::Skipped => self.skipped += 1,
        }
        self.total_duration_ms = self.total_duration_ms.saturating_add(input.duration_ms);
        self.pass_rate = pass_rate::pass_rate(self.passed, self.failed, self.skipped);
        self.pass_rate_status = PassRateStatus::from_rate(self.pass_rate);

        self.results.push(TestResult {
            test_case_id: test_case_id.clone(),
            outcome: input.outcome,
            duration_ms: input.duration_ms,
            error_message: input.error_message,
            recorded_at: Utc::now(),
        });
        self.record(EventKind::TestResultRecorded {
            test_run_id: self.id.clone(),
            test_case_id,
            outcome: input.outcome,
            pass_rate: self.pass_rate,
        });
        Ok(())
    }

    pub fn complete(&mut self) -> Result<(), DomainError> {
        validate_transition(self.status, TestRunStatus::Completed)?;
        self.status = TestRunStatus::Completed;
        self.completed_at = Some(Utc::now());
        self.record(EventKind::TestRunCompleted {
            test_run_id: self.id.clone(),
            passed: self.passed,
            failed: self.failed,
            skipped: self.skipped,
            pass_rate: self.pass_rate,
        });
        Ok(())
    }

    pub fn stop(&mut self) -> Result<(), DomainError> {
        self.change_status(TestRunStatus::Stopped)
    }

    pub fn cancel(&mut self) -> Result<(), DomainError> {
        self.change_status(TestRunStatus::Cancelled)
    }

    pub fn mark_analyzed(&mut self) -> Result<(), DomainError> {
        self.change_status(TestRunStatus::Analyzed)
    }

    pub fn meets_release_gate(&self) -> bool {
        pass_rate::meets_release_gate(self.pass_rate)
    }

    /// Recorded results as a percentage of the expected count, capped at 100.
    pub fn progress(&self) -> u8 {
        let recorded = self.results.len() as u64;
        let expected = u64::from(self.expected_test_count.max(1));
        (recorded * 100 / expected).min(100) as u8
    }

    pub fn drain_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.pending_events)
    }

    pub fn id(&self) -> &TestRunId {
        &self.id
    }

    pub fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    pub fn status(&self) -> TestRunStatus {
        self.status
    }

    pub fn pass_rate(&self) -> u8 {
        self.pass_rate
    }

    pub fn pass_rate_status(&self) -> PassRateStatus {
        self.pass_rate_status
    }

    pub fn counts(&self) -> (u32, u32, u32) {
        (self.passed, self.failed, self.skipped)
    }

    pub fn results(&self) -> &[TestResult] {
        &self.results
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn view(&self) -> TestRunView {
        TestRunView {
            id: self.id.clone(),
            name: self.name.clone(),
            status: self.status,
            expected_test_count: self.expected_test_count,
            passed: self.passed,
            failed: self.failed,
            skipped: self.skipped,
            total_duration_ms: self.total_duration_ms,
            pass_rate: self.pass_rate,
            pass_rate_status: self.pass_rate_status,
            meets_release_gate: self.meets_release_gate(),
            progress: self.progress(),
            results: self.results.clone(),
            created_at: self.created_at,
            started_at: self.started_at,
            completed_at: self.completed_at,
        }
    }

    fn change_status(&mut self, next: TestRunStatus) -> Result<(), DomainError> {
        validate_transition(self.status, next)?;
        let from = self.status;
        self.status = next;
        self.record(EventKind::TestRunStatusChanged {
            test_run_id: self.id.clone(),
            from,
            to: next,
        });
        Ok(())
    }

    fn record(&mut self, kind: EventKind) {
        self.pending_events
            .push(DomainEvent::new(self.tenant_id.clone(), kind));
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TestRunView {
    pub id: TestRunId,
    pub name: String,
    pub status: TestRunStatus,
    pub expected_test_count: u32,
    pub passed: u32,
    pub failed: u32,
    pub skipped: u32,
    pub total_duration_ms: u64,
    pub pass_rate: u8,
    pub pass_rate_status: PassRateStatus,
    pub meets_release_gate: bool,
    pub progress: u8,
    pub results: Vec<TestResult>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}
