use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use chrono::Utc;
use serde_json::Value;

use crate::bugs::{Bug, BugId, BugPriority, BugRepository, BugSeverity, NewBug};
use crate::memory::MemoryStore;
use crate::releases::confidence::{
    ExplainError, ExplanationProvider, ExplanationProviders, NoExplanations, OpenBugCounts,
    RcsBreakdown, RcsDetails, RcsExplanation, RcsResult, SharedProvider,
};
use crate::releases::{
    ConfidenceSources, NewRelease, Release, ReleaseConfidenceService, ReleaseId,
    RuleBasedExplainer, SecurityOpsError, SecurityOpsScorer, SoScore,
};
use crate::requirements::{Requirement, RequirementId, RequirementRepository, RequirementStatus};
use crate::tenant::{TenantId, TENANT_HEADER};
use crate::test_runs::{
    NewTestRun, TestOutcome, TestResultInput, TestRun, TestRunId, TestRunRepository,
};

pub(super) fn tenant(raw: &str) -> TenantId {
    TenantId::new(raw).expect("valid tenant")
}

/// Fixed security/ops signal.
pub(super) struct StaticSecurityOps(pub(super) f64);

impl SecurityOpsScorer for StaticSecurityOps {
    fn calculate_so_score(
        &self,
        _tenant: &TenantId,
        _release_id: &ReleaseId,
    ) -> Result<SoScore, SecurityOpsError> {
        let mut details = BTreeMap::new();
        details.insert("scanner".to_string(), "fixture".to_string());
        Ok(SoScore {
            score: self.0,
            details,
        })
    }
}

pub(super) struct UnavailableSecurityOps;

impl SecurityOpsScorer for UnavailableSecurityOps {
    fn calculate_so_score(
        &self,
        _tenant: &TenantId,
        _release_id: &ReleaseId,
    ) -> Result<SoScore, SecurityOpsError> {
        Err(SecurityOpsError::Unavailable("scanner offline".to_string()))
    }
}

pub(super) struct FailingExplainer;

#[async_trait]
impl ExplanationProvider for FailingExplainer {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn explain_rcs(
        &self,
        _score: f64,
        _breakdown: &RcsBreakdown,
    ) -> Result<RcsExplanation, ExplainError> {
        Err(ExplainError::Unavailable("model endpoint timed out".to_string()))
    }
}

/// Only the named tenant gets explanations.
pub(super) struct SingleTenantExplanations {
    pub(super) tenant: TenantId,
}

impl ExplanationProviders for SingleTenantExplanations {
    fn provider_for(&self, tenant: &TenantId) -> Option<Arc<dyn ExplanationProvider>> {
        (tenant == &self.tenant).then(|| Arc::new(RuleBasedExplainer) as Arc<dyn ExplanationProvider>)
    }
}

pub(super) fn rules() -> Arc<dyn ExplanationProviders> {
    Arc::new(SharedProvider(Arc::new(RuleBasedExplainer)))
}

pub(super) fn no_explanations() -> Arc<dyn ExplanationProviders> {
    Arc::new(NoExplanations)
}

pub(super) fn build_service(
    store: &MemoryStore,
    explanations: Arc<dyn ExplanationProviders>,
    security_ops: Arc<dyn SecurityOpsScorer>,
) -> ReleaseConfidenceService {
    let shared = Arc::new(store.clone());
    ReleaseConfidenceService::new(ConfidenceSources {
        releases: shared.clone(),
        requirements: shared.clone(),
        bugs: shared.clone(),
        test_runs: shared.clone(),
        security_ops,
        explanations,
        events: shared,
    })
}

pub(super) fn default_service(store: &MemoryStore) -> ReleaseConfidenceService {
    build_service(store, no_explanations(), Arc::new(StaticSecurityOps(100.0)))
}

pub(super) fn new_release(version: &str) -> NewRelease {
    NewRelease {
        version: version.to_string(),
        name: Some("Autumn train".to_string()),
        target_date: None,
    }
}

pub(super) fn requirement(id: &str, owner: &TenantId, status: RequirementStatus) -> Requirement {
    Requirement {
        id: RequirementId(id.to_string()),
        tenant_id: owner.clone(),
        title: format!("Requirement {id}"),
        status,
        created_at: Utc::now(),
    }
}

pub(super) fn bug(
    id: &str,
    owner: &TenantId,
    severity: Option<BugSeverity>,
    priority: Option<BugPriority>,
) -> Bug {
    Bug::create(
        BugId(id.to_string()),
        owner.clone(),
        NewBug {
            title: format!("Defect {id}"),
            description: "Seen during release candidate testing".to_string(),
            severity,
            priority,
            tags: Vec::new(),
        },
    )
    .expect("bug builds")
}

pub(super) fn resolved_bug(id: &str, owner: &TenantId, severity: BugSeverity) -> Bug {
    let mut bug = bug(id, owner, None, None);
    bug.triage(severity, BugPriority::P1, "qa-lead")
        .expect("triaged");
    bug.mark_resolved().expect("resolved");
    bug
}

/// Completed run with the given outcome counts.
pub(super) fn finished_run(id: &str, owner: &TenantId, passed: u32, failed: u32) -> TestRun {
    let mut run = TestRun::create(
        TestRunId(id.to_string()),
        owner.clone(),
        NewTestRun {
            name: format!("suite {id}"),
            expected_test_count: passed + failed,
        },
    )
    .expect("run builds");
    run.start().expect("started");
    let outcomes = std::iter::repeat(TestOutcome::Passed)
        .take(passed as usize)
        .chain(std::iter::repeat(TestOutcome::Failed).take(failed as usize));
    for (index, outcome) in outcomes.enumerate() {
        run.record_result(TestResultInput {
            test_case_id: format!("{id}-case-{index}"),
            outcome,
            duration_ms: 40,
            error_message: None,
        })
        .expect("recorded");
    }
    run.complete().expect("completed");
    run
}

/// Three of four requirements ready, one open critical bug, latest run at 90%.
///
/// With a security/ops score of 100 this lands on RP 75, B 60, QT 90, SO 100.
pub(super) fn seed_worked_example(store: &MemoryStore, owner: &TenantId) {
    let statuses = [
        RequirementStatus::Ready,
        RequirementStatus::Ready,
        RequirementStatus::Ready,
        RequirementStatus::InReview,
    ];
    for (index, status) in statuses.into_iter().enumerate() {
        RequirementRepository::insert(
            store,
            owner,
            requirement(&format!("req-{index}"), owner, status),
        )
        .expect("requirement stored");
    }

    BugRepository::insert(
        store,
        owner,
        bug("bug-crit", owner, Some(BugSeverity::Critical), Some(BugPriority::P0)),
    )
    .expect("bug stored");
    BugRepository::insert(
        store,
        owner,
        resolved_bug("bug-fixed", owner, BugSeverity::High),
    )
    .expect("bug stored");

    TestRunRepository::insert(store, owner, finished_run("run-a", owner, 4, 6))
        .expect("run stored");
    TestRunRepository::insert(store, owner, finished_run("run-b", owner, 9, 1))
        .expect("run stored");
}

pub(super) fn create_release(
    service: &ReleaseConfidenceService,
    owner: &TenantId,
    version: &str,
) -> Release {
    service
        .create_release(owner, new_release(version))
        .expect("release created")
}

pub(super) fn breakdown(
    requirements: f64,
    quality: f64,
    bugs: f64,
    security_ops: f64,
    open_bugs: OpenBugCounts,
) -> RcsBreakdown {
    RcsBreakdown {
        requirements_planning: requirements,
        quality_testing: quality,
        bugs,
        security_ops,
        details: RcsDetails {
            ready_requirements: 0,
            total_requirements: 0,
            latest_test_run: Some(TestRunId("run-fixture".to_string())),
            open_bugs,
            security_ops: BTreeMap::new(),
        },
    }
}

pub(super) fn rcs(breakdown: RcsBreakdown) -> RcsResult {
    RcsResult::new(ReleaseId("rel-fixture".to_string()), breakdown)
}

pub(super) fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

pub(super) fn json_post(uri: &str, tenant: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(TENANT_HEADER, tenant);
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request builds"),
        None => builder.body(Body::empty()).expect("request builds"),
    }
}

pub(super) async fn read_json(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 256 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
