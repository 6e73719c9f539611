use std::collections::BTreeMap;
use std::sync::Arc;

use release_gate::bugs::{BugAction, BugPriority, BugService, BugSeverity, BugStatus, NewBug};
use release_gate::memory::MemoryStore;
use release_gate::releases::confidence::SharedProvider;
use release_gate::releases::{
    ConfidenceServiceError, ConfidenceSources, NewRelease, ReleaseAction,
    ReleaseConfidenceService, ReleaseId, ReleaseStatus, RuleBasedExplainer, SecurityOpsError,
    SecurityOpsScorer, SoScore,
};
use release_gate::requirements::{NewRequirement, RequirementService, RequirementStatus};
use release_gate::tenant::TenantId;
use release_gate::test_runs::{
    NewTestRun, TestOutcome, TestResultInput, TestRunAction, TestRunService,
};

struct PipelineScanner;

impl SecurityOpsScorer for PipelineScanner {
    fn calculate_so_score(
        &self,
        _tenant: &TenantId,
        _release_id: &ReleaseId,
    ) -> Result<SoScore, SecurityOpsError> {
        let mut details = BTreeMap::new();
        details.insert("dependency_audit".to_string(), "2 low advisories".to_string());
        Ok(SoScore {
            score: 90.0,
            details,
        })
    }
}

struct Harness {
    store: MemoryStore,
    bugs: BugService<MemoryStore, MemoryStore>,
    runs: TestRunService<MemoryStore, MemoryStore>,
    requirements: RequirementService<MemoryStore>,
    releases: ReleaseConfidenceService,
}

fn harness() -> Harness {
    let store = MemoryStore::new();
    let shared = Arc::new(store.clone());
    let releases = ReleaseConfidenceService::new(ConfidenceSources {
        releases: shared.clone(),
        requirements: shared.clone(),
        bugs: shared.clone(),
        test_runs: shared.clone(),
        security_ops: Arc::new(PipelineScanner),
        explanations: Arc::new(SharedProvider(Arc::new(RuleBasedExplainer))),
        events: shared.clone(),
    });
    Harness {
        bugs: BugService::new(shared.clone(), shared.clone()),
        runs: TestRunService::new(shared.clone(), shared.clone()),
        requirements: RequirementService::new(shared),
        releases,
        store,
    }
}

#[test]
fn critical_bug_blocks_release_until_resolved() {
    let h = harness();
    let tenant = TenantId::new("northwind").expect("tenant");

    for title in ["Passwordless login", "Audit log export"] {
        h.requirements
            .register(
                &tenant,
                NewRequirement {
                    title: title.to_string(),
                    status: RequirementStatus::Ready,
                },
            )
            .expect("requirement registered");
    }

    let bug = h
        .bugs
        .create(
            &tenant,
            NewBug {
                title: "Session token leaks into logs".to_string(),
                description: "Bearer token printed at info level".to_string(),
                ..NewBug::default()
            },
        )
        .expect("bug filed");
    let bug = h
        .bugs
        .triage(
            &tenant,
            bug.id(),
            BugSeverity::Critical,
            BugPriority::P0,
            "security-oncall",
        )
        .expect("bug triaged");
    assert!(bug.blocks_release());

    let run = h
        .runs
        .create(
            &tenant,
            NewTestRun {
                name: "rc1 full regression".to_string(),
                expected_test_count: 20,
            },
        )
        .expect("run created");
    h.runs
        .apply(&tenant, run.id(), TestRunAction::Start)
        .expect("run started");
    for index in 0..20 {
        let outcome = if index == 7 {
            TestOutcome::Failed
        } else {
            TestOutcome::Passed
        };
        h.runs
            .record_result(
                &tenant,
                run.id(),
                TestResultInput {
                    test_case_id: format!("REG-{index:03}"),
                    outcome,
                    duration_ms: 250,
                    error_message: None,
                },
            )
            .expect("result recorded");
    }
    let run = h
        .runs
        .apply(&tenant, run.id(), TestRunAction::Complete)
        .expect("run completed");
    assert_eq!(run.pass_rate(), 95);

    let release = h
        .releases
        .create_release(
            &tenant,
            NewRelease {
                version: "5.2.0".to_string(),
                name: None,
                target_date: None,
            },
        )
        .expect("release planned");
    for action in [ReleaseAction::Activate, ReleaseAction::Freeze] {
        h.releases
            .transition_release(&tenant, release.id(), action)
            .expect("release moved");
    }

    // 95 * 0.4 + 60 * 0.3 + 100 * 0.2 + 90 * 0.1
    let blocked = h
        .releases
        .evaluate_gates(&tenant, release.id(), None)
        .expect("gates evaluated");
    assert_eq!(blocked.rcs.display_score, 85);
    assert!(!blocked.can_release);

    let err = h
        .releases
        .ship_release(&tenant, release.id(), None)
        .expect_err("critical bug blocks shipping");
    assert!(matches!(err, ConfidenceServiceError::GateBlocked { .. }));

    let bug = h
        .bugs
        .apply(&tenant, bug.id(), BugAction::Resolve, None)
        .expect("bug resolved");
    assert_eq!(bug.status(), BugStatus::Resolved);
    assert!(!bug.blocks_release());

    let (shipped, evaluation) = h
        .releases
        .ship_release(&tenant, release.id(), None)
        .expect("release ships");
    assert_eq!(shipped.status(), ReleaseStatus::Released);
    assert_eq!(evaluation.rcs.display_score, 97);
    assert!(evaluation.override_reason.is_none());
    assert_eq!(
        evaluation.rcs.breakdown.details.security_ops.get("dependency_audit"),
        Some(&"2 low advisories".to_string())
    );

    let names: Vec<&str> = h
        .store
        .events(&tenant)
        .iter()
        .map(|event| event.name())
        .collect();
    assert!(names.contains(&"bug_triaged"));
    assert!(names.contains(&"test_run_completed"));
    assert!(names.contains(&"release_scored"));
    assert_eq!(names.last(), Some(&"release_status_changed"));
}

#[test]
fn tenants_never_share_scoring_inputs() {
    let h = harness();
    let noisy = TenantId::new("noisy").expect("tenant");
    let quiet = TenantId::new("quiet").expect("tenant");

    for index in 0..3 {
        h.bugs
            .create(
                &noisy,
                NewBug {
                    title: format!("Crash #{index}"),
                    description: "Segfault on startup".to_string(),
                    severity: Some(BugSeverity::Critical),
                    ..NewBug::default()
                },
            )
            .expect("bug filed");
    }

    let release = h
        .releases
        .create_release(
            &quiet,
            NewRelease {
                version: "0.1.0".to_string(),
                name: Some("first light".to_string()),
                target_date: None,
            },
        )
        .expect("release planned");
    let result = h
        .releases
        .calculate_rcs(&quiet, release.id())
        .expect("scored");

    assert_eq!(result.breakdown.bugs, 100.0);
    assert_eq!(result.breakdown.details.open_bugs.critical, 0);
    assert!(h.bugs.list(&quiet).expect("list").is_empty());
    assert_eq!(h.bugs.list(&noisy).expect("list").len(), 3);
}
