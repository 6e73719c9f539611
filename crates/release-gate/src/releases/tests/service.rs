use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::common::*;
use crate::lifecycle::DomainError;
use crate::memory::MemoryStore;
use crate::releases::confidence::{store_explanation, SharedProvider};
use crate::releases::{
    ConfidenceServiceError, RcsExplanation, Release, ReleaseAction, ReleaseId, ReleaseRepository,
    ReleaseStatus,
};
use crate::repository::RepositoryError;
use crate::tenant::TenantId;

#[test]
fn calculate_rcs_scores_worked_example_and_persists_it() {
    let store = MemoryStore::new();
    let acme = tenant("acme");
    seed_worked_example(&store, &acme);
    let service = default_service(&store);
    let release = create_release(&service, &acme, "2.4.0");

    let result = service.calculate_rcs(&acme, release.id()).expect("scored");

    assert_close(result.breakdown.requirements_planning, 75.0);
    assert_close(result.breakdown.bugs, 60.0);
    assert_close(result.breakdown.quality_testing, 90.0);
    assert_close(result.breakdown.security_ops, 100.0);
    assert_close(result.score, 79.0);
    assert_eq!(result.display_score, 79);
    assert_eq!(
        result.breakdown.details.latest_test_run.as_ref().map(|id| id.0.as_str()),
        Some("run-b")
    );

    let stored = service.get_release(&acme, release.id()).expect("stored");
    assert_close(stored.rcs_score(), 79.0);
    assert!(stored.rcs_breakdown().is_some());
    assert!(store
        .events(&acme)
        .iter()
        .any(|event| event.name() == "release_scored"));
}

#[test]
fn evaluate_gates_blocks_worked_example_until_overridden() {
    let store = MemoryStore::new();
    let acme = tenant("acme");
    seed_worked_example(&store, &acme);
    let service = default_service(&store);
    let release = create_release(&service, &acme, "2.4.0");

    let blocked = service
        .evaluate_gates(&acme, release.id(), None)
        .expect("evaluated");
    assert!(!blocked.can_release);

    let overridden = service
        .evaluate_gates(
            &acme,
            release.id(),
            Some("Critical bug mitigated by feature flag".to_string()),
        )
        .expect("evaluated");
    assert!(overridden.can_release);
    assert_eq!(
        overridden.override_reason.as_deref(),
        Some("Critical bug mitigated by feature flag")
    );
}

#[test]
fn scores_only_see_the_callers_tenant() {
    let store = MemoryStore::new();
    let acme = tenant("acme");
    let globex = tenant("globex");
    seed_worked_example(&store, &acme);
    let service = default_service(&store);
    let release = create_release(&service, &globex, "9.0.0");

    let result = service.calculate_rcs(&globex, release.id()).expect("scored");
    assert_eq!(result.breakdown.requirements_planning, 0.0);
    assert_eq!(result.breakdown.quality_testing, 0.0);
    assert_eq!(result.breakdown.bugs, 100.0);
    assert_eq!(result.breakdown.details.open_bugs.total(), 0);

    let err = service
        .calculate_rcs(&acme, release.id())
        .expect_err("globex release is hidden from acme");
    assert!(matches!(
        err,
        ConfidenceServiceError::Repository(RepositoryError::NotFound)
    ));
}

#[test]
fn security_ops_failure_propagates_and_leaves_release_unscored() {
    let store = MemoryStore::new();
    let acme = tenant("acme");
    let service = build_service(&store, no_explanations(), Arc::new(UnavailableSecurityOps));
    let release = create_release(&service, &acme, "1.0.0");

    let err = service
        .calculate_rcs(&acme, release.id())
        .expect_err("scanner offline");
    assert!(matches!(err, ConfidenceServiceError::SecurityOps(_)));

    let stored = service.get_release(&acme, release.id()).expect("stored");
    assert!(stored.rcs_breakdown().is_none());
}

#[test]
fn ship_requires_gates_and_frozen_release() {
    let store = MemoryStore::new();
    let acme = tenant("acme");
    seed_worked_example(&store, &acme);
    let service = default_service(&store);
    let release = create_release(&service, &acme, "3.0.0");

    service
        .transition_release(&acme, release.id(), ReleaseAction::Activate)
        .expect("activated");
    service
        .transition_release(&acme, release.id(), ReleaseAction::Freeze)
        .expect("frozen");

    let err = service
        .ship_release(&acme, release.id(), None)
        .expect_err("critical bug blocks");
    match err {
        ConfidenceServiceError::GateBlocked { failing } => {
            assert_eq!(failing, ["No open critical bugs"]);
        }
        other => panic!("expected gate block, got {other:?}"),
    }

    let (shipped, evaluation) = service
        .ship_release(&acme, release.id(), Some("exec approval".to_string()))
        .expect("shipped with override");
    assert_eq!(shipped.status(), ReleaseStatus::Released);
    assert!(evaluation.overridden());

    let err = service
        .calculate_rcs(&acme, release.id())
        .expect_err("released scores are frozen");
    assert!(matches!(
        err,
        ConfidenceServiceError::Domain(DomainError::TerminalState { .. })
    ));
}

#[test]
fn shipping_an_unfrozen_release_is_rejected_before_scoring() {
    let store = MemoryStore::new();
    let acme = tenant("acme");
    seed_worked_example(&store, &acme);
    let service = default_service(&store);
    let release = create_release(&service, &acme, "3.1.0");

    let err = service
        .ship_release(&acme, release.id(), Some("exec approval".to_string()))
        .expect_err("planned releases cannot ship");
    assert!(matches!(
        err,
        ConfidenceServiceError::Domain(DomainError::InvalidTransition { .. })
    ));

    service
        .transition_release(&acme, release.id(), ReleaseAction::Activate)
        .expect("activated");
    let err = service
        .ship_release(&acme, release.id(), None)
        .expect_err("active releases cannot ship");
    assert!(matches!(
        err,
        ConfidenceServiceError::Domain(DomainError::InvalidTransition { .. })
    ));

    let stored = service.get_release(&acme, release.id()).expect("stored");
    assert_eq!(stored.status(), ReleaseStatus::Active);
    assert!(stored.rcs_breakdown().is_none());
    assert!(!store
        .events(&acme)
        .iter()
        .any(|event| event.name() == "release_scored"));
}

#[test]
fn release_transitions_follow_the_table() {
    let store = MemoryStore::new();
    let acme = tenant("acme");
    let service = default_service(&store);
    let release = create_release(&service, &acme, "4.1.0");

    let err = service
        .transition_release(&acme, release.id(), ReleaseAction::Freeze)
        .expect_err("planned cannot freeze");
    assert!(matches!(
        err,
        ConfidenceServiceError::Domain(DomainError::InvalidTransition { .. })
    ));

    for action in [
        ReleaseAction::Activate,
        ReleaseAction::Freeze,
        ReleaseAction::Unfreeze,
        ReleaseAction::Abort,
    ] {
        service
            .transition_release(&acme, release.id(), action)
            .expect("legal move");
    }
    let aborted = service.get_release(&acme, release.id()).expect("stored");
    assert_eq!(aborted.status(), ReleaseStatus::Aborted);
}

#[test]
fn blank_version_is_rejected() {
    let store = MemoryStore::new();
    let service = default_service(&store);
    let err = service
        .create_release(&tenant("acme"), new_release("  "))
        .expect_err("version required");
    assert!(matches!(
        err,
        ConfidenceServiceError::Domain(DomainError::MissingField { field: "version" })
    ));
}

#[test]
fn without_a_runtime_the_explanation_is_skipped() {
    let store = MemoryStore::new();
    let acme = tenant("acme");
    let service = build_service(&store, rules(), Arc::new(StaticSecurityOps(100.0)));
    let release = create_release(&service, &acme, "5.0.0");

    let result = service.calculate_rcs(&acme, release.id()).expect("scored");
    assert!(service.dispatch_explanation(&acme, &result).is_none());

    let stored = service.get_release(&acme, release.id()).expect("stored");
    assert!(stored.rcs_explanation().is_none());
}

#[tokio::test]
async fn explanation_is_attached_in_the_background() {
    let store = MemoryStore::new();
    let acme = tenant("acme");
    seed_worked_example(&store, &acme);
    let service = build_service(&store, rules(), Arc::new(StaticSecurityOps(100.0)));
    let release = create_release(&service, &acme, "2.4.0");

    let result = service.calculate_rcs(&acme, release.id()).expect("scored");
    service
        .dispatch_explanation(&acme, &result)
        .expect("runtime available")
        .await
        .expect("task completes");

    let stored = service.get_release(&acme, release.id()).expect("stored");
    let explanation = stored.rcs_explanation().expect("explanation stored");
    assert!(explanation
        .summary
        .starts_with("Release confidence is 79/100: ready to ship."));
    assert!(explanation
        .risks
        .iter()
        .any(|risk| risk.contains("critical")));
}

#[tokio::test]
async fn failing_explainer_does_not_affect_the_score() {
    let store = MemoryStore::new();
    let acme = tenant("acme");
    seed_worked_example(&store, &acme);
    let service = build_service(
        &store,
        Arc::new(SharedProvider(Arc::new(FailingExplainer))),
        Arc::new(StaticSecurityOps(100.0)),
    );
    let release = create_release(&service, &acme, "2.4.0");

    let result = service.calculate_rcs(&acme, release.id()).expect("scored");
    assert_eq!(result.display_score, 79);
    service
        .dispatch_explanation(&acme, &result)
        .expect("runtime available")
        .await
        .expect("task swallows the provider error");

    let stored = service.get_release(&acme, release.id()).expect("stored");
    assert_close(stored.rcs_score(), 79.0);
    assert!(stored.rcs_explanation().is_none());
}

#[tokio::test]
async fn tenants_without_a_provider_get_no_explanation() {
    let store = MemoryStore::new();
    let acme = tenant("acme");
    let globex = tenant("globex");
    let service = build_service(
        &store,
        Arc::new(SingleTenantExplanations {
            tenant: acme.clone(),
        }),
        Arc::new(StaticSecurityOps(100.0)),
    );
    let release = create_release(&service, &globex, "1.2.0");

    let result = service.calculate_rcs(&globex, release.id()).expect("scored");
    assert!(service.dispatch_explanation(&globex, &result).is_none());
}

#[tokio::test]
async fn explanation_for_a_superseded_score_is_discarded() {
    let store = MemoryStore::new();
    let acme = tenant("acme");
    let service = build_service(&store, no_explanations(), Arc::new(StaticSecurityOps(100.0)));
    let release = create_release(&service, &acme, "6.0.0");

    let first = service.calculate_rcs(&acme, release.id()).expect("first score");
    let mut latest = service.get_release(&acme, release.id()).expect("stored");
    let next_calculation = first.calculated_at + chrono::Duration::seconds(5);
    latest
        .apply_score(first.score, first.breakdown.clone(), next_calculation)
        .expect("rescored");

    let stale = RcsExplanation {
        summary: "stale".to_string(),
        risks: Vec::new(),
        strengths: Vec::new(),
    };
    assert!(!latest.attach_explanation(stale.clone(), first.calculated_at));
    assert!(latest.attach_explanation(stale.clone(), next_calculation));
    ReleaseRepository::update(&store, &acme, latest).expect("saved");

    let attached = store
        .attach_explanation(&acme, release.id(), first.calculated_at, stale)
        .expect("store reachable");
    assert!(!attached);
}

/// Serves a fixed copy of the release on every read, like a reader that raced a writer.
struct StaleReads {
    store: MemoryStore,
    snapshot: Release,
}

impl ReleaseRepository for StaleReads {
    fn insert(&self, tenant: &TenantId, release: Release) -> Result<Release, RepositoryError> {
        ReleaseRepository::insert(&self.store, tenant, release)
    }

    fn update(&self, tenant: &TenantId, release: Release) -> Result<(), RepositoryError> {
        ReleaseRepository::update(&self.store, tenant, release)
    }

    fn fetch(
        &self,
        _tenant: &TenantId,
        _id: &ReleaseId,
    ) -> Result<Option<Release>, RepositoryError> {
        Ok(Some(self.snapshot.clone()))
    }

    fn list(&self, tenant: &TenantId) -> Result<Vec<Release>, RepositoryError> {
        ReleaseRepository::list(&self.store, tenant)
    }

    fn attach_explanation(
        &self,
        tenant: &TenantId,
        id: &ReleaseId,
        calculated_at: DateTime<Utc>,
        explanation: RcsExplanation,
    ) -> Result<bool, RepositoryError> {
        self.store.attach_explanation(tenant, id, calculated_at, explanation)
    }
}

#[test]
fn late_explanation_never_rolls_back_a_shipped_release() {
    let store = MemoryStore::new();
    let acme = tenant("acme");
    seed_worked_example(&store, &acme);
    let service = default_service(&store);
    let release = create_release(&service, &acme, "3.2.0");
    for action in [ReleaseAction::Activate, ReleaseAction::Freeze] {
        service
            .transition_release(&acme, release.id(), action)
            .expect("moved");
    }
    let frozen = service.get_release(&acme, release.id()).expect("stored");

    let (shipped, _) = service
        .ship_release(&acme, release.id(), Some("hotfix".to_string()))
        .expect("shipped");
    let calculated_at = shipped.view().rcs_calculated_at.expect("scored on ship");

    let stale = StaleReads {
        store: store.clone(),
        snapshot: frozen,
    };
    store_explanation(
        &stale,
        &acme,
        release.id(),
        RcsExplanation {
            summary: "written after shipping".to_string(),
            risks: Vec::new(),
            strengths: Vec::new(),
        },
        calculated_at,
    )
    .expect("explanation stored");

    let stored = service.get_release(&acme, release.id()).expect("stored");
    assert_eq!(stored.status(), ReleaseStatus::Released);
    assert_eq!(
        stored.rcs_explanation().map(|explanation| explanation.summary.as_str()),
        Some("written after shipping")
    );
}
