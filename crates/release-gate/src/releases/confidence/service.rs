use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::explain::{ExplanationProvider, ExplanationProviders, RcsExplanation};
use super::gates::{self, GateEvaluation};
use super::pillars::{score_pillars, RcsBreakdown, RcsResult};
use crate::bugs::BugRepository;
use crate::events::{publish_best_effort, EventStore};
use crate::lifecycle::{validate_transition, DomainError};
use crate::releases::domain::{NewRelease, Release, ReleaseAction, ReleaseId, ReleaseStatus};
use crate::releases::repository::{ReleaseRepository, SecurityOpsError, SecurityOpsScorer};
use crate::repository::RepositoryError;
use crate::requirements::RequirementRepository;
use crate::tenant::TenantId;
use crate::test_runs::TestRunRepository;

/// Collaborators the confidence service reads from and writes to.
#[derive(Clone)]
pub struct ConfidenceSources {
    pub releases: Arc<dyn ReleaseRepository>,
    pub requirements: Arc<dyn RequirementRepository>,
    pub bugs: Arc<dyn BugRepository>,
    pub test_runs: Arc<dyn TestRunRepository>,
    pub security_ops: Arc<dyn SecurityOpsScorer>,
    pub explanations: Arc<dyn ExplanationProviders>,
    pub events: Arc<dyn EventStore>,
}

/// Computes release confidence scores and evaluates release gates.
pub struct ReleaseConfidenceService {
    sources: ConfidenceSources,
}

static RELEASE_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_release_id() -> ReleaseId {
    let id = RELEASE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ReleaseId(format!("rel-{id:06}"))
}

impl ReleaseConfidenceService {
    pub fn new(sources: ConfidenceSources) -> Self {
        Self { sources }
    }

    pub fn create_release(
        &self,
        tenant: &TenantId,
        input: NewRelease,
    ) -> Result<Release, ConfidenceServiceError> {
        let mut release = Release::create(next_release_id(), tenant.clone(), input)?;
        let events = release.drain_events();
        let stored = self.sources.releases.insert(tenant, release)?;
        publish_best_effort(&*self.sources.events, tenant, events);
        info!(%tenant, release = %stored.id(), version = stored.version(), "release planned");
        Ok(stored)
    }

    pub fn get_release(
        &self,
        tenant: &TenantId,
        id: &ReleaseId,
    ) -> Result<Release, ConfidenceServiceError> {
        let release = self
            .sources
            .releases
            .fetch(tenant, id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(release)
    }

    pub fn list_releases(&self, tenant: &TenantId) -> Result<Vec<Release>, ConfidenceServiceError> {
        Ok(self.sources.releases.list(tenant)?)
    }

    pub fn transition_release(
        &self,
        tenant: &TenantId,
        id: &ReleaseId,
        action: ReleaseAction,
    ) -> Result<Release, ConfidenceServiceError> {
        let mut release = self.get_release(tenant, id)?;
        release.apply(action)?;
        self.save(tenant, &mut release)?;
        info!(%tenant, release = %id, status = ?release.status(), "release status changed");
        Ok(release)
    }

    /// Scores the release, persists the result, and kicks off the explanation task.
    pub fn calculate_rcs(
        &self,
        tenant: &TenantId,
        release_id: &ReleaseId,
    ) -> Result<RcsResult, ConfidenceServiceError> {
        let mut release = self.get_release(tenant, release_id)?;

        let requirements = self.sources.requirements.list(tenant)?;
        let bugs = self.sources.bugs.list(tenant)?;
        let test_runs = self.sources.test_runs.list(tenant)?;
        let security_ops = self
            .sources
            .security_ops
            .calculate_so_score(tenant, release_id)?;

        let breakdown = score_pillars(&requirements, &bugs, &test_runs, security_ops);
        let result = RcsResult::new(release_id.clone(), breakdown);

        release.apply_score(result.score, result.breakdown.clone(), result.calculated_at)?;
        self.save(tenant, &mut release)?;

        info!(
            %tenant,
            release = %release_id,
            score = result.display_score,
            qt = result.breakdown.quality_testing,
            b = result.breakdown.bugs,
            rp = result.breakdown.requirements_planning,
            so = result.breakdown.security_ops,
            "release confidence calculated"
        );

        self.dispatch_explanation(tenant, &result);
        Ok(result)
    }

    /// Recomputes the score and runs the gate checklist against it.
    pub fn evaluate_gates(
        &self,
        tenant: &TenantId,
        release_id: &ReleaseId,
        override_reason: Option<String>,
    ) -> Result<GateEvaluation, ConfidenceServiceError> {
        let rcs = self.calculate_rcs(tenant, release_id)?;
        let evaluation = gates::evaluate(rcs, override_reason);

        if evaluation.overridden() {
            let failing: Vec<&str> = evaluation
                .failing_required()
                .iter()
                .map(|gate| gate.name)
                .collect();
            warn!(
                %tenant,
                release = %release_id,
                reason = evaluation.override_reason.as_deref().unwrap_or_default(),
                ?failing,
                "required release gates bypassed by override"
            );
        }
        Ok(evaluation)
    }

    /// Moves a frozen release to `Released` when its gates allow it.
    pub fn ship_release(
        &self,
        tenant: &TenantId,
        release_id: &ReleaseId,
        override_reason: Option<String>,
    ) -> Result<(Release, GateEvaluation), ConfidenceServiceError> {
        let current = self.get_release(tenant, release_id)?;
        validate_transition(current.status(), ReleaseStatus::Released)?;

        let evaluation = self.evaluate_gates(tenant, release_id, override_reason)?;
        if !evaluation.can_release {
            let failing = evaluation
                .failing_required()
                .iter()
                .map(|gate| gate.name.to_string())
                .collect();
            return Err(ConfidenceServiceError::GateBlocked { failing });
        }

        let mut release = self.get_release(tenant, release_id)?;
        release.mark_released()?;
        self.save(tenant, &mut release)?;
        info!(%tenant, release = %release_id, "release shipped");
        Ok((release, evaluation))
    }

    fn save(&self, tenant: &TenantId, release: &mut Release) -> Result<(), ConfidenceServiceError> {
        let events = release.drain_events();
        self.sources.releases.update(tenant, release.clone())?;
        publish_best_effort(&*self.sources.events, tenant, events);
        Ok(())
    }

    /// Fire-and-forget: the returned handle exists for tests, callers never await it.
    pub(crate) fn dispatch_explanation(
        &self,
        tenant: &TenantId,
        result: &RcsResult,
    ) -> Option<JoinHandle<()>> {
        let Some(provider) = self.sources.explanations.provider_for(tenant) else {
            debug!(%tenant, "no explanation provider configured");
            return None;
        };
        let Ok(handle) = Handle::try_current() else {
            debug!(%tenant, "no async runtime available; skipping rcs explanation");
            return None;
        };

        let releases = Arc::clone(&self.sources.releases);
        let tenant = tenant.clone();
        let release_id = result.release_id.clone();
        let score = result.score;
        let breakdown = result.breakdown.clone();
        let calculated_at = result.calculated_at;

        Some(handle.spawn(async move {
            explain_and_attach(
                provider,
                releases,
                tenant,
                release_id,
                score,
                breakdown,
                calculated_at,
            )
            .await;
        }))
    }
}

async fn explain_and_attach(
    provider: Arc<dyn ExplanationProvider>,
    releases: Arc<dyn ReleaseRepository>,
    tenant: TenantId,
    release_id: ReleaseId,
    score: f64,
    breakdown: RcsBreakdown,
    calculated_at: DateTime<Utc>,
) {
    let explanation = match provider.explain_rcs(score, &breakdown).await {
        Ok(explanation) => explanation,
        Err(err) => {
            warn!(%tenant, release = %release_id, provider = provider.name(), error = %err, "rcs explanation failed");
            return;
        }
    };

    if let Err(err) =
        store_explanation(&*releases, &tenant, &release_id, explanation, calculated_at)
    {
        warn!(%tenant, release = %release_id, error = %err, "could not store rcs explanation");
    }
}

pub(crate) fn store_explanation(
    releases: &dyn ReleaseRepository,
    tenant: &TenantId,
    release_id: &ReleaseId,
    explanation: RcsExplanation,
    calculated_at: DateTime<Utc>,
) -> Result<(), RepositoryError> {
    if releases.attach_explanation(tenant, release_id, calculated_at, explanation)? {
        debug!(%tenant, release = %release_id, "rcs explanation stored");
    } else {
        debug!(%tenant, release = %release_id, "discarding explanation for a superseded score");
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum ConfidenceServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    SecurityOps(#[from] SecurityOpsError),
    #[error("release blocked by required gates: {}", failing.join(", "))]
    GateBlocked { failing: Vec<String> },
}
