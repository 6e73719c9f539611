use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use release_gate::bugs::BugService;
use release_gate::config::{ConfidenceConfig, ExplainerKind};
use release_gate::memory::MemoryStore;
use release_gate::releases::confidence::{NoExplanations, SharedProvider};
use release_gate::releases::{
    ConfidenceSources, ExplanationProviders, ReleaseConfidenceService, ReleaseId,
    RuleBasedExplainer, SecurityOpsError, SecurityOpsScorer, SoScore,
};
use release_gate::requirements::RequirementService;
use release_gate::tenant::TenantId;
use release_gate::test_runs::TestRunService;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Security/ops signal pinned by configuration until a scanner integration exists.
#[derive(Debug, Clone, Copy)]
pub(crate) struct StaticSecurityOps {
    score: f64,
}

impl StaticSecurityOps {
    pub(crate) fn new(score: f64) -> Self {
        Self { score }
    }
}

impl SecurityOpsScorer for StaticSecurityOps {
    fn calculate_so_score(
        &self,
        _tenant: &TenantId,
        _release_id: &ReleaseId,
    ) -> Result<SoScore, SecurityOpsError> {
        let mut details = BTreeMap::new();
        details.insert("source".to_string(), "static configuration".to_string());
        Ok(SoScore {
            score: self.score,
            details,
        })
    }
}

pub(crate) fn explanation_providers(kind: ExplainerKind) -> Arc<dyn ExplanationProviders> {
    match kind {
        ExplainerKind::Rules => Arc::new(SharedProvider(Arc::new(RuleBasedExplainer))),
        ExplainerKind::Disabled => Arc::new(NoExplanations),
    }
}

/// Every service wired against one in-memory store.
#[derive(Clone)]
pub(crate) struct Services {
    pub(crate) bugs: Arc<BugService<MemoryStore, MemoryStore>>,
    pub(crate) test_runs: Arc<TestRunService<MemoryStore, MemoryStore>>,
    pub(crate) requirements: Arc<RequirementService<MemoryStore>>,
    pub(crate) releases: Arc<ReleaseConfidenceService>,
}

impl Services {
    pub(crate) fn in_memory(store: &MemoryStore, config: &ConfidenceConfig) -> Self {
        let shared = Arc::new(store.clone());
        let releases = ReleaseConfidenceService::new(ConfidenceSources {
            releases: shared.clone(),
            requirements: shared.clone(),
            bugs: shared.clone(),
            test_runs: shared.clone(),
            security_ops: Arc::new(StaticSecurityOps::new(config.security_ops_score)),
            explanations: explanation_providers(config.explainer),
            events: shared.clone(),
        });

        Self {
            bugs: Arc::new(BugService::new(shared.clone(), shared.clone())),
            test_runs: Arc::new(TestRunService::new(shared.clone(), shared.clone())),
            requirements: Arc::new(RequirementService::new(shared)),
            releases: Arc::new(releases),
        }
    }
}
