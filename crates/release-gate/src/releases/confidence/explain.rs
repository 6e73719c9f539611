use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::gates::{MAX_OPEN_HIGH_BUGS, MIN_RCS_SCORE, MIN_REQUIREMENTS_READINESS};
use super::pillars::RcsBreakdown;
use crate::tenant::TenantId;
use crate::test_runs::RELEASE_GATE_PASS_RATE;

/// Narrative attached to a release after scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RcsExplanation {
    pub summary: String,
    pub risks: Vec<String>,
    pub strengths: Vec<String>,
}

/// Pluggable narrator for a confidence score (local model, hosted LLM, rules).
#[async_trait]
pub trait ExplanationProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn explain_rcs(
        &self,
        score: f64,
        breakdown: &RcsBreakdown,
    ) -> Result<RcsExplanation, ExplainError>;
}

/// Resolves the provider configured for a tenant, if any.
pub trait ExplanationProviders: Send + Sync {
    fn provider_for(&self, tenant: &TenantId) -> Option<Arc<dyn ExplanationProvider>>;
}

#[derive(Debug, thiserror::Error)]
pub enum ExplainError {
    #[error("explanation provider unavailable: {0}")]
    Unavailable(String),
    #[error("explanation provider returned an unusable answer: {0}")]
    Malformed(String),
}

/// Tenants never receive an explanation.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoExplanations;

impl ExplanationProviders for NoExplanations {
    fn provider_for(&self, _tenant: &TenantId) -> Option<Arc<dyn ExplanationProvider>> {
        None
    }
}

/// Every tenant shares one provider.
#[derive(Clone)]
pub struct SharedProvider(pub Arc<dyn ExplanationProvider>);

impl ExplanationProviders for SharedProvider {
    fn provider_for(&self, _tenant: &TenantId) -> Option<Arc<dyn ExplanationProvider>> {
        Some(Arc::clone(&self.0))
    }
}

/// Deterministic narrator built from the gate thresholds; needs no network access.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleBasedExplainer;

#[async_trait]
impl ExplanationProvider for RuleBasedExplainer {
    fn name(&self) -> &'static str {
        "rules"
    }

    async fn explain_rcs(
        &self,
        score: f64,
        breakdown: &RcsBreakdown,
    ) -> Result<RcsExplanation, ExplainError> {
        Ok(narrate(score, breakdown))
    }
}

pub(crate) fn narrate(score: f64, breakdown: &RcsBreakdown) -> RcsExplanation {
    let verdict = if score >= MIN_RCS_SCORE {
        "ready to ship"
    } else if score >= 50.0 {
        "at risk"
    } else {
        "not ready"
    };
    let open = &breakdown.details.open_bugs;
    let pass_rate_floor = f64::from(RELEASE_GATE_PASS_RATE);

    let mut risks = Vec::new();
    let mut strengths = Vec::new();

    if open.critical > 0 {
        risks.push(format!(
            "{} critical bug(s) still open and blocking the release",
            open.critical
        ));
    }
    if open.high > MAX_OPEN_HIGH_BUGS {
        risks.push(format!(
            "{} high-severity bugs open, above the allowance of {MAX_OPEN_HIGH_BUGS}",
            open.high
        ));
    }
    if breakdown.details.latest_test_run.is_none() {
        risks.push("no test run has been recorded".to_string());
    } else if breakdown.quality_testing < pass_rate_floor {
        risks.push(format!(
            "latest pass rate {:.0}% is below the {RELEASE_GATE_PASS_RATE}% gate",
            breakdown.quality_testing
        ));
    } else {
        strengths.push(format!(
            "latest pass rate {:.0}% clears the test gate",
            breakdown.quality_testing
        ));
    }
    if breakdown.requirements_planning < MIN_REQUIREMENTS_READINESS {
        risks.push(format!(
            "only {} of {} requirement(s) are ready",
            breakdown.details.ready_requirements, breakdown.details.total_requirements
        ));
    } else {
        strengths.push("requirements are substantially ready".to_string());
    }
    if open.total() == 0 {
        strengths.push("no open bugs".to_string());
    }
    if breakdown.security_ops >= 90.0 {
        strengths.push(format!(
            "security & ops checks score {:.0}",
            breakdown.security_ops
        ));
    } else if breakdown.security_ops < 50.0 {
        risks.push(format!(
            "security & ops checks score only {:.0}",
            breakdown.security_ops
        ));
    }

    RcsExplanation {
        summary: format!(
            "Release confidence is {:.0}/100: {verdict}. Quality {:.0}, bugs {:.0}, requirements {:.0}, security & ops {:.0}.",
            score.round(),
            breakdown.quality_testing,
            breakdown.bugs,
            breakdown.requirements_planning,
            breakdown.security_ops
        ),
        risks,
        strengths,
    }
}
