//! Release Confidence Score (RCS) aggregation and release-gate evaluation.
//!
//! Four pillars are scored independently on a 0-100 scale and combined as
//! `QT*0.4 + B*0.3 + RP*0.2 + SO*0.1`:
//!
//! * RP (requirements & planning): share of requirements marked ready.
//! * QT (quality & testing): pass rate of the latest test run.
//! * B (bugs): 100 minus a severity-keyed deduction per open bug.
//! * SO (security & ops): opaque score from [`SecurityOpsScorer`](super::SecurityOpsScorer).

mod explain;
mod gates;
mod pillars;
mod service;

pub use explain::{
    ExplainError, ExplanationProvider, ExplanationProviders, NoExplanations, RcsExplanation,
    RuleBasedExplainer, SharedProvider,
};
pub use gates::{
    GateEvaluation, GateResult, MAX_OPEN_HIGH_BUGS, MIN_RCS_SCORE, MIN_REQUIREMENTS_READINESS,
};
pub use pillars::{
    bug_score, combine, open_bug_deduction, quality_score, requirements_score, OpenBugCounts,
    RcsBreakdown, RcsDetails, RcsResult, BUGS_WEIGHT, QUALITY_WEIGHT, REQUIREMENTS_WEIGHT,
    SECURITY_OPS_WEIGHT,
};
pub use service::{ConfidenceServiceError, ConfidenceSources, ReleaseConfidenceService};

#[cfg(test)]
pub(crate) use explain::narrate;
#[cfg(test)]
pub(crate) use gates::evaluate;
#[cfg(test)]
pub(crate) use pillars::score_pillars;
#[cfg(test)]
pub(crate) use service::store_explanation;
