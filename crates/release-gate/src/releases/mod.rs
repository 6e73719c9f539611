//! Release lifecycle plus the confidence score and gate engine that decides go/no-go.

pub mod confidence;
pub mod domain;
pub mod repository;
pub mod router;

#[cfg(test)]
mod tests;

pub use confidence::{
    ConfidenceServiceError, ConfidenceSources, ExplanationProvider, ExplanationProviders,
    GateEvaluation, GateResult, RcsBreakdown, RcsExplanation, RcsResult,
    ReleaseConfidenceService, RuleBasedExplainer,
};
pub use domain::{NewRelease, Release, ReleaseAction, ReleaseId, ReleaseStatus, ReleaseView};
pub use repository::{ReleaseRepository, SecurityOpsError, SecurityOpsScorer, SoScore};
pub use router::release_router;
