//! Shared transition-table plumbing for the bug, test run, and release aggregates.
//!
//! Each status enum lists its legal successors in one `match`; every mutation goes through
//! [`validate_transition`] so the rules stay auditable in a single place per aggregate.

/// Invariant violations raised synchronously by aggregates.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    #[error("{field} must not be empty")]
    MissingField { field: &'static str },
    #[error("{0}")]
    Invalid(String),
    #[error("cannot move {entity} from {from} to {to}")]
    InvalidTransition {
        entity: &'static str,
        from: &'static str,
        to: &'static str,
    },
    #[error("{entity} is {state} and no longer accepts changes")]
    TerminalState {
        entity: &'static str,
        state: &'static str,
    },
    #[error("bug has already been triaged; use a triage update instead")]
    AlreadyTriaged,
}

/// A status enum backed by a literal transition table.
pub trait LifecycleState: Copy + Eq + 'static {
    const ENTITY: &'static str;

    fn allowed_transitions(self) -> &'static [Self];

    fn label(self) -> &'static str;

    fn can_transition_to(self, next: Self) -> bool {
        self.allowed_transitions().contains(&next)
    }
}

pub fn validate_transition<S: LifecycleState>(from: S, to: S) -> Result<(), DomainError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(DomainError::InvalidTransition {
            entity: S::ENTITY,
            from: from.label(),
            to: to.label(),
        })
    }
}

pub(crate) fn require_text(value: &str, field: &'static str) -> Result<String, DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(DomainError::MissingField { field })
    } else {
        Ok(trimmed.to_string())
    }
}
