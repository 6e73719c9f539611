//! Bug tracking: the triage lifecycle, release-blocking rules, and impact scoring.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;
mod triage;


pub use domain::{Bug, BugId, BugStatus, BugView, NewBug, TriageUpdate};
pub use repository::BugRepository;
pub use router::bug_router;
pub use service::{BugAction, BugService, BugServiceError};
pub use triage::{BugPriority, BugSeverity};
