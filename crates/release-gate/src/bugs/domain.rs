use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::triage::{self, BugPriority, BugSeverity};
use crate::events::{DomainEvent, EventKind};
use crate::lifecycle::{require_text, validate_transition, DomainError, LifecycleState};
use crate::tenant::TenantId;

/// Identifier wrapper for tracked bugs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BugId(pub String);

impl std::fmt::Display for BugId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BugStatus {
    Open,
    Triaged,
    InProgress,
    Resolved,
    Verified,
    Closed,
    Deferred,
    Invalid,
}

impl BugStatus {
    /// Terminal states only leave through a reopen.
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            BugStatus::Resolved | BugStatus::Closed | BugStatus::Deferred | BugStatus::Invalid
        )
    }

    /// Open for scoring purposes: anything not resolved or closed.
    pub const fn is_open(self) -> bool {
        !matches!(self, BugStatus::Resolved | BugStatus::Closed)
    }
}

impl LifecycleState for BugStatus {
    const ENTITY: &'static str = "bug";

    fn allowed_transitions(self) -> &'static [Self] {
        use BugStatus::*;
        match self {
            Open => &[Triaged, InProgress, Deferred, Invalid],
            Triaged => &[InProgress, Resolved, Deferred, Invalid],
            InProgress => &[Resolved, Deferred, Invalid],
            Resolved => &[Verified, Closed, Open],
            Verified => &[Closed, Open],
            Closed => &[Open],
            Deferred => &[Open],
            Invalid => &[Open],
        }
    }

    fn label(self) -> &'static str {
        match self {
            BugStatus::Open => "open",
            BugStatus::Triaged => "triaged",
            BugStatus::InProgress => "in_progress",
            BugStatus::Resolved => "resolved",
            BugStatus::Verified => "verified",
            BugStatus::Closed => "closed",
            BugStatus::Deferred => "deferred",
            BugStatus::Invalid => "invalid",
        }
    }
}

/// Intake payload for a new bug report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBug {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub severity: Option<BugSeverity>,
    #[serde(default)]
    pub priority: Option<BugPriority>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Partial edit of triage fields; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageUpdate {
    #[serde(default)]
    pub severity: Option<BugSeverity>,
    #[serde(default)]
    pub priority: Option<BugPriority>,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

impl TriageUpdate {
    fn is_empty(&self) -> bool {
        self.severity.is_none()
            && self.priority.is_none()
            && self.assigned_to.is_none()
            && self.tags.is_none()
    }
}

/// Bug aggregate owning its triage lifecycle.
#[derive(Debug, Clone)]
pub struct Bug {
    id: BugId,
    tenant_id: TenantId,
    title: String,
    description: String,
    status: BugStatus,
    severity: Option<BugSeverity>,
    priority: Option<BugPriority>,
    assigned_to: Option<String>,
    tags: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
    pending_events: Vec<DomainEvent>,
}

impl Bug {
    pub fn create(id: BugId, tenant_id: TenantId, input: NewBug) -> Result<Self, DomainError> {
        let title = require_text(&input.title, "title")?;
        let description = require_text(&input.description, "description")?;
        let now = Utc::now();

        let mut bug = Self {
            id,
            tenant_id,
            title,
            description,
            status: BugStatus::Open,
            severity: input.severity,
            priority: input.priority,
            assigned_to: None,
            tags: normalize_tags(input.tags),
            created_at: now,
            updated_at: now,
            resolved_at: None,
            pending_events: Vec::new(),
        };
        bug.record(EventKind::BugCreated {
            bug_id: bug.id.clone(),
            title: bug.title.clone(),
        });
        Ok(bug)
    }

    pub fn triage(
        &mut self,
        severity: BugSeverity,
        priority: BugPriority,
        assigned_to: &str,
    ) -> Result<(), DomainError> {
        self.ensure_editable()?;
        if self.status == BugStatus::Triaged {
            return Err(DomainError::AlreadyTriaged);
        }
        let assigned_to = require_text(assigned_to, "assigned_to")?;
        validate_transition(self.status, BugStatus::Triaged)?;

        self.severity = Some(severity);
        self.priority = Some(priority);
        self.assigned_to = Some(assigned_to.clone());
        self.move_to(BugStatus::Triaged);
        self.record(EventKind::BugTriaged {
            bug_id: self.id.clone(),
            severity,
            priority,
            assigned_to,
        });
        Ok(())
    }

    pub fn update_triage(&mut self, update: TriageUpdate) -> Result<(), DomainError> {
        self.ensure_editable()?;
        if update.is_empty() {
            return Err(DomainError::Invalid(
                "triage update must change at least one field".to_string(),
            ));
        }
        let assigned_to = update
            .assigned_to
            .as_deref()
            .map(|value| require_text(value, "assigned_to"))
            .transpose()?;

        if let Some(severity) = update.severity {
            self.severity = Some(severity);
        }
        if let Some(priority) = update.priority {
            self.priority = Some(priority);
        }
        if let Some(assignee) = &assigned_to {
            self.assigned_to = Some(assignee.clone());
        }
        if let Some(tags) = update.tags {
            self.tags = normalize_tags(tags);
        }
        self.updated_at = Utc::now();
        self.record(EventKind::BugTriageUpdated {
            bug_id: self.id.clone(),
            severity: update.severity,
            priority: update.priority,
            assigned_to,
        });
        Ok(())
    }

    pub fn mark_in_progress(&mut self) -> Result<(), DomainError> {
        self.change_status(BugStatus::InProgress)
    }

    pub fn mark_resolved(&mut self) -> Result<(), DomainError> {
        validate_transition(self.status, BugStatus::Resolved)?;
        self.move_to(BugStatus::Resolved);
        self.resolved_at = Some(self.updated_at);
        self.record(EventKind::BugResolved {
            bug_id: self.id.clone(),
        });
        Ok(())
    }

    pub fn mark_verified(&mut self) -> Result<(), DomainError> {
        self.change_status(BugStatus::Verified)
    }

    pub fn mark_closed(&mut self) -> Result<(), DomainError> {
        self.change_status(BugStatus::Closed)
    }

    pub fn defer(&mut self) -> Result<(), DomainError> {
        self.change_status(BugStatus::Deferred)
    }

    pub fn mark_invalid(&mut self) -> Result<(), DomainError> {
        self.change_status(BugStatus::Invalid)
    }

    /// Sends a resolved-like bug back to `Open`.
    pub fn reopen(&mut self, reason: Option<String>) -> Result<(), DomainError> {
        validate_transition(self.status, BugStatus::Open)?;
        self.move_to(BugStatus::Open);
        self.resolved_at = None;
        let reason = reason
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        self.record(EventKind::BugReopened {
            bug_id: self.id.clone(),
            reason,
        });
        Ok(())
    }

    /// Critical severity or P0 priority on a bug that is not resolved/closed.
    pub fn blocks_release(&self) -> bool {
        let urgent = self.severity == Some(BugSeverity::Critical)
            || self.priority == Some(BugPriority::P0);
        urgent && self.status.is_open()
    }

    pub fn impact_score(&self) -> u8 {
        triage::impact_score(self.severity, self.priority, self.status.is_open())
    }

    pub fn drain_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.pending_events)
    }

    pub fn pending_events(&self) -> &[DomainEvent] {
        &self.pending_events
    }

    pub fn id(&self) -> &BugId {
        &self.id
    }

    pub fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn status(&self) -> BugStatus {
        self.status
    }

    pub fn severity(&self) -> Option<BugSeverity> {
        self.severity
    }

    pub fn priority(&self) -> Option<BugPriority> {
        self.priority
    }

    pub fn assigned_to(&self) -> Option<&str> {
        self.assigned_to.as_deref()
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn view(&self) -> BugView {
        BugView {
            id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            status: self.status,
            severity: self.severity,
            priority: self.priority,
            assigned_to: self.assigned_to.clone(),
            tags: self.tags.clone(),
            blocks_release: self.blocks_release(),
            impact_score: self.impact_score(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            resolved_at: self.resolved_at,
        }
    }

    fn ensure_editable(&self) -> Result<(), DomainError> {
        if self.status.is_terminal() {
            return Err(DomainError::TerminalState {
                entity: BugStatus::ENTITY,
                state: self.status.label(),
            });
        }
        Ok(())
    }

    fn change_status(&mut self, next: BugStatus) -> Result<(), DomainError> {
        validate_transition(self.status, next)?;
        let from = self.move_to(next);
        self.record(EventKind::BugStatusChanged {
            bug_id: self.id.clone(),
            from,
            to: next,
        });
        Ok(())
    }

    fn move_to(&mut self, next: BugStatus) -> BugStatus {
        let from = self.status;
        self.status = next;
        self.updated_at = Utc::now();
        from
    }

    fn record(&mut self, kind: EventKind) {
        self.pending_events
            .push(DomainEvent::new(self.tenant_id.clone(), kind));
    }
}

fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut tags: Vec<String> = tags
        .into_iter()
        .map(|tag| tag.trim().to_ascii_lowercase())
        .filter(|tag| !tag.is_empty())
        .collect();
    tags.sort();
    tags.dedup();
    tags
}

/// Serializable projection returned by the HTTP layer.
#[derive(Debug, Clone, Serialize)]
pub struct BugView {
    pub id: BugId,
    pub title: String,
    pub description: String,
    pub status: BugStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<BugSeverity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<BugPriority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    pub tags: Vec<String>,
    pub blocks_release: bool,
    pub impact_score: u8,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}
