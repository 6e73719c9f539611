use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::confidence::{RcsBreakdown, RcsExplanation};
use crate::events::{DomainEvent, EventKind};
use crate::lifecycle::{require_text, validate_transition, DomainError, LifecycleState};
use crate::tenant::TenantId;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReleaseId(pub String);

impl std::fmt::Display for ReleaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReleaseStatus {
    Planned,
    Active,
    Frozen,
    Released,
    Aborted,
}

impl ReleaseStatus {
    pub const fn is_final(self) -> bool {
        matches!(self, ReleaseStatus::Released | ReleaseStatus::Aborted)
    }
}

impl LifecycleState for ReleaseStatus {
    const ENTITY: &'static str = "release";

    fn allowed_transitions(self) -> &'static [Self] {
        use ReleaseStatus::*;
        match self {
            Planned => &[Active, Aborted],
            Active => &[Frozen, Aborted],
            Frozen => &[Released, Active, Aborted],
            Released => &[],
            Aborted => &[],
        }
    }

    fn label(self) -> &'static str {
        match self {
            ReleaseStatus::Planned => "planned",
            ReleaseStatus::Active => "active",
            ReleaseStatus::Frozen => "frozen",
            ReleaseStatus::Released => "released",
            ReleaseStatus::Aborted => "aborted",
        }
    }
}

/// Manual lifecycle moves; shipping goes through the gate evaluation instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseAction {
    Activate,
    Freeze,
    Unfreeze,
    Abort,
}

impl ReleaseAction {
    pub const fn target(self) -> ReleaseStatus {
        match self {
            ReleaseAction::Activate | ReleaseAction::Unfreeze => ReleaseStatus::Active,
            ReleaseAction::Freeze => ReleaseStatus::Frozen,
            ReleaseAction::Abort => ReleaseStatus::Aborted,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRelease {
    pub version: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub target_date: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct Release {
    id: ReleaseId,
    tenant_id: TenantId,
    version: String,
    name: Option<String>,
    target_date: Option<NaiveDate>,
    status: ReleaseStatus,
    rcs_score: f64,
    rcs_breakdown: Option<RcsBreakdown>,
    rcs_explanation: Option<RcsExplanation>,
    rcs_calculated_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    pending_events: Vec<DomainEvent>,
}

impl Release {
    pub fn create(
        id: ReleaseId,
        tenant_id: TenantId,
        input: NewRelease,
    ) -> Result<Self, DomainError> {
        let version = require_text(&input.version, "version")?;
        let name = input
            .name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());
        let now = Utc::now();

        let mut release = Self {
            id,
            tenant_id,
            version,
            name,
            target_date: input.target_date,
            status: ReleaseStatus::Planned,
            rcs_score: 0.0,
            rcs_breakdown: None,
            rcs_explanation: None,
            rcs_calculated_at: None,
            created_at: now,
            updated_at: now,
            pending_events: Vec::new(),
        };
        release.record(EventKind::ReleaseCreated {
            release_id: release.id.clone(),
            version: release.version.clone(),
        });
        Ok(release)
    }

    pub fn apply(&mut self, action: ReleaseAction) -> Result<(), DomainError> {
        self.change_status(action.target())
    }

    pub fn mark_released(&mut self) -> Result<(), DomainError> {
        self.change_status(ReleaseStatus::Released)
    }

    /// Stores a freshly computed score; any explanation of the previous score is dropped.
    pub fn apply_score(
        &mut self,
        score: f64,
        breakdown: RcsBreakdown,
        calculated_at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if self.status.is_final() {
            return Err(DomainError::TerminalState {
                entity: ReleaseStatus::ENTITY,
                state: self.status.label(),
            });
        }
        self.rcs_score = score;
        self.rcs_breakdown = Some(breakdown);
        self.rcs_explanation = None;
        self.rcs_calculated_at = Some(calculated_at);
        self.updated_at = Utc::now();
        self.record(EventKind::ReleaseScored {
            release_id: self.id.clone(),
            score,
        });
        Ok(())
    }

    /// Attaches an explanation only if it describes the score currently stored.
    pub fn attach_explanation(
        &mut self,
        explanation: RcsExplanation,
        calculated_at: DateTime<Utc>,
    ) -> bool {
        if self.rcs_calculated_at != Some(calculated_at) {
            return false;
        }
        self.rcs_explanation = Some(explanation);
        true
    }

    pub fn drain_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.pending_events)
    }

    pub fn id(&self) -> &ReleaseId {
        &self.id
    }

    pub fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn status(&self) -> ReleaseStatus {
        self.status
    }

    pub fn rcs_score(&self) -> f64 {
        self.rcs_score
    }

    pub fn rcs_breakdown(&self) -> Option<&RcsBreakdown> {
        self.rcs_breakdown.as_ref()
    }

    pub fn rcs_explanation(&self) -> Option<&RcsExplanation> {
        self.rcs_explanation.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn view(&self) -> ReleaseView {
        ReleaseView {
            id: self.id.clone(),
            version: self.version.clone(),
            name: self.name.clone(),
            target_date: self.target_date,
            status: self.status,
            rcs_score: self.rcs_score,
            rcs_display_score: self.rcs_score.round() as u8,
            rcs_breakdown: self.rcs_breakdown.clone(),
            rcs_explanation: self.rcs_explanation.clone(),
            rcs_calculated_at: self.rcs_calculated_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    fn change_status(&mut self, next: ReleaseStatus) -> Result<(), DomainError> {
        validate_transition(self.status, next)?;
        let from = self.status;
        self.status = next;
        self.updated_at = Utc::now();
        self.record(EventKind::ReleaseStatusChanged {
            release_id: self.id.clone(),
            from,
            to: next,
        });
        Ok(())
    }

    fn record(&mut self, kind: EventKind) {
        self.pending_events
            .push(DomainEvent::new(self.tenant_id.clone(), kind));
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReleaseView {
    pub id: ReleaseId,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_date: Option<NaiveDate>,
    pub status: ReleaseStatus,
    pub rcs_score: f64,
    pub rcs_display_score: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rcs_breakdown: Option<RcsBreakdown>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rcs_explanation: Option<RcsExplanation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rcs_calculated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
