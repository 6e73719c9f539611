use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::bugs::{Bug, BugSeverity};
use crate::releases::domain::ReleaseId;
use crate::releases::repository::SoScore;
use crate::requirements::Requirement;
use crate::test_runs::{TestRun, TestRunId};

/// Pillar weights in tenths of the total.
pub const QUALITY_WEIGHT: u8 = 4;
pub const BUGS_WEIGHT: u8 = 3;
pub const REQUIREMENTS_WEIGHT: u8 = 2;
pub const SECURITY_OPS_WEIGHT: u8 = 1;

/// The four pillar sub-scores (each 0-100) plus the inputs they were derived from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RcsBreakdown {
    pub requirements_planning: f64,
    pub quality_testing: f64,
    pub bugs: f64,
    pub security_ops: f64,
    pub details: RcsDetails,
}

impl RcsBreakdown {
    pub fn total(&self) -> f64 {
        combine(
            self.quality_testing,
            self.bugs,
            self.requirements_planning,
            self.security_ops,
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RcsDetails {
    pub ready_requirements: usize,
    pub total_requirements: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_test_run: Option<TestRunId>,
    pub open_bugs: OpenBugCounts,
    #[serde(default)]
    pub security_ops: BTreeMap<String, String>,
}

/// Open (not resolved/closed) bugs grouped by severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenBugCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub untriaged: usize,
}

impl OpenBugCounts {
    pub fn total(&self) -> usize {
        self.critical + self.high + self.medium + self.low + self.untriaged
    }

    fn add(&mut self, severity: Option<BugSeverity>) {
        match severity {
            Some(BugSeverity::Critical) => self.critical += 1,
            Some(BugSeverity::High) => self.high += 1,
            Some(BugSeverity::Medium) => self.medium += 1,
            Some(BugSeverity::Low) => self.low += 1,
            None => self.untriaged += 1,
        }
    }
}

/// Outcome of one confidence calculation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RcsResult {
    pub release_id: ReleaseId,
    pub score: f64,
    pub display_score: u8,
    pub breakdown: RcsBreakdown,
    pub calculated_at: DateTime<Utc>,
}

impl RcsResult {
    pub fn new(release_id: ReleaseId, breakdown: RcsBreakdown) -> Self {
        let score = breakdown.total();
        Self {
            release_id,
            score,
            display_score: score.round() as u8,
            breakdown,
            calculated_at: Utc::now(),
        }
    }
}

/// `ready / max(total, 1) * 100`.
pub fn requirements_score(ready: usize, total: usize) -> f64 {
    ready as f64 / total.max(1) as f64 * 100.0
}

/// Pass rate of the most recently created run, or 0 with no runs.
pub fn quality_score(runs: &[TestRun]) -> (f64, Option<TestRunId>) {
    runs.iter()
        .max_by(|a, b| {
            a.created_at()
                .cmp(&b.created_at())
                .then_with(|| a.id().cmp(b.id()))
        })
        .map(|run| (f64::from(run.pass_rate()), Some(run.id().clone())))
        .unwrap_or((0.0, None))
}

pub const fn open_bug_deduction(severity: Option<BugSeverity>) -> f64 {
    match severity {
        Some(BugSeverity::Critical) => 40.0,
        Some(BugSeverity::High) => 20.0,
        Some(BugSeverity::Medium) => 10.0,
        _ => 2.0,
    }
}

/// `100 - sum(deduction)` over open bugs, floored at 0.
pub fn bug_score(bugs: &[Bug]) -> (f64, OpenBugCounts) {
    let mut counts = OpenBugCounts::default();
    let mut score = 100.0;
    for bug in bugs.iter().filter(|bug| bug.status().is_open()) {
        counts.add(bug.severity());
        score -= open_bug_deduction(bug.severity());
    }
    (f64::max(score, 0.0), counts)
}

pub fn combine(quality: f64, bugs: f64, requirements: f64, security_ops: f64) -> f64 {
    // Summed in tenths so whole-number pillars land exactly on gate thresholds.
    (quality * f64::from(QUALITY_WEIGHT)
        + bugs * f64::from(BUGS_WEIGHT)
        + requirements * f64::from(REQUIREMENTS_WEIGHT)
        + security_ops * f64::from(SECURITY_OPS_WEIGHT))
        / 10.0
}

pub(crate) fn score_pillars(
    requirements: &[Requirement],
    bugs: &[Bug],
    runs: &[TestRun],
    security_ops: SoScore,
) -> RcsBreakdown {
    let total_requirements = requirements.len();
    let ready_requirements = requirements
        .iter()
        .filter(|requirement| requirement.status.is_ready())
        .count();
    let (quality_testing, latest_test_run) = quality_score(runs);
    let (bugs, open_bugs) = bug_score(bugs);

    RcsBreakdown {
        requirements_planning: requirements_score(ready_requirements, total_requirements),
        quality_testing,
        bugs,
        security_ops: security_ops.score.clamp(0.0, 100.0),
        details: RcsDetails {
            ready_requirements,
            total_requirements,
            latest_test_run,
            open_bugs,
            security_ops: security_ops.details,
        },
    }
}
