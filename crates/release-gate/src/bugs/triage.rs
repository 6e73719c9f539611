use serde::{Deserialize, Serialize};

/// Technical severity assigned during triage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BugSeverity {
    Critical,
    High,
    Medium,
    Low,
}

impl BugSeverity {
    /// Share of the 0-100 impact score contributed by severity (max 50).
    pub const fn impact_weight(self) -> u8 {
        match self {
            BugSeverity::Critical => 50,
            BugSeverity::High => 35,
            BugSeverity::Medium => 20,
            BugSeverity::Low => 10,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            BugSeverity::Critical => "critical",
            BugSeverity::High => "high",
            BugSeverity::Medium => "medium",
            BugSeverity::Low => "low",
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            BugSeverity::Critical => "system unusable or data loss; blocks release",
            BugSeverity::High => "major feature broken without a reasonable workaround",
            BugSeverity::Medium => "feature degraded but a workaround exists",
            BugSeverity::Low => "cosmetic or minor inconvenience",
        }
    }
}

/// Business priority assigned during triage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BugPriority {
    P0,
    P1,
    P2,
    P3,
}

impl BugPriority {
    /// Share of the 0-100 impact score contributed by priority (max 30).
    pub const fn impact_weight(self) -> u8 {
        match self {
            BugPriority::P0 => 30,
            BugPriority::P1 => 20,
            BugPriority::P2 => 10,
            BugPriority::P3 => 5,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            BugPriority::P0 => "P0",
            BugPriority::P1 => "P1",
            BugPriority::P2 => "P2",
            BugPriority::P3 => "P3",
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            BugPriority::P0 => "drop everything; fix before the next release",
            BugPriority::P1 => "fix in the current sprint",
            BugPriority::P2 => "schedule in an upcoming sprint",
            BugPriority::P3 => "backlog",
        }
    }
}

/// Bonus applied to the impact score while a bug is still unresolved.
pub(crate) const ACTIVE_BUG_BONUS: u8 = 20;

pub(crate) fn impact_score(
    severity: Option<BugSeverity>,
    priority: Option<BugPriority>,
    unresolved: bool,
) -> u8 {
    let severity = severity.map(BugSeverity::impact_weight).unwrap_or(0) as u16;
    let priority = priority.map(BugPriority::impact_weight).unwrap_or(0) as u16;
    let activity = if unresolved { ACTIVE_BUG_BONUS as u16 } else { 0 };
    (severity + priority + activity).min(100) as u8
}
