use serde::Serialize;

use super::pillars::RcsResult;
use crate::releases::domain::ReleaseId;
use crate::test_runs::RELEASE_GATE_PASS_RATE;

pub const MIN_RCS_SCORE: f64 = 75.0;
pub const MIN_REQUIREMENTS_READINESS: f64 = 90.0;
pub const MAX_OPEN_HIGH_BUGS: usize = 2;

/// One named pass/fail check in the release checklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GateResult {
    pub name: &'static str,
    pub required: bool,
    pub passed: bool,
    pub message: String,
}

/// Gate checklist outcome for a release, including any manual override.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GateEvaluation {
    pub release_id: ReleaseId,
    pub rcs: RcsResult,
    pub gates: Vec<GateResult>,
    pub can_release: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub override_reason: Option<String>,
}

impl GateEvaluation {
    pub fn required_gates_passed(&self) -> bool {
        self.gates.iter().all(|gate| !gate.required || gate.passed)
    }

    pub fn failing_required(&self) -> Vec<&GateResult> {
        self.gates
            .iter()
            .filter(|gate| gate.required && !gate.passed)
            .collect()
    }

    /// True when the release is only allowed because of the override.
    pub fn overridden(&self) -> bool {
        self.override_reason.is_some() && !self.required_gates_passed()
    }
}

pub(crate) fn evaluate(rcs: RcsResult, override_reason: Option<String>) -> GateEvaluation {
    let override_reason = override_reason
        .map(|reason| reason.trim().to_string())
        .filter(|reason| !reason.is_empty());

    let breakdown = &rcs.breakdown;
    let open = breakdown.details.open_bugs;
    let pass_rate_floor = f64::from(RELEASE_GATE_PASS_RATE);

    let gates = vec![
        GateResult {
            name: "RCS Score >= 75",
            required: true,
            passed: rcs.score >= MIN_RCS_SCORE,
            message: format!(
                "release confidence {:.1} against minimum {MIN_RCS_SCORE:.0}",
                rcs.score
            ),
        },
        GateResult {
            name: "No open critical bugs",
            required: true,
            passed: open.critical == 0,
            message: format!("{} open critical bug(s)", open.critical),
        },
        GateResult {
            name: "Test pass rate >= 80%",
            required: true,
            passed: breakdown.quality_testing >= pass_rate_floor,
            message: format!(
                "latest test run pass rate {:.0}% against minimum {RELEASE_GATE_PASS_RATE}%",
                breakdown.quality_testing
            ),
        },
        GateResult {
            name: "Requirements readiness >= 90%",
            required: false,
            passed: breakdown.requirements_planning >= MIN_REQUIREMENTS_READINESS,
            message: format!(
                "{} of {} requirement(s) ready ({:.0}%)",
                breakdown.details.ready_requirements,
                breakdown.details.total_requirements,
                breakdown.requirements_planning
            ),
        },
        GateResult {
            name: "Open high-severity bugs <= 2",
            required: false,
            passed: open.high <= MAX_OPEN_HIGH_BUGS,
            message: format!(
                "{} open high-severity bug(s), allowance {MAX_OPEN_HIGH_BUGS}",
                open.high
            ),
        },
    ];

    let required_passed = gates.iter().all(|gate| !gate.required || gate.passed);
    GateEvaluation {
        release_id: rcs.release_id.clone(),
        can_release: required_passed || override_reason.is_some(),
        rcs,
        gates,
        override_reason,
    }
}
