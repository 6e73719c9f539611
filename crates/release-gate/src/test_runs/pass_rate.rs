use serde::{Deserialize, Serialize};

/// Minimum pass rate (percent) a run needs to satisfy the release gate.
pub const RELEASE_GATE_PASS_RATE: u8 = 80;

/// Qualitative band for a run's pass rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PassRateStatus {
    Excellent,
    Good,
    Acceptable,
    NeedsAttention,
    Critical,
}

impl PassRateStatus {
    pub const fn from_rate(rate: u8) -> Self {
        match rate {
            95..=u8::MAX => PassRateStatus::Excellent,
            85..=94 => PassRateStatus::Good,
            75..=84 => PassRateStatus::Acceptable,
            50..=74 => PassRateStatus::NeedsAttention,
            _ => PassRateStatus::Critical,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            PassRateStatus::Excellent => "excellent",
            PassRateStatus::Good => "good",
            PassRateStatus::Acceptable => "acceptable",
            PassRateStatus::NeedsAttention => "needs_attention",
            PassRateStatus::Critical => "critical",
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            PassRateStatus::Excellent => "suite is healthy",
            PassRateStatus::Good => "minor failures worth reviewing",
            PassRateStatus::Acceptable => "failures need follow-up before release",
            PassRateStatus::NeedsAttention => "significant failures; investigate before continuing",
            PassRateStatus::Critical => "suite is largely failing",
        }
    }
}

/// `round(passed / (passed + failed + skipped) * 100)`, or 0 for an empty run.
pub fn pass_rate(passed: u32, failed: u32, skipped: u32) -> u8 {
    let total = u64::from(passed) + u64::from(failed) + u64::from(skipped);
    if total == 0 {
        return 0;
    }
    (passed as f64 / total as f64 * 100.0).round() as u8
}

pub fn meets_release_gate(rate: u8) -> bool {
    rate >= RELEASE_GATE_PASS_RATE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_thresholds() {
        assert_eq!(PassRateStatus::from_rate(100), PassRateStatus::Excellent);
        assert_eq!(PassRateStatus::from_rate(95), PassRateStatus::Excellent);
        assert_eq!(PassRateStatus::from_rate(94), PassRateStatus::Good);
        assert_eq!(PassRateStatus::from_rate(85), PassRateStatus::Good);
        assert_eq!(PassRateStatus::from_rate(84), PassRateStatus::Acceptable);
        assert_eq!(PassRateStatus::from_rate(75), PassRateStatus::Acceptable);
        assert_eq!(PassRateStatus::from_rate(74), PassRateStatus::NeedsAttention);
        assert_eq!(PassRateStatus::from_rate(50), PassRateStatus::NeedsAttention);
        assert_eq!(PassRateStatus::from_rate(49), PassRateStatus::Critical);
        assert_eq!(PassRateStatus::from_rate(0), PassRateStatus::Critical);
    }

    #[test]
    fn pass_rate_rounds_and_handles_empty_runs() {
        assert_eq!(pass_rate(0, 0, 0), 0);
        assert_eq!(pass_rate(2, 1, 0), 67);
        assert_eq!(pass_rate(1, 2, 0), 33);
        assert_eq!(pass_rate(1, 1, 0), 50);
        assert_eq!(pass_rate(7, 1, 2), 70);
    }

    #[test]
    fn release_gate_boundary() {
        assert!(!meets_release_gate(79));
        assert!(meets_release_gate(80));
    }
}
