//! Test execution tracking: run lifecycle, result recording, and pass-rate classification.

pub mod domain;
pub mod pass_rate;
pub mod repository;
pub mod router;
pub mod service;


pub use domain::{
    NewTestRun, TestOutcome, TestResult, TestResultInput, TestRun, TestRunId, TestRunStatus,
    TestRunView,
};
pub use pass_rate::{PassRateStatus, RELEASE_GATE_PASS_RATE};
pub use repository::TestRunRepository;
pub use router::test_run_router;
pub use service::{TestRunAction, TestRunService, TestRunServiceError};
