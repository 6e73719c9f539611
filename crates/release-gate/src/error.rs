use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::bugs::BugServiceError;
use crate::config::ConfigError;
use crate::http::error_response;
use crate::releases::ConfidenceServiceError;
use crate::requirements::RequirementServiceError;
use crate::telemetry::TelemetryError;
use crate::test_runs::TestRunServiceError;

/// Top-level error for the binary edge: startup failures plus anything a service can raise.
#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Bugs(BugServiceError),
    TestRuns(TestRunServiceError),
    Requirements(RequirementServiceError),
    Confidence(ConfidenceServiceError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {err}"),
            AppError::Telemetry(err) => write!(f, "telemetry error: {err}"),
            AppError::Io(err) => write!(f, "io error: {err}"),
            AppError::Server(err) => write!(f, "server error: {err}"),
            AppError::Bugs(err) => write!(f, "bug tracking error: {err}"),
            AppError::TestRuns(err) => write!(f, "test run error: {err}"),
            AppError::Requirements(err) => write!(f, "requirement error: {err}"),
            AppError::Confidence(err) => write!(f, "release confidence error: {err}"),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Bugs(err) => Some(err),
            AppError::TestRuns(err) => Some(err),
            AppError::Requirements(err) => Some(err),
            AppError::Confidence(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Bugs(err) => err.into_response(),
            AppError::TestRuns(err) => err.into_response(),
            AppError::Requirements(err) => err.into_response(),
            AppError::Confidence(err) => err.into_response(),
            other => error_response(StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<BugServiceError> for AppError {
    fn from(value: BugServiceError) -> Self {
        Self::Bugs(value)
    }
}

impl From<TestRunServiceError> for AppError {
    fn from(value: TestRunServiceError) -> Self {
        Self::TestRuns(value)
    }
}

impl From<RequirementServiceError> for AppError {
    fn from(value: RequirementServiceError) -> Self {
        Self::Requirements(value)
    }
}

impl From<ConfidenceServiceError> for AppError {
    fn from(value: ConfidenceServiceError) -> Self {
        Self::Confidence(value)
    }
}
