use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::lifecycle::DomainError;
use crate::repository::RepositoryError;

pub(crate) fn domain_status(err: &DomainError) -> StatusCode {
    match err {
        DomainError::MissingField { .. } | DomainError::Invalid(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        DomainError::InvalidTransition { .. }
        | DomainError::TerminalState { .. }
        | DomainError::AlreadyTriaged => StatusCode::CONFLICT,
    }
}

pub(crate) fn repository_status(err: &RepositoryError) -> StatusCode {
    match err {
        RepositoryError::NotFound => StatusCode::NOT_FOUND,
        RepositoryError::Conflict => StatusCode::CONFLICT,
        RepositoryError::Unavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub(crate) fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}
