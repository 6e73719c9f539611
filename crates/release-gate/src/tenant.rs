use std::fmt;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Header carrying the caller's tenant on every scoped request.
pub const TENANT_HEADER: &str = "x-tenant-id";

/// Isolation boundary threaded through every repository and service call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    /// Returns `None` for blank identifiers so an empty header never maps to a tenant.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for TenantId
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<Value>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(TENANT_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| TenantId::new(value))
            .ok_or_else(|| {
                let payload = json!({
                    "error": format!("missing or blank {TENANT_HEADER} header"),
                });
                (StatusCode::BAD_REQUEST, Json(payload))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[test]
    fn blank_identifiers_are_rejected() {
        assert!(TenantId::new("   ").is_none());
        assert_eq!(TenantId::new(" acme ").expect("tenant").as_str(), "acme");
    }

    #[tokio::test]
    async fn extractor_requires_header() {
        let (mut parts, _) = Request::builder()
            .uri("/api/v1/bugs")
            .body(())
            .expect("request builds")
            .into_parts();

        let rejection = TenantId::from_request_parts(&mut parts, &())
            .await
            .expect_err("missing header rejected");
        assert_eq!(rejection.0, StatusCode::BAD_REQUEST);

        let (mut parts, _) = Request::builder()
            .uri("/api/v1/bugs")
            .header(TENANT_HEADER, "globex")
            .body(())
            .expect("request builds")
            .into_parts();
        let tenant = TenantId::from_request_parts(&mut parts, &())
            .await
            .expect("tenant extracted");
        assert_eq!(tenant.as_str(), "globex");
    }
}
