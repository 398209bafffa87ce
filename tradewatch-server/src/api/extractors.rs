//! Custom Axum extractors for request authentication.
//!
//! Provides:
//! - `AdminAuth` – checks the `Authorization: Bearer <token>` header against
//!   the configured admin token (used by the operator API).
//!
//! Webhook signatures are verified by the receiver itself because the HMAC
//! covers the raw body bytes.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use ring::digest::{SHA256, digest};
use tradewatch_sdk::objects::ErrorResponse;

use crate::state::AppState;

// ---------------------------------------------------------------------------
// AdminAuth - operator API authentication via bearer token
// ---------------------------------------------------------------------------

/// An Axum extractor that admits the request only when it carries the
/// configured admin token.
///
/// # Header format
///
/// ```text
/// Authorization: Bearer {admin_token}
/// ```
///
/// When no token is configured every request is admitted.
pub struct AdminAuth;

/// Errors returned by the [`AdminAuth`] extractor.
#[derive(Debug, thiserror::Error)]
pub enum AdminAuthError {
    #[error("missing Authorization header")]
    MissingHeader,
    #[error("invalid Authorization header format")]
    InvalidHeader,
    #[error("invalid admin token")]
    InvalidToken,
}

impl IntoResponse for AdminAuthError {
    fn into_response(self) -> Response {
        let status = match self {
            AdminAuthError::MissingHeader | AdminAuthError::InvalidToken => {
                StatusCode::UNAUTHORIZED
            }
            AdminAuthError::InvalidHeader => StatusCode::BAD_REQUEST,
        };
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Compare digests so the comparison time does not depend on how much of the
/// token matched.
fn token_matches(presented: &str, expected: &str) -> bool {
    digest(&SHA256, presented.as_bytes()).as_ref() == digest(&SHA256, expected.as_bytes()).as_ref()
}

impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = AdminAuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.admin_token.as_deref() else {
            return Ok(AdminAuth);
        };

        let header_value = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AdminAuthError::MissingHeader)?
            .to_str()
            .map_err(|_| AdminAuthError::InvalidHeader)?;

        let presented = header_value
            .strip_prefix("Bearer ")
            .ok_or(AdminAuthError::InvalidHeader)?
            .trim();

        if !token_matches(presented, expected) {
            tracing::warn!("Rejected operator request with invalid admin token");
            return Err(AdminAuthError::InvalidToken);
        }
        Ok(AdminAuth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_matches() {
        assert!(token_matches("s3cret", "s3cret"));
        assert!(!token_matches("s3cre", "s3cret"));
        assert!(!token_matches("", "s3cret"));
    }

    #[test]
    fn test_rejection_status_codes() {
        assert_eq!(
            AdminAuthError::MissingHeader.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AdminAuthError::InvalidHeader.into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AdminAuthError::InvalidToken.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
    }
}
