//! Authorization failures.
//!
//! Every way `TokenAuthorizer::authorize` can fail is a variant here; the HTTP
//! layer maps them with `status()` and renders them via `IntoResponse`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::error::ErrorResponse;
use crate::services::auth::key_set::KeySetError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("authorization header is expected")]
    MissingHeader,
    #[error("authorization header must be 'Bearer <token>'")]
    InvalidHeaderFormat,
    #[error("token is malformed: {0}")]
    MalformedToken(&'static str),
    #[error("token algorithm '{0}' is not supported")]
    UnsupportedAlgorithm(String),
    #[error("unable to resolve signing key")]
    KeyResolutionFailed(#[from] KeySetError),
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token expired")]
    TokenExpired,
    #[error("incorrect issuer")]
    InvalidIssuer,
    #[error("incorrect audience")]
    InvalidAudience,
    #[error("permissions not included in token")]
    PermissionsClaimMissing,
    #[error("permission '{0}' not granted")]
    PermissionDenied(String),
}

impl AuthError {
    /// Stable machine-readable code, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingHeader => "missing_header",
            Self::InvalidHeaderFormat => "invalid_header_format",
            Self::MalformedToken(_) => "malformed_token",
            Self::UnsupportedAlgorithm(_) => "unsupported_algorithm",
            Self::KeyResolutionFailed(KeySetError::KeyNotFound(_)) => "key_not_found",
            Self::KeyResolutionFailed(KeySetError::Unavailable(_)) => "key_set_unavailable",
            Self::InvalidSignature => "invalid_signature",
            Self::TokenExpired => "token_expired",
            Self::InvalidIssuer => "invalid_issuer",
            Self::InvalidAudience => "invalid_audience",
            Self::PermissionsClaimMissing => "permissions_claim_missing",
            Self::PermissionDenied(_) => "permission_denied",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::PermissionDenied(_) => StatusCode::FORBIDDEN,
            // A key the issuer doesn't publish is the token's fault; an
            // unreachable issuer is ours.
            Self::KeyResolutionFailed(KeySetError::KeyNotFound(_)) => StatusCode::UNAUTHORIZED,
            Self::KeyResolutionFailed(KeySetError::Unavailable(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    /// Client-facing description. Upstream detail from the key set stays in the logs.
    pub fn description(&self) -> String {
        match self {
            Self::KeyResolutionFailed(KeySetError::KeyNotFound(_)) => {
                "unable to find the appropriate key".to_string()
            }
            Self::KeyResolutionFailed(KeySetError::Unavailable(_)) => {
                "authorization service unavailable".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ErrorResponse::new(self.status(), self.description()).into_response()
    }
}
