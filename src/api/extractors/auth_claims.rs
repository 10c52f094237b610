use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::services::auth::{AuthError, ClaimSet};

/// Handler で、検証済みの ClaimSet を受け取るための extractor
/// permission middleware が ClaimSet を request.extensions() に insert 済みである前提
/// 見つからない場合は 401 を返す（ミドルウェア未設定の route）
pub struct AuthClaims(pub ClaimSet);

impl<S> FromRequestParts<S> for AuthClaims
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<ClaimSet>()
            .cloned()
            .map(AuthClaims)
            .ok_or(AuthError::MissingHeader)
    }
}
