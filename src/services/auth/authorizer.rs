//! Bearer token verification + permission enforcement.
//!
//! `TokenAuthorizer::authorize` runs every check in a fixed order and stops at
//! the first failure:
//!
//! 1. header present
//! 2. `Bearer <token>` scheme
//! 3. three non-empty segments
//! 4. RS256 header with a `kid`
//! 5. key lookup in the issuer key set
//! 6. signature
//! 7. `exp`, `iss`, `aud`, `sub`
//! 8. `permissions` claim present
//! 9. required permission granted
//!
//! Claims are only deserialized from a payload whose signature has been
//! verified (step 6 comes before 7-9).

use std::collections::BTreeSet;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, Validation};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::services::auth::error::AuthError;
use crate::services::auth::key_set::{KeyResolver, KeySetError};

const BEARER_SCHEME: &str = "Bearer";
const SUPPORTED_ALGORITHM: &str = "RS256";

/// `aud` may be a single string or a list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    One(String),
    Many(Vec<String>),
}

impl Audience {
    pub fn contains(&self, audience: &str) -> bool {
        match self {
            Self::One(aud) => aud == audience,
            Self::Many(auds) => auds.iter().any(|aud| aud == audience),
        }
    }
}

/// Verified claims handed to route handlers.
#[derive(Debug, Clone)]
pub struct ClaimSet {
    pub issuer: String,
    pub audience: Audience,
    pub expiry: DateTime<Utc>,
    pub subject: String,
    pub permissions: BTreeSet<String>,
}

impl ClaimSet {
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }
}

// Only what step 4 needs; the full header is parsed again by jsonwebtoken.
#[derive(Debug, Deserialize)]
struct TokenHeader {
    alg: String,
    #[serde(default)]
    kid: Option<String>,
}

// Claims stay untyped until `validate_claims` so that a badly typed claim
// fails at its own step, after the ones before it (an expired token with a
// garbage `permissions` claim is still `TokenExpired`).
#[derive(Debug, Deserialize)]
struct RawClaims {
    #[serde(default)]
    iss: Option<Value>,
    #[serde(default)]
    aud: Option<Value>,
    #[serde(default)]
    exp: Option<Value>,
    #[serde(default)]
    sub: Option<Value>,
    #[serde(default)]
    permissions: Option<Value>,
}

pub struct TokenAuthorizer {
    keys: Arc<dyn KeyResolver>,
    issuer: String,
    audience: String,
    validation: Validation,
}

impl std::fmt::Debug for TokenAuthorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenAuthorizer")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish()
    }
}

impl TokenAuthorizer {
    pub fn new(
        keys: Arc<dyn KeyResolver>,
        issuer: impl Into<String>,
        audience: impl Into<String>,
    ) -> Self {
        // jsonwebtoken only checks the signature here. Claim checks run
        // afterwards in `validate_claims` so each one has its own failure.
        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        Self {
            keys,
            issuer: issuer.into(),
            audience: audience.into(),
            validation,
        }
    }

    /// Verify the bearer token in `header` and require `required_permission`.
    pub async fn authorize(
        &self,
        header: Option<&str>,
        required_permission: &str,
    ) -> Result<ClaimSet, AuthError> {
        let token = bearer_token(header)?;
        let kid = key_id(token)?;

        let key = self.keys.get_key(&kid).await?;
        if key.kid != kid {
            return Err(KeySetError::KeyNotFound(kid).into());
        }

        let data = jsonwebtoken::decode::<RawClaims>(token, &key.decoding_key, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::Json(_) | ErrorKind::Utf8(_) | ErrorKind::Base64(_) => {
                    AuthError::MalformedToken("encoding")
                }
                _ => AuthError::InvalidSignature,
            })?;

        let claims = self.validate_claims(data.claims, Utc::now())?;

        if !claims.has_permission(required_permission) {
            return Err(AuthError::PermissionDenied(required_permission.to_string()));
        }

        Ok(claims)
    }

    fn validate_claims(&self, raw: RawClaims, now: DateTime<Utc>) -> Result<ClaimSet, AuthError> {
        let exp = raw
            .exp
            .as_ref()
            .and_then(Value::as_i64)
            .ok_or(AuthError::MalformedToken("exp"))?;
        let expiry = DateTime::from_timestamp(exp, 0).ok_or(AuthError::MalformedToken("exp"))?;
        if expiry <= now {
            return Err(AuthError::TokenExpired);
        }

        let issuer = match raw.iss {
            Some(Value::String(iss)) if iss == self.issuer => iss,
            _ => return Err(AuthError::InvalidIssuer),
        };

        let audience = raw
            .aud
            .and_then(|aud| serde_json::from_value::<Audience>(aud).ok())
            .filter(|aud| aud.contains(&self.audience))
            .ok_or(AuthError::InvalidAudience)?;

        let subject = match raw.sub {
            Some(Value::String(sub)) if !sub.trim().is_empty() => sub,
            _ => return Err(AuthError::MalformedToken("sub")),
        };

        let permissions = match raw.permissions {
            None => return Err(AuthError::PermissionsClaimMissing),
            Some(Value::Array(items)) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(permission) => Ok(permission),
                    _ => Err(AuthError::MalformedToken("permissions")),
                })
                .collect::<Result<BTreeSet<_>, _>>()?,
            Some(_) => return Err(AuthError::MalformedToken("permissions")),
        };

        Ok(ClaimSet {
            issuer,
            audience,
            expiry,
            subject,
            permissions,
        })
    }
}

/// Steps 1-2: `Authorization: Bearer <token>`.
fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let header = header
        .filter(|h| !h.is_empty())
        .ok_or(AuthError::MissingHeader)?;

    let mut parts = header.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(BEARER_SCHEME), Some(token), None) if !token.is_empty() => Ok(token),
        _ => Err(AuthError::InvalidHeaderFormat),
    }
}

/// Steps 3-4: segment structure, then `alg` and `kid` from the header segment.
fn key_id(token: &str) -> Result<String, AuthError> {
    let segments: Vec<&str> = token.split('.').collect();
    let header_segment = match segments.as_slice() {
        [header, payload, signature]
            if !header.is_empty() && !payload.is_empty() && !signature.is_empty() =>
        {
            *header
        }
        _ => return Err(AuthError::MalformedToken("expected three segments")),
    };

    let header_json = URL_SAFE_NO_PAD
        .decode(header_segment)
        .map_err(|_| AuthError::MalformedToken("header"))?;
    let header: TokenHeader =
        serde_json::from_slice(&header_json).map_err(|_| AuthError::MalformedToken("header"))?;

    if header.alg != SUPPORTED_ALGORITHM {
        return Err(AuthError::UnsupportedAlgorithm(header.alg));
    }

    header
        .kid
        .filter(|kid| !kid.is_empty())
        .ok_or(AuthError::MalformedToken("kid"))
}
