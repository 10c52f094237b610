//! Issuer key set (JWKS) fetch + cache.
//!
//! Responsibility:
//! - Fetch the issuer's published key set from a fixed URL.
//! - Keep the usable RS256 keys in an in-memory snapshot indexed by `kid`.
//! - Refresh on a miss (unknown `kid`) or when the snapshot has expired.
//!
//! Concurrency:
//! - Reads go through `ArcSwap::load` and never block.
//! - A refresh builds a complete new snapshot and swaps it in whole, so a
//!   reader sees either the previous key set or the new one.
//! - Two concurrent misses may both fetch; the last store wins.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use jsonwebtoken::DecodingKey;
use serde::Deserialize;
use thiserror::Error;

/// Errors returned while resolving a signing key.
///
/// `KeyNotFound` is a token problem (the issuer does not publish that key),
/// `Unavailable` is an infrastructure problem (the key set could not be read).
#[derive(Debug, Error)]
pub enum KeySetError {
    #[error("no signing key with kid '{0}' in the issuer key set")]
    KeyNotFound(String),
    #[error("issuer key set unavailable: {0}")]
    Unavailable(String),
}

/// Source of verification keys for the authorizer.
#[async_trait]
pub trait KeyResolver: Send + Sync {
    /// Returns the key whose `kid` is exactly `kid`.
    async fn get_key(&self, kid: &str) -> Result<Arc<SigningKey>, KeySetError>;
}

/// One entry of a JWKS document. Only the fields needed for RSA verification are kept.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    pub kid: Option<String>,
    pub kty: String,
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,
    #[serde(default)]
    pub alg: Option<String>,
    #[serde(default)]
    pub n: Option<String>,
    #[serde(default)]
    pub e: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwkSet {
    pub keys: Vec<Jwk>,
}

/// Verification algorithm accepted for issuer keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAlgorithm {
    RS256,
}

/// A public key from the issuer key set, ready for signature verification.
///
/// - Key material is intentionally not printable via Debug.
#[derive(Clone)]
pub struct SigningKey {
    pub kid: String,
    pub algorithm: KeyAlgorithm,
    pub decoding_key: DecodingKey,
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("kid", &self.kid)
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

impl SigningKey {
    /// Build a signing key from RSA components (base64url `n` and `e`).
    pub fn from_rsa_components(
        kid: impl Into<String>,
        n: &str,
        e: &str,
    ) -> Result<Self, jsonwebtoken::errors::Error> {
        Ok(Self {
            kid: kid.into(),
            algorithm: KeyAlgorithm::RS256,
            decoding_key: DecodingKey::from_rsa_components(n, e)?,
        })
    }

    /// Convert one JWK, or `None` when it is not an RS256 signature key.
    fn from_jwk(jwk: &Jwk) -> Option<Self> {
        let skip = |reason: &str| {
            tracing::warn!(kid = ?jwk.kid, reason, "skipping jwk");
            None
        };

        if jwk.kty != "RSA" {
            return skip("kty is not RSA");
        }
        if jwk.key_use.as_deref().is_some_and(|u| u != "sig") {
            return skip("use is not sig");
        }
        if jwk.alg.as_deref().is_some_and(|a| a != "RS256") {
            return skip("alg is not RS256");
        }

        let (Some(kid), Some(n), Some(e)) = (jwk.kid.as_deref(), jwk.n.as_deref(), jwk.e.as_deref())
        else {
            return skip("kid, n or e missing");
        };

        match Self::from_rsa_components(kid, n, e) {
            Ok(key) => Some(key),
            Err(err) => {
                tracing::warn!(kid = %kid, error = %err, "skipping jwk with unusable rsa components");
                None
            }
        }
    }
}

/// Index the usable keys of a fetched set by `kid`.
pub fn index_keys(set: &JwkSet) -> HashMap<String, Arc<SigningKey>> {
    set.keys
        .iter()
        .filter_map(SigningKey::from_jwk)
        .map(|key| (key.kid.clone(), Arc::new(key)))
        .collect()
}

struct KeySnapshot {
    keys: HashMap<String, Arc<SigningKey>>,
    expires_at: Instant,
}

/// JWKS-backed key resolver with a TTL-bounded, atomically swapped cache.
pub struct KeySetResolver {
    jwks_url: String,
    http_client: reqwest::Client,
    cache: ArcSwapOption<KeySnapshot>,
    cache_ttl: Duration,
}

impl std::fmt::Debug for KeySetResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeySetResolver")
            .field("jwks_url", &self.jwks_url)
            .field("cache_ttl", &self.cache_ttl)
            .finish()
    }
}

impl KeySetResolver {
    /// `fetch_timeout` bounds one whole JWKS request (connect + body).
    pub fn new(
        jwks_url: impl Into<String>,
        cache_ttl: Duration,
        fetch_timeout: Duration,
    ) -> Result<Self, KeySetError> {
        let http_client = reqwest::Client::builder()
            .timeout(fetch_timeout)
            .build()
            .map_err(|e| KeySetError::Unavailable(format!("http client: {e}")))?;

        Ok(Self {
            jwks_url: jwks_url.into(),
            http_client,
            cache: ArcSwapOption::empty(),
            cache_ttl,
        })
    }

    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    /// Look up `kid` in the current snapshot if it has not expired.
    fn cached(&self, kid: &str) -> Option<Arc<SigningKey>> {
        let guard = self.cache.load();
        let snapshot = guard.as_ref()?;
        if snapshot.expires_at <= Instant::now() {
            return None;
        }
        snapshot.keys.get(kid).cloned()
    }

    /// Fetch the key set and replace the whole snapshot.
    async fn fetch_snapshot(&self) -> Result<Arc<KeySnapshot>, KeySetError> {
        tracing::debug!(url = %self.jwks_url, "fetching issuer key set");

        let response = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, timeout = e.is_timeout(), "failed to fetch key set");
                KeySetError::Unavailable(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(status = %status, "key set endpoint returned an error");
            return Err(KeySetError::Unavailable(format!("http status {status}")));
        }

        let set: JwkSet = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse key set");
            KeySetError::Unavailable(e.to_string())
        })?;

        let keys = index_keys(&set);
        tracing::info!(
            key_count = keys.len(),
            published = set.keys.len(),
            "issuer key set refreshed"
        );

        let snapshot = Arc::new(KeySnapshot {
            keys,
            expires_at: Instant::now() + self.cache_ttl,
        });
        self.cache.store(Some(Arc::clone(&snapshot)));

        Ok(snapshot)
    }
}

#[async_trait]
impl KeyResolver for KeySetResolver {
    async fn get_key(&self, kid: &str) -> Result<Arc<SigningKey>, KeySetError> {
        if let Some(key) = self.cached(kid) {
            return Ok(key);
        }

        // Look in the snapshot we just fetched, not the shared slot: it may
        // already have been replaced, or have a zero TTL.
        let snapshot = self.fetch_snapshot().await?;

        snapshot.keys.get(kid).cloned().ok_or_else(|| {
            tracing::warn!(kid = %kid, "kid not found in issuer key set after refresh");
            KeySetError::KeyNotFound(kid.to_string())
        })
    }
}
