/// Factory: build `TokenAuthorizer` (backed by the issuer JWKS) from application `Config`.
use std::sync::Arc;

use crate::config::Config;
use crate::services::auth::{KeySetError, KeySetResolver, TokenAuthorizer};

pub fn build_authorizer(config: &Config) -> Result<Arc<TokenAuthorizer>, KeySetError> {
    let keys = KeySetResolver::new(
        config.auth_jwks_url.as_str(),
        config.jwks_cache_ttl,
        config.jwks_fetch_timeout,
    )?;

    tracing::info!(
        issuer = %config.auth_issuer,
        audience = %config.auth_audience,
        jwks_url = %keys.jwks_url(),
        "token authorizer configured"
    );

    Ok(Arc::new(TokenAuthorizer::new(
        Arc::new(keys),
        config.auth_issuer.clone(),
        config.auth_audience.clone(),
    )))
}
