/*
 * Responsibility
 * - 環境変数や設定の読み込み (PORT, DATABASE_URL, CORS 許可、Auth/JWKS 設定など)
 * - 設定値のバリデーション (不足なら起動失敗)
 * - 起動時に一度だけ読む (リクエスト毎には読まない)
 */
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(value: Option<String>) -> Self {
        match value
            .unwrap_or_else(|| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    // None -> in-memory drink store
    pub database_url: Option<String>,

    pub app_env: AppEnv,
    pub cors_allowed_origins: Vec<String>,

    pub auth_issuer: String,
    pub auth_audience: String,
    pub auth_jwks_url: Url,
    pub jwks_cache_ttl: Duration,
    pub jwks_fetch_timeout: Duration,

    pub request_timeout: Duration,
    pub request_body_limit_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key/value source (env in production, a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port: u16 = match var("PORT") {
            Some(v) => v.trim().parse().map_err(|_| ConfigError::Invalid("PORT"))?,
            None => 3000,
        };
        let addr = SocketAddr::from(([0, 0, 0, 0], port));

        let database_url = var("DATABASE_URL");

        let app_env = AppEnv::parse(var("APP_ENV"));

        let cors_allowed_origins = var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        let auth_issuer = var("AUTH_ISSUER").ok_or(ConfigError::Missing("AUTH_ISSUER"))?;

        let auth_audience = var("AUTH_AUDIENCE").ok_or(ConfigError::Missing("AUTH_AUDIENCE"))?;

        // Auth0 style default: https://<tenant>/.well-known/jwks.json
        let jwks_url = var("AUTH_JWKS_URL").unwrap_or_else(|| {
            format!("{}/.well-known/jwks.json", auth_issuer.trim_end_matches('/'))
        });
        let auth_jwks_url = Url::parse(&jwks_url)
            .ok()
            .filter(|u| matches!(u.scheme(), "http" | "https"))
            .ok_or(ConfigError::Invalid("AUTH_JWKS_URL"))?;

        let jwks_cache_ttl = Duration::from_secs(seconds(&var, "JWKS_CACHE_TTL_SECONDS", 300)?);

        let jwks_fetch_timeout = Duration::from_secs(seconds(&var, "JWKS_FETCH_TIMEOUT_SECONDS", 5)?);
        if jwks_fetch_timeout.is_zero() {
            return Err(ConfigError::Invalid("JWKS_FETCH_TIMEOUT_SECONDS"));
        }

        let request_timeout = Duration::from_secs(seconds(&var, "REQUEST_TIMEOUT_SECONDS", 30)?);
        if request_timeout.is_zero() {
            return Err(ConfigError::Invalid("REQUEST_TIMEOUT_SECONDS"));
        }

        let request_body_limit_bytes = match var("REQUEST_BODY_LIMIT_BYTES") {
            Some(v) => v
                .trim()
                .parse::<usize>()
                .map_err(|_| ConfigError::Invalid("REQUEST_BODY_LIMIT_BYTES"))?,
            None => 1024 * 1024,
        };

        Ok(Self {
            addr,
            database_url,
            app_env,
            cors_allowed_origins,
            auth_issuer,
            auth_audience,
            auth_jwks_url,
            jwks_cache_ttl,
            jwks_fetch_timeout,
            request_timeout,
            request_body_limit_bytes,
        })
    }
}

fn seconds(
    var: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: u64,
) -> Result<u64, ConfigError> {
    match var(key) {
        Some(v) => v.trim().parse::<u64>().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}
