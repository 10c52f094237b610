#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use chrono::Utc;
use http_body_util::BodyExt;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use drinks_api::{
    app::build_router,
    config::Config,
    repos::MemoryDrinkStore,
    services::auth::build_authorizer,
    state::AppState,
};

pub const PRIMARY_PEM: &str = include_str!("../fixtures/primary.pem");
pub const ROGUE_PEM: &str = include_str!("../fixtures/rogue.pem");
const PRIMARY_JWK: &str = include_str!("../fixtures/primary.jwk.json");

pub const ISSUER: &str = "https://drinks.example.auth0.com/";
pub const AUDIENCE: &str = "drinks";
pub const KID: &str = "primary-2024";
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

pub const ALL_PERMISSIONS: [&str; 4] = [
    "get:drinks-detail",
    "post:drinks",
    "patch:drinks",
    "delete:drinks",
];

pub fn jwks_body() -> Value {
    let jwk: Value = serde_json::from_str(PRIMARY_JWK).unwrap();
    json!({
        "keys": [{
            "kty": "RSA",
            "use": "sig",
            "alg": "RS256",
            "kid": KID,
            "n": jwk["n"],
            "e": jwk["e"],
        }]
    })
}

/// JWKS endpoint publishing the primary key under `KID`.
pub async fn jwks_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(jwks_body()))
        .mount(&server)
        .await;
    server
}

pub fn test_config(jwks_url: &str) -> Config {
    let vars = HashMap::from([
        ("AUTH_ISSUER", ISSUER.to_string()),
        ("AUTH_AUDIENCE", AUDIENCE.to_string()),
        ("AUTH_JWKS_URL", jwks_url.to_string()),
        ("JWKS_FETCH_TIMEOUT_SECONDS", "1".to_string()),
    ]);
    Config::from_lookup(|key| vars.get(key).cloned()).unwrap()
}

/// Full router over an in-memory store, authorizing against `jwks_url`.
pub fn app(jwks_url: &str) -> Router {
    let config = test_config(jwks_url);
    let authorizer = build_authorizer(&config).unwrap();
    let state = AppState::new(Arc::new(MemoryDrinkStore::new()), authorizer);
    build_router(state, &config)
}

pub fn claims(permissions: &[&str]) -> Value {
    json!({
        "iss": ISSUER,
        "aud": AUDIENCE,
        "sub": "auth0|barista",
        "exp": Utc::now().timestamp() + 3600,
        "permissions": permissions,
    })
}

pub fn sign_with(pem: &str, kid: &str, claims: &Value) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_string());
    let key = EncodingKey::from_rsa_pem(pem.as_bytes()).unwrap();
    jsonwebtoken::encode(&header, claims, &key).unwrap()
}

pub fn token(permissions: &[&str]) -> String {
    sign_with(PRIMARY_PEM, KID, &claims(permissions))
}

pub fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
