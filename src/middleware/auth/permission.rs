//! Per-route permission gate: bearer token 検証 → 権限チェック → ClaimSet を extensions に入れる
//!
//! 使い方 (route 単位で required permission を宣言する):
//! ```ignore
//! Router::new().route(
//!     "/drinks",
//!     post(create_drink).route_layer(middleware::from_fn_with_state(
//!         PermissionGate::new(state.authorizer.clone(), "post:drinks"),
//!         require_permission,
//!     )),
//! );
//! ```
//!
//! - 失敗時は AuthError をそのまま返す (401 / 403 / 500 と JSON body は AuthError 側で決まる)
//! - 成功時は handler が `AuthClaims` extractor で ClaimSet を受け取る

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};

use crate::services::auth::{AuthError, TokenAuthorizer};

/// State for one gated route: the shared authorizer and the permission that route requires.
#[derive(Clone, Debug)]
pub struct PermissionGate {
    authorizer: Arc<TokenAuthorizer>,
    permission: &'static str,
}

impl PermissionGate {
    pub fn new(authorizer: Arc<TokenAuthorizer>, permission: &'static str) -> Self {
        Self {
            authorizer,
            permission,
        }
    }
}

pub async fn require_permission(
    State(gate): State<PermissionGate>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    // Owned copy: nothing borrowed from `req` is held across the await below.
    let header = req
        .headers()
        .get(header::AUTHORIZATION)
        .map(|value| value.to_str().map(str::to_owned));

    let result = match header {
        Some(Ok(value)) => gate.authorizer.authorize(Some(&value), gate.permission).await,
        // Non-visible-ASCII header values can't be a bearer token.
        Some(Err(_)) => Err(AuthError::InvalidHeaderFormat),
        None => gate.authorizer.authorize(None, gate.permission).await,
    };

    let claims = match result {
        Ok(claims) => claims,
        Err(err) => {
            tracing::warn!(
                kind = err.kind(),
                error = %err,
                permission = gate.permission,
                method = %req.method(),
                path = %req.uri().path(),
                "request not authorized"
            );
            return Err(err);
        }
    };

    tracing::debug!(
        subject = %claims.subject,
        permission = gate.permission,
        "request authorized"
    );

    // middleware → extractor への受け渡し
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}
