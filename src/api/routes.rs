/*
 * Responsibility
 * - URL と handler の対応
 * - route 単位で required permission を宣言する (GET /drinks と /health は公開)
 * - 同じ path への .route() は method router としてマージされる
 */
use axum::{
    Router, middleware,
    routing::{MethodRouter, delete, get, patch, post},
};

use crate::api::handlers::{drinks, health};
use crate::middleware::auth::{PermissionGate, require_permission};
use crate::state::AppState;

fn gated(
    state: &AppState,
    permission: &'static str,
    route: MethodRouter<AppState>,
) -> MethodRouter<AppState> {
    route.route_layer(middleware::from_fn_with_state(
        PermissionGate::new(state.authorizer.clone(), permission),
        require_permission,
    ))
}

pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/drinks", get(drinks::list_drinks))
        .route(
            "/drinks",
            gated(state, "post:drinks", post(drinks::create_drink)),
        )
        .route(
            "/drinks-detail",
            gated(state, "get:drinks-detail", get(drinks::list_drinks_detail)),
        )
        .route(
            "/drinks/{drink_id}",
            gated(state, "patch:drinks", patch(drinks::update_drink)),
        )
        .route(
            "/drinks/{drink_id}",
            gated(state, "delete:drinks", delete(drinks::delete_drink)),
        )
}
