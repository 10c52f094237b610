//! HTTP-level middleware (cross-cutting concerns).
//!
//! - Request-Id generation + propagation (`x-request-id`)
//! - Access logging (TraceLayer)
//! - Body size limit and global timeout, both from `Config`
//!
//! Errors raised by these layers are rendered in the same JSON shape as the
//! handlers' errors.

use axum::Router;
use axum::error_handling::HandleErrorLayer;
use axum::http::{StatusCode, header::HeaderName};
use tower::timeout::TimeoutLayer;
use tower::{BoxError, ServiceBuilder};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::error::ErrorResponse;

async fn handle_layer_error(err: BoxError) -> ErrorResponse {
    if err.is::<tower::timeout::error::Elapsed>() {
        ErrorResponse::new(StatusCode::REQUEST_TIMEOUT, "request timed out")
    } else {
        tracing::error!(error = %err, "unhandled middleware error");
        ErrorResponse::new(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
    }
}

pub fn apply(router: Router, config: &Config) -> Router {
    let request_id_header = HeaderName::from_static("x-request-id");

    let layers = ServiceBuilder::new()
        .layer(HandleErrorLayer::new(handle_layer_error))
        .layer(SetRequestIdLayer::new(
            request_id_header.clone(),
            MakeRequestUuid,
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header))
        .layer(RequestBodyLimitLayer::new(config.request_body_limit_bytes))
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(TraceLayer::new_for_http());

    router.layer(layers)
}
