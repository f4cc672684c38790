//! One axum router per simulated collaborator.

pub mod accounting;
pub mod cart;
pub mod catalog;
pub mod currency;
pub mod email;
pub mod fraud;
pub mod payment;
pub mod shipping;

use std::time::Duration;

use axum::extract::Request;
use axum::http::HeaderMap;
use axum::routing::get;
use axum::{Json, Router};
use checkout::RequestContext;
use domain::contracts::REQUEST_ID_HEADER;
use tower_http::trace::TraceLayer;

/// Simulators do not enforce the caller's deadline; the caller does.
const SIMULATED_BUDGET: Duration = Duration::from_secs(30);

/// Builds the call context from the forwarded correlation id.
pub(crate) fn request_context(headers: &HeaderMap) -> RequestContext {
    let correlation_id = headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");
    RequestContext::new(correlation_id, SIMULATED_BUDGET)
}

/// Adds `/health` and request tracing to a service's routes.
pub(crate) fn service_router(service: &'static str, routes: Router) -> Router {
    routes
        .route(
            "/health",
            get(move || async move {
                Json(serde_json::json!({ "status": "ok", "service": service }))
            }),
        )
        .layer(
            TraceLayer::new_for_http().make_span_with(move |request: &Request| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "collaborator",
                    service,
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id,
                )
            }),
        )
}
