//! HTTP entry point of the checkout orchestrator.
//!
//! Exposes `POST /api/checkout`, `/health` and `/metrics`, with request-id
//! correlation, structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::Request;
use axum::routing::{get, post};
use checkout::CheckoutOrchestrator;
use domain::contracts::REQUEST_ID_HEADER;
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub orchestrator: Arc<CheckoutOrchestrator>,
}

impl AppState {
    pub fn new(orchestrator: Arc<CheckoutOrchestrator>) -> Arc<Self> {
        Arc::new(Self { orchestrator })
    }
}

/// Creates the Axum application router with all routes and shared state.
///
/// `/metrics` is only mounted when a Prometheus recorder is installed.
pub fn create_app(state: Arc<AppState>, metrics_handle: Option<PrometheusHandle>) -> Router {
    let orchestrator = Arc::clone(&state.orchestrator);
    let mut app = Router::new()
        .route("/health", get(routes::health::check))
        .route("/api/checkout", post(routes::checkout::place_order))
        .with_state(state);

    if let Some(handle) = metrics_handle {
        let scrape = routes::metrics::Scrape {
            handle,
            orchestrator,
        };
        app = app.merge(
            Router::new()
                .route("/metrics", get(routes::metrics::scrape))
                .with_state(scrape),
        );
    }

    app.layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http().make_span_with(make_span))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            ),
    )
}

fn make_span(request: &Request<Body>) -> tracing::Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");
    tracing::info_span!(
        "http",
        method = %request.method(),
        uri = %request.uri(),
        request_id,
    )
}
