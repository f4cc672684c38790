//! Prometheus scrape endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderValue, header};
use axum::response::{IntoResponse, Response};
use checkout::CheckoutOrchestrator;
use metrics_exporter_prometheus::PrometheusHandle;

const PROMETHEUS_TEXT: &str = "text/plain; version=0.0.4; charset=utf-8";

/// What a scrape reads: the installed recorder and the orchestrator whose
/// detached follow-ups are sampled at scrape time.
#[derive(Clone)]
pub struct Scrape {
    pub handle: PrometheusHandle,
    pub orchestrator: Arc<CheckoutOrchestrator>,
}

/// GET /metrics
///
/// Samples `checkout_background_tasks_pending` before rendering, since the
/// follow-up count only changes between requests.
pub async fn scrape(State(scrape): State<Scrape>) -> Response {
    let pending = scrape.orchestrator.background().pending();
    metrics::gauge!("checkout_background_tasks_pending").set(pending as f64);
    scrape.handle.run_upkeep();

    let mut response = scrape.handle.render().into_response();
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(PROMETHEUS_TEXT));
    response
}
