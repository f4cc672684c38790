//! `POST /api/checkout`.

use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, StatusCode};
use checkout::RequestContext;
use domain::contracts::REQUEST_ID_HEADER;
use domain::{CheckoutRequest, Order, OrderReason, OrderStatus};

use crate::AppState;
use crate::error::ApiError;

/// Inbound header that may shorten the request deadline, in milliseconds.
pub const REQUEST_TIMEOUT_HEADER: &str = "x-request-timeout-ms";

/// POST /api/checkout
///
/// Always answers with the order body once the request is valid; the
/// status code only summarizes the order's outcome.
pub async fn place_order(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let Json(request) = payload?;
    let deadline = request_deadline(&headers, state.orchestrator.config().request_deadline)?;
    let correlation_id = headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let rctx = RequestContext::new(correlation_id, deadline);
    let order = state.orchestrator.checkout(request, rctx).await?;
    Ok((status_code(&order), Json(order)))
}

/// The configured deadline, shortened by `x-request-timeout-ms` if the
/// caller sent a smaller one.
fn request_deadline(headers: &HeaderMap, configured: Duration) -> Result<Duration, ApiError> {
    let Some(value) = headers.get(REQUEST_TIMEOUT_HEADER) else {
        return Ok(configured);
    };
    let millis: u64 = value
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .ok_or_else(|| {
            ApiError::BadRequest(format!(
                "{REQUEST_TIMEOUT_HEADER} must be a whole number of milliseconds"
            ))
        })?;
    Ok(configured.min(Duration::from_millis(millis)))
}

/// Maps an order onto the response status.
pub fn status_code(order: &Order) -> StatusCode {
    match (order.status, order.reason) {
        (OrderStatus::Completed | OrderStatus::CompletedWithWarnings, _) => StatusCode::OK,
        (OrderStatus::PaymentFailed, _) => StatusCode::PAYMENT_REQUIRED,
        (OrderStatus::Rejected, Some(OrderReason::DeadlineExceeded)) => {
            StatusCode::GATEWAY_TIMEOUT
        }
        (OrderStatus::Rejected, _) => StatusCode::CONFLICT,
    }
}
