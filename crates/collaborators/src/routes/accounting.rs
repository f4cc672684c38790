//! Accounting: `POST /orders`, `GET /orders`.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use checkout::{AccountingService, InMemoryAccountingService};
use domain::contracts::{AccountingEvent, paths};

use crate::error::ServiceError;
use crate::routes::{request_context, service_router};

pub fn router(accounting: InMemoryAccountingService) -> Router {
    let routes = Router::new()
        .route(paths::ACCOUNTING_ORDERS, post(publish).get(list))
        .with_state(accounting);
    service_router("accounting", routes)
}

async fn publish(
    State(accounting): State<InMemoryAccountingService>,
    headers: HeaderMap,
    Json(event): Json<AccountingEvent>,
) -> Result<StatusCode, ServiceError> {
    accounting
        .publish(&request_context(&headers), &event)
        .await?;
    tracing::info!(order_id = %event.order_id, status = %event.status, "order recorded");
    Ok(StatusCode::ACCEPTED)
}

/// GET /orders: every event recorded so far.
async fn list(State(accounting): State<InMemoryAccountingService>) -> Json<Vec<AccountingEvent>> {
    Json(accounting.events())
}
