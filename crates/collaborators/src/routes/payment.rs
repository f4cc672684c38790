//! Payment: `POST /charge`, `POST /refund`.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use checkout::{InMemoryPaymentService, PaymentService};
use domain::contracts::{ChargeRequest, PaymentReceipt, RefundRequest, paths};

use crate::error::ServiceError;
use crate::routes::{request_context, service_router};

pub fn router(payment: InMemoryPaymentService) -> Router {
    let routes = Router::new()
        .route(paths::PAYMENT_CHARGE, post(charge))
        .route(paths::PAYMENT_REFUND, post(refund))
        .with_state(payment);
    service_router("payment", routes)
}

async fn charge(
    State(payment): State<InMemoryPaymentService>,
    headers: HeaderMap,
    Json(request): Json<ChargeRequest>,
) -> Result<Json<PaymentReceipt>, ServiceError> {
    match payment.charge(&request_context(&headers), &request).await {
        Ok(receipt) => {
            tracing::info!(
                order_id = %request.order_id,
                amount = %request.amount,
                transaction_id = %receipt.transaction_id,
                "charge accepted"
            );
            Ok(Json(receipt))
        }
        Err(error) => {
            tracing::info!(order_id = %request.order_id, amount = %request.amount, %error, "charge declined");
            Err(error.into())
        }
    }
}

async fn refund(
    State(payment): State<InMemoryPaymentService>,
    headers: HeaderMap,
    Json(request): Json<RefundRequest>,
) -> Result<StatusCode, ServiceError> {
    payment.refund(&request_context(&headers), &request).await?;
    tracing::info!(transaction_id = %request.transaction_id, "charge refunded");
    Ok(StatusCode::NO_CONTENT)
}
