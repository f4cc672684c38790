//! Fraud detection: `POST /check`.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use checkout::{FraudDetectionService, InMemoryFraudDetectionService};
use domain::contracts::{FraudCheckRequest, FraudVerdict, paths};

use crate::error::ServiceError;
use crate::routes::{request_context, service_router};

pub fn router(fraud: InMemoryFraudDetectionService) -> Router {
    let routes = Router::new()
        .route(paths::FRAUD_CHECK, post(check))
        .with_state(fraud);
    service_router("fraud_detection", routes)
}

async fn check(
    State(fraud): State<InMemoryFraudDetectionService>,
    headers: HeaderMap,
    Json(request): Json<FraudCheckRequest>,
) -> Result<Json<FraudVerdict>, ServiceError> {
    let verdict = fraud.check(&request_context(&headers), &request).await?;
    if verdict.flagged {
        tracing::warn!(
            order_id = %request.order_id,
            reason = verdict.reason.as_deref().unwrap_or(""),
            "order flagged"
        );
    }
    Ok(Json(verdict))
}
