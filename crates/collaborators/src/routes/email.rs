//! Email: `POST /send-order-confirmation`.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use checkout::{EmailService, InMemoryEmailService};
use domain::contracts::{ConfirmationEmail, paths};

use crate::error::ServiceError;
use crate::routes::{request_context, service_router};

pub fn router(email: InMemoryEmailService) -> Router {
    let routes = Router::new()
        .route(paths::EMAIL_CONFIRMATION, post(send_confirmation))
        .with_state(email);
    service_router("email", routes)
}

async fn send_confirmation(
    State(email): State<InMemoryEmailService>,
    headers: HeaderMap,
    Json(message): Json<ConfirmationEmail>,
) -> Result<StatusCode, ServiceError> {
    email
        .send_confirmation(&request_context(&headers), &message)
        .await?;
    tracing::info!(order_id = %message.order_id, to = %message.email, "confirmation sent");
    Ok(StatusCode::NO_CONTENT)
}
