//! Cart: `POST /empty`.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use checkout::{CartService, InMemoryCartService};
use domain::contracts::{EmptyCartRequest, paths};

use crate::error::ServiceError;
use crate::routes::{request_context, service_router};

pub fn router(cart: InMemoryCartService) -> Router {
    let routes = Router::new()
        .route(paths::CART_EMPTY, post(empty))
        .with_state(cart);
    service_router("cart", routes)
}

async fn empty(
    State(cart): State<InMemoryCartService>,
    headers: HeaderMap,
    Json(request): Json<EmptyCartRequest>,
) -> Result<StatusCode, ServiceError> {
    cart.empty(&request_context(&headers), &request).await?;
    Ok(StatusCode::NO_CONTENT)
}
