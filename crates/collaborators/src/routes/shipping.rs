//! Shipping: `POST /quote`, `POST /ship`.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use checkout::{InMemoryShippingService, ShippingService};
use domain::contracts::{QuoteRequest, ShipRequest, ShipmentReceipt, ShippingQuote, paths};

use crate::error::ServiceError;
use crate::routes::{request_context, service_router};

pub fn router(shipping: InMemoryShippingService) -> Router {
    let routes = Router::new()
        .route(paths::SHIPPING_QUOTE, post(quote))
        .route(paths::SHIPPING_SHIP, post(ship))
        .with_state(shipping);
    service_router("shipping", routes)
}

async fn quote(
    State(shipping): State<InMemoryShippingService>,
    headers: HeaderMap,
    Json(request): Json<QuoteRequest>,
) -> Result<Json<ShippingQuote>, ServiceError> {
    let quote = shipping.quote(&request_context(&headers), &request).await?;
    Ok(Json(quote))
}

async fn ship(
    State(shipping): State<InMemoryShippingService>,
    headers: HeaderMap,
    Json(request): Json<ShipRequest>,
) -> Result<Json<ShipmentReceipt>, ServiceError> {
    let receipt = shipping.ship(&request_context(&headers), &request).await?;
    tracing::info!(order_id = %request.order_id, tracking_id = %receipt.tracking_id, "shipment dispatched");
    Ok(Json(receipt))
}
