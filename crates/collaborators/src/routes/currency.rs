//! Currency: `GET /currencies`, `POST /convert`.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use checkout::{CurrencyService, InMemoryCurrencyService};
use common::{CurrencyCode, Price};
use domain::contracts::{ConvertRequest, paths};

use crate::error::ServiceError;
use crate::routes::{request_context, service_router};

pub fn router(currency: InMemoryCurrencyService) -> Router {
    let routes = Router::new()
        .route("/currencies", get(supported))
        .route(paths::CURRENCY_CONVERT, post(convert))
        .with_state(currency);
    service_router("currency", routes)
}

async fn supported(State(currency): State<InMemoryCurrencyService>) -> Json<Vec<CurrencyCode>> {
    Json(currency.supported_currencies())
}

async fn convert(
    State(currency): State<InMemoryCurrencyService>,
    headers: HeaderMap,
    Json(request): Json<ConvertRequest>,
) -> Result<Json<Price>, ServiceError> {
    let price = currency.convert(&request_context(&headers), &request).await?;
    Ok(Json(price))
}
