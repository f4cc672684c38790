//! Product catalog: `GET /products`, `GET /products/{id}`.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::routing::get;
use axum::{Json, Router};
use checkout::{CatalogService, InMemoryCatalogService};
use common::ProductId;
use domain::contracts::{ProductPrice, paths};

use crate::error::ServiceError;
use crate::routes::{request_context, service_router};

pub fn router(catalog: InMemoryCatalogService) -> Router {
    let routes = Router::new()
        .route(paths::CATALOG_PRODUCTS, get(list))
        .route(&format!("{}/{{id}}", paths::CATALOG_PRODUCTS), get(get_price))
        .with_state(catalog);
    service_router("catalog", routes)
}

/// GET /products: ids of every product on sale.
async fn list(State(catalog): State<InMemoryCatalogService>) -> Json<Vec<ProductId>> {
    Json(catalog.product_ids())
}

/// GET /products/{id}
async fn get_price(
    State(catalog): State<InMemoryCatalogService>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<ProductPrice>, ServiceError> {
    let ctx = request_context(&headers);
    let price = catalog.get_price(&ctx, &ProductId::new(id)).await?;
    Ok(Json(price))
}
