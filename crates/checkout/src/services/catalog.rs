//! Product catalog service trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use common::{Price, ProductId};
use domain::contracts::ProductPrice;

use crate::context::RequestContext;
use crate::error::CollaboratorError;
use crate::services::fault::{Fault, read, write};

/// Prices products.
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Returns the current price of one product.
    async fn get_price(
        &self,
        ctx: &RequestContext,
        product_id: &ProductId,
    ) -> Result<ProductPrice, CollaboratorError>;
}

#[derive(Debug, Default)]
struct InMemoryCatalogState {
    prices: HashMap<ProductId, Price>,
    lookups: usize,
    fault: Fault,
}

/// In-memory catalog backed by a fixed price list.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalogService {
    state: Arc<RwLock<InMemoryCatalogState>>,
}

impl InMemoryCatalogService {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a product, returning the catalog for chaining.
    pub fn with_product(self, product_id: impl Into<ProductId>, price: Price) -> Self {
        self.set_price(product_id, price);
        self
    }

    /// Adds or replaces a product.
    pub fn set_price(&self, product_id: impl Into<ProductId>, price: Price) {
        write(&self.state).prices.insert(product_id.into(), price);
    }

    /// Makes every lookup fail with `error`, or succeed again with `None`.
    pub fn set_error(&self, error: Option<CollaboratorError>) {
        write(&self.state).fault.error = error;
    }

    /// Delays every lookup by `delay`.
    pub fn set_delay(&self, delay: Duration) {
        write(&self.state).fault.delay = Some(delay);
    }

    /// Returns the number of lookups attempted.
    pub fn lookup_count(&self) -> usize {
        read(&self.state).lookups
    }

    /// Returns the ids of all known products, sorted.
    pub fn product_ids(&self) -> Vec<ProductId> {
        let mut ids: Vec<ProductId> = read(&self.state).prices.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[async_trait]
impl CatalogService for InMemoryCatalogService {
    async fn get_price(
        &self,
        _ctx: &RequestContext,
        product_id: &ProductId,
    ) -> Result<ProductPrice, CollaboratorError> {
        let fault = {
            let mut state = write(&self.state);
            state.lookups += 1;
            state.fault.clone()
        };
        fault.inject().await?;

        let price = read(&self.state)
            .prices
            .get(product_id)
            .cloned()
            .ok_or_else(|| CollaboratorError::NotFound(format!("product {product_id}")))?;

        Ok(ProductPrice {
            product_id: product_id.clone(),
            price,
        })
    }
}
