//! Cart service trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use domain::CartItem;
use domain::contracts::EmptyCartRequest;

use crate::context::RequestContext;
use crate::error::CollaboratorError;
use crate::services::fault::{Fault, read, write};

/// Stores the users' carts.
#[async_trait]
pub trait CartService: Send + Sync {
    /// Removes every item from the user's cart.
    async fn empty(
        &self,
        ctx: &RequestContext,
        request: &EmptyCartRequest,
    ) -> Result<(), CollaboratorError>;
}

#[derive(Debug, Default)]
struct InMemoryCartState {
    carts: HashMap<String, Vec<CartItem>>,
    emptied: Vec<String>,
    fault: Fault,
}

/// In-memory cart store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCartService {
    state: Arc<RwLock<InMemoryCartState>>,
}

impl InMemoryCartService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an item to the user's cart.
    pub fn add_item(&self, user_id: impl Into<String>, item: CartItem) {
        write(&self.state)
            .carts
            .entry(user_id.into())
            .or_default()
            .push(item);
    }

    /// Returns the items in the user's cart.
    pub fn items(&self, user_id: &str) -> Vec<CartItem> {
        read(&self.state)
            .carts
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn set_error(&self, error: Option<CollaboratorError>) {
        write(&self.state).fault.error = error;
    }

    pub fn set_delay(&self, delay: Duration) {
        write(&self.state).fault.delay = Some(delay);
    }

    /// Returns the users whose carts were emptied, in order.
    pub fn emptied(&self) -> Vec<String> {
        read(&self.state).emptied.clone()
    }
}

#[async_trait]
impl CartService for InMemoryCartService {
    async fn empty(
        &self,
        _ctx: &RequestContext,
        request: &EmptyCartRequest,
    ) -> Result<(), CollaboratorError> {
        let fault = read(&self.state).fault.clone();
        fault.inject().await?;

        let mut state = write(&self.state);
        state.carts.remove(&request.user_id);
        state.emptied.push(request.user_id.clone());
        Ok(())
    }
}
