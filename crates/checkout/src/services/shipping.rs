//! Shipping service trait and in-memory implementation.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use common::{CurrencyCode, Money, OrderId, Price};
use domain::contracts::{QuoteRequest, ShipRequest, ShipmentReceipt, ShippingQuote};

use crate::context::RequestContext;
use crate::error::CollaboratorError;
use crate::services::fault::{Fault, read, write};

/// Quotes and dispatches shipments.
#[async_trait]
pub trait ShippingService: Send + Sync {
    /// Returns the shipping cost for the cart to the address.
    async fn quote(
        &self,
        ctx: &RequestContext,
        request: &QuoteRequest,
    ) -> Result<ShippingQuote, CollaboratorError>;

    /// Dispatches the order and returns its tracking id.
    async fn ship(
        &self,
        ctx: &RequestContext,
        request: &ShipRequest,
    ) -> Result<ShipmentReceipt, CollaboratorError>;
}

#[derive(Debug)]
struct InMemoryShippingState {
    flat_rate: Price,
    per_unit: Money,
    shipments: Vec<(String, OrderId)>,
    next_id: u32,
    quotes: usize,
    quote_fault: Fault,
    ship_fault: Fault,
}

impl Default for InMemoryShippingState {
    fn default() -> Self {
        Self {
            flat_rate: Price::zero(CurrencyCode::usd()),
            per_unit: Money::zero(),
            shipments: Vec::new(),
            next_id: 0,
            quotes: 0,
            quote_fault: Fault::default(),
            ship_fault: Fault::default(),
        }
    }
}

/// In-memory shipping service quoting a flat rate plus a per-unit charge.
#[derive(Debug, Clone, Default)]
pub struct InMemoryShippingService {
    state: Arc<RwLock<InMemoryShippingState>>,
}

impl InMemoryShippingService {
    /// Creates a service quoting zero USD.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the flat part of every quote; its currency is the quote currency.
    pub fn set_flat_rate(&self, cost: Price) {
        write(&self.state).flat_rate = cost;
    }

    /// Sets the amount added per shipped unit.
    pub fn set_per_unit(&self, cost: Money) {
        write(&self.state).per_unit = cost;
    }

    pub fn set_quote_error(&self, error: Option<CollaboratorError>) {
        write(&self.state).quote_fault.error = error;
    }

    pub fn set_quote_delay(&self, delay: Duration) {
        write(&self.state).quote_fault.delay = Some(delay);
    }

    pub fn set_ship_error(&self, error: Option<CollaboratorError>) {
        write(&self.state).ship_fault.error = error;
    }

    pub fn set_ship_delay(&self, delay: Duration) {
        write(&self.state).ship_fault.delay = Some(delay);
    }

    /// Returns the number of quotes requested.
    pub fn quote_count(&self) -> usize {
        read(&self.state).quotes
    }

    /// Returns the number of shipments dispatched.
    pub fn shipment_count(&self) -> usize {
        read(&self.state).shipments.len()
    }

    /// Returns true if the order has been shipped.
    pub fn has_shipment_for(&self, order_id: OrderId) -> bool {
        read(&self.state)
            .shipments
            .iter()
            .any(|(_, id)| *id == order_id)
    }
}

#[async_trait]
impl ShippingService for InMemoryShippingService {
    async fn quote(
        &self,
        _ctx: &RequestContext,
        request: &QuoteRequest,
    ) -> Result<ShippingQuote, CollaboratorError> {
        let fault = {
            let mut state = write(&self.state);
            state.quotes += 1;
            state.quote_fault.clone()
        };
        fault.inject().await?;

        let state = read(&self.state);
        let units = request
            .items
            .iter()
            .fold(0u32, |units, item| units.saturating_add(item.quantity));
        let cents = state
            .per_unit
            .checked_mul(units)
            .and_then(|per_unit| state.flat_rate.cents.checked_add(per_unit))
            .ok_or_else(|| {
                CollaboratorError::InvalidResponse(format!("no quote for {units} units"))
            })?;
        Ok(ShippingQuote {
            cost: Price::new(state.flat_rate.currency_code.clone(), cents),
        })
    }

    async fn ship(
        &self,
        _ctx: &RequestContext,
        request: &ShipRequest,
    ) -> Result<ShipmentReceipt, CollaboratorError> {
        let fault = read(&self.state).ship_fault.clone();
        fault.inject().await?;

        let mut state = write(&self.state);
        state.next_id += 1;
        let tracking_id = format!("TRACK-{:04}", state.next_id);
        state
            .shipments
            .push((tracking_id.clone(), request.order_id));

        Ok(ShipmentReceipt { tracking_id })
    }
}
