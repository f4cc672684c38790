//! Per-request accumulator of step outcomes.

use chrono::{DateTime, Utc};
use common::{CurrencyCode, Money, OrderId, Price, ProductId};
use serde::{Deserialize, Serialize};

use crate::contracts::{FraudVerdict, PaymentReceipt, ProductPrice, ShipmentReceipt, ShippingQuote};
use crate::request::{CartItem, CheckoutRequest};
use crate::step::{FailureKind, FailureReason, Step, StepError, StepFailure, StepOutcome};

/// A priced cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Money,
    pub line_total: Money,
}

/// The cart priced by the catalog, all lines in one currency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedCart {
    pub currency_code: CurrencyCode,
    pub lines: Vec<LineItem>,
    subtotal: Money,
}

impl PricedCart {
    /// Pairs cart lines with catalog prices given in the same order.
    ///
    /// Fails if a price is missing or belongs to another product, if the
    /// catalog answered in more than one currency, or if a line total or
    /// the subtotal does not fit in a [`Money`].
    pub fn from_prices(items: &[CartItem], prices: Vec<ProductPrice>) -> Result<Self, StepError> {
        if items.len() != prices.len() {
            return Err(StepError::new(
                FailureReason::InvalidResponse,
                format!("expected {} prices, got {}", items.len(), prices.len()),
            ));
        }
        let Some(currency_code) = prices.first().map(|p| p.price.currency_code.clone()) else {
            return Err(StepError::new(
                FailureReason::InvalidResponse,
                "no prices for an empty cart",
            ));
        };

        let mut lines = Vec::with_capacity(items.len());
        for (item, price) in items.iter().zip(prices) {
            if price.product_id != item.product_id {
                return Err(StepError::new(
                    FailureReason::InvalidResponse,
                    format!(
                        "price for {} returned for {}",
                        price.product_id, item.product_id
                    ),
                ));
            }
            if price.price.currency_code != currency_code {
                return Err(StepError::new(
                    FailureReason::InvalidResponse,
                    format!(
                        "mixed catalog currencies {} and {}",
                        currency_code, price.price.currency_code
                    ),
                ));
            }
            let Some(line_total) = price.price.cents.checked_mul(item.quantity) else {
                return Err(out_of_range(format!(
                    "{} x {} overflows",
                    item.quantity, price.price
                )));
            };
            lines.push(LineItem {
                product_id: item.product_id.clone(),
                quantity: item.quantity,
                unit_price: price.price.cents,
                line_total,
            });
        }

        let subtotal = Money::checked_sum(lines.iter().map(|l| l.line_total))
            .ok_or_else(|| out_of_range("cart subtotal overflows"))?;

        Ok(Self {
            currency_code,
            lines,
            subtotal,
        })
    }

    /// Sum of all line totals.
    pub fn subtotal(&self) -> Money {
        self.subtotal
    }
}

/// Mutable record of one checkout, owned by the task running it.
///
/// Each request-path step has one slot that is filled exactly once, when the
/// step is attempted or skipped. Failures are also appended, in recording
/// order, to a flat list classified by [`Step::failure_kind`].
#[derive(Debug, Clone)]
pub struct OrderContext {
    order_id: OrderId,
    user_id: String,
    requested_currency: CurrencyCode,
    created_at: DateTime<Utc>,
    placeholder_shipping: Money,
    catalog: Option<StepOutcome<PricedCart>>,
    shipping_quote: Option<StepOutcome<ShippingQuote>>,
    conversion: Option<StepOutcome<Price>>,
    payment: Option<StepOutcome<PaymentReceipt>>,
    fraud: Option<StepOutcome<FraudVerdict>>,
    shipment: Option<StepOutcome<ShipmentReceipt>>,
    failures: Vec<StepFailure>,
}

impl OrderContext {
    /// Creates an empty context for `request`.
    pub fn new(
        order_id: OrderId,
        request: &CheckoutRequest,
        placeholder_shipping: Money,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            order_id,
            user_id: request.user_id.clone(),
            requested_currency: request.currency_code.clone(),
            created_at,
            placeholder_shipping,
            catalog: None,
            shipping_quote: None,
            conversion: None,
            payment: None,
            fraud: None,
            shipment: None,
            failures: Vec::new(),
        }
    }

    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn requested_currency(&self) -> &CurrencyCode {
        &self.requested_currency
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn catalog(&self) -> Option<&StepOutcome<PricedCart>> {
        self.catalog.as_ref()
    }

    pub fn shipping_quote(&self) -> Option<&StepOutcome<ShippingQuote>> {
        self.shipping_quote.as_ref()
    }

    pub fn conversion(&self) -> Option<&StepOutcome<Price>> {
        self.conversion.as_ref()
    }

    pub fn payment(&self) -> Option<&StepOutcome<PaymentReceipt>> {
        self.payment.as_ref()
    }

    pub fn fraud(&self) -> Option<&StepOutcome<FraudVerdict>> {
        self.fraud.as_ref()
    }

    pub fn shipment(&self) -> Option<&StepOutcome<ShipmentReceipt>> {
        self.shipment.as_ref()
    }

    /// All failures recorded so far, in recording order.
    pub fn failures(&self) -> &[StepFailure] {
        &self.failures
    }

    /// Records the priced cart. A cart whose subtotal plus the placeholder
    /// shipping cost overflows is recorded as an invalid response.
    pub fn record_catalog(&mut self, outcome: StepOutcome<PricedCart>) {
        let outcome = match outcome {
            StepOutcome::Success(cart)
                if cart.subtotal().checked_add(self.placeholder_shipping).is_none() =>
            {
                StepOutcome::Failure(out_of_range("cart total overflows"))
            }
            outcome => outcome,
        };
        store(&mut self.catalog, &mut self.failures, Step::Catalog, outcome);
    }

    /// Records the shipping quote. A quote that cannot be added to the
    /// priced cart is recorded as an invalid response, so the placeholder
    /// applies.
    pub fn record_shipping_quote(&mut self, outcome: StepOutcome<ShippingQuote>) {
        let outcome = match (outcome, self.priced_cart()) {
            (StepOutcome::Success(quote), Some(cart))
                if cart.subtotal().checked_add(quote.cost.cents).is_none() =>
            {
                StepOutcome::Failure(out_of_range(format!(
                    "shipping {} overflows the cart total",
                    quote.cost
                )))
            }
            (outcome, _) => outcome,
        };
        store(
            &mut self.shipping_quote,
            &mut self.failures,
            Step::ShippingQuote,
            outcome,
        );
    }

    pub fn record_conversion(&mut self, outcome: StepOutcome<Price>) {
        store(
            &mut self.conversion,
            &mut self.failures,
            Step::CurrencyConversion,
            outcome,
        );
    }

    pub fn record_payment(&mut self, outcome: StepOutcome<PaymentReceipt>) {
        store(&mut self.payment, &mut self.failures, Step::Payment, outcome);
    }

    pub fn record_fraud_check(&mut self, outcome: StepOutcome<FraudVerdict>) {
        store(&mut self.fraud, &mut self.failures, Step::FraudCheck, outcome);
    }

    pub fn record_shipment(&mut self, outcome: StepOutcome<ShipmentReceipt>) {
        store(&mut self.shipment, &mut self.failures, Step::Shipment, outcome);
    }

    /// Returns true if `step` already has an outcome.
    pub fn is_recorded(&self, step: Step) -> bool {
        match step {
            Step::Catalog => self.catalog.is_some(),
            Step::ShippingQuote => self.shipping_quote.is_some(),
            Step::CurrencyConversion => self.conversion.is_some(),
            Step::Payment => self.payment.is_some(),
            Step::FraudCheck => self.fraud.is_some(),
            Step::Shipment => self.shipment.is_some(),
            _ => false,
        }
    }

    /// Records every request-path step that has not run yet as skipped
    /// because the deadline passed.
    ///
    /// Currency conversion is left out when it is known not to be needed.
    pub fn skip_unattempted(&mut self) {
        for step in Step::SEQUENCE {
            if self.is_recorded(step) {
                continue;
            }
            if step == Step::CurrencyConversion && self.conversion_required() == Some(false) {
                continue;
            }
            let skipped = StepError::skipped();
            match step {
                Step::Catalog => self.record_catalog(StepOutcome::Failure(skipped)),
                Step::ShippingQuote => self.record_shipping_quote(StepOutcome::Failure(skipped)),
                Step::CurrencyConversion => self.record_conversion(StepOutcome::Failure(skipped)),
                Step::Payment => self.record_payment(StepOutcome::Failure(skipped)),
                Step::FraudCheck => self.record_fraud_check(StepOutcome::Failure(skipped)),
                Step::Shipment => self.record_shipment(StepOutcome::Failure(skipped)),
                _ => {}
            }
        }
    }

    /// Returns true once a fatal failure, a deadline failure or a fraud flag
    /// has been recorded; no further request-path step may run.
    pub fn is_halted(&self) -> bool {
        self.fraud_flagged()
            || self
                .failures
                .iter()
                .any(|f| matches!(f.kind, FailureKind::Fatal | FailureKind::DeadlineExceeded))
    }

    /// Returns true if any step failed because of the request deadline.
    pub fn deadline_exceeded(&self) -> bool {
        self.failures
            .iter()
            .any(|f| f.kind == FailureKind::DeadlineExceeded)
    }

    pub fn priced_cart(&self) -> Option<&PricedCart> {
        self.catalog.as_ref().and_then(StepOutcome::success)
    }

    /// Whether the cart must be converted to the requested currency, once
    /// the cart currency is known.
    pub fn conversion_required(&self) -> Option<bool> {
        self.priced_cart()
            .map(|cart| cart.currency_code != self.requested_currency)
    }

    /// The quoted shipping cost, or the placeholder when no usable quote
    /// was recorded.
    pub fn shipping_cost(&self) -> Money {
        self.shipping_quote
            .as_ref()
            .and_then(StepOutcome::success)
            .map(|quote| quote.cost.cents)
            .unwrap_or(self.placeholder_shipping)
    }

    /// Subtotal plus shipping, in the cart currency.
    ///
    /// `None` until the cart is priced, or if the sum does not fit.
    pub fn cart_total(&self) -> Option<Price> {
        let cart = self.priced_cart()?;
        let total = cart.subtotal().checked_add(self.shipping_cost())?;
        Some(Price::new(cart.currency_code.clone(), total))
    }

    /// The amount to charge: the converted total when conversion succeeded,
    /// the cart total otherwise.
    pub fn charge_amount(&self) -> Option<Price> {
        match self.conversion.as_ref().and_then(StepOutcome::success) {
            Some(converted) => Some(converted.clone()),
            None => self.cart_total(),
        }
    }

    pub fn payment_receipt(&self) -> Option<&PaymentReceipt> {
        self.payment.as_ref().and_then(StepOutcome::success)
    }

    pub fn payment_succeeded(&self) -> bool {
        self.payment_receipt().is_some()
    }

    pub fn fraud_flagged(&self) -> bool {
        self.fraud
            .as_ref()
            .and_then(StepOutcome::success)
            .is_some_and(|verdict| verdict.flagged)
    }

    pub fn tracking_id(&self) -> Option<&str> {
        self.shipment
            .as_ref()
            .and_then(StepOutcome::success)
            .map(|receipt| receipt.tracking_id.as_str())
    }
}

fn out_of_range(message: impl Into<String>) -> StepError {
    StepError::new(FailureReason::InvalidResponse, message)
}

fn store<T>(
    slot: &mut Option<StepOutcome<T>>,
    failures: &mut Vec<StepFailure>,
    step: Step,
    outcome: StepOutcome<T>,
) {
    debug_assert!(slot.is_none(), "step {step} recorded twice");
    if let StepOutcome::Failure(error) = &outcome {
        failures.push(StepFailure::new(step, error));
    }
    *slot = Some(outcome);
}
