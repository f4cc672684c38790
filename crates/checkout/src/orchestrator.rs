//! Drives one checkout through its collaborators.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use common::OrderId;
use domain::contracts::{
    AccountingEvent, ChargeRequest, ConfirmationEmail, ConvertRequest, EmptyCartRequest,
    FraudCheckRequest, QuoteRequest, RefundRequest, ShipRequest,
};
use domain::{
    CheckoutRequest, FailureReason, Order, OrderContext, PricedCart, Step, StepError, StepOutcome,
    aggregate,
};
use futures_util::future::try_join_all;
use tracing::Instrument;

use crate::background::BackgroundTasks;
use crate::config::CheckoutConfig;
use crate::context::RequestContext;
use crate::error::{CollaboratorError, Result};
use crate::services::Collaborators;

/// Orchestrates a checkout.
///
/// The request path runs
/// `(catalog ∥ shipping quote) → currency conversion → payment → fraud check → shipment`,
/// stopping at the first fatal failure, fraud flag or deadline hit. The
/// confirmation email, accounting event, cart emptying and any payment
/// reversal are detached and never delay the response.
pub struct CheckoutOrchestrator {
    collaborators: Collaborators,
    config: CheckoutConfig,
    background: BackgroundTasks,
}

impl CheckoutOrchestrator {
    /// Creates a new orchestrator.
    pub fn new(collaborators: Collaborators, config: CheckoutConfig) -> Self {
        Self {
            collaborators,
            config,
            background: BackgroundTasks::new(),
        }
    }

    pub fn config(&self) -> &CheckoutConfig {
        &self.config
    }

    /// Detached tasks spawned by past checkouts.
    pub fn background(&self) -> &BackgroundTasks {
        &self.background
    }

    /// Runs one checkout and returns the resulting order.
    ///
    /// Only request validation fails with an error; every collaborator
    /// failure is reflected in the order's status, reason and warnings.
    #[tracing::instrument(
        skip_all,
        fields(
            correlation_id = %rctx.correlation_id(),
            user_id = %request.user_id,
            order_id = tracing::field::Empty,
            status = tracing::field::Empty,
        )
    )]
    pub async fn checkout(&self, request: CheckoutRequest, rctx: RequestContext) -> Result<Order> {
        metrics::counter!("checkout_requests_total").increment(1);
        let started = Instant::now();

        if let Err(error) = request.validate() {
            tracing::info!(%error, "checkout request rejected");
            return Err(error.into());
        }

        let order_id = OrderId::new();
        let span = tracing::Span::current();
        span.record("order_id", tracing::field::display(order_id));

        let mut ctx = OrderContext::new(
            order_id,
            &request,
            self.config.placeholder_shipping,
            Utc::now(),
        );

        self.price_cart(&request, &rctx, &mut ctx).await;
        if !ctx.is_halted() && ctx.conversion_required() == Some(true) {
            self.convert_total(&rctx, &mut ctx).await;
        }
        if !ctx.is_halted() {
            self.charge(&request, &rctx, &mut ctx).await;
        }
        if !ctx.is_halted() {
            self.screen(&request, &rctx, &mut ctx).await;
        }
        if !ctx.is_halted() {
            self.ship(&request, &rctx, &mut ctx).await;
        }
        if ctx.deadline_exceeded() {
            ctx.skip_unattempted();
        }

        let order = aggregate(&ctx);
        span.record("status", order.status.as_str());

        metrics::counter!("checkout_orders_total", "status" => order.status.as_str()).increment(1);
        metrics::histogram!("checkout_duration_seconds").record(started.elapsed().as_secs_f64());
        tracing::info!(
            status = %order.status,
            reason = order.reason.map(|r| r.as_str()),
            warnings = order.warnings.len(),
            "checkout finished"
        );

        self.dispatch_follow_ups(&request, &rctx, &order);
        Ok(order)
    }

    /// Prices every cart line and quotes shipping, concurrently.
    async fn price_cart(
        &self,
        request: &CheckoutRequest,
        rctx: &RequestContext,
        ctx: &mut OrderContext,
    ) {
        let catalog = &self.collaborators.catalog;
        let lookups = try_join_all(
            request
                .items
                .iter()
                .map(|item| catalog.get_price(rctx, &item.product_id)),
        );
        let quote_request = QuoteRequest {
            address: request.address.clone(),
            items: request.items.clone(),
        };
        let quote = self.collaborators.shipping.quote(rctx, &quote_request);

        let (prices, quote) = tokio::join!(
            self.call(Step::Catalog, rctx, lookups),
            self.call(Step::ShippingQuote, rctx, quote),
        );

        let cart: StepOutcome<PricedCart> = match prices {
            StepOutcome::Success(prices) => PricedCart::from_prices(&request.items, prices).into(),
            StepOutcome::Failure(error) => StepOutcome::Failure(error),
        };
        let quote = match (quote, cart.success()) {
            (StepOutcome::Success(quote), Some(cart))
                if quote.cost.currency_code != cart.currency_code =>
            {
                StepOutcome::Failure(StepError::new(
                    FailureReason::InvalidResponse,
                    format!(
                        "quote in {}, cart priced in {}",
                        quote.cost.currency_code, cart.currency_code
                    ),
                ))
            }
            (quote, _) => quote,
        };

        observe(Step::Catalog, &cart);
        observe(Step::ShippingQuote, &quote);
        ctx.record_catalog(cart);
        ctx.record_shipping_quote(quote);
    }

    /// Converts the cart total into the requested currency.
    async fn convert_total(&self, rctx: &RequestContext, ctx: &mut OrderContext) {
        let Some(from) = ctx.cart_total() else {
            return;
        };
        let request = ConvertRequest {
            from,
            to_code: ctx.requested_currency().clone(),
        };

        let outcome = self
            .call(
                Step::CurrencyConversion,
                rctx,
                self.collaborators.currency.convert(rctx, &request),
            )
            .await;
        let outcome = match outcome {
            StepOutcome::Success(price) if price.currency_code != request.to_code => {
                StepOutcome::Failure(StepError::new(
                    FailureReason::InvalidResponse,
                    format!("asked for {}, got {}", request.to_code, price.currency_code),
                ))
            }
            outcome => outcome,
        };

        observe(Step::CurrencyConversion, &outcome);
        ctx.record_conversion(outcome);
    }

    async fn charge(
        &self,
        request: &CheckoutRequest,
        rctx: &RequestContext,
        ctx: &mut OrderContext,
    ) {
        let Some(amount) = ctx.charge_amount() else {
            return;
        };
        let charge = ChargeRequest {
            order_id: ctx.order_id(),
            user_id: request.user_id.clone(),
            amount,
            payment_token: request.payment_token.clone(),
        };

        let outcome = self
            .call(
                Step::Payment,
                rctx,
                self.collaborators.payment.charge(rctx, &charge),
            )
            .await;

        observe(Step::Payment, &outcome);
        ctx.record_payment(outcome);
    }

    /// Screens the charged order; a flag reverses the charge in the
    /// background.
    async fn screen(
        &self,
        request: &CheckoutRequest,
        rctx: &RequestContext,
        ctx: &mut OrderContext,
    ) {
        let Some(amount) = ctx.charge_amount() else {
            return;
        };
        let check = FraudCheckRequest {
            order_id: ctx.order_id(),
            user_id: request.user_id.clone(),
            amount,
            item_count: request.unit_count(),
            address: request.address.clone(),
        };

        let outcome = self
            .call(
                Step::FraudCheck,
                rctx,
                self.collaborators.fraud_detection.check(rctx, &check),
            )
            .await;

        observe(Step::FraudCheck, &outcome);
        ctx.record_fraud_check(outcome);

        if ctx.fraud_flagged() {
            tracing::warn!(
                reason = ctx
                    .fraud()
                    .and_then(StepOutcome::success)
                    .and_then(|v| v.reason.as_deref()),
                "order flagged, reversing payment"
            );
            self.reverse_payment(rctx, ctx);
        }
    }

    async fn ship(&self, request: &CheckoutRequest, rctx: &RequestContext, ctx: &mut OrderContext) {
        let shipment = ShipRequest {
            order_id: ctx.order_id(),
            address: request.address.clone(),
            items: request.items.clone(),
        };

        let outcome = self
            .call(
                Step::Shipment,
                rctx,
                self.collaborators.shipping.ship(rctx, &shipment),
            )
            .await;

        observe(Step::Shipment, &outcome);
        ctx.record_shipment(outcome);
    }

    fn reverse_payment(&self, rctx: &RequestContext, ctx: &OrderContext) {
        let Some(receipt) = ctx.payment_receipt() else {
            return;
        };
        let refund = RefundRequest {
            order_id: ctx.order_id(),
            transaction_id: receipt.transaction_id.clone(),
        };
        let payment = Arc::clone(&self.collaborators.payment);
        let rctx = rctx.detached(self.config.reversal_timeout);
        self.background.spawn(
            Step::PaymentReversal,
            self.config.reversal_timeout,
            async move { payment.refund(&rctx, &refund).await },
        );
    }

    /// Spawns the accounting event for every order, and the confirmation
    /// email and cart emptying for successful ones. Each call gets its own
    /// deadline, so it still runs after the request deadline has passed.
    fn dispatch_follow_ups(&self, request: &CheckoutRequest, rctx: &RequestContext, order: &Order) {
        let timeouts = &self.config.timeouts;

        let accounting = Arc::clone(&self.collaborators.accounting);
        let event = AccountingEvent::from(order);
        let call_ctx = rctx.detached(timeouts.accounting);
        self.background
            .spawn(Step::AccountingEvent, timeouts.accounting, async move {
                accounting.publish(&call_ctx, &event).await
            });

        if !order.status.is_success() {
            return;
        }

        if let Some(email) = &request.email {
            let mailer = Arc::clone(&self.collaborators.email);
            let message = ConfirmationEmail::for_order(email.clone(), order);
            let call_ctx = rctx.detached(timeouts.email);
            self.background
                .spawn(Step::ConfirmationEmail, timeouts.email, async move {
                    mailer.send_confirmation(&call_ctx, &message).await
                });
        }

        let cart = Arc::clone(&self.collaborators.cart);
        let empty = EmptyCartRequest {
            user_id: order.user_id.clone(),
        };
        let call_ctx = rctx.detached(timeouts.cart);
        self.background
            .spawn(Step::EmptyCart, timeouts.cart, async move {
                cart.empty(&call_ctx, &empty).await
            });
    }

    /// Runs one request-path call bounded by
    /// `min(collaborator timeout, time left to the deadline)`.
    ///
    /// A call that would start after the deadline is not made.
    async fn call<T, F>(&self, step: Step, rctx: &RequestContext, call: F) -> StepOutcome<T>
    where
        F: Future<Output = std::result::Result<T, CollaboratorError>>,
    {
        let limit = self.config.timeouts.for_collaborator(step.collaborator());
        let remaining = rctx.remaining();
        if remaining.is_zero() {
            return StepOutcome::Failure(StepError::skipped());
        }
        let bound_by_deadline = remaining <= limit;

        let span = tracing::info_span!(
            "step",
            step = step.as_str(),
            collaborator = step.collaborator().as_str()
        );
        let started = Instant::now();
        let result = tokio::time::timeout(limit.min(remaining), call)
            .instrument(span)
            .await;
        metrics::histogram!("checkout_step_duration_seconds", "step" => step.as_str())
            .record(started.elapsed().as_secs_f64());

        match result {
            Ok(Ok(value)) => StepOutcome::Success(value),
            Ok(Err(CollaboratorError::Timeout(_))) if rctx.is_expired() => {
                StepOutcome::Failure(StepError::deadline_exceeded())
            }
            Ok(Err(error)) => StepOutcome::Failure(error.into()),
            Err(_) if bound_by_deadline => StepOutcome::Failure(StepError::deadline_exceeded()),
            Err(_) => StepOutcome::Failure(StepError::timeout(limit)),
        }
    }
}

/// Logs and counts a failed step.
fn observe<T>(step: Step, outcome: &StepOutcome<T>) {
    if let StepOutcome::Failure(error) = outcome {
        metrics::counter!(
            "checkout_step_failures_total",
            "step" => step.as_str(),
            "reason" => error.reason.as_str()
        )
        .increment(1);
        tracing::warn!(
            step = step.as_str(),
            reason = error.reason.as_str(),
            retryable = error.retryable,
            "step failed: {}",
            error.message
        );
    }
}
