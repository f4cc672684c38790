//! Integration tests for the checkout orchestrator against in-memory
//! collaborators.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use checkout::{
    AccountingService, CheckoutConfig, CheckoutError, CheckoutOrchestrator, CollaboratorError,
    CollaboratorTimeouts, Collaborators, InMemoryAccountingService, InMemoryCollaborators,
    InMemoryPaymentService, PaymentService, RequestContext,
};
use common::{CurrencyCode, Money, Price};
use domain::contracts::{AccountingEvent, ChargeRequest, PaymentReceipt, RefundRequest};
use domain::{
    Address, CartItem, CheckoutRequest, DomainError, FailureReason, Order, OrderReason,
    OrderStatus, Step,
};

fn usd(cents: i64) -> Price {
    Price::new(CurrencyCode::usd(), Money::from_cents(cents))
}

fn eur() -> CurrencyCode {
    CurrencyCode::parse("EUR").unwrap()
}

fn request() -> CheckoutRequest {
    CheckoutRequest {
        user_id: "user-42".to_string(),
        items: vec![CartItem::new("A", 2)],
        address: Address {
            street_address: "1600 Amphitheatre Pkwy".to_string(),
            city: "Mountain View".to_string(),
            state: "CA".to_string(),
            country: "US".to_string(),
            zip_code: "94043".to_string(),
        },
        payment_token: "tok_visa".to_string(),
        currency_code: CurrencyCode::usd(),
        email: Some("buyer@example.com".to_string()),
    }
}

struct TestHarness {
    orchestrator: CheckoutOrchestrator,
    services: InMemoryCollaborators,
}

impl TestHarness {
    fn new() -> Self {
        Self::with_config(CheckoutConfig::default())
    }

    fn with_config(config: CheckoutConfig) -> Self {
        let services = InMemoryCollaborators::new();
        services.catalog.set_price("A", usd(1000));
        services.catalog.set_price("B", usd(250));
        services.shipping.set_flat_rate(usd(500));
        services.currency.set_rate(eur(), 0.5);

        let orchestrator = CheckoutOrchestrator::new(services.collaborators(), config);
        Self {
            orchestrator,
            services,
        }
    }

    /// Harness whose collaborators never time out on their own, so only the
    /// request deadline can cut a call short.
    fn without_call_timeouts() -> Self {
        Self::with_config(CheckoutConfig {
            timeouts: CollaboratorTimeouts::uniform(Duration::from_secs(60)),
            ..CheckoutConfig::default()
        })
    }

    async fn checkout(&self, request: CheckoutRequest) -> Order {
        self.checkout_within(request, Duration::from_secs(5)).await
    }

    async fn checkout_within(&self, request: CheckoutRequest, budget: Duration) -> Order {
        self.orchestrator
            .checkout(request, RequestContext::new("req-test", budget))
            .await
            .unwrap()
    }

    /// Waits for every detached task spawned so far.
    async fn settle(&self) {
        self.orchestrator.background().wait_idle().await;
    }
}

/// Wraps an in-memory service and records how much time each detached call
/// had left when it started.
#[derive(Clone)]
struct Recording<S> {
    inner: S,
    remaining: Arc<Mutex<Vec<Duration>>>,
}

impl<S> Recording<S> {
    fn new(inner: S) -> Self {
        Self {
            inner,
            remaining: Arc::default(),
        }
    }

    fn record(&self, ctx: &RequestContext) {
        self.remaining.lock().unwrap().push(ctx.remaining());
    }

    fn remaining(&self) -> Vec<Duration> {
        self.remaining.lock().unwrap().clone()
    }
}

#[async_trait]
impl AccountingService for Recording<InMemoryAccountingService> {
    async fn publish(
        &self,
        ctx: &RequestContext,
        event: &AccountingEvent,
    ) -> Result<(), CollaboratorError> {
        self.record(ctx);
        self.inner.publish(ctx, event).await
    }
}

#[async_trait]
impl PaymentService for Recording<InMemoryPaymentService> {
    async fn charge(
        &self,
        ctx: &RequestContext,
        request: &ChargeRequest,
    ) -> Result<PaymentReceipt, CollaboratorError> {
        self.inner.charge(ctx, request).await
    }

    async fn refund(
        &self,
        ctx: &RequestContext,
        request: &RefundRequest,
    ) -> Result<(), CollaboratorError> {
        self.record(ctx);
        self.inner.refund(ctx, request).await
    }
}

#[tokio::test]
async fn test_happy_path_completes_with_expected_total() {
    let h = TestHarness::new();

    let order = h.checkout(request()).await;

    assert_eq!(order.status, OrderStatus::Completed);
    assert_eq!(order.reason, None);
    assert!(order.warnings.is_empty());

    let total = order.total.as_ref().unwrap();
    assert_eq!(total.subtotal, Money::from_cents(2000));
    assert_eq!(total.shipping, Money::from_cents(500));
    assert_eq!(total.total, Money::from_cents(2500));
    assert_eq!(total.charged, usd(2500));
    assert!(total.converted);

    assert_eq!(order.payment_transaction_id.as_deref(), Some("PAY-0001"));
    assert_eq!(order.tracking_id.as_deref(), Some("TRACK-0001"));
    assert_eq!(h.services.payment.last_charge_amount(), Some(usd(2500)));
    assert_eq!(h.services.fraud_detection.check_count(), 1);
    assert_eq!(h.services.shipping.shipment_count(), 1);
    assert_eq!(h.services.currency.conversion_count(), 0);

    h.settle().await;
    let events = h.services.accounting.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].order_id, order.order_id);
    assert_eq!(events[0].status, OrderStatus::Completed);
    assert_eq!(h.services.email.sent().len(), 1);
    assert_eq!(h.services.email.sent()[0].email, "buyer@example.com");
    assert_eq!(h.services.cart.emptied(), vec!["user-42".to_string()]);
}

#[tokio::test]
async fn test_payment_failure_skips_fraud_and_shipment() {
    let h = TestHarness::new();
    h.services.payment.set_fail_on_charge(true);

    let order = h.checkout(request()).await;

    assert_eq!(order.status, OrderStatus::PaymentFailed);
    assert_eq!(order.reason, Some(OrderReason::PaymentFailed));
    assert!(order.total.is_none());
    assert!(order.payment_transaction_id.is_none());
    assert_eq!(h.services.payment.charge_count(), 1);
    assert_eq!(h.services.fraud_detection.check_count(), 0);
    assert_eq!(h.services.shipping.shipment_count(), 0);

    h.settle().await;
    let events = h.services.accounting.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].status, OrderStatus::PaymentFailed);
    assert!(h.services.email.sent().is_empty());
    assert!(h.services.cart.emptied().is_empty());
}

#[tokio::test]
async fn test_payment_unavailable_is_payment_failed() {
    let h = TestHarness::new();
    h.services
        .payment
        .set_charge_error(Some(CollaboratorError::Unavailable("gateway down".to_string())));

    let order = h.checkout(request()).await;

    assert_eq!(order.status, OrderStatus::PaymentFailed);
    assert_eq!(h.services.shipping.shipment_count(), 0);
}

#[tokio::test]
async fn test_catalog_miss_rejects_without_charging() {
    let h = TestHarness::new();
    let mut req = request();
    req.items.push(CartItem::new("missing", 1));

    let order = h.checkout(req).await;

    assert_eq!(order.status, OrderStatus::Rejected);
    assert_eq!(order.reason, Some(OrderReason::CatalogMiss));
    assert!(order.total.is_none());
    assert_eq!(h.services.payment.charge_count(), 0);
    assert_eq!(h.services.shipping.shipment_count(), 0);

    h.settle().await;
    assert_eq!(h.services.accounting.events()[0].status, OrderStatus::Rejected);
    assert!(h.services.email.sent().is_empty());
}

#[tokio::test]
async fn test_catalog_outage_is_catalog_unavailable() {
    let h = TestHarness::new();
    h.services
        .catalog
        .set_error(Some(CollaboratorError::Unavailable("db down".to_string())));

    let order = h.checkout(request()).await;

    assert_eq!(order.status, OrderStatus::Rejected);
    assert_eq!(order.reason, Some(OrderReason::CatalogUnavailable));
    assert_eq!(h.services.payment.charge_count(), 0);
}

#[tokio::test]
async fn test_fraud_flag_rejects_and_reverses_once() {
    let h = TestHarness::new();
    h.services.fraud_detection.flag_user("user-42");

    let order = h.checkout(request()).await;

    assert_eq!(order.status, OrderStatus::Rejected);
    assert_eq!(order.reason, Some(OrderReason::FraudFlagged));
    assert!(order.total.is_none());
    assert_eq!(h.services.shipping.shipment_count(), 0);

    h.settle().await;
    let transaction_id = order.payment_transaction_id.clone().unwrap();
    assert_eq!(h.services.payment.refunds(), vec![transaction_id]);
    assert_eq!(h.services.payment.payment_count(), 0);
    assert_eq!(
        h.services.accounting.events()[0].reason,
        Some(OrderReason::FraudFlagged)
    );
    assert!(h.services.cart.emptied().is_empty());
}

#[tokio::test]
async fn test_failed_reversal_does_not_change_the_order() {
    let h = TestHarness::new();
    h.services.fraud_detection.flag_user("user-42");
    h.services
        .payment
        .set_refund_error(Some(CollaboratorError::Unavailable("refunds down".to_string())));

    let order = h.checkout(request()).await;
    h.settle().await;

    assert_eq!(order.status, OrderStatus::Rejected);
    assert_eq!(order.reason, Some(OrderReason::FraudFlagged));
    assert!(h.services.payment.refunds().is_empty());
    assert_eq!(h.services.payment.payment_count(), 1);
}

#[tokio::test]
async fn test_quote_failure_uses_placeholder_shipping() {
    let h = TestHarness::with_config(CheckoutConfig {
        placeholder_shipping: Money::from_cents(799),
        ..CheckoutConfig::default()
    });
    h.services
        .shipping
        .set_quote_error(Some(CollaboratorError::Unavailable("rates down".to_string())));

    let order = h.checkout(request()).await;

    assert_eq!(order.status, OrderStatus::CompletedWithWarnings);
    let total = order.total.as_ref().unwrap();
    assert_eq!(total.shipping, Money::from_cents(799));
    assert_eq!(total.total, Money::from_cents(2799));
    assert_eq!(order.warnings.len(), 1);
    assert_eq!(order.warnings[0].step, Step::ShippingQuote);
    assert_eq!(order.warnings[0].reason, FailureReason::Unavailable);
    assert!(order.warnings[0].retryable);
    assert_eq!(h.services.shipping.shipment_count(), 1);
}

#[tokio::test]
async fn test_quote_in_foreign_currency_is_not_used() {
    let h = TestHarness::new();
    h.services
        .shipping
        .set_flat_rate(Price::new(eur(), Money::from_cents(300)));

    let order = h.checkout(request()).await;

    assert_eq!(order.status, OrderStatus::CompletedWithWarnings);
    assert_eq!(order.total.as_ref().unwrap().shipping, Money::zero());
    assert_eq!(order.warnings[0].reason, FailureReason::InvalidResponse);
}

#[tokio::test]
async fn test_charge_is_converted_to_requested_currency() {
    let h = TestHarness::new();
    let mut req = request();
    req.currency_code = eur();

    let order = h.checkout(req).await;

    assert_eq!(order.status, OrderStatus::Completed);
    let total = order.total.as_ref().unwrap();
    assert_eq!(total.currency_code, CurrencyCode::usd());
    assert_eq!(total.total, Money::from_cents(2500));
    assert_eq!(total.charged, Price::new(eur(), Money::from_cents(1250)));
    assert!(total.converted);
    assert_eq!(
        h.services.payment.last_charge_amount(),
        Some(Price::new(eur(), Money::from_cents(1250)))
    );
}

#[tokio::test]
async fn test_conversion_failure_charges_cart_currency() {
    let h = TestHarness::new();
    h.services
        .currency
        .set_error(Some(CollaboratorError::Unavailable("no rates".to_string())));
    let mut req = request();
    req.currency_code = eur();

    let order = h.checkout(req).await;

    assert_eq!(order.status, OrderStatus::CompletedWithWarnings);
    let total = order.total.as_ref().unwrap();
    assert_eq!(total.charged, usd(2500));
    assert!(!total.converted);
    assert_eq!(order.warnings[0].step, Step::CurrencyConversion);
    assert_eq!(h.services.payment.last_charge_amount(), Some(usd(2500)));
}

#[tokio::test]
async fn test_fraud_outage_ships_unscreened() {
    let h = TestHarness::new();
    h.services
        .fraud_detection
        .set_error(Some(CollaboratorError::Unavailable("model offline".to_string())));

    let order = h.checkout(request()).await;

    assert_eq!(order.status, OrderStatus::CompletedWithWarnings);
    assert_eq!(order.warnings[0].step, Step::FraudCheck);
    assert_eq!(h.services.shipping.shipment_count(), 1);
    assert!(order.tracking_id.is_some());
}

#[tokio::test]
async fn test_shipment_failure_completes_with_warning() {
    let h = TestHarness::new();
    h.services
        .shipping
        .set_ship_error(Some(CollaboratorError::Unavailable("warehouse down".to_string())));

    let order = h.checkout(request()).await;

    assert_eq!(order.status, OrderStatus::CompletedWithWarnings);
    assert!(order.tracking_id.is_none());
    assert!(order.payment_transaction_id.is_some());
    assert!(order.warnings[0].message.contains("retried out of band"));

    h.settle().await;
    assert_eq!(h.services.email.sent().len(), 1);
}

#[tokio::test]
async fn test_notification_failures_never_change_the_order() {
    let h = TestHarness::new();
    h.services
        .email
        .set_error(Some(CollaboratorError::Unavailable("smtp down".to_string())));
    h.services
        .accounting
        .set_error(Some(CollaboratorError::Unavailable("ledger down".to_string())));
    h.services
        .cart
        .set_error(Some(CollaboratorError::Unavailable("redis down".to_string())));

    let order = h.checkout(request()).await;
    h.settle().await;

    assert_eq!(order.status, OrderStatus::Completed);
    assert!(order.warnings.is_empty());
    assert!(h.services.email.sent().is_empty());
    assert!(h.services.accounting.events().is_empty());
}

#[tokio::test]
async fn test_no_email_without_address() {
    let h = TestHarness::new();
    let mut req = request();
    req.email = None;

    let order = h.checkout(req).await;
    h.settle().await;

    assert_eq!(order.status, OrderStatus::Completed);
    assert!(h.services.email.sent().is_empty());
    assert_eq!(h.services.accounting.events().len(), 1);
}

#[tokio::test]
async fn test_invalid_request_calls_no_collaborator() {
    let h = TestHarness::new();
    let mut req = request();
    req.items.clear();

    let result = h
        .orchestrator
        .checkout(req, RequestContext::new("req-test", Duration::from_secs(5)))
        .await;

    assert!(matches!(
        result,
        Err(CheckoutError::InvalidRequest(DomainError::EmptyCart))
    ));
    assert_eq!(h.services.catalog.lookup_count(), 0);
    assert_eq!(h.services.shipping.quote_count(), 0);

    h.settle().await;
    assert!(h.services.accounting.events().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_slow_quote_times_out_as_retryable_warning() {
    let h = TestHarness::new();
    h.services.shipping.set_quote_delay(Duration::from_secs(3));

    let started = tokio::time::Instant::now();
    let order = h.checkout(request()).await;

    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(1000) && elapsed < Duration::from_millis(1100));
    assert_eq!(order.status, OrderStatus::CompletedWithWarnings);
    let warning = &order.warnings[0];
    assert_eq!(warning.step, Step::ShippingQuote);
    assert_eq!(warning.reason, FailureReason::Timeout);
    assert!(warning.retryable);
    assert_eq!(h.services.shipping.quote_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_deadline_before_charge_rejects() {
    let h = TestHarness::without_call_timeouts();
    h.services.payment.set_charge_delay(Duration::from_secs(1));

    let order = h
        .checkout_within(request(), Duration::from_millis(300))
        .await;

    assert_eq!(order.status, OrderStatus::Rejected);
    assert_eq!(order.reason, Some(OrderReason::DeadlineExceeded));
    assert!(order.payment_transaction_id.is_none());
    assert_eq!(h.services.payment.payment_count(), 0);
    assert_eq!(h.services.fraud_detection.check_count(), 0);
    assert_eq!(h.services.shipping.shipment_count(), 0);

    let skipped: Vec<Step> = order.warnings.iter().map(|w| w.step).collect();
    assert_eq!(
        skipped,
        vec![Step::Payment, Step::FraudCheck, Step::Shipment]
    );
    assert!(
        order
            .warnings
            .iter()
            .all(|w| w.reason == FailureReason::DeadlineExceeded)
    );
}

#[tokio::test(start_paused = true)]
async fn test_deadline_after_charge_completes_with_warnings() {
    let h = TestHarness::without_call_timeouts();
    h.services.fraud_detection.set_delay(Duration::from_secs(1));

    let order = h
        .checkout_within(request(), Duration::from_millis(300))
        .await;

    assert_eq!(order.status, OrderStatus::CompletedWithWarnings);
    assert!(order.payment_transaction_id.is_some());
    assert_eq!(h.services.shipping.shipment_count(), 0);

    let steps: Vec<Step> = order.warnings.iter().map(|w| w.step).collect();
    assert_eq!(steps, vec![Step::FraudCheck, Step::Shipment]);
    assert!(
        order
            .warnings
            .iter()
            .all(|w| w.reason == FailureReason::DeadlineExceeded)
    );
}

#[tokio::test(start_paused = true)]
async fn test_expired_deadline_skips_every_step() {
    let h = TestHarness::new();

    let order = h.checkout_within(request(), Duration::ZERO).await;

    assert_eq!(order.status, OrderStatus::Rejected);
    assert_eq!(order.reason, Some(OrderReason::DeadlineExceeded));
    assert_eq!(h.services.catalog.lookup_count(), 0);
    assert_eq!(h.services.shipping.quote_count(), 0);
    assert_eq!(order.warnings.len(), Step::SEQUENCE.len());
}

#[tokio::test(start_paused = true)]
async fn test_detached_steps_do_not_delay_the_response() {
    let h = TestHarness::new();
    h.services.accounting.set_delay(Duration::from_millis(800));
    h.services.email.set_delay(Duration::from_millis(800));

    let started = tokio::time::Instant::now();
    let order = h.checkout(request()).await;

    assert!(started.elapsed() < Duration::from_millis(800));
    assert_eq!(order.status, OrderStatus::Completed);
    assert!(h.orchestrator.background().pending() > 0);

    h.settle().await;
    assert_eq!(h.services.accounting.events().len(), 1);
    assert_eq!(h.services.email.sent().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_follow_ups_after_deadline_get_their_own_budget() {
    let h = TestHarness::new();
    h.services.fraud_detection.set_delay(Duration::from_secs(1));
    let accounting = Recording::new(h.services.accounting.clone());
    let config = CheckoutConfig {
        timeouts: CollaboratorTimeouts::uniform(Duration::from_secs(60)),
        ..CheckoutConfig::default()
    };
    let orchestrator = CheckoutOrchestrator::new(
        Collaborators {
            accounting: Arc::new(accounting.clone()),
            ..h.services.collaborators()
        },
        config,
    );

    let order = orchestrator
        .checkout(
            request(),
            RequestContext::new("late", Duration::from_millis(300)),
        )
        .await
        .unwrap();
    orchestrator.background().wait_idle().await;

    assert_eq!(order.status, OrderStatus::CompletedWithWarnings);
    let remaining = accounting.remaining();
    assert_eq!(remaining.len(), 1);
    assert!(remaining[0] > Duration::from_secs(30), "{remaining:?}");
    assert_eq!(h.services.accounting.events().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_reversal_near_deadline_gets_reversal_timeout() {
    let h = TestHarness::without_call_timeouts();
    h.services.fraud_detection.flag_user("user-42");
    h.services.fraud_detection.set_delay(Duration::from_millis(290));
    h.services.payment.set_refund_delay(Duration::from_millis(100));
    let payment = Recording::new(h.services.payment.clone());
    let config = CheckoutConfig {
        timeouts: CollaboratorTimeouts::uniform(Duration::from_secs(60)),
        ..CheckoutConfig::default()
    };
    let reversal_timeout = config.reversal_timeout;
    let orchestrator = CheckoutOrchestrator::new(
        Collaborators {
            payment: Arc::new(payment.clone()),
            ..h.services.collaborators()
        },
        config,
    );

    let order = orchestrator
        .checkout(
            request(),
            RequestContext::new("flagged", Duration::from_millis(300)),
        )
        .await
        .unwrap();
    orchestrator.background().wait_idle().await;

    assert_eq!(order.reason, Some(OrderReason::FraudFlagged));
    let remaining = payment.remaining();
    assert_eq!(remaining.len(), 1);
    assert!(remaining[0] > Duration::from_millis(100), "{remaining:?}");
    assert!(remaining[0] <= reversal_timeout);
    assert_eq!(h.services.payment.refunds().len(), 1);
}

#[tokio::test]
async fn test_max_quantity_line_is_priced_without_overflow() {
    let h = TestHarness::new();
    let mut req = request();
    req.items = vec![CartItem::new("A", u32::MAX), CartItem::new("B", 1)];

    let order = h.checkout(req).await;

    assert_eq!(order.status, OrderStatus::Completed, "{order:?}");
    let total = order.total.as_ref().unwrap();
    let subtotal = 1000 * i64::from(u32::MAX) + 250;
    assert_eq!(total.subtotal, Money::from_cents(subtotal));
    assert_eq!(total.total, Money::from_cents(subtotal + 500));
    assert_eq!(h.services.payment.last_charge_amount(), Some(usd(subtotal + 500)));
}

#[tokio::test]
async fn test_unrepresentable_cart_total_rejects_without_charging() {
    let h = TestHarness::new();
    h.services.catalog.set_price("A", usd(i64::MAX));

    let order = h.checkout(request()).await;

    assert_eq!(order.status, OrderStatus::Rejected);
    assert_eq!(order.reason, Some(OrderReason::CatalogUnavailable));
    assert_eq!(order.warnings[0].step, Step::Catalog);
    assert_eq!(order.warnings[0].reason, FailureReason::InvalidResponse);
    assert_eq!(h.services.payment.charge_count(), 0);
}

#[tokio::test]
async fn test_every_failure_combination_yields_a_terminal_order() {
    for mask in 0u8..32 {
        let h = TestHarness::new();
        let down = |bit: u8| {
            (mask & (1 << bit) != 0).then(|| CollaboratorError::Unavailable("down".to_string()))
        };

        h.services.catalog.set_error(down(0));
        h.services.shipping.set_quote_error(down(1));
        h.services.payment.set_charge_error(down(2));
        h.services.fraud_detection.set_error(down(3));
        h.services.shipping.set_ship_error(down(4));

        let order = h.checkout(request()).await;

        let expected = if mask & 0b1 != 0 {
            OrderStatus::Rejected
        } else if mask & 0b100 != 0 {
            OrderStatus::PaymentFailed
        } else if mask & 0b11010 != 0 {
            OrderStatus::CompletedWithWarnings
        } else {
            OrderStatus::Completed
        };
        assert_eq!(order.status, expected, "failure mask {mask:05b}");
        assert_eq!(order.total.is_some(), expected.is_success());
        if !expected.is_success() {
            assert_eq!(h.services.shipping.shipment_count(), 0);
        }
    }
}
