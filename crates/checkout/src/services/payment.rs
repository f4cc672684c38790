//! Payment service trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use common::{FailurePolicy, NeverFail, OrderId, Price};
use domain::contracts::{ChargeRequest, PaymentReceipt, RefundRequest};

use crate::context::RequestContext;
use crate::error::CollaboratorError;
use crate::services::fault::{Fault, read, write};

/// Charges and refunds customers.
#[async_trait]
pub trait PaymentService: Send + Sync {
    /// Charges the payment token for the order.
    async fn charge(
        &self,
        ctx: &RequestContext,
        request: &ChargeRequest,
    ) -> Result<PaymentReceipt, CollaboratorError>;

    /// Reverses a previous charge.
    async fn refund(
        &self,
        ctx: &RequestContext,
        request: &RefundRequest,
    ) -> Result<(), CollaboratorError>;
}

#[derive(Debug)]
struct InMemoryPaymentState {
    payments: HashMap<String, (OrderId, Price)>,
    next_id: u32,
    charges: usize,
    refunds: Vec<String>,
    last_amount: Option<Price>,
    fail_on_charge: bool,
    failure_policy: Arc<dyn FailurePolicy>,
    charge_fault: Fault,
    refund_fault: Fault,
}

impl Default for InMemoryPaymentState {
    fn default() -> Self {
        Self {
            payments: HashMap::new(),
            next_id: 0,
            charges: 0,
            refunds: Vec::new(),
            last_amount: None,
            fail_on_charge: false,
            failure_policy: Arc::new(NeverFail),
            charge_fault: Fault::default(),
            refund_fault: Fault::default(),
        }
    }
}

/// In-memory payment service.
///
/// Charges are declined when `set_fail_on_charge` is on or when the failure
/// policy says so.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentService {
    state: Arc<RwLock<InMemoryPaymentState>>,
}

impl InMemoryPaymentService {
    /// Creates a payment service that accepts every charge.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a payment service that declines charges per `policy`.
    pub fn with_failure_policy(policy: Arc<dyn FailurePolicy>) -> Self {
        let service = Self::default();
        write(&service.state).failure_policy = policy;
        service
    }

    /// Configures the service to decline every charge.
    pub fn set_fail_on_charge(&self, fail: bool) {
        write(&self.state).fail_on_charge = fail;
    }

    /// Makes charges fail with `error` instead of a decline.
    pub fn set_charge_error(&self, error: Option<CollaboratorError>) {
        write(&self.state).charge_fault.error = error;
    }

    pub fn set_charge_delay(&self, delay: Duration) {
        write(&self.state).charge_fault.delay = Some(delay);
    }

    pub fn set_refund_error(&self, error: Option<CollaboratorError>) {
        write(&self.state).refund_fault.error = error;
    }

    pub fn set_refund_delay(&self, delay: Duration) {
        write(&self.state).refund_fault.delay = Some(delay);
    }

    /// Returns the number of charges attempted.
    pub fn charge_count(&self) -> usize {
        read(&self.state).charges
    }

    /// Returns the number of active (charged, not refunded) payments.
    pub fn payment_count(&self) -> usize {
        read(&self.state).payments.len()
    }

    /// Returns the transaction ids refunded so far.
    pub fn refunds(&self) -> Vec<String> {
        read(&self.state).refunds.clone()
    }

    /// Returns true if a payment exists with the given transaction id.
    pub fn has_payment(&self, transaction_id: &str) -> bool {
        read(&self.state).payments.contains_key(transaction_id)
    }

    /// Returns the amount of the last charge attempted.
    pub fn last_charge_amount(&self) -> Option<Price> {
        read(&self.state).last_amount.clone()
    }
}

#[async_trait]
impl PaymentService for InMemoryPaymentService {
    async fn charge(
        &self,
        _ctx: &RequestContext,
        request: &ChargeRequest,
    ) -> Result<PaymentReceipt, CollaboratorError> {
        let fault = {
            let mut state = write(&self.state);
            state.charges += 1;
            state.last_amount = Some(request.amount.clone());
            state.charge_fault.clone()
        };
        fault.inject().await?;

        let mut state = write(&self.state);
        if state.fail_on_charge || state.failure_policy.should_fail() {
            return Err(CollaboratorError::Declined("payment declined".to_string()));
        }

        state.next_id += 1;
        let transaction_id = format!("PAY-{:04}", state.next_id);
        state.payments.insert(
            transaction_id.clone(),
            (request.order_id, request.amount.clone()),
        );

        Ok(PaymentReceipt { transaction_id })
    }

    async fn refund(
        &self,
        _ctx: &RequestContext,
        request: &RefundRequest,
    ) -> Result<(), CollaboratorError> {
        let fault = read(&self.state).refund_fault.clone();
        fault.inject().await?;

        let mut state = write(&self.state);
        if state.payments.remove(&request.transaction_id).is_none() {
            return Err(CollaboratorError::NotFound(format!(
                "transaction {}",
                request.transaction_id
            )));
        }
        state.refunds.push(request.transaction_id.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{AlwaysFail, CurrencyCode, Money};

    fn ctx() -> RequestContext {
        RequestContext::new("test", Duration::from_secs(1))
    }

    fn charge_request() -> ChargeRequest {
        ChargeRequest {
            order_id: OrderId::new(),
            user_id: "user-1".to_string(),
            amount: Price::new(CurrencyCode::usd(), Money::from_cents(5000)),
            payment_token: "tok".to_string(),
        }
    }

    #[tokio::test]
    async fn test_charge_and_refund() {
        let service = InMemoryPaymentService::new();
        let request = charge_request();

        let receipt = service.charge(&ctx(), &request).await.unwrap();
        assert!(receipt.transaction_id.starts_with("PAY-"));
        assert_eq!(service.payment_count(), 1);
        assert!(service.has_payment(&receipt.transaction_id));

        service
            .refund(
                &ctx(),
                &RefundRequest {
                    order_id: request.order_id,
                    transaction_id: receipt.transaction_id.clone(),
                },
            )
            .await
            .unwrap();
        assert_eq!(service.payment_count(), 0);
        assert_eq!(service.refunds(), vec![receipt.transaction_id]);
    }

    #[tokio::test]
    async fn test_fail_on_charge() {
        let service = InMemoryPaymentService::new();
        service.set_fail_on_charge(true);

        let err = service.charge(&ctx(), &charge_request()).await.unwrap_err();
        assert!(matches!(err, CollaboratorError::Declined(_)));
        assert_eq!(service.payment_count(), 0);
        assert_eq!(service.charge_count(), 1);
    }

    #[tokio::test]
    async fn test_failure_policy_declines() {
        let service = InMemoryPaymentService::with_failure_policy(Arc::new(AlwaysFail));
        let result = service.charge(&ctx(), &charge_request()).await;
        assert!(matches!(result, Err(CollaboratorError::Declined(_))));
    }

    #[tokio::test]
    async fn test_sequential_transaction_ids() {
        let service = InMemoryPaymentService::new();

        let r1 = service.charge(&ctx(), &charge_request()).await.unwrap();
        let r2 = service.charge(&ctx(), &charge_request()).await.unwrap();

        assert_eq!(r1.transaction_id, "PAY-0001");
        assert_eq!(r2.transaction_id, "PAY-0002");
    }

    #[tokio::test]
    async fn test_refund_of_unknown_transaction() {
        let service = InMemoryPaymentService::new();
        let err = service
            .refund(
                &ctx(),
                &RefundRequest {
                    order_id: OrderId::new(),
                    transaction_id: "PAY-9999".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CollaboratorError::NotFound(_)));
    }
}
