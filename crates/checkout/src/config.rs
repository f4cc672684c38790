//! Checkout tuning: per-collaborator timeouts, deadline and fallbacks.

use std::time::Duration;

use common::Money;
use domain::Collaborator;

/// Upper bound for a single call to each collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollaboratorTimeouts {
    pub catalog: Duration,
    pub shipping: Duration,
    pub currency: Duration,
    pub payment: Duration,
    pub fraud_detection: Duration,
    pub email: Duration,
    pub accounting: Duration,
    pub cart: Duration,
}

impl CollaboratorTimeouts {
    /// Sets every timeout to `timeout`.
    pub fn uniform(timeout: Duration) -> Self {
        Self {
            catalog: timeout,
            shipping: timeout,
            currency: timeout,
            payment: timeout,
            fraud_detection: timeout,
            email: timeout,
            accounting: timeout,
            cart: timeout,
        }
    }

    pub fn for_collaborator(&self, collaborator: Collaborator) -> Duration {
        match collaborator {
            Collaborator::Catalog => self.catalog,
            Collaborator::Shipping => self.shipping,
            Collaborator::Currency => self.currency,
            Collaborator::Payment => self.payment,
            Collaborator::FraudDetection => self.fraud_detection,
            Collaborator::Email => self.email,
            Collaborator::Accounting => self.accounting,
            Collaborator::Cart => self.cart,
        }
    }
}

impl Default for CollaboratorTimeouts {
    fn default() -> Self {
        Self {
            catalog: Duration::from_millis(1000),
            shipping: Duration::from_millis(1000),
            currency: Duration::from_millis(500),
            payment: Duration::from_millis(2000),
            fraud_detection: Duration::from_millis(1000),
            email: Duration::from_millis(1000),
            accounting: Duration::from_millis(1000),
            cart: Duration::from_millis(500),
        }
    }
}

/// Configuration of the checkout orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutConfig {
    pub timeouts: CollaboratorTimeouts,
    /// Timeout of the detached payment reversal after a fraud flag.
    pub reversal_timeout: Duration,
    /// Shipping cost charged when no quote could be obtained.
    pub placeholder_shipping: Money,
    /// Deadline applied when the caller does not supply one.
    pub request_deadline: Duration,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            timeouts: CollaboratorTimeouts::default(),
            reversal_timeout: Duration::from_millis(500),
            placeholder_shipping: Money::zero(),
            request_deadline: Duration::from_secs(5),
        }
    }
}
