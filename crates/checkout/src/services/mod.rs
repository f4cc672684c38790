//! Collaborator service traits with in-memory and HTTP implementations.

pub mod accounting;
pub mod cart;
pub mod catalog;
pub mod currency;
pub mod email;
mod fault;
pub mod fraud;
pub mod http;
pub mod payment;
pub mod shipping;

use std::sync::Arc;

pub use accounting::{AccountingService, InMemoryAccountingService};
pub use cart::{CartService, InMemoryCartService};
pub use catalog::{CatalogService, InMemoryCatalogService};
pub use currency::{CurrencyService, InMemoryCurrencyService};
pub use email::{EmailService, InMemoryEmailService};
pub use fraud::{FraudDetectionService, InMemoryFraudDetectionService};
pub use http::{
    CollaboratorUrls, HttpAccountingService, HttpCartService, HttpCatalogService,
    HttpCurrencyService, HttpEmailService, HttpEndpoint, HttpFraudDetectionService,
    HttpPaymentService, HttpShippingService,
};
pub use payment::{InMemoryPaymentService, PaymentService};
pub use shipping::{InMemoryShippingService, ShippingService};

use crate::config::CollaboratorTimeouts;

/// The full set of collaborators the orchestrator talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub catalog: Arc<dyn CatalogService>,
    pub shipping: Arc<dyn ShippingService>,
    pub currency: Arc<dyn CurrencyService>,
    pub payment: Arc<dyn PaymentService>,
    pub fraud_detection: Arc<dyn FraudDetectionService>,
    pub email: Arc<dyn EmailService>,
    pub accounting: Arc<dyn AccountingService>,
    pub cart: Arc<dyn CartService>,
}

impl Collaborators {
    /// HTTP clients for every collaborator, sharing one connection pool.
    pub fn http(
        client: reqwest::Client,
        urls: &CollaboratorUrls,
        timeouts: &CollaboratorTimeouts,
    ) -> Self {
        let endpoint =
            |url: &str, timeout| HttpEndpoint::new(client.clone(), url.to_string(), timeout);
        Self {
            catalog: Arc::new(HttpCatalogService(endpoint(&urls.catalog, timeouts.catalog))),
            shipping: Arc::new(HttpShippingService(endpoint(
                &urls.shipping,
                timeouts.shipping,
            ))),
            currency: Arc::new(HttpCurrencyService(endpoint(
                &urls.currency,
                timeouts.currency,
            ))),
            payment: Arc::new(HttpPaymentService(endpoint(&urls.payment, timeouts.payment))),
            fraud_detection: Arc::new(HttpFraudDetectionService(endpoint(
                &urls.fraud_detection,
                timeouts.fraud_detection,
            ))),
            email: Arc::new(HttpEmailService(endpoint(&urls.email, timeouts.email))),
            accounting: Arc::new(HttpAccountingService(endpoint(
                &urls.accounting,
                timeouts.accounting,
            ))),
            cart: Arc::new(HttpCartService(endpoint(&urls.cart, timeouts.cart))),
        }
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

/// In-memory collaborators, kept as concrete handles so callers can
/// configure them and inspect what they received.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCollaborators {
    pub catalog: InMemoryCatalogService,
    pub shipping: InMemoryShippingService,
    pub currency: InMemoryCurrencyService,
    pub payment: InMemoryPaymentService,
    pub fraud_detection: InMemoryFraudDetectionService,
    pub email: InMemoryEmailService,
    pub accounting: InMemoryAccountingService,
    pub cart: InMemoryCartService,
}

impl InMemoryCollaborators {
    pub fn new() -> Self {
        Self::default()
    }

    /// Type-erased handles sharing state with `self`.
    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            catalog: Arc::new(self.catalog.clone()),
            shipping: Arc::new(self.shipping.clone()),
            currency: Arc::new(self.currency.clone()),
            payment: Arc::new(self.payment.clone()),
            fraud_detection: Arc::new(self.fraud_detection.clone()),
            email: Arc::new(self.email.clone()),
            accounting: Arc::new(self.accounting.clone()),
            cart: Arc::new(self.cart.clone()),
        }
    }
}
