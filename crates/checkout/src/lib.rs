//! Checkout orchestration.
//!
//! A checkout prices the cart and quotes shipping concurrently, converts the
//! total into the requested currency, charges the customer, screens the
//! charge for fraud and dispatches the shipment:
//!
//! ```text
//! (catalog ∥ shipping quote) → currency → payment → fraud check → shipment
//! ```
//!
//! Catalog and payment failures are fatal; every other failure is folded
//! into the order as a warning. Email, accounting, cart emptying and payment
//! reversal run as detached background tasks.

pub mod background;
pub mod config;
pub mod context;
pub mod error;
pub mod orchestrator;
pub mod services;

pub use background::BackgroundTasks;
pub use config::{CheckoutConfig, CollaboratorTimeouts};
pub use context::RequestContext;
pub use error::{CheckoutError, CollaboratorError};
pub use orchestrator::CheckoutOrchestrator;
pub use services::{
    AccountingService, CartService, CatalogService, CollaboratorUrls, Collaborators,
    CurrencyService, EmailService, FraudDetectionService, InMemoryAccountingService,
    InMemoryCartService, InMemoryCatalogService, InMemoryCollaborators, InMemoryCurrencyService,
    InMemoryEmailService, InMemoryFraudDetectionService, InMemoryPaymentService,
    InMemoryShippingService, PaymentService, ShippingService,
};
