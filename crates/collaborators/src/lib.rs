//! Simulated downstream services for the checkout API.
//!
//! Each collaborator is the in-memory implementation from the `checkout`
//! crate behind its own axum router, so a local run exercises the real
//! HTTP clients end to end.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use checkout::{InMemoryCollaborators, InMemoryPaymentService};
use common::{CurrencyCode, Money, Price, ProbabilisticFailure};

pub use config::{ConfigError, SimulatorConfig};
pub use error::ServiceError;

/// Demo catalog, priced in USD.
const CATALOG: &[(&str, i64)] = &[
    ("OLJCESPC7Z", 1999),
    ("66VCHSJNUP", 3499),
    ("1YMWWN1N4O", 10999),
    ("L9ECAV7KIM", 899),
    ("2ZYFJ3GM2N", 1850),
    ("0PUK6V6EV0", 6750),
    ("LS4PSXUNUM", 2499),
    ("9SIQT8TOJO", 12000),
    ("6E92ZMYYFZ", 450),
];

/// Units per USD.
const RATES: &[(&str, f64)] = &[
    ("EUR", 0.92),
    ("GBP", 0.79),
    ("JPY", 151.0),
    ("CAD", 1.36),
    ("CHF", 0.88),
];

/// Builds the in-memory collaborators with demo data and the configured
/// failure behaviour.
pub fn seed(config: &SimulatorConfig) -> Result<InMemoryCollaborators, ConfigError> {
    let policy = ProbabilisticFailure::new(config.payment_failure_rate)?;
    let mut services = InMemoryCollaborators::new();
    services.payment = InMemoryPaymentService::with_failure_policy(Arc::new(policy));

    for (id, cents) in CATALOG {
        services
            .catalog
            .set_price(*id, Price::new(CurrencyCode::usd(), Money::from_cents(*cents)));
    }
    for (code, rate) in RATES {
        let code = CurrencyCode::parse(code).map_err(|_| ConfigError::Invalid {
            var: "currency rate",
            value: (*code).to_string(),
        })?;
        services.currency.set_rate(code, *rate);
    }

    services
        .shipping
        .set_flat_rate(Price::new(CurrencyCode::usd(), config.shipping_flat_rate));
    services.shipping.set_per_unit(config.shipping_per_unit);
    services
        .fraud_detection
        .set_flag_threshold(config.fraud_flag_threshold);

    Ok(services)
}

/// One router per collaborator, in the port order of
/// [`checkout::CollaboratorUrls::consecutive`].
pub fn routers(services: &InMemoryCollaborators) -> Vec<(&'static str, Router)> {
    vec![
        ("catalog", routes::catalog::router(services.catalog.clone())),
        ("shipping", routes::shipping::router(services.shipping.clone())),
        ("currency", routes::currency::router(services.currency.clone())),
        ("payment", routes::payment::router(services.payment.clone())),
        (
            "fraud_detection",
            routes::fraud::router(services.fraud_detection.clone()),
        ),
        ("email", routes::email::router(services.email.clone())),
        (
            "accounting",
            routes::accounting::router(services.accounting.clone()),
        ),
        ("cart", routes::cart::router(services.cart.clone())),
    ]
}
