//! Application configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use checkout::{CheckoutConfig, CollaboratorUrls};
use common::Money;
use thiserror::Error;

/// A set but unparsable environment variable.
#[derive(Debug, Error)]
#[error("invalid value '{value}' for {var}")]
pub struct ConfigError {
    pub var: String,
    pub value: String,
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `CHECKOUT_DEADLINE_MS`: overall request deadline (default: `5000`)
/// - `<COLLABORATOR>_SERVICE_URL`: base URL of each collaborator, e.g.
///   `PAYMENT_SERVICE_URL`. Unset ones default to `http://127.0.0.1` on
///   consecutive ports from `COLLABORATORS_BASE_PORT` (default: `9100`),
///   matching the `collaborators` binary.
/// - `<COLLABORATOR>_TIMEOUT_MS`: per-call timeout of each collaborator
/// - `PAYMENT_REVERSAL_TIMEOUT_MS`: timeout of the refund after a fraud
///   flag (default: `500`)
/// - `PLACEHOLDER_SHIPPING_CENTS`: shipping cost used when the quote fails
///   (default: `0`)
///
/// `RUST_LOG` and `LOG_FORMAT` are read by the telemetry crate.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub urls: CollaboratorUrls,
    pub checkout: CheckoutConfig,
}

impl Config {
    /// Loads configuration from environment variables, falling back to
    /// defaults for unset ones.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Loads configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let base_port = parse_var(&lookup, "COLLABORATORS_BASE_PORT")?.unwrap_or(9100);

        let mut urls = CollaboratorUrls::consecutive("127.0.0.1", base_port);
        let mut timeouts = defaults.checkout.timeouts;
        let collaborators = [
            ("CATALOG", &mut urls.catalog, &mut timeouts.catalog),
            ("SHIPPING", &mut urls.shipping, &mut timeouts.shipping),
            ("CURRENCY", &mut urls.currency, &mut timeouts.currency),
            ("PAYMENT", &mut urls.payment, &mut timeouts.payment),
            (
                "FRAUD_DETECTION",
                &mut urls.fraud_detection,
                &mut timeouts.fraud_detection,
            ),
            ("EMAIL", &mut urls.email, &mut timeouts.email),
            ("ACCOUNTING", &mut urls.accounting, &mut timeouts.accounting),
            ("CART", &mut urls.cart, &mut timeouts.cart),
        ];
        for (name, url, timeout) in collaborators {
            if let Some(value) = lookup(&format!("{name}_SERVICE_URL")) {
                *url = value;
            }
            if let Some(ms) = parse_var(&lookup, &format!("{name}_TIMEOUT_MS"))? {
                *timeout = Duration::from_millis(ms);
            }
        }

        let millis = |var: &str, default: Duration| -> Result<Duration, ConfigError> {
            Ok(parse_var(&lookup, var)?
                .map(Duration::from_millis)
                .unwrap_or(default))
        };
        let checkout = CheckoutConfig {
            timeouts,
            reversal_timeout: millis(
                "PAYMENT_REVERSAL_TIMEOUT_MS",
                defaults.checkout.reversal_timeout,
            )?,
            placeholder_shipping: parse_var(&lookup, "PLACEHOLDER_SHIPPING_CENTS")?
                .map(Money::from_cents)
                .unwrap_or(defaults.checkout.placeholder_shipping),
            request_deadline: millis("CHECKOUT_DEADLINE_MS", defaults.checkout.request_deadline)?,
        };

        Ok(Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_var(&lookup, "PORT")?.unwrap_or(defaults.port),
            urls,
            checkout,
        })
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &str,
) -> Result<Option<T>, ConfigError> {
    lookup(var)
        .map(|value| {
            value.trim().parse().map_err(|_| ConfigError {
                var: var.to_string(),
                value,
            })
        })
        .transpose()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            urls: CollaboratorUrls::consecutive("127.0.0.1", 9100),
            checkout: CheckoutConfig::default(),
        }
    }
}
