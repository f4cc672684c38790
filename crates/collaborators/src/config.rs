//! Simulator configuration loaded from environment variables.

use common::{InvalidFailureRate, Money};
use thiserror::Error;

/// Invalid simulator setting.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {var}")]
    Invalid { var: &'static str, value: String },

    #[error(transparent)]
    FailureRate(#[from] InvalidFailureRate),
}

/// Simulator settings with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"127.0.0.1"`)
/// - `COLLABORATORS_BASE_PORT`: port of the first service; the others
///   follow consecutively (default: `9100`)
/// - `PAYMENT_FAILURE_RATE`: share of declined charges, `0.0-1.0`
///   (default: `0.0`)
/// - `FRAUD_FLAG_THRESHOLD_CENTS`: flag orders above this amount
///   (default: unset, nothing is flagged)
/// - `SHIPPING_FLAT_RATE_CENTS` / `SHIPPING_PER_UNIT_CENTS`: quote
///   components in USD (defaults: `599` / `100`)
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatorConfig {
    pub host: String,
    pub base_port: u16,
    pub payment_failure_rate: f64,
    pub fraud_flag_threshold: Option<Money>,
    pub shipping_flat_rate: Money,
    pub shipping_per_unit: Money,
}

impl SimulatorConfig {
    /// Loads configuration from environment variables, falling back to
    /// defaults for unset ones. Set but unparsable values are errors.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            host: std::env::var("HOST").unwrap_or(defaults.host),
            base_port: parse_var("COLLABORATORS_BASE_PORT")?.unwrap_or(defaults.base_port),
            payment_failure_rate: parse_var("PAYMENT_FAILURE_RATE")?
                .unwrap_or(defaults.payment_failure_rate),
            fraud_flag_threshold: parse_var::<i64>("FRAUD_FLAG_THRESHOLD_CENTS")?
                .map(Money::from_cents),
            shipping_flat_rate: parse_var::<i64>("SHIPPING_FLAT_RATE_CENTS")?
                .map(Money::from_cents)
                .unwrap_or(defaults.shipping_flat_rate),
            shipping_per_unit: parse_var::<i64>("SHIPPING_PER_UNIT_CENTS")?
                .map(Money::from_cents)
                .unwrap_or(defaults.shipping_per_unit),
        })
    }

    /// Returns the `"host:port"` bind address of the n-th service.
    pub fn addr(&self, index: u16) -> String {
        format!("{}:{}", self.host, self.base_port + index)
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            base_port: 9100,
            payment_failure_rate: 0.0,
            fraud_flag_threshold: None,
            shipping_flat_rate: Money::from_cents(599),
            shipping_per_unit: Money::from_cents(100),
        }
    }
}

fn parse_var<T: std::str::FromStr>(var: &'static str) -> Result<Option<T>, ConfigError> {
    match std::env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { var, value }),
        Err(_) => Ok(None),
    }
}
