//! Currency conversion service trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use common::{CurrencyCode, Price};
use domain::contracts::ConvertRequest;

use crate::context::RequestContext;
use crate::error::CollaboratorError;
use crate::services::fault::{Fault, read, write};

/// Converts amounts between currencies.
#[async_trait]
pub trait CurrencyService: Send + Sync {
    /// Converts `request.from` into `request.to_code`.
    async fn convert(
        &self,
        ctx: &RequestContext,
        request: &ConvertRequest,
    ) -> Result<Price, CollaboratorError>;
}

#[derive(Debug)]
struct InMemoryCurrencyState {
    /// Units of each currency per one USD.
    rates: HashMap<CurrencyCode, f64>,
    conversions: usize,
    fault: Fault,
}

impl Default for InMemoryCurrencyState {
    fn default() -> Self {
        Self {
            rates: HashMap::from([(CurrencyCode::usd(), 1.0)]),
            conversions: 0,
            fault: Fault::default(),
        }
    }
}

/// In-memory converter over a table of USD-relative rates.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCurrencyService {
    state: Arc<RwLock<InMemoryCurrencyState>>,
}

impl InMemoryCurrencyService {
    /// Creates a converter that only knows USD.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rate, returning the converter for chaining.
    pub fn with_rate(self, code: CurrencyCode, per_usd: f64) -> Self {
        self.set_rate(code, per_usd);
        self
    }

    /// Sets how many units of `code` one USD buys.
    pub fn set_rate(&self, code: CurrencyCode, per_usd: f64) {
        write(&self.state).rates.insert(code, per_usd);
    }

    pub fn set_error(&self, error: Option<CollaboratorError>) {
        write(&self.state).fault.error = error;
    }

    pub fn set_delay(&self, delay: Duration) {
        write(&self.state).fault.delay = Some(delay);
    }

    /// Returns the number of conversions requested.
    pub fn conversion_count(&self) -> usize {
        read(&self.state).conversions
    }

    /// Returns the supported currency codes, sorted.
    pub fn supported_currencies(&self) -> Vec<CurrencyCode> {
        let mut codes: Vec<CurrencyCode> = read(&self.state).rates.keys().cloned().collect();
        codes.sort();
        codes
    }
}

#[async_trait]
impl CurrencyService for InMemoryCurrencyService {
    async fn convert(
        &self,
        _ctx: &RequestContext,
        request: &ConvertRequest,
    ) -> Result<Price, CollaboratorError> {
        let fault = {
            let mut state = write(&self.state);
            state.conversions += 1;
            state.fault.clone()
        };
        fault.inject().await?;

        let state = read(&self.state);
        let rate_of = |code: &CurrencyCode| {
            state
                .rates
                .get(code)
                .copied()
                .ok_or_else(|| CollaboratorError::NotFound(format!("unsupported currency {code}")))
        };
        let from = rate_of(&request.from.currency_code)?;
        let to = rate_of(&request.to_code)?;

        Ok(Price::new(
            request.to_code.clone(),
            request.from.cents.scale(to / from),
        ))
    }
}
