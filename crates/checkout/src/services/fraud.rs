//! Fraud detection service trait and in-memory implementation.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use common::Money;
use domain::contracts::{FraudCheckRequest, FraudVerdict};

use crate::context::RequestContext;
use crate::error::CollaboratorError;
use crate::services::fault::{Fault, read, write};

/// Screens charged orders for fraud.
#[async_trait]
pub trait FraudDetectionService: Send + Sync {
    async fn check(
        &self,
        ctx: &RequestContext,
        request: &FraudCheckRequest,
    ) -> Result<FraudVerdict, CollaboratorError>;
}

#[derive(Debug, Default)]
struct InMemoryFraudState {
    threshold: Option<Money>,
    flagged_users: HashSet<String>,
    checks: usize,
    fault: Fault,
}

/// In-memory screener flagging listed users and amounts above a threshold.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFraudDetectionService {
    state: Arc<RwLock<InMemoryFraudState>>,
}

impl InMemoryFraudDetectionService {
    /// Creates a screener that clears every order.
    pub fn new() -> Self {
        Self::default()
    }

    /// Flags every order whose amount is above `threshold`.
    pub fn set_flag_threshold(&self, threshold: Option<Money>) {
        write(&self.state).threshold = threshold;
    }

    /// Flags every order placed by `user_id`.
    pub fn flag_user(&self, user_id: impl Into<String>) {
        write(&self.state).flagged_users.insert(user_id.into());
    }

    pub fn set_error(&self, error: Option<CollaboratorError>) {
        write(&self.state).fault.error = error;
    }

    pub fn set_delay(&self, delay: Duration) {
        write(&self.state).fault.delay = Some(delay);
    }

    /// Returns the number of checks requested.
    pub fn check_count(&self) -> usize {
        read(&self.state).checks
    }
}

#[async_trait]
impl FraudDetectionService for InMemoryFraudDetectionService {
    async fn check(
        &self,
        _ctx: &RequestContext,
        request: &FraudCheckRequest,
    ) -> Result<FraudVerdict, CollaboratorError> {
        let fault = {
            let mut state = write(&self.state);
            state.checks += 1;
            state.fault.clone()
        };
        fault.inject().await?;

        let state = read(&self.state);
        if state.flagged_users.contains(&request.user_id) {
            return Ok(FraudVerdict::flagged("user on watch list"));
        }
        if let Some(threshold) = state.threshold.filter(|t| request.amount.cents > *t) {
            return Ok(FraudVerdict::flagged(format!(
                "amount {} above {}",
                request.amount.cents, threshold
            )));
        }
        Ok(FraudVerdict::clear())
    }
}
