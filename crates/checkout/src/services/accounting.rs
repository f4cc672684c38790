//! Accounting service trait and in-memory implementation.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use domain::contracts::AccountingEvent;

use crate::context::RequestContext;
use crate::error::CollaboratorError;
use crate::services::fault::{Fault, read, write};

/// Receives the final outcome of every checkout.
#[async_trait]
pub trait AccountingService: Send + Sync {
    async fn publish(
        &self,
        ctx: &RequestContext,
        event: &AccountingEvent,
    ) -> Result<(), CollaboratorError>;
}

#[derive(Debug, Default)]
struct InMemoryAccountingState {
    events: Vec<AccountingEvent>,
    fault: Fault,
}

/// In-memory ledger of published events.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAccountingService {
    state: Arc<RwLock<InMemoryAccountingState>>,
}

impl InMemoryAccountingService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_error(&self, error: Option<CollaboratorError>) {
        write(&self.state).fault.error = error;
    }

    pub fn set_delay(&self, delay: Duration) {
        write(&self.state).fault.delay = Some(delay);
    }

    /// Returns the events published so far.
    pub fn events(&self) -> Vec<AccountingEvent> {
        read(&self.state).events.clone()
    }
}

#[async_trait]
impl AccountingService for InMemoryAccountingService {
    async fn publish(
        &self,
        _ctx: &RequestContext,
        event: &AccountingEvent,
    ) -> Result<(), CollaboratorError> {
        let fault = read(&self.state).fault.clone();
        fault.inject().await?;

        write(&self.state).events.push(event.clone());
        Ok(())
    }
}
