//! Email service trait and in-memory implementation.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use domain::contracts::ConfirmationEmail;

use crate::context::RequestContext;
use crate::error::CollaboratorError;
use crate::services::fault::{Fault, read, write};

/// Sends customer notifications.
#[async_trait]
pub trait EmailService: Send + Sync {
    async fn send_confirmation(
        &self,
        ctx: &RequestContext,
        email: &ConfirmationEmail,
    ) -> Result<(), CollaboratorError>;
}

#[derive(Debug, Default)]
struct InMemoryEmailState {
    sent: Vec<ConfirmationEmail>,
    fault: Fault,
}

/// In-memory mailer that keeps every message it was asked to send.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEmailService {
    state: Arc<RwLock<InMemoryEmailState>>,
}

impl InMemoryEmailService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_error(&self, error: Option<CollaboratorError>) {
        write(&self.state).fault.error = error;
    }

    pub fn set_delay(&self, delay: Duration) {
        write(&self.state).fault.delay = Some(delay);
    }

    /// Returns the confirmations sent so far.
    pub fn sent(&self) -> Vec<ConfirmationEmail> {
        read(&self.state).sent.clone()
    }
}

#[async_trait]
impl EmailService for InMemoryEmailService {
    async fn send_confirmation(
        &self,
        _ctx: &RequestContext,
        email: &ConfirmationEmail,
    ) -> Result<(), CollaboratorError> {
        let fault = read(&self.state).fault.clone();
        fault.inject().await?;

        write(&self.state).sent.push(email.clone());
        Ok(())
    }
}
