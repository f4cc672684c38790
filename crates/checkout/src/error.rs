//! Checkout error types.

use std::time::Duration;

use domain::{DomainError, FailureReason, StepError};
use thiserror::Error;

/// Errors a collaborator call can end with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollaboratorError {
    /// No response within the call timeout.
    #[error("no response within {}ms", .0.as_millis())]
    Timeout(Duration),

    /// The requested entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The collaborator refused the request.
    #[error("declined: {0}")]
    Declined(String),

    /// The collaborator could not be reached or reported an internal error.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// The collaborator answered with something that could not be used.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl CollaboratorError {
    /// Returns the failure reason recorded for this error.
    pub fn reason(&self) -> FailureReason {
        match self {
            CollaboratorError::Timeout(_) => FailureReason::Timeout,
            CollaboratorError::NotFound(_) => FailureReason::NotFound,
            CollaboratorError::Declined(_) => FailureReason::Declined,
            CollaboratorError::Unavailable(_) => FailureReason::Unavailable,
            CollaboratorError::InvalidResponse(_) => FailureReason::InvalidResponse,
        }
    }
}

impl From<CollaboratorError> for StepError {
    fn from(error: CollaboratorError) -> Self {
        let reason = error.reason();
        match error {
            CollaboratorError::Timeout(after) => StepError::timeout(after),
            CollaboratorError::NotFound(msg)
            | CollaboratorError::Declined(msg)
            | CollaboratorError::Unavailable(msg)
            | CollaboratorError::InvalidResponse(msg) => StepError::new(reason, msg),
        }
    }
}

/// Errors that prevent a checkout from running at all.
///
/// Collaborator failures never surface here; they are folded into the
/// returned order.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The request failed validation before any collaborator was called.
    #[error("invalid checkout request: {0}")]
    InvalidRequest(#[from] DomainError),
}

/// Convenience type alias for checkout results.
pub type Result<T> = std::result::Result<T, CheckoutError>;
