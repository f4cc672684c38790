//! Checkout steps and their outcomes.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// External services the orchestrator calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collaborator {
    Catalog,
    Shipping,
    Currency,
    Payment,
    FraudDetection,
    Email,
    Accounting,
    Cart,
}

impl Collaborator {
    /// Returns the collaborator name as used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Collaborator::Catalog => "catalog",
            Collaborator::Shipping => "shipping",
            Collaborator::Currency => "currency",
            Collaborator::Payment => "payment",
            Collaborator::FraudDetection => "fraud_detection",
            Collaborator::Email => "email",
            Collaborator::Accounting => "accounting",
            Collaborator::Cart => "cart",
        }
    }
}

impl std::fmt::Display for Collaborator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of work in the checkout flow.
///
/// The first six run on the request path, in this order:
/// ```text
/// (Catalog ∥ ShippingQuote) ──► CurrencyConversion ──► Payment ──► FraudCheck ──► Shipment
/// ```
/// The rest are detached from the response and never recorded in the
/// order context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Catalog,
    ShippingQuote,
    CurrencyConversion,
    Payment,
    FraudCheck,
    Shipment,
    PaymentReversal,
    ConfirmationEmail,
    AccountingEvent,
    EmptyCart,
}

impl Step {
    /// Steps executed on the request path, in order.
    pub const SEQUENCE: [Step; 6] = [
        Step::Catalog,
        Step::ShippingQuote,
        Step::CurrencyConversion,
        Step::Payment,
        Step::FraudCheck,
        Step::Shipment,
    ];

    /// Returns the step name as used in logs, metrics and responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Catalog => "catalog",
            Step::ShippingQuote => "shipping_quote",
            Step::CurrencyConversion => "currency_conversion",
            Step::Payment => "payment",
            Step::FraudCheck => "fraud_check",
            Step::Shipment => "shipment",
            Step::PaymentReversal => "payment_reversal",
            Step::ConfirmationEmail => "confirmation_email",
            Step::AccountingEvent => "accounting_event",
            Step::EmptyCart => "empty_cart",
        }
    }

    /// The collaborator this step calls.
    pub fn collaborator(&self) -> Collaborator {
        match self {
            Step::Catalog => Collaborator::Catalog,
            Step::ShippingQuote | Step::Shipment => Collaborator::Shipping,
            Step::CurrencyConversion => Collaborator::Currency,
            Step::Payment | Step::PaymentReversal => Collaborator::Payment,
            Step::FraudCheck => Collaborator::FraudDetection,
            Step::ConfirmationEmail => Collaborator::Email,
            Step::AccountingEvent => Collaborator::Accounting,
            Step::EmptyCart => Collaborator::Cart,
        }
    }

    /// Classifies a failure of this step.
    ///
    /// A deadline failure is always `DeadlineExceeded`; otherwise catalog and
    /// payment failures are fatal and everything else is tolerable.
    pub fn failure_kind(&self, error: &StepError) -> FailureKind {
        if error.reason == FailureReason::DeadlineExceeded {
            return FailureKind::DeadlineExceeded;
        }
        match self {
            Step::Catalog | Step::Payment => FailureKind::Fatal,
            _ => FailureKind::Tolerable,
        }
    }

    /// What a failure of this step means for the order, shown to the caller.
    pub fn warning_note(&self) -> &'static str {
        match self {
            Step::Catalog => "cart could not be priced",
            Step::ShippingQuote => "shipping quote unavailable, placeholder shipping cost applied",
            Step::CurrencyConversion => "total charged in cart currency, unconverted",
            Step::Payment => "payment outcome unknown",
            Step::FraudCheck => "fraud screening unavailable, order not screened",
            Step::Shipment => "shipment not dispatched, must be retried out of band",
            Step::PaymentReversal => "payment reversal not confirmed",
            Step::ConfirmationEmail => "confirmation email not sent",
            Step::AccountingEvent => "accounting event not published",
            Step::EmptyCart => "cart not emptied",
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error taxonomy for step failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Aborts the remaining steps and decides a non-success status.
    Fatal,
    /// Recorded as a warning; the flow continues.
    Tolerable,
    /// The request deadline passed; treated as fatal from here on.
    DeadlineExceeded,
}

/// Why a downstream call did not produce a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    Timeout,
    DeadlineExceeded,
    NotFound,
    Declined,
    Unavailable,
    InvalidResponse,
}

impl FailureReason {
    /// Returns the reason as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::Timeout => "timeout",
            FailureReason::DeadlineExceeded => "deadline_exceeded",
            FailureReason::NotFound => "not_found",
            FailureReason::Declined => "declined",
            FailureReason::Unavailable => "unavailable",
            FailureReason::InvalidResponse => "invalid_response",
        }
    }

    /// Whether a repeat of the call could plausibly succeed.
    ///
    /// Informational only: nothing in the checkout flow retries.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FailureReason::Timeout | FailureReason::DeadlineExceeded | FailureReason::Unavailable
        )
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure payload of a [`StepOutcome`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepError {
    pub reason: FailureReason,
    pub message: String,
    pub retryable: bool,
}

impl StepError {
    /// Creates an error whose retryability follows from its reason.
    pub fn new(reason: FailureReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
            retryable: reason.is_retryable(),
        }
    }

    /// The collaborator did not answer within its per-call timeout.
    pub fn timeout(after: Duration) -> Self {
        Self::new(
            FailureReason::Timeout,
            format!("no response within {}ms", after.as_millis()),
        )
    }

    /// The request deadline passed while the call was in flight.
    pub fn deadline_exceeded() -> Self {
        Self::new(
            FailureReason::DeadlineExceeded,
            "request deadline exceeded while the call was in flight",
        )
    }

    /// The request deadline had already passed; the step never started.
    pub fn skipped() -> Self {
        Self::new(
            FailureReason::DeadlineExceeded,
            "skipped, request deadline already exceeded",
        )
    }
}

impl std::fmt::Display for StepError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.reason, self.message)
    }
}

/// Result of one attempted step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome<T> {
    Success(T),
    Failure(StepError),
}

impl<T> StepOutcome<T> {
    /// Returns true if the step succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, StepOutcome::Success(_))
    }

    /// Returns the success payload, if any.
    pub fn success(&self) -> Option<&T> {
        match self {
            StepOutcome::Success(value) => Some(value),
            StepOutcome::Failure(_) => None,
        }
    }

    /// Returns the failure, if any.
    pub fn failure(&self) -> Option<&StepError> {
        match self {
            StepOutcome::Success(_) => None,
            StepOutcome::Failure(error) => Some(error),
        }
    }
}

impl<T> From<Result<T, StepError>> for StepOutcome<T> {
    fn from(result: Result<T, StepError>) -> Self {
        match result {
            Ok(value) => StepOutcome::Success(value),
            Err(error) => StepOutcome::Failure(error),
        }
    }
}

/// A failure recorded in the order context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepFailure {
    pub step: Step,
    pub collaborator: Collaborator,
    pub kind: FailureKind,
    pub reason: FailureReason,
    pub message: String,
    pub retryable: bool,
}

impl StepFailure {
    /// Classifies `error` against `step`.
    pub fn new(step: Step, error: &StepError) -> Self {
        Self {
            step,
            collaborator: step.collaborator(),
            kind: step.failure_kind(error),
            reason: error.reason,
            message: error.message.clone(),
            retryable: error.retryable,
        }
    }
}
