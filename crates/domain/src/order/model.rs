//! The final order returned to the caller.

use chrono::{DateTime, Utc};
use common::{CurrencyCode, Money, OrderId, Price};
use serde::{Deserialize, Serialize};

use crate::order::context::LineItem;
use crate::step::{Collaborator, FailureReason, Step, StepFailure};

/// Terminal status of a checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Every step succeeded.
    Completed,
    /// Payment succeeded; one or more tolerable steps failed.
    CompletedWithWarnings,
    /// The charge was declined or failed.
    PaymentFailed,
    /// The order was refused (catalog miss, fraud flag, deadline).
    Rejected,
}

impl OrderStatus {
    /// Returns true if the customer was charged and the order stands.
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            OrderStatus::Completed | OrderStatus::CompletedWithWarnings
        )
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Completed => "Completed",
            OrderStatus::CompletedWithWarnings => "CompletedWithWarnings",
            OrderStatus::PaymentFailed => "PaymentFailed",
            OrderStatus::Rejected => "Rejected",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an order did not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderReason {
    PaymentFailed,
    FraudFlagged,
    CatalogMiss,
    CatalogUnavailable,
    DeadlineExceeded,
    /// The flow ended without a successful charge and without any recorded
    /// fatal failure.
    NotCharged,
}

impl OrderReason {
    /// Returns the reason as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderReason::PaymentFailed => "payment_failed",
            OrderReason::FraudFlagged => "fraud_flagged",
            OrderReason::CatalogMiss => "catalog_miss",
            OrderReason::CatalogUnavailable => "catalog_unavailable",
            OrderReason::DeadlineExceeded => "deadline_exceeded",
            OrderReason::NotCharged => "not_charged",
        }
    }
}

impl std::fmt::Display for OrderReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Itemized total of a completed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotal {
    /// Currency the catalog priced the cart in.
    pub currency_code: CurrencyCode,
    pub items: Vec<LineItem>,
    pub subtotal: Money,
    pub shipping: Money,
    /// `subtotal + shipping`, in `currency_code`.
    pub total: Money,
    /// What the payment collaborator was asked to charge.
    pub charged: Price,
    /// False when the charge fell back to the cart currency.
    pub converted: bool,
}

/// A non-fatal problem surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderWarning {
    pub step: Step,
    pub collaborator: Collaborator,
    pub reason: FailureReason,
    pub message: String,
    pub retryable: bool,
}

impl From<&StepFailure> for OrderWarning {
    fn from(failure: &StepFailure) -> Self {
        Self {
            step: failure.step,
            collaborator: failure.collaborator,
            reason: failure.reason,
            message: format!("{}: {}", failure.step.warning_note(), failure.message),
            retryable: failure.retryable,
        }
    }
}

/// Final result of one checkout. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub user_id: String,
    pub status: OrderStatus,
    pub reason: Option<OrderReason>,
    pub total: Option<OrderTotal>,
    pub payment_transaction_id: Option<String>,
    pub tracking_id: Option<String>,
    pub warnings: Vec<OrderWarning>,
    pub created_at: DateTime<Utc>,
}
