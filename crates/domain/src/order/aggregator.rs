//! Derives the final [`Order`] from an [`OrderContext`].

use crate::order::context::OrderContext;
use crate::order::model::{Order, OrderReason, OrderStatus, OrderTotal, OrderWarning};
use crate::step::{FailureKind, FailureReason, StepOutcome};

/// Builds the order for a finished checkout.
///
/// Pure: the result depends only on the recorded outcomes, so calling it
/// twice on the same context yields identical orders. Status is decided by
/// the first matching rule:
///
/// 1. payment failed (not because of the deadline) → `PaymentFailed`
/// 2. fraud flagged → `Rejected` / `fraud_flagged`
/// 3. catalog failed → `Rejected` / `catalog_miss` or `catalog_unavailable`
/// 4. deadline hit before a successful charge → `Rejected` / `deadline_exceeded`
/// 5. no successful charge → `Rejected` / `not_charged`
/// 6. any recorded failure → `CompletedWithWarnings`
/// 7. otherwise → `Completed`
pub fn aggregate(ctx: &OrderContext) -> Order {
    let (status, reason) = derive_status(ctx);

    let total = if status.is_success() {
        order_total(ctx)
    } else {
        None
    };

    let warnings = ctx
        .failures()
        .iter()
        .filter(|f| f.kind != FailureKind::Fatal)
        .map(OrderWarning::from)
        .collect();

    Order {
        order_id: ctx.order_id(),
        user_id: ctx.user_id().to_string(),
        status,
        reason,
        total,
        payment_transaction_id: ctx.payment_receipt().map(|r| r.transaction_id.clone()),
        tracking_id: ctx.tracking_id().map(String::from),
        warnings,
        created_at: ctx.created_at(),
    }
}

fn derive_status(ctx: &OrderContext) -> (OrderStatus, Option<OrderReason>) {
    if let Some(StepOutcome::Failure(error)) = ctx.payment() {
        if error.reason != FailureReason::DeadlineExceeded {
            return (OrderStatus::PaymentFailed, Some(OrderReason::PaymentFailed));
        }
    }

    if ctx.fraud_flagged() {
        return (OrderStatus::Rejected, Some(OrderReason::FraudFlagged));
    }

    if let Some(StepOutcome::Failure(error)) = ctx.catalog() {
        match error.reason {
            FailureReason::NotFound => {
                return (OrderStatus::Rejected, Some(OrderReason::CatalogMiss));
            }
            FailureReason::DeadlineExceeded => {}
            _ => {
                return (OrderStatus::Rejected, Some(OrderReason::CatalogUnavailable));
            }
        }
    }

    if !ctx.payment_succeeded() {
        let reason = if ctx.deadline_exceeded() {
            OrderReason::DeadlineExceeded
        } else {
            OrderReason::NotCharged
        };
        return (OrderStatus::Rejected, Some(reason));
    }

    if ctx.failures().is_empty() {
        (OrderStatus::Completed, None)
    } else {
        (OrderStatus::CompletedWithWarnings, None)
    }
}

fn order_total(ctx: &OrderContext) -> Option<OrderTotal> {
    let cart = ctx.priced_cart()?;
    let charged = ctx.charge_amount()?;
    let subtotal = cart.subtotal();
    let shipping = ctx.shipping_cost();
    let total = ctx.cart_total()?.cents;

    Some(OrderTotal {
        currency_code: cart.currency_code.clone(),
        items: cart.lines.clone(),
        subtotal,
        shipping,
        total,
        converted: &charged.currency_code == ctx.requested_currency(),
        charged,
    })
}
