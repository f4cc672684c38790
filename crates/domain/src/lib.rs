//! Domain layer for checkout orchestration.
//!
//! This crate provides:
//! - the inbound `CheckoutRequest` and its validation
//! - step bookkeeping (`Step`, `StepOutcome`, `StepFailure`)
//! - the per-request `OrderContext` accumulator
//! - the final `Order` and the pure `aggregate` function that derives it
//! - wire contracts shared with the downstream collaborators

pub mod contracts;
pub mod error;
pub mod order;
pub mod request;
pub mod step;

pub use error::DomainError;
pub use order::{
    LineItem, Order, OrderContext, OrderReason, OrderStatus, OrderTotal, OrderWarning, PricedCart,
    aggregate,
};
pub use request::{Address, CartItem, CheckoutRequest};
pub use step::{
    Collaborator, FailureKind, FailureReason, Step, StepError, StepFailure, StepOutcome,
};
