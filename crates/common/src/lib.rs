//! Shared value objects for the checkout services.
//!
//! Everything here is used on both sides of the HTTP boundary: by the
//! checkout orchestrator and by the simulated collaborators it calls.

pub mod failure;
pub mod money;
pub mod types;

pub use failure::{
    AlwaysFail, FailurePolicy, InvalidFailureRate, NeverFail, ProbabilisticFailure,
};
pub use money::{CurrencyCode, InvalidCurrencyCode, Money, Price};
pub use types::{OrderId, ProductId};
