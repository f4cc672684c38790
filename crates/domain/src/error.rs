//! Domain error types.

use thiserror::Error;

/// Reasons a checkout request is rejected before orchestration starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// The cart has no lines.
    #[error("Cart must contain at least one item")]
    EmptyCart,

    /// A cart line has a non-positive quantity.
    #[error("Invalid quantity {quantity} for product {product_id}")]
    InvalidQuantity { product_id: String, quantity: u32 },

    /// A required text field is empty.
    #[error("Field '{0}' must not be empty")]
    MissingField(&'static str),
}
