//! Inbound checkout request.

use common::{CurrencyCode, ProductId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// One line of the cart being checked out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl CartItem {
    /// Creates a new cart line.
    pub fn new(product_id: impl Into<ProductId>, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// Shipping destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street_address: String,
    pub city: String,
    #[serde(default)]
    pub state: String,
    pub country: String,
    pub zip_code: String,
}

/// A request to check out a user's cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub user_id: String,
    pub items: Vec<CartItem>,
    pub address: Address,
    pub payment_token: String,
    /// Currency the user wants to be charged in.
    pub currency_code: CurrencyCode,
    /// Where to send the confirmation; no email is sent when absent.
    #[serde(default)]
    pub email: Option<String>,
}

impl CheckoutRequest {
    /// Checks the request invariants: a non-empty cart with positive
    /// quantities and no blank identifying fields.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.user_id.trim().is_empty() {
            return Err(DomainError::MissingField("user_id"));
        }
        if self.payment_token.trim().is_empty() {
            return Err(DomainError::MissingField("payment_token"));
        }
        if self.items.is_empty() {
            return Err(DomainError::EmptyCart);
        }
        for item in &self.items {
            if item.product_id.is_blank() {
                return Err(DomainError::MissingField("product_id"));
            }
            if item.quantity == 0 {
                return Err(DomainError::InvalidQuantity {
                    product_id: item.product_id.to_string(),
                    quantity: item.quantity,
                });
            }
        }

        let address = &self.address;
        for (name, value) in [
            ("address.street_address", &address.street_address),
            ("address.city", &address.city),
            ("address.country", &address.country),
            ("address.zip_code", &address.zip_code),
        ] {
            if value.trim().is_empty() {
                return Err(DomainError::MissingField(name));
            }
        }

        if matches!(&self.email, Some(email) if email.trim().is_empty()) {
            return Err(DomainError::MissingField("email"));
        }
        Ok(())
    }

    /// Total number of units across all lines, saturating at `u32::MAX`.
    pub fn unit_count(&self) -> u32 {
        self.items
            .iter()
            .fold(0u32, |units, item| units.saturating_add(item.quantity))
    }
}
