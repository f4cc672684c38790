//! Wire contracts exchanged with the downstream collaborators.
//!
//! Every exchange is a single JSON request/response over HTTP. The success
//! payloads double as the step results recorded in the order context.

use chrono::{DateTime, Utc};
use common::{CurrencyCode, OrderId, Price, ProductId};
use serde::{Deserialize, Serialize};

use crate::order::{Order, OrderReason, OrderStatus};
use crate::request::{Address, CartItem};

/// Header carrying the correlation id from the inbound request to every
/// downstream call.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request paths served by the collaborators.
pub mod paths {
    /// `GET {CATALOG_PRODUCTS}/{product_id}`
    pub const CATALOG_PRODUCTS: &str = "/products";
    pub const SHIPPING_QUOTE: &str = "/quote";
    pub const SHIPPING_SHIP: &str = "/ship";
    pub const CURRENCY_CONVERT: &str = "/convert";
    pub const PAYMENT_CHARGE: &str = "/charge";
    pub const PAYMENT_REFUND: &str = "/refund";
    pub const FRAUD_CHECK: &str = "/check";
    pub const EMAIL_CONFIRMATION: &str = "/send-order-confirmation";
    pub const ACCOUNTING_ORDERS: &str = "/orders";
    pub const CART_EMPTY: &str = "/empty";
}

/// Catalog.GetPrice response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPrice {
    pub product_id: ProductId,
    pub price: Price,
}

/// Shipping.Quote request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub address: Address,
    pub items: Vec<CartItem>,
}

/// Shipping.Quote response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingQuote {
    pub cost: Price,
}

/// Shipping.Ship request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipRequest {
    pub order_id: OrderId,
    pub address: Address,
    pub items: Vec<CartItem>,
}

/// Shipping.Ship response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentReceipt {
    pub tracking_id: String,
}

/// Currency.Convert request. The response is a bare [`Price`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertRequest {
    pub from: Price,
    pub to_code: CurrencyCode,
}

/// Payment.Charge request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeRequest {
    pub order_id: OrderId,
    pub user_id: String,
    pub amount: Price,
    pub payment_token: String,
}

/// Payment.Charge response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub transaction_id: String,
}

/// Payment reversal request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundRequest {
    pub order_id: OrderId,
    pub transaction_id: String,
}

/// FraudDetection.Check request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FraudCheckRequest {
    pub order_id: OrderId,
    pub user_id: String,
    pub amount: Price,
    pub item_count: u32,
    pub address: Address,
}

/// FraudDetection.Check response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FraudVerdict {
    pub flagged: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

impl FraudVerdict {
    /// A verdict that lets the order through.
    pub fn clear() -> Self {
        Self {
            flagged: false,
            reason: None,
        }
    }

    /// A verdict that rejects the order.
    pub fn flagged(reason: impl Into<String>) -> Self {
        Self {
            flagged: true,
            reason: Some(reason.into()),
        }
    }
}

/// Email.Send request for an order confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationEmail {
    pub email: String,
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub total: Option<Price>,
    pub tracking_id: Option<String>,
}

impl ConfirmationEmail {
    /// Builds the confirmation for a finished order.
    pub fn for_order(email: impl Into<String>, order: &Order) -> Self {
        Self {
            email: email.into(),
            order_id: order.order_id,
            status: order.status,
            total: order.total.as_ref().map(|t| t.charged.clone()),
            tracking_id: order.tracking_id.clone(),
        }
    }
}

/// Accounting.Publish event describing the final outcome of a checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountingEvent {
    pub order_id: OrderId,
    pub user_id: String,
    pub status: OrderStatus,
    pub reason: Option<OrderReason>,
    pub charged: Option<Price>,
    pub transaction_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&Order> for AccountingEvent {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.order_id,
            user_id: order.user_id.clone(),
            status: order.status,
            reason: order.reason,
            charged: order.total.as_ref().map(|t| t.charged.clone()),
            transaction_id: order.payment_transaction_id.clone(),
            created_at: order.created_at,
        }
    }
}

/// Cart.Empty request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmptyCartRequest {
    pub user_id: String,
}
