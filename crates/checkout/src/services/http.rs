//! HTTP clients for the collaborators.
//!
//! Every call forwards the correlation id in `x-request-id` and is bounded
//! by `min(collaborator timeout, time left to the request deadline)`.

use std::time::Duration;

use async_trait::async_trait;
use common::{Price, ProductId};
use domain::contracts::{
    AccountingEvent, ChargeRequest, ConfirmationEmail, ConvertRequest, EmptyCartRequest,
    FraudCheckRequest, FraudVerdict, PaymentReceipt, ProductPrice, QuoteRequest,
    REQUEST_ID_HEADER, RefundRequest, ShipRequest, ShipmentReceipt, ShippingQuote, paths,
};
use reqwest::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::context::RequestContext;
use crate::error::CollaboratorError;
use crate::services::{
    AccountingService, CartService, CatalogService, CurrencyService, EmailService,
    FraudDetectionService, PaymentService, ShippingService,
};

/// Base URLs of the collaborator services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollaboratorUrls {
    pub catalog: String,
    pub shipping: String,
    pub currency: String,
    pub payment: String,
    pub fraud_detection: String,
    pub email: String,
    pub accounting: String,
    pub cart: String,
}

impl CollaboratorUrls {
    /// Points every collaborator at `host`, on consecutive ports from
    /// `base_port` in the order the collaborators binary binds them.
    pub fn consecutive(host: &str, base_port: u16) -> Self {
        let url = |offset: u16| format!("http://{host}:{}", base_port + offset);
        Self {
            catalog: url(0),
            shipping: url(1),
            currency: url(2),
            payment: url(3),
            fraud_detection: url(4),
            email: url(5),
            accounting: url(6),
            cart: url(7),
        }
    }
}

/// One collaborator base URL plus the shared client and call timeout.
#[derive(Debug, Clone)]
pub struct HttpEndpoint {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpEndpoint {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        ctx: &RequestContext,
        path: &str,
    ) -> Result<T, CollaboratorError> {
        let request = self.client.get(format!("{}{path}", self.base_url));
        let response = self.send(ctx, request).await?;
        decode(response).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        ctx: &RequestContext,
        path: &str,
        body: &B,
    ) -> Result<T, CollaboratorError> {
        let request = self
            .client
            .post(format!("{}{path}", self.base_url))
            .json(body);
        let response = self.send(ctx, request).await?;
        decode(response).await
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        ctx: &RequestContext,
        path: &str,
        body: &B,
    ) -> Result<(), CollaboratorError> {
        let request = self
            .client
            .post(format!("{}{path}", self.base_url))
            .json(body);
        self.send(ctx, request).await.map(|_| ())
    }

    async fn send(
        &self,
        ctx: &RequestContext,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, CollaboratorError> {
        let timeout = self.timeout.min(ctx.remaining());
        let response = request
            .header(REQUEST_ID_HEADER, ctx.correlation_id())
            .timeout(timeout)
            .send()
            .await
            .map_err(|error| {
                if error.is_timeout() {
                    CollaboratorError::Timeout(timeout)
                } else {
                    CollaboratorError::Unavailable(error.to_string())
                }
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = if body.is_empty() {
            format!("HTTP {status}")
        } else {
            format!("HTTP {status}: {body}")
        };
        Err(match status {
            StatusCode::NOT_FOUND => CollaboratorError::NotFound(message),
            StatusCode::PAYMENT_REQUIRED | StatusCode::UNPROCESSABLE_ENTITY => {
                CollaboratorError::Declined(message)
            }
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
                CollaboratorError::Timeout(timeout)
            }
            s if s.is_server_error() => CollaboratorError::Unavailable(message),
            _ => CollaboratorError::InvalidResponse(message),
        })
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, CollaboratorError> {
    response
        .json()
        .await
        .map_err(|error| CollaboratorError::InvalidResponse(error.to_string()))
}

/// Catalog over HTTP: `GET /products/{id}`.
#[derive(Debug, Clone)]
pub struct HttpCatalogService(pub HttpEndpoint);

#[async_trait]
impl CatalogService for HttpCatalogService {
    async fn get_price(
        &self,
        ctx: &RequestContext,
        product_id: &ProductId,
    ) -> Result<ProductPrice, CollaboratorError> {
        self.0
            .get_json(ctx, &format!("{}/{}", paths::CATALOG_PRODUCTS, product_id))
            .await
    }
}

/// Shipping over HTTP: `POST /quote`, `POST /ship`.
#[derive(Debug, Clone)]
pub struct HttpShippingService(pub HttpEndpoint);

#[async_trait]
impl ShippingService for HttpShippingService {
    async fn quote(
        &self,
        ctx: &RequestContext,
        request: &QuoteRequest,
    ) -> Result<ShippingQuote, CollaboratorError> {
        self.0.post_json(ctx, paths::SHIPPING_QUOTE, request).await
    }

    async fn ship(
        &self,
        ctx: &RequestContext,
        request: &ShipRequest,
    ) -> Result<ShipmentReceipt, CollaboratorError> {
        self.0.post_json(ctx, paths::SHIPPING_SHIP, request).await
    }
}

/// Currency over HTTP: `POST /convert`.
#[derive(Debug, Clone)]
pub struct HttpCurrencyService(pub HttpEndpoint);

#[async_trait]
impl CurrencyService for HttpCurrencyService {
    async fn convert(
        &self,
        ctx: &RequestContext,
        request: &ConvertRequest,
    ) -> Result<Price, CollaboratorError> {
        self.0.post_json(ctx, paths::CURRENCY_CONVERT, request).await
    }
}

/// Payment over HTTP: `POST /charge`, `POST /refund`.
#[derive(Debug, Clone)]
pub struct HttpPaymentService(pub HttpEndpoint);

#[async_trait]
impl PaymentService for HttpPaymentService {
    async fn charge(
        &self,
        ctx: &RequestContext,
        request: &ChargeRequest,
    ) -> Result<PaymentReceipt, CollaboratorError> {
        self.0.post_json(ctx, paths::PAYMENT_CHARGE, request).await
    }

    async fn refund(
        &self,
        ctx: &RequestContext,
        request: &RefundRequest,
    ) -> Result<(), CollaboratorError> {
        self.0.post(ctx, paths::PAYMENT_REFUND, request).await
    }
}

/// Fraud detection over HTTP: `POST /check`.
#[derive(Debug, Clone)]
pub struct HttpFraudDetectionService(pub HttpEndpoint);

#[async_trait]
impl FraudDetectionService for HttpFraudDetectionService {
    async fn check(
        &self,
        ctx: &RequestContext,
        request: &FraudCheckRequest,
    ) -> Result<FraudVerdict, CollaboratorError> {
        self.0.post_json(ctx, paths::FRAUD_CHECK, request).await
    }
}

/// Email over HTTP: `POST /send-order-confirmation`.
#[derive(Debug, Clone)]
pub struct HttpEmailService(pub HttpEndpoint);

#[async_trait]
impl EmailService for HttpEmailService {
    async fn send_confirmation(
        &self,
        ctx: &RequestContext,
        email: &ConfirmationEmail,
    ) -> Result<(), CollaboratorError> {
        self.0.post(ctx, paths::EMAIL_CONFIRMATION, email).await
    }
}

/// Accounting over HTTP: `POST /orders`.
#[derive(Debug, Clone)]
pub struct HttpAccountingService(pub HttpEndpoint);

#[async_trait]
impl AccountingService for HttpAccountingService {
    async fn publish(
        &self,
        ctx: &RequestContext,
        event: &AccountingEvent,
    ) -> Result<(), CollaboratorError> {
        self.0.post(ctx, paths::ACCOUNTING_ORDERS, event).await
    }
}

/// Cart over HTTP: `POST /empty`.
#[derive(Debug, Clone)]
pub struct HttpCartService(pub HttpEndpoint);

#[async_trait]
impl CartService for HttpCartService {
    async fn empty(
        &self,
        ctx: &RequestContext,
        request: &EmptyCartRequest,
    ) -> Result<(), CollaboratorError> {
        self.0.post(ctx, paths::CART_EMPTY, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consecutive_urls() {
        let urls = CollaboratorUrls::consecutive("127.0.0.1", 9100);
        assert_eq!(urls.catalog, "http://127.0.0.1:9100");
        assert_eq!(urls.payment, "http://127.0.0.1:9103");
        assert_eq!(urls.cart, "http://127.0.0.1:9107");
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let endpoint = HttpEndpoint::new(
            reqwest::Client::new(),
            "http://localhost:9000/",
            Duration::from_secs(1),
        );
        assert_eq!(endpoint.base_url(), "http://localhost:9000");
    }

    #[tokio::test]
    async fn test_unreachable_collaborator_is_unavailable() {
        // Port 9 (discard) is closed on loopback in test environments.
        let service = HttpCatalogService(HttpEndpoint::new(
            reqwest::Client::new(),
            "http://127.0.0.1:9",
            Duration::from_secs(1),
        ));
        let err = service
            .get_price(
                &RequestContext::new("test", Duration::from_secs(1)),
                &ProductId::new("A"),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CollaboratorError::Unavailable(_) | CollaboratorError::Timeout(_)
        ));
    }
}
