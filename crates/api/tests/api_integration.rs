//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use checkout::{CheckoutConfig, CheckoutOrchestrator, InMemoryCollaborators};
use common::{CurrencyCode, Money, Price};
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

fn setup() -> (axum::Router, InMemoryCollaborators) {
    let services = InMemoryCollaborators::new();
    services
        .catalog
        .set_price("SKU-001", Price::new(CurrencyCode::usd(), Money::from_cents(1000)));
    services
        .shipping
        .set_flat_rate(Price::new(CurrencyCode::usd(), Money::from_cents(500)));

    let orchestrator =
        CheckoutOrchestrator::new(services.collaborators(), CheckoutConfig::default());
    let state = api::AppState::new(Arc::new(orchestrator));
    let app = api::create_app(state, Some(get_metrics_handle()));
    (app, services)
}

fn checkout_body(product_id: &str, quantity: u32) -> serde_json::Value {
    serde_json::json!({
        "user_id": "user-1",
        "items": [{ "product_id": product_id, "quantity": quantity }],
        "address": {
            "street_address": "1600 Amphitheatre Pkwy",
            "city": "Mountain View",
            "state": "CA",
            "country": "US",
            "zip_code": "94043"
        },
        "payment_token": "tok_visa",
        "currency_code": "USD",
        "email": "buyer@example.com"
    })
}

fn post_checkout(body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/checkout")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let (app, _) = setup();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["background_tasks"].is_u64());
}

#[tokio::test]
async fn test_completed_checkout_is_200() {
    let (app, services) = setup();

    let response = app
        .oneshot(post_checkout(checkout_body("SKU-001", 2)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "Completed");
    assert_eq!(json["total"]["subtotal"], 2000);
    assert_eq!(json["total"]["shipping"], 500);
    assert_eq!(json["total"]["total"], 2500);
    assert!(json["payment_transaction_id"].as_str().is_some());
    assert!(json["tracking_id"].as_str().is_some());
    assert_eq!(json["warnings"].as_array().unwrap().len(), 0);
    assert_eq!(services.payment.payment_count(), 1);
}

#[tokio::test]
async fn test_warnings_still_200() {
    let (app, services) = setup();
    services
        .shipping
        .set_ship_error(Some(checkout::CollaboratorError::Unavailable(
            "carrier down".to_string(),
        )));

    let response = app
        .oneshot(post_checkout(checkout_body("SKU-001", 1)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "CompletedWithWarnings");
    assert_eq!(json["warnings"][0]["step"], "shipment");
}

#[tokio::test]
async fn test_declined_payment_is_402() {
    let (app, services) = setup();
    services.payment.set_fail_on_charge(true);

    let response = app
        .oneshot(post_checkout(checkout_body("SKU-001", 1)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    let json = json_body(response).await;
    assert_eq!(json["status"], "PaymentFailed");
    assert_eq!(json["reason"], "payment_failed");
}

#[tokio::test]
async fn test_unknown_product_is_409() {
    let (app, services) = setup();

    let response = app
        .oneshot(post_checkout(checkout_body("SKU-404", 1)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = json_body(response).await;
    assert_eq!(json["status"], "Rejected");
    assert_eq!(json["reason"], "catalog_miss");
    assert_eq!(services.payment.charge_count(), 0);
}

#[tokio::test]
async fn test_fraud_flag_is_409() {
    let (app, services) = setup();
    services.fraud_detection.flag_user("user-1");

    let response = app
        .oneshot(post_checkout(checkout_body("SKU-001", 1)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = json_body(response).await;
    assert_eq!(json["reason"], "fraud_flagged");
}

#[tokio::test]
async fn test_deadline_before_charge_is_504() {
    let (app, services) = setup();
    services.catalog.set_delay(Duration::from_secs(2));

    let mut request = post_checkout(checkout_body("SKU-001", 1));
    request
        .headers_mut()
        .insert("x-request-timeout-ms", "50".parse().unwrap());
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    let json = json_body(response).await;
    assert_eq!(json["status"], "Rejected");
    assert_eq!(json["reason"], "deadline_exceeded");
    assert_eq!(services.payment.charge_count(), 0);
}

#[tokio::test]
async fn test_malformed_json_is_400() {
    let (app, _) = setup();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/checkout")
                .header("content-type", "application/json")
                .body(Body::from("{\"user_id\": "))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert!(json["error"].as_str().is_some());
}

#[tokio::test]
async fn test_empty_cart_is_400() {
    let (app, services) = setup();
    let mut body = checkout_body("SKU-001", 1);
    body["items"] = serde_json::json!([]);

    let response = app.oneshot(post_checkout(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert!(json["error"].as_str().unwrap().contains("at least one item"));
    assert_eq!(services.catalog.lookup_count(), 0);
}

#[tokio::test]
async fn test_bad_timeout_header_is_400() {
    let (app, _) = setup();
    let mut request = post_checkout(checkout_body("SKU-001", 1));
    request
        .headers_mut()
        .insert("x-request-timeout-ms", "later".parse().unwrap());

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_request_id_is_propagated() {
    let (app, _) = setup();
    let mut request = post_checkout(checkout_body("SKU-001", 1));
    request
        .headers_mut()
        .insert("x-request-id", "req-abc-123".parse().unwrap());

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(
        response.headers().get("x-request-id").unwrap(),
        "req-abc-123"
    );
}

#[tokio::test]
async fn test_request_id_is_generated_when_absent() {
    let (app, _) = setup();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let id = response.headers().get("x-request-id").unwrap();
    assert!(!id.is_empty());
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, _) = setup();

    let response = app
        .clone()
        .oneshot(post_checkout(checkout_body("SKU-001", 1)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/plain; version=0.0.4")
    );
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("checkout_requests_total"));
    assert!(text.contains("checkout_orders_total"));
    assert!(text.contains("checkout_background_tasks_pending"));
}
