//! API error types with HTTP response mapping.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use checkout::CheckoutError;

/// API-level error type that maps to HTTP responses.
///
/// Collaborator failures never surface here: they are part of the returned
/// order. Only requests the orchestrator refuses to start end up as errors.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed or invalid request from the client.
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => {
                tracing::debug!(error = %msg, "bad request");
                (StatusCode::BAD_REQUEST, msg)
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::InvalidRequest(_) => ApiError::BadRequest(err.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::DomainError;

    #[test]
    fn test_invalid_request_is_bad_request() {
        let err = ApiError::from(CheckoutError::InvalidRequest(DomainError::EmptyCart));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_body_carries_message() {
        let err = ApiError::from(CheckoutError::InvalidRequest(DomainError::MissingField(
            "payment_token",
        )));
        let ApiError::BadRequest(msg) = err;
        assert!(msg.contains("payment_token"));
    }
}
