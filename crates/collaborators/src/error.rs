//! Maps collaborator errors onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use checkout::CollaboratorError;

/// A failed simulated call, rendered as `{"error": ...}`.
#[derive(Debug)]
pub struct ServiceError(pub CollaboratorError);

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            CollaboratorError::NotFound(_) => StatusCode::NOT_FOUND,
            CollaboratorError::Declined(_) => StatusCode::PAYMENT_REQUIRED,
            CollaboratorError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            CollaboratorError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            CollaboratorError::InvalidResponse(_) => StatusCode::BAD_REQUEST,
        };
        if status.is_server_error() {
            tracing::warn!(error = %self.0, "simulated call failed");
        }

        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

impl From<CollaboratorError> for ServiceError {
    fn from(err: CollaboratorError) -> Self {
        ServiceError(err)
    }
}
