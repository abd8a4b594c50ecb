//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use checkout::{CheckoutError, WebhookError};
use store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// Checkout could not be started.
    Checkout(CheckoutError),
    /// A gateway callback was rejected.
    Webhook(WebhookError),
    /// Catalog or ledger failure.
    Store(StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Checkout(err) => checkout_error_to_response(err),
            ApiError::Webhook(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            ApiError::Store(err) => store_error_to_response(err),
        };

        if status.is_server_error() {
            tracing::error!(error = %message, "internal server error");
        }
        metrics::counter!("http_errors_total", "status" => status.as_u16().to_string())
            .increment(1);

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn checkout_error_to_response(err: CheckoutError) -> (StatusCode, String) {
    match err {
        CheckoutError::Validation(_) | CheckoutError::SessionMismatch { .. } => {
            (StatusCode::BAD_REQUEST, err.to_string())
        }
        CheckoutError::ProductNotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        CheckoutError::Store(store_err) => store_error_to_response(store_err),
        CheckoutError::Gateway(_) | CheckoutError::Snapshot(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

fn store_error_to_response(err: StoreError) -> (StatusCode, String) {
    match &err {
        StoreError::ProductNotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        StoreError::Order(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        StoreError::ProductInUse(_) | StoreError::DuplicateSession(_) => {
            (StatusCode::CONFLICT, err.to_string())
        }
        _ => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        ApiError::Checkout(err)
    }
}

impl From<WebhookError> for ApiError {
    fn from(err: WebhookError) -> Self {
        ApiError::Webhook(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkout::{GatewayError, SignatureError};
    use common::ProductId;

    fn status_of(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_checkout_errors_map_to_status() {
        assert_eq!(
            status_of(CheckoutError::Validation("Cart is empty".into()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(CheckoutError::ProductNotFound(ProductId::new(99999)).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(
                CheckoutError::Gateway(GatewayError::Api {
                    status: 502,
                    message: "down".into()
                })
                .into()
            ),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_webhook_errors_are_bad_requests() {
        assert_eq!(
            status_of(WebhookError::Signature(SignatureError::Mismatch).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(WebhookError::Payload("bad".into()).into()),
            StatusCode::BAD_REQUEST
        );
    }
}
