//! Checkout error types.

use common::{ProductId, SessionId};
use domain::OrderError;
use store::StoreError;
use thiserror::Error;

use crate::gateway::{GatewayError, SignatureError};

/// Errors that can occur while creating or confirming a checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The client submitted an unusable cart.
    #[error("{0}")]
    Validation(String),

    /// A cart line references a product that isn't in the catalog.
    #[error("Product {0} not found")]
    ProductNotFound(ProductId),

    /// The payment gateway failed or rejected the request.
    #[error("Payment gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// The catalog or order ledger failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The cart snapshot stored on the session could not be encoded or decoded.
    #[error("Invalid cart snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// The gateway answered for a different session than the one requested.
    #[error("Session {requested} resolved to gateway session {resolved}")]
    SessionMismatch {
        requested: SessionId,
        resolved: SessionId,
    },
}

impl From<OrderError> for CheckoutError {
    fn from(err: OrderError) -> Self {
        CheckoutError::Validation(err.to_string())
    }
}

/// Errors that make a gateway callback unacceptable.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Signature missing, malformed or not matching.
    #[error("Invalid webhook signature: {0}")]
    Signature(#[from] SignatureError),

    /// Body is not the expected event envelope.
    #[error("Invalid webhook payload: {0}")]
    Payload(String),
}

/// Convenience type alias for checkout results.
pub type Result<T> = std::result::Result<T, CheckoutError>;
