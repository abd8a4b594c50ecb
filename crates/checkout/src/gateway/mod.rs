//! Payment gateway client interface, Stripe implementation and in-memory fake.

pub mod memory;
pub mod signature;
pub mod stripe;

pub use memory::InMemoryGateway;
pub use signature::{SIGNATURE_HEADER, SignatureError, WebhookVerifier};
pub use stripe::{StripeConfig, StripeGateway};

use std::collections::HashMap;

use async_trait::async_trait;
use common::SessionId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Metadata key under which the cart snapshot is stored on a session.
pub const CART_METADATA_KEY: &str = "cart_data";

/// Placeholder the gateway replaces with the session id in the success URL.
pub const SESSION_ID_PLACEHOLDER: &str = "{CHECKOUT_SESSION_ID}";

/// Errors returned by a payment gateway client.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The gateway could not be reached or timed out.
    #[error("Gateway request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The gateway rejected the request.
    #[error("Gateway returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The gateway has no session with this id.
    #[error("Session not found: {0}")]
    SessionNotFound(SessionId),

    /// The gateway response could not be decoded.
    #[error("Invalid gateway response: {0}")]
    Decode(String),

    /// The id cannot name a gateway session; no request was made.
    #[error("Invalid session id: {0:?}")]
    InvalidSessionId(SessionId),

    /// The configured API base is not a usable URL.
    #[error("Invalid gateway URL: {0}")]
    InvalidUrl(String),
}

/// Checkout mode requested from the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    /// One-shot payment.
    #[default]
    Payment,
}

impl SessionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionMode::Payment => "payment",
        }
    }
}

/// Payment status reported by the gateway for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Funds captured.
    Paid,
    /// Payment not completed yet, or it failed.
    #[default]
    Unpaid,
    /// The session needed no payment.
    NoPaymentRequired,
    /// Any status this client doesn't know about.
    #[serde(other)]
    Unknown,
}

impl PaymentStatus {
    pub fn is_paid(&self) -> bool {
        matches!(self, PaymentStatus::Paid)
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentStatus::Paid => "paid",
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::NoPaymentRequired => "no_payment_required",
            PaymentStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// One line of a checkout session, priced in minor units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    pub description: String,
    pub currency: String,
    /// Unit price in minor units (cents).
    pub unit_amount: i64,
    pub quantity: i32,
}

/// Request to open a hosted checkout session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    pub mode: SessionMode,
    pub payment_method_types: Vec<String>,
    pub line_items: Vec<LineItem>,
    pub success_url: String,
    pub cancel_url: String,
    pub metadata: HashMap<String, String>,
}

impl CreateSessionRequest {
    /// Returns Σ(unit_amount × quantity) in minor units.
    pub fn amount_total(&self) -> i64 {
        self.line_items
            .iter()
            .map(|item| item.unit_amount * i64::from(item.quantity))
            .sum()
    }
}

/// A checkout session as reported by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: SessionId,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CheckoutSession {
    /// Returns the cart snapshot stored at session creation, if any.
    pub fn cart_snapshot(&self) -> Option<&str> {
        self.metadata.get(CART_METADATA_KEY).map(String::as_str)
    }
}

/// Client for the external payment gateway.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Opens a hosted checkout session.
    async fn create_checkout_session(
        &self,
        request: CreateSessionRequest,
    ) -> Result<CheckoutSession, GatewayError>;

    /// Fetches a session's current payment status and metadata.
    async fn retrieve_checkout_session(
        &self,
        session_id: &SessionId,
    ) -> Result<CheckoutSession, GatewayError>;
}
