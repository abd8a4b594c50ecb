//! Checkout and payment confirmation for the storefront.
//!
//! Provides:
//! - `CheckoutService`, which prices a cart and opens a gateway session
//! - `ConfirmationHandler`, which turns a paid session into exactly one order
//! - `WebhookHandler`, which authenticates gateway callbacks and confirms
//!   completed checkouts through the same path
//! - the `PaymentGateway` client interface with a Stripe implementation and an
//!   in-memory fake

pub mod confirmation;
pub mod error;
pub mod gateway;
pub mod initiator;
pub mod webhook;

pub use confirmation::{Confirmation, ConfirmationHandler};
pub use error::{CheckoutError, Result, WebhookError};
pub use gateway::{
    CheckoutSession, CreateSessionRequest, GatewayError, InMemoryGateway, LineItem,
    PaymentGateway, PaymentStatus, SignatureError, StripeConfig, StripeGateway, WebhookVerifier,
};
pub use initiator::{CheckoutService, CheckoutUrls, CreatedSession};
pub use webhook::{CHECKOUT_SESSION_COMPLETED, WebhookEvent, WebhookHandler, WebhookOutcome};
