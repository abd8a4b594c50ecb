//! Checkout initiation: price a cart and open a gateway session.

use std::collections::HashMap;
use std::sync::Arc;

use common::SessionId;
use domain::{Cart, Money, OrderError};
use store::CatalogStore;

use crate::error::{CheckoutError, Result};
use crate::gateway::{
    CART_METADATA_KEY, CreateSessionRequest, LineItem, PaymentGateway, SESSION_ID_PLACEHOLDER,
    SessionMode,
};

/// Currency of every line item; the storefront is single-currency.
pub const CURRENCY: &str = "usd";

/// Redirect targets handed to the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutUrls {
    /// Where the gateway sends the user after paying. Contains the session id placeholder.
    pub success_url: String,
    /// Where the gateway sends the user after abandoning checkout.
    pub cancel_url: String,
}

impl CheckoutUrls {
    /// Derives the redirect URLs from the storefront's public origin.
    pub fn from_public_url(public_url: &str) -> Self {
        let base = public_url.trim_end_matches('/');
        Self {
            success_url: format!("{base}/success?session_id={SESSION_ID_PLACEHOLDER}"),
            cancel_url: format!("{base}/"),
        }
    }
}

/// A gateway session opened for a cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedSession {
    pub session_id: SessionId,
    /// Hosted payment page, if the gateway returned one.
    pub url: Option<String>,
    /// Σ(current price × quantity) at the time of checkout.
    pub total: Money,
}

/// Validates carts against the catalog and opens payment sessions.
///
/// Writes nothing locally: the only side effect is one gateway call.
pub struct CheckoutService<S: ?Sized, G: ?Sized> {
    store: Arc<S>,
    gateway: Arc<G>,
    urls: CheckoutUrls,
}

impl<S, G> CheckoutService<S, G>
where
    S: CatalogStore + ?Sized,
    G: PaymentGateway + ?Sized,
{
    /// Creates a new checkout service.
    pub fn new(store: Arc<S>, gateway: Arc<G>, urls: CheckoutUrls) -> Self {
        Self {
            store,
            gateway,
            urls,
        }
    }

    /// Returns the configured redirect URLs.
    pub fn urls(&self) -> &CheckoutUrls {
        &self.urls
    }

    /// Prices `cart` against the current catalog and opens a gateway session.
    ///
    /// Fails before contacting the gateway if the cart is empty, a product is
    /// unknown, or a quantity is below 1. The session's metadata carries the
    /// cart snapshot that confirmation later reads back.
    #[tracing::instrument(skip(self, cart), fields(lines = cart.len()))]
    pub async fn create_session(&self, cart: &Cart) -> Result<CreatedSession> {
        let start = std::time::Instant::now();

        if cart.is_empty() {
            return Err(OrderError::EmptyCart.into());
        }

        let mut total = Money::zero();
        let mut line_items = Vec::with_capacity(cart.len());
        for line in cart {
            let product = self
                .store
                .get_product(line.product_id)
                .await?
                .ok_or(CheckoutError::ProductNotFound(line.product_id))?;
            line.validate()?;

            total += product.price.multiply(line.quantity);
            line_items.push(LineItem {
                name: product.name,
                description: product.description,
                currency: CURRENCY.to_string(),
                unit_amount: product.price.to_minor_units(),
                quantity: line.quantity,
            });
        }

        let request = CreateSessionRequest {
            mode: SessionMode::Payment,
            payment_method_types: vec!["card".to_string()],
            line_items,
            success_url: self.urls.success_url.clone(),
            cancel_url: self.urls.cancel_url.clone(),
            metadata: HashMap::from([(CART_METADATA_KEY.to_string(), cart.to_snapshot()?)]),
        };

        let session = self.gateway.create_checkout_session(request).await?;

        metrics::counter!("checkout_sessions_created_total").increment(1);
        metrics::histogram!("checkout_duration_seconds").record(start.elapsed().as_secs_f64());
        tracing::info!(session_id = %session.id, %total, "checkout session opened");

        Ok(CreatedSession {
            session_id: session.id,
            url: session.url,
            total,
        })
    }
}
