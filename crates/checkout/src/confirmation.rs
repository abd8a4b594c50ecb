//! Payment confirmation: turn a paid gateway session into exactly one order.

use std::sync::Arc;

use common::SessionId;
use domain::{Cart, Order, OrderStatus};
use store::{ShopStore, StoreError};

use crate::error::{CheckoutError, Result};
use crate::gateway::{PaymentGateway, PaymentStatus};

/// Outcome of a confirmation attempt. None of these are errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
    /// A new order was written.
    Created(Order),
    /// An order for this session already exists; nothing was written.
    AlreadyProcessed,
    /// The gateway doesn't report the session as paid yet.
    NotPaid(PaymentStatus),
    /// The session carries no cart snapshot, or an empty one.
    EmptyCart,
}

impl Confirmation {
    /// Label used for the outcome metric.
    pub fn as_str(&self) -> &'static str {
        match self {
            Confirmation::Created(_) => "created",
            Confirmation::AlreadyProcessed => "already_processed",
            Confirmation::NotPaid(_) => "not_paid",
            Confirmation::EmptyCart => "empty_cart",
        }
    }
}

/// Confirms paid gateway sessions into orders, idempotently.
///
/// May be invoked any number of times per session (browser redirect,
/// gateway callback, retries); at most one order is ever written.
pub struct ConfirmationHandler<S: ?Sized, G: ?Sized> {
    store: Arc<S>,
    gateway: Arc<G>,
}

impl<S: ?Sized, G: ?Sized> Clone for ConfirmationHandler<S, G> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            gateway: self.gateway.clone(),
        }
    }
}

impl<S, G> ConfirmationHandler<S, G>
where
    S: ShopStore + ?Sized,
    G: PaymentGateway + ?Sized,
{
    /// Creates a new confirmation handler.
    pub fn new(store: Arc<S>, gateway: Arc<G>) -> Self {
        Self { store, gateway }
    }

    /// Confirms a session.
    ///
    /// 1. If an order already exists for the session, returns immediately
    ///    without contacting the gateway.
    /// 2. Fetches the session. A session the gateway reports under a
    ///    different id is refused; anything other than `paid` is a no-op.
    /// 3. Decodes the cart snapshot from the session metadata.
    /// 4. Places the order in one transaction, pricing every line from the
    ///    current catalog. Losing a race on the session's unique constraint
    ///    resolves to `AlreadyProcessed`.
    #[tracing::instrument(skip(self))]
    pub async fn confirm(&self, session_id: &SessionId) -> Result<Confirmation> {
        let outcome = self.confirm_inner(session_id).await;
        let label = match &outcome {
            Ok(confirmation) => confirmation.as_str(),
            Err(_) => "error",
        };
        metrics::counter!("order_confirmations_total", "outcome" => label).increment(1);
        outcome
    }

    async fn confirm_inner(&self, session_id: &SessionId) -> Result<Confirmation> {
        if self.store.has_order_for_session(session_id).await? {
            tracing::debug!("order already recorded for session");
            return Ok(Confirmation::AlreadyProcessed);
        }

        let session = self.gateway.retrieve_checkout_session(session_id).await?;
        // Orders are keyed by the gateway's own id, never by caller input
        if session.id != *session_id {
            return Err(CheckoutError::SessionMismatch {
                requested: session_id.clone(),
                resolved: session.id,
            });
        }
        let session_id = &session.id;

        if !session.payment_status.is_paid() {
            tracing::info!(payment_status = %session.payment_status, "session not paid yet");
            return Ok(Confirmation::NotPaid(session.payment_status));
        }

        let cart = match session.cart_snapshot() {
            Some(snapshot) => Cart::from_snapshot(snapshot)?,
            None => Cart::default(),
        };
        if cart.is_empty() {
            tracing::warn!("paid session has no cart snapshot");
            return Ok(Confirmation::EmptyCart);
        }

        match self
            .store
            .place_order(session_id, &cart, OrderStatus::Paid)
            .await
        {
            Ok(order) => {
                metrics::counter!("orders_confirmed_total").increment(1);
                tracing::info!(
                    order_id = %order.id,
                    total = %order.total_amount,
                    items = order.items.len(),
                    "order created"
                );
                Ok(Confirmation::Created(order))
            }
            Err(StoreError::DuplicateSession(_)) => {
                tracing::info!("lost confirmation race; order already recorded");
                Ok(Confirmation::AlreadyProcessed)
            }
            Err(e) => Err(CheckoutError::Store(e)),
        }
    }

    /// Confirms a session, logging and swallowing any failure.
    ///
    /// A failed confirmation leaves no order behind, so a later attempt can
    /// still succeed.
    pub async fn confirm_or_log(&self, session_id: &SessionId) -> Option<Confirmation> {
        match self.confirm(session_id).await {
            Ok(confirmation) => Some(confirmation),
            Err(CheckoutError::Gateway(e)) => {
                tracing::error!(
                    %session_id,
                    error = %e,
                    "payment gateway error during confirmation"
                );
                None
            }
            Err(e) => {
                tracing::error!(%session_id, error = %e, "error processing order");
                None
            }
        }
    }
}
