//! Gateway callback handling.

use common::SessionId;
use serde::Deserialize;
use store::ShopStore;

use crate::confirmation::{Confirmation, ConfirmationHandler};
use crate::error::WebhookError;
use crate::gateway::{PaymentGateway, SignatureError, WebhookVerifier};

/// Event type sent when a hosted checkout finishes.
pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";

/// Envelope of a gateway callback.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEventData {
    pub object: serde_json::Value,
}

impl WebhookEvent {
    /// Returns `data.object.id`, the session id for checkout events.
    pub fn object_id(&self) -> Option<&str> {
        self.data.object.get("id").and_then(|v| v.as_str())
    }
}

/// What a verified callback led to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// A completed checkout was run through confirmation.
    Confirmed(Confirmation),
    /// Confirmation failed and was logged; a retry may succeed.
    ConfirmationFailed,
    /// The event type is not handled.
    Ignored,
}

/// Authenticates gateway callbacks and feeds completed checkouts into
/// the same confirmation logic as the user redirect.
pub struct WebhookHandler<S: ?Sized, G: ?Sized> {
    verifier: Option<WebhookVerifier>,
    confirmations: ConfirmationHandler<S, G>,
}

impl<S, G> WebhookHandler<S, G>
where
    S: ShopStore + ?Sized,
    G: PaymentGateway + ?Sized,
{
    /// Creates a webhook handler.
    ///
    /// Without a verifier every callback is rejected.
    pub fn new(
        verifier: Option<WebhookVerifier>,
        confirmations: ConfirmationHandler<S, G>,
    ) -> Self {
        Self {
            verifier,
            confirmations,
        }
    }

    /// Verifies and parses a callback without acting on it.
    pub fn parse(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> Result<WebhookEvent, WebhookError> {
        let verifier = self
            .verifier
            .as_ref()
            .ok_or(SignatureError::NotConfigured)?;
        verifier.verify(payload, signature)?;

        serde_json::from_slice(payload).map_err(|e| WebhookError::Payload(e.to_string()))
    }

    /// Handles one callback.
    ///
    /// Fails closed: a missing, malformed or non-matching signature, or an
    /// unparseable envelope, is an error and nothing is written.
    #[tracing::instrument(skip(self, payload, signature), fields(bytes = payload.len()))]
    pub async fn handle(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> Result<WebhookOutcome, WebhookError> {
        let event = match self.parse(payload, signature) {
            Ok(event) => event,
            Err(e) => {
                metrics::counter!("webhook_events_total", "result" => "rejected").increment(1);
                tracing::warn!(error = %e, "rejected gateway callback");
                return Err(e);
            }
        };

        if event.event_type != CHECKOUT_SESSION_COMPLETED {
            metrics::counter!("webhook_events_total", "result" => "ignored").increment(1);
            tracing::info!(
                event_id = %event.id,
                event_type = %event.event_type,
                "unhandled event type"
            );
            return Ok(WebhookOutcome::Ignored);
        }

        let session_id = event
            .object_id()
            .map(SessionId::from)
            .ok_or_else(|| WebhookError::Payload("event object has no id".to_string()))?;

        metrics::counter!("webhook_events_total", "result" => "accepted").increment(1);
        tracing::info!(event_id = %event.id, %session_id, "checkout completed callback");

        Ok(match self.confirmations.confirm_or_log(&session_id).await {
            Some(confirmation) => WebhookOutcome::Confirmed(confirmation),
            None => WebhookOutcome::ConfirmationFailed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_envelope_parses() {
        let json = r#"{
            "id": "evt_1",
            "object": "event",
            "type": "checkout.session.completed",
            "data": {"object": {"id": "cs_test_1", "object": "checkout.session"}}
        }"#;
        let event: WebhookEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.event_type, CHECKOUT_SESSION_COMPLETED);
        assert_eq!(event.object_id(), Some("cs_test_1"));
    }

    #[test]
    fn test_envelope_without_data_is_rejected() {
        let result = serde_json::from_str::<WebhookEvent>(r#"{"id": "evt_1", "type": "x"}"#);
        assert!(result.is_err());
    }
}
