//! Gateway callback endpoint.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use checkout::gateway::SIGNATURE_HEADER;
use serde::Serialize;

use crate::AppState;
use crate::error::ApiError;

#[derive(Serialize)]
pub struct WebhookResponse {
    pub received: bool,
}

/// POST /webhook — authenticated gateway callback.
///
/// The raw body is verified against the signature header before parsing.
/// Once verified, the callback is acknowledged even if confirmation fails.
#[tracing::instrument(skip(state, headers, body))]
pub async fn receive(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, ApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    let outcome = state.webhooks.handle(&body, signature).await?;
    tracing::debug!(?outcome, "gateway callback handled");

    Ok(Json(WebhookResponse { received: true }))
}
