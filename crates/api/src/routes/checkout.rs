//! Checkout initiation and post-payment redirect endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::response::Redirect;
use common::SessionId;
use domain::Cart;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;

#[derive(Serialize)]
pub struct CheckoutSessionResponse {
    pub id: String,
}

#[derive(Deserialize)]
pub struct SuccessParams {
    pub session_id: Option<String>,
}

/// POST /create-checkout-session — prices a cart and opens a gateway session.
///
/// Body: `[{"product_id": 1, "quantity": 2}, ...]`. Responds with the
/// gateway session id the client redirects to.
#[tracing::instrument(skip(state, payload))]
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Cart>, JsonRejection>,
) -> Result<Json<CheckoutSessionResponse>, ApiError> {
    let Json(cart) = payload.map_err(|rejection| {
        tracing::debug!(error = %rejection.body_text(), "rejected checkout body");
        ApiError::BadRequest("Invalid JSON".to_string())
    })?;

    let created = state.checkout.create_session(&cart).await?;

    Ok(Json(CheckoutSessionResponse {
        id: created.session_id.to_string(),
    }))
}

/// GET /success — the gateway's post-payment redirect.
///
/// Confirms the session if one is given and always sends the user back to
/// the catalog. Confirmation failures are logged, never shown.
#[tracing::instrument(skip(state, params))]
pub async fn success(
    State(state): State<Arc<AppState>>,
    params: Result<Query<SuccessParams>, QueryRejection>,
) -> Redirect {
    let session_id = params
        .ok()
        .and_then(|Query(p)| p.session_id)
        .filter(|id| !id.trim().is_empty())
        .map(SessionId::from);

    if let Some(session_id) = session_id {
        state.confirmations.confirm_or_log(&session_id).await;
    }

    Redirect::to("/")
}
