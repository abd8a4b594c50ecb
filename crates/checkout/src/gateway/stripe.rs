//! Stripe Checkout client over the REST API.

use std::time::Duration;

use async_trait::async_trait;
use common::SessionId;
use serde::Deserialize;

use super::{CheckoutSession, CreateSessionRequest, GatewayError, PaymentGateway};

/// Default Stripe API origin.
pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";

/// Stripe client configuration.
#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub secret_key: String,
    pub api_base: String,
    /// Upper bound on every request to the gateway.
    pub timeout: Duration,
}

impl StripeConfig {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Deserialize)]
struct StripeErrorDetail {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

/// Stripe payment gateway.
#[derive(Clone)]
pub struct StripeGateway {
    config: StripeConfig,
    client: reqwest::Client,
}

impl StripeGateway {
    pub fn new(config: StripeConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { config, client })
    }

    fn sessions_url(&self) -> String {
        format!(
            "{}/v1/checkout/sessions",
            self.config.api_base.trim_end_matches('/')
        )
    }

    /// URL of one session. The id is pushed as a single encoded path segment
    /// and must consist of ASCII letters, digits and underscores.
    fn session_url(&self, session_id: &SessionId) -> Result<reqwest::Url, GatewayError> {
        let id = session_id.as_str();
        if id.is_empty() || !id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
            return Err(GatewayError::InvalidSessionId(session_id.clone()));
        }
        Self::push_segment(&self.sessions_url(), id)
    }

    fn push_segment(base: &str, segment: &str) -> Result<reqwest::Url, GatewayError> {
        let mut url =
            reqwest::Url::parse(base).map_err(|e| GatewayError::InvalidUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| GatewayError::InvalidUrl(base.to_string()))?
            .push(segment);
        Ok(url)
    }

    /// Flattens a session request into Stripe's bracketed form encoding.
    fn form_params(request: &CreateSessionRequest) -> Vec<(String, String)> {
        let mut params = vec![
            ("mode".to_string(), request.mode.as_str().to_string()),
            ("success_url".to_string(), request.success_url.clone()),
            ("cancel_url".to_string(), request.cancel_url.clone()),
        ];

        for (i, method) in request.payment_method_types.iter().enumerate() {
            params.push((format!("payment_method_types[{i}]"), method.clone()));
        }

        for (i, item) in request.line_items.iter().enumerate() {
            let prefix = format!("line_items[{i}]");
            params.push((
                format!("{prefix}[price_data][currency]"),
                item.currency.clone(),
            ));
            params.push((
                format!("{prefix}[price_data][unit_amount]"),
                item.unit_amount.to_string(),
            ));
            params.push((
                format!("{prefix}[price_data][product_data][name]"),
                item.name.clone(),
            ));
            // Stripe rejects empty descriptions
            if !item.description.is_empty() {
                params.push((
                    format!("{prefix}[price_data][product_data][description]"),
                    item.description.clone(),
                ));
            }
            params.push((format!("{prefix}[quantity]"), item.quantity.to_string()));
        }

        for (key, value) in &request.metadata {
            params.push((format!("metadata[{key}]"), value.clone()));
        }

        params
    }

    async fn parse_response(
        response: reqwest::Response,
        session_id: Option<&SessionId>,
    ) -> Result<CheckoutSession, GatewayError> {
        let status = response.status();
        if status.is_success() {
            return response
                .json::<CheckoutSession>()
                .await
                .map_err(|e| GatewayError::Decode(e.to_string()));
        }

        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<StripeErrorBody>(&body).ok();

        if let (Some(id), Some(d)) = (session_id, &detail)
            && d.error.code.as_deref() == Some("resource_missing")
        {
            return Err(GatewayError::SessionNotFound(id.clone()));
        }

        let message = detail
            .and_then(|d| d.error.message)
            .unwrap_or(body);
        tracing::warn!(status = status.as_u16(), %message, "stripe API error");
        Err(GatewayError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    #[tracing::instrument(skip(self, request), fields(line_items = request.line_items.len()))]
    async fn create_checkout_session(
        &self,
        request: CreateSessionRequest,
    ) -> Result<CheckoutSession, GatewayError> {
        let response = self
            .client
            .post(self.sessions_url())
            .basic_auth(&self.config.secret_key, Some(""))
            .form(&Self::form_params(&request))
            .send()
            .await?;

        let session = Self::parse_response(response, None).await?;
        tracing::info!(session_id = %session.id, "checkout session created");
        Ok(session)
    }

    #[tracing::instrument(skip(self))]
    async fn retrieve_checkout_session(
        &self,
        session_id: &SessionId,
    ) -> Result<CheckoutSession, GatewayError> {
        let url = self.session_url(session_id)?;
        let response = self
            .client
            .get(url)
            .basic_auth(&self.config.secret_key, Some(""))
            .send()
            .await?;

        Self::parse_response(response, Some(session_id)).await
    }
}
