//! Application configuration loaded from environment variables.

use std::fmt;
use std::time::Duration;

use checkout::gateway::signature::DEFAULT_TOLERANCE_SECS;
use checkout::gateway::stripe::DEFAULT_API_BASE;
use checkout::{CheckoutUrls, StripeConfig, WebhookVerifier};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT` — `text` or `json` (default: `text`)
/// - `DATABASE_URL` — PostgreSQL URL; unset runs on the in-memory store
/// - `PUBLIC_URL` — externally visible base URL (default: `http://localhost:3000`)
/// - `STRIPE_SECRET_KEY` — gateway API key; unset runs on the in-memory gateway
/// - `STRIPE_WEBHOOK_SECRET` — callback signing secret; unset rejects all callbacks
/// - `STRIPE_API_BASE` — gateway base URL (default: `https://api.stripe.com`)
/// - `GATEWAY_TIMEOUT_SECS` — per-request gateway timeout (default: `10`)
/// - `WEBHOOK_TOLERANCE_SECS` — allowed callback clock skew (default: `300`)
#[derive(Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub public_url: String,
    pub stripe_secret_key: Option<String>,
    pub stripe_webhook_secret: Option<String>,
    pub stripe_api_base: String,
    pub gateway_timeout: Duration,
    pub webhook_tolerance_secs: u64,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        Self {
            host: var("HOST").unwrap_or(defaults.host),
            port: var("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: var("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: var("LOG_FORMAT")
                .map(|f| LogFormat::parse(&f))
                .unwrap_or_default(),
            database_url: var("DATABASE_URL"),
            public_url: var("PUBLIC_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.public_url),
            stripe_secret_key: var("STRIPE_SECRET_KEY"),
            stripe_webhook_secret: var("STRIPE_WEBHOOK_SECRET"),
            stripe_api_base: var("STRIPE_API_BASE").unwrap_or(defaults.stripe_api_base),
            gateway_timeout: var("GATEWAY_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.gateway_timeout),
            webhook_tolerance_secs: var("WEBHOOK_TOLERANCE_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.webhook_tolerance_secs),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Return URLs handed to the gateway for hosted checkout.
    pub fn checkout_urls(&self) -> CheckoutUrls {
        CheckoutUrls::from_public_url(&self.public_url)
    }

    /// Stripe client settings, if a secret key is configured.
    pub fn stripe_config(&self) -> Option<StripeConfig> {
        self.stripe_secret_key.as_ref().map(|key| StripeConfig {
            secret_key: key.clone(),
            api_base: self.stripe_api_base.clone(),
            timeout: self.gateway_timeout,
        })
    }

    /// Callback verifier, if a signing secret is configured.
    pub fn webhook_verifier(&self) -> Option<WebhookVerifier> {
        self.stripe_webhook_secret
            .as_ref()
            .map(|secret| WebhookVerifier::new(secret.clone(), self.webhook_tolerance_secs))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            public_url: "http://localhost:3000".to_string(),
            stripe_secret_key: None,
            stripe_webhook_secret: None,
            stripe_api_base: DEFAULT_API_BASE.to_string(),
            gateway_timeout: Duration::from_secs(10),
            webhook_tolerance_secs: DEFAULT_TOLERANCE_SECS,
        }
    }
}

fn redact(value: &Option<String>) -> &'static str {
    if value.is_some() { "<set>" } else { "<unset>" }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("log_level", &self.log_level)
            .field("log_format", &self.log_format)
            .field("database_url", &redact(&self.database_url))
            .field("public_url", &self.public_url)
            .field("stripe_secret_key", &redact(&self.stripe_secret_key))
            .field("stripe_webhook_secret", &redact(&self.stripe_webhook_secret))
            .field("stripe_api_base", &self.stripe_api_base)
            .field("gateway_timeout", &self.gateway_timeout)
            .field("webhook_tolerance_secs", &self.webhook_tolerance_secs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Text);
        assert_eq!(config.public_url, "http://localhost:3000");
        assert_eq!(config.gateway_timeout, Duration::from_secs(10));
        assert_eq!(config.webhook_tolerance_secs, 300);
        assert!(config.database_url.is_none());
        assert!(config.stripe_config().is_none());
        assert!(config.webhook_verifier().is_none());
    }

    #[test]
    fn test_addr_formatting() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ..Config::default()
        };
        assert_eq!(config.addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_addr_default() {
        let config = Config::default();
        assert_eq!(config.addr(), "0.0.0.0:3000");
    }

    #[test]
    fn test_lookup_overrides_defaults() {
        let config = from_pairs(&[
            ("PORT", "8081"),
            ("LOG_FORMAT", "JSON"),
            ("DATABASE_URL", "postgres://localhost/shop"),
            ("PUBLIC_URL", "https://shop.example.com/"),
            ("STRIPE_SECRET_KEY", "sk_test_123"),
            ("STRIPE_WEBHOOK_SECRET", "whsec_123"),
            ("GATEWAY_TIMEOUT_SECS", "3"),
            ("WEBHOOK_TOLERANCE_SECS", "60"),
        ]);

        assert_eq!(config.port, 8081);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/shop")
        );
        assert_eq!(config.public_url, "https://shop.example.com");
        assert_eq!(config.webhook_tolerance_secs, 60);

        let stripe = config.stripe_config().unwrap();
        assert_eq!(stripe.secret_key, "sk_test_123");
        assert_eq!(stripe.api_base, DEFAULT_API_BASE);
        assert_eq!(stripe.timeout, Duration::from_secs(3));
        assert!(config.webhook_verifier().is_some());

        let urls = config.checkout_urls();
        assert_eq!(urls.cancel_url, "https://shop.example.com/");
    }

    #[test]
    fn test_invalid_and_empty_values_fall_back() {
        let config = from_pairs(&[
            ("PORT", "not-a-port"),
            ("STRIPE_SECRET_KEY", ""),
            ("GATEWAY_TIMEOUT_SECS", "-1"),
        ]);

        assert_eq!(config.port, 3000);
        assert!(config.stripe_secret_key.is_none());
        assert_eq!(config.gateway_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_debug_hides_secrets() {
        let config = from_pairs(&[("STRIPE_SECRET_KEY", "sk_live_secret")]);
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk_live_secret"));
        assert!(debug.contains("<set>"));
    }
}
