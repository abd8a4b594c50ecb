//! HTTP storefront server with observability.
//!
//! Serves the catalog, starts hosted checkouts, confirms paid sessions from
//! the post-payment redirect and from gateway callbacks, and lists paid
//! orders. Structured logging via tracing, Prometheus metrics at `/metrics`.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use checkout::{
    CheckoutService, CheckoutUrls, ConfirmationHandler, PaymentGateway, WebhookHandler,
    WebhookVerifier,
};
use metrics_exporter_prometheus::PrometheusHandle;
use store::ShopStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Store handle shared by every service.
pub type DynStore = dyn ShopStore;
/// Gateway client shared by every service.
pub type DynGateway = dyn PaymentGateway;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub store: Arc<DynStore>,
    pub checkout: CheckoutService<DynStore, DynGateway>,
    pub confirmations: ConfirmationHandler<DynStore, DynGateway>,
    pub webhooks: WebhookHandler<DynStore, DynGateway>,
}

impl AppState {
    /// Wires the checkout, confirmation and callback services over one store
    /// and one gateway client.
    pub fn new(
        store: Arc<DynStore>,
        gateway: Arc<DynGateway>,
        urls: CheckoutUrls,
        verifier: Option<WebhookVerifier>,
    ) -> Self {
        let checkout = CheckoutService::new(store.clone(), gateway.clone(), urls);
        let confirmations = ConfirmationHandler::new(store.clone(), gateway);
        let webhooks = WebhookHandler::new(verifier, confirmations.clone());

        Self {
            store,
            checkout,
            confirmations,
            webhooks,
        }
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/", get(routes::products::list))
        .route("/products", get(routes::products::list))
        .route("/orders", get(routes::orders::list))
        .route(
            "/create-checkout-session",
            post(routes::checkout::create_session),
        )
        .route("/success", get(routes::checkout::success))
        .route("/webhook", post(routes::webhook::receive))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
