//! API server entry point.

use std::sync::Arc;

use api::config::{Config, LogFormat};
use api::{AppState, DynGateway, DynStore};
use checkout::{InMemoryGateway, StripeGateway};
use sqlx::postgres::PgPoolOptions;
use store::{CatalogStoreExt, InMemoryStore, PostgresStore};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn build_store(config: &Config) -> Arc<DynStore> {
    match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(url)
                .await
                .expect("failed to connect to database");
            let store = PostgresStore::new(pool);
            store
                .run_migrations()
                .await
                .expect("failed to run migrations");
            tracing::info!("using PostgreSQL store");
            Arc::new(store)
        }
        None => {
            let store = InMemoryStore::new();
            store
                .seed_defaults()
                .await
                .expect("failed to seed catalog");
            tracing::warn!("DATABASE_URL not set, using in-memory store");
            Arc::new(store)
        }
    }
}

fn build_gateway(config: &Config) -> Arc<DynGateway> {
    match config.stripe_config() {
        Some(stripe) => {
            let gateway = StripeGateway::new(stripe).expect("failed to build gateway client");
            tracing::info!(api_base = %config.stripe_api_base, "using Stripe gateway");
            Arc::new(gateway)
        }
        None => {
            tracing::warn!("STRIPE_SECRET_KEY not set, using in-memory gateway");
            Arc::new(InMemoryGateway::auto_paying())
        }
    }
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    init_tracing(&config);
    tracing::debug!(?config, "loaded configuration");

    // 2. Install Prometheus metrics recorder
    let prometheus_builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let metrics_handle = prometheus_builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Create store, gateway client and application state
    let store = build_store(&config).await;
    let gateway = build_gateway(&config);
    let verifier = config.webhook_verifier();
    if verifier.is_none() {
        tracing::warn!("STRIPE_WEBHOOK_SECRET not set, gateway callbacks will be rejected");
    }
    let state = Arc::new(AppState::new(
        store,
        gateway,
        config.checkout_urls(),
        verifier,
    ));

    // 4. Build the application
    let app = api::create_app(state, metrics_handle);

    // 5. Start server
    let addr = config.addr();
    tracing::info!(%addr, public_url = %config.public_url, "starting storefront server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("server shut down gracefully");
}
