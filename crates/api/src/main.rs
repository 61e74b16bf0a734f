//! API server entry point.

use std::sync::Arc;

use checkout::{LogAuditLog, LogNotifier, ReconcilePolicy};
use gateway::{GatewayConfig, HttpPaymentGateway};
use metrics_exporter_prometheus::PrometheusHandle;
use store::{InMemoryStore, PostgresStore, Store};
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

async fn serve<S: Store + Clone + 'static>(
    config: api::Config,
    store: S,
    metrics_handle: PrometheusHandle,
) {
    let gateway = Arc::new(HttpPaymentGateway::new(GatewayConfig::from_env()));
    if !gateway.config().is_configured() {
        tracing::warn!("mobile-money credentials missing; payment prompts are unavailable");
    }

    let state = api::create_state(
        store,
        gateway,
        Arc::new(LogNotifier),
        Arc::new(LogAuditLog),
        ReconcilePolicy::default(),
    );
    let app = api::create_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("server shut down gracefully");
}

#[tokio::main]
async fn main() {
    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let prometheus_builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let metrics_handle = prometheus_builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Select the store and serve
    let config = api::Config::from_env();
    match config.database_url.clone() {
        Some(url) => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(10)
                .connect(&url)
                .await
                .expect("failed to connect to database");
            let store = PostgresStore::new(pool);
            store.run_migrations().await.expect("migrations failed");
            serve(config, store, metrics_handle).await;
        }
        None => {
            tracing::warn!("DATABASE_URL not set; running on the in-memory store");
            serve(config, InMemoryStore::new(), metrics_handle).await;
        }
    }
}
