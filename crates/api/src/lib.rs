//! HTTP API server with observability for the storefront checkout core.
//!
//! Provides REST endpoints for order creation, the paid/delivered
//! transitions, and the mobile-money payment flow, with structured logging
//! (tracing) and Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use checkout::{AuditLog, Notifier, OrderService, ReconcilePolicy, Reconciler};
use gateway::PaymentGateway;
use metrics_exporter_prometheus::PrometheusHandle;
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::Config;
use routes::orders::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/orders", post(routes::orders::create::<S>))
        .route("/orders", get(routes::orders::list::<S>))
        .route("/orders/mine", get(routes::orders::mine::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/orders/{id}/pay", put(routes::orders::pay::<S>))
        .route("/orders/{id}/deliver", put(routes::orders::deliver::<S>))
        .route("/payments/mobile-push", post(routes::payments::push::<S>))
        .route(
            "/payments/mobile-status/{invoiceId}",
            get(routes::payments::status::<S>),
        )
        .route("/payments/webhook", post(routes::payments::webhook::<S>))
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

/// Creates application state over an explicit store, gateway, and
/// collaborators.
pub fn create_state<S: Store + Clone + 'static>(
    store: S,
    gateway: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn Notifier>,
    audit: Arc<dyn AuditLog>,
    policy: ReconcilePolicy,
) -> Arc<AppState<S>> {
    let orders = OrderService::new(store.clone(), notifier, audit);
    let reconciler = Reconciler::new(orders.clone(), gateway.clone(), policy);

    Arc::new(AppState {
        orders,
        reconciler,
        gateway,
        store,
    })
}
