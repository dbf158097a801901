//! Supplier integration facade and its HTTP server.
//!
//! Provides REST endpoints for stock lookups, purchases and administration,
//! with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod http_invoker;
pub mod integration;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use catalog::FallbackStore;
use metrics_exporter_prometheus::PrometheusHandle;
use supplier::RemoteInvoker;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::Config;
pub use http_invoker::HttpInvoker;
pub use integration::{
    ConnectionStatus, ImportReport, ImportResult, IntegrationConfig, IntegrationDefaults,
    SupplierIntegration,
};

use routes::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<I, F>(state: AppState<I, F>, metrics_handle: PrometheusHandle) -> Router
where
    I: RemoteInvoker + 'static,
    F: FallbackStore + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/stock/{kiosk_token}", get(routes::stock::get::<I, F>))
        .route(
            "/stock/{kiosk_token}/availability",
            get(routes::stock::availability::<I, F>),
        )
        .route("/orders", post(routes::orders::buy::<I, F>))
        .route(
            "/orders/{order_id}/products",
            get(routes::orders::products::<I, F>),
        )
        .route("/orders/{order_id}/poll", post(routes::orders::poll::<I, F>))
        .route(
            "/connection/{kiosk_token}",
            get(routes::admin::connection::<I, F>),
        )
        .route("/admin/import", post(routes::admin::import::<I, F>))
        .route("/admin/cache/clear", post(routes::admin::clear_cache::<I, F>))
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

/// Builds the shared facade from `config` around an invoker and a store.
pub fn create_state<I, F>(invoker: I, store: F, config: &Config) -> AppState<I, F>
where
    I: RemoteInvoker + 'static,
    F: FallbackStore + 'static,
{
    Arc::new(SupplierIntegration::with_config(
        invoker,
        store,
        config.integration_config(),
    ))
}
