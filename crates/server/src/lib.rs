//! HTTP surface of the Lincoln directory: RPC procedures behind per-client
//! rate limiting and an origin allow-list.

pub mod cors;
pub mod routes;
pub mod rpc;
pub mod state;

use std::future::Future;
use std::sync::Arc;

use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::get;
use axum::Router;
use lincoln_common::AppConfig;
use lincoln_directory::Directory;
use lincoln_rate_limit::RateLimiter;
use tower_http::trace::TraceLayer;

use crate::cors::{apply_cors, CorsPolicy};

pub use state::{AppState, ServerMetrics, SharedState};

/// Build the Axum router with all RPC routes and middleware.
pub fn build_router(state: SharedState) -> Router {
    let cors = Arc::new(CorsPolicy::from_config(&state.config));

    Router::new()
        // Procedures
        .route(
            "/rpc/healthCheck",
            get(routes::health::health_check).post(routes::health::health_check),
        )
        .route(
            "/rpc/getStudents",
            get(routes::students::get_students).post(routes::students::get_students),
        )
        .route(
            "/rpc/getCivilWarOrphans",
            get(routes::orphans::get_civil_war_orphans)
                .post(routes::orphans::get_civil_war_orphans),
        )
        // Prometheus metrics
        .route("/metrics", get(routes::metrics::get_metrics))
        .fallback(rpc::not_found)
        .with_state(state)
        // Outermost last: tracing, then CORS, then context capture
        .layer(from_fn(rpc::attach_request_context))
        .layer(from_fn_with_state(cors, apply_cors))
        .layer(TraceLayer::new_for_http())
}

/// Serve the router on `listen_addr` until `shutdown` resolves.
pub async fn run_server<F>(state: SharedState, listen_addr: &str, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    tracing::info!("directory RPC server listening on {}", listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

/// Convenience function to create a SharedState from its parts.
pub fn new_shared_state(
    config: AppConfig,
    limiter: RateLimiter,
    directory: Arc<dyn Directory>,
) -> SharedState {
    Arc::new(AppState::new(config, limiter, directory))
}
