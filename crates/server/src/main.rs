use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use lincoln_common::AppConfig;
use lincoln_directory::InMemoryDirectory;
use lincoln_rate_limit::RateLimiter;
use lincoln_server::{new_shared_state, run_server};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).json().init();

    // Parse command-line args for config path
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/lincoln.yaml".to_string());

    info!(config_path = %config_path, "starting Lincoln directory server");

    let config = AppConfig::load_or_default(&config_path)?;
    info!(
        environment = ?config.server.environment,
        extra_origins = config.cors.allowed_origins.len(),
        "configuration loaded"
    );

    let directory = InMemoryDirectory::load(&config.directory)?;
    info!(
        students = directory.student_count(),
        civil_war_orphans = directory.civil_war_orphan_count(),
        "directory loaded"
    );

    let limiter = RateLimiter::new();
    let sweeper = limiter.start_sweeper(Duration::from_secs(config.rate_limit.sweep_interval_secs));

    let listen_addr = config.server.listen.clone();
    let state = new_shared_state(config, limiter, Arc::new(directory));

    let result = run_server(state, &listen_addr, shutdown_signal()).await;

    sweeper.abort();
    info!("Lincoln directory server stopped");
    result
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("received SIGTERM, initiating graceful shutdown");
        }
    }
}
