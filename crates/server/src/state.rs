use std::sync::Arc;

use lincoln_common::AppConfig;
use lincoln_directory::Directory;
use lincoln_rate_limit::RateLimiter;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};

/// Shared state type alias used across all route handlers.
pub type SharedState = Arc<AppState>;

/// Everything a procedure handler needs: configuration, the rate limiter, the
/// record source and metrics.
pub struct AppState {
    pub config: AppConfig,
    pub limiter: RateLimiter,
    pub directory: Arc<dyn Directory>,
    pub metrics: ServerMetrics,
}

/// Prometheus metrics for the RPC surface, labelled by procedure.
pub struct ServerMetrics {
    pub registry: Registry,
    pub requests_total: IntCounterVec,
    pub requests_rate_limited: IntCounterVec,
    pub request_duration: HistogramVec,
}

impl ServerMetrics {
    /// Create the counters and histogram and register them against a fresh
    /// registry.
    pub fn new() -> Self {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new("lincoln_requests_total", "Total number of RPC calls received"),
            &["procedure"],
        )
        .expect("failed to create requests_total counter");

        let requests_rate_limited = IntCounterVec::new(
            Opts::new(
                "lincoln_requests_rate_limited",
                "Total number of RPC calls rejected by the rate limiter",
            ),
            &["procedure"],
        )
        .expect("failed to create requests_rate_limited counter");

        let request_duration = HistogramVec::new(
            HistogramOpts::new(
                "lincoln_request_duration_seconds",
                "RPC call duration in seconds",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0]),
            &["procedure"],
        )
        .expect("failed to create request_duration histogram");

        registry
            .register(Box::new(requests_total.clone()))
            .expect("failed to register requests_total");
        registry
            .register(Box::new(requests_rate_limited.clone()))
            .expect("failed to register requests_rate_limited");
        registry
            .register(Box::new(request_duration.clone()))
            .expect("failed to register request_duration");

        Self {
            registry,
            requests_total,
            requests_rate_limited,
            request_duration,
        }
    }
}

impl ServerMetrics {
    /// Content type of [`ServerMetrics::render`] output.
    pub const CONTENT_TYPE: &'static str = "text/plain; version=0.0.4; charset=utf-8";

    /// Encode every registered family in the Prometheus text format.
    pub fn render(&self) -> prometheus::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl Default for ServerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new(config: AppConfig, limiter: RateLimiter, directory: Arc<dyn Directory>) -> Self {
        Self {
            config,
            limiter,
            directory,
            metrics: ServerMetrics::new(),
        }
    }
}
