//! Per-client rate limiting for the directory RPC server.
//!
//! Requests are counted in fixed windows keyed by client identity (see
//! [`lincoln_request_context::client_id`]). The counting rules live in
//! [`window`]; counters are held by a [`RateLimitStore`], which the
//! [`RateLimiter`] facade takes as an injected backend so a shared store can
//! replace the in-process [`MemoryStore`] without touching the decision logic.
//!
//! Expired counters are treated as absent whether or not they have been swept.
//! [`RateLimiter::start_sweeper`] reclaims them in the background to bound
//! memory.

pub mod clock;
pub mod decision;
pub mod store;
pub mod window;

use std::sync::Arc;
use std::time::Duration;

use lincoln_request_context::{client_id, RequestContext};
use tokio::task::JoinHandle;

pub use clock::{Clock, SystemClock};
pub use decision::RateLimitDecision;
pub use store::{MemoryStore, RateLimitStore};
pub use window::RateLimitEntry;

#[cfg(any(test, feature = "test-helpers"))]
pub use clock::MockClock;

/// Window applied when the caller does not choose one.
pub const DEFAULT_WINDOW_MS: u64 = 60_000;
/// Standard per-window quota.
pub const DEFAULT_MAX_REQUESTS: u32 = 100;
/// Quota for the strict tier.
pub const STRICT_MAX_REQUESTS: u32 = 20;

/// Fixed-window rate limiter over a pluggable store.
///
/// Cheaply cloneable; clones share the same store and clock.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// In-memory store and system clock.
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    pub fn with_store(store: Arc<dyn RateLimitStore>) -> Self {
        Self::with_store_and_clock(store, Arc::new(SystemClock))
    }

    pub fn with_store_and_clock(store: Arc<dyn RateLimitStore>, clock: Arc<dyn Clock>) -> Self {
        tracing::info!("creating fixed window rate limiter");
        Self { store, clock }
    }

    /// Count one request from `client_id` against `max_requests` per `window_ms`.
    ///
    /// Never fails. The store entry is keyed by `client_id` alone, so mixing
    /// window sizes for the same client reuses whichever window is open.
    pub fn check(&self, client_id: &str, max_requests: u32, window_ms: u64) -> RateLimitDecision {
        let now = self.clock.now_ms();
        let mut decision = None;

        self.store.update(client_id, &mut |slot| {
            decision = Some(window::evaluate(slot, now, max_requests, window_ms));
        });

        // A store that skips `apply` is treated as holding no entry.
        let decision =
            decision.unwrap_or_else(|| window::evaluate(&mut None, now, max_requests, window_ms));

        if decision.allowed {
            tracing::trace!(
                client_id,
                remaining = decision.remaining,
                limit = decision.limit,
                "request within rate limit"
            );
        } else {
            tracing::info!(
                client_id,
                limit = decision.limit,
                retry_after = decision.retry_after,
                "request rate limited"
            );
        }

        decision
    }

    /// Check the request described by `ctx` against the default 60 second window.
    pub fn check_with_context(&self, ctx: &RequestContext, max_requests: u32) -> RateLimitDecision {
        self.check(&client_id(ctx), max_requests, DEFAULT_WINDOW_MS)
    }

    /// Check the request described by `ctx` against a caller-supplied window.
    pub fn check_custom_with_context(
        &self,
        ctx: &RequestContext,
        max_requests: u32,
        window_ms: u64,
    ) -> RateLimitDecision {
        self.check(&client_id(ctx), max_requests, window_ms)
    }

    /// Remove expired entries now. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        self.store.sweep(self.clock.now_ms())
    }

    pub fn store(&self) -> &Arc<dyn RateLimitStore> {
        &self.store
    }

    /// Spawn a Tokio task that sweeps expired entries every `interval`.
    ///
    /// The task holds clones of the store and clock and runs until the returned
    /// handle is aborted or the runtime shuts down.
    pub fn start_sweeper(&self, interval: Duration) -> JoinHandle<()> {
        let limiter = self.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let removed = limiter.sweep();
                tracing::trace!(removed, "rate limiter sweep tick completed");
            }
        })
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const START: u64 = 1_700_000_000_000;

    fn limiter() -> (RateLimiter, MockClock) {
        let clock = MockClock::new(START);
        let limiter =
            RateLimiter::with_store_and_clock(Arc::new(MemoryStore::new()), Arc::new(clock.clone()));
        (limiter, clock)
    }

    fn ctx(ip: &str) -> RequestContext {
        RequestContext {
            client_ip: ip.to_string(),
            ..RequestContext::default()
        }
    }

    #[test]
    fn context_check_uses_default_window() {
        let (limiter, _clock) = limiter();
        let decision = limiter.check_with_context(&ctx("192.168.1.200"), 2);

        assert!(decision.allowed);
        assert_eq!(decision.remaining, 1);
        assert_eq!(decision.limit, 2);
        assert_eq!(decision.reset_time, START + DEFAULT_WINDOW_MS);
    }

    #[test]
    fn custom_window_is_honoured() {
        let (limiter, _clock) = limiter();
        let decision = limiter.check_custom_with_context(&ctx("10.0.0.1"), 5, 1_000);

        assert_eq!(decision.reset_time, START + 1_000);
        assert_eq!(decision.limit, 5);
    }

    #[test]
    fn mixed_windows_share_one_entry() {
        let (limiter, _clock) = limiter();
        let client = ctx("10.0.0.2");

        limiter.check_custom_with_context(&client, 5, 1_000);
        let decision = limiter.check_with_context(&client, 5);

        // The open 1s window keeps counting; it is not re-keyed by window size.
        assert_eq!(decision.reset_time, START + 1_000);
        assert_eq!(decision.remaining, 3);
        assert_eq!(limiter.store().len(), 1);
    }

    #[test]
    fn clone_shares_state() {
        let (limiter, _clock) = limiter();
        let limiter2 = limiter.clone();

        assert!(limiter.check("shared", 2, DEFAULT_WINDOW_MS).allowed);
        assert!(limiter2.check("shared", 2, DEFAULT_WINDOW_MS).allowed);
        assert!(!limiter.check("shared", 2, DEFAULT_WINDOW_MS).allowed);
    }

    #[test]
    fn sweep_uses_clock() {
        let (limiter, clock) = limiter();
        limiter.check("a", 10, 1_000);
        limiter.check("b", 10, 10_000);

        clock.advance(Duration::from_millis(1_001));
        assert_eq!(limiter.sweep(), 1);
        assert!(limiter.store().get("a").is_none());
        assert!(limiter.store().get("b").is_some());
    }
}
