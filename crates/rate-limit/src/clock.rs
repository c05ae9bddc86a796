//! Wall-clock time source for rate-limit windows.
//!
//! Window boundaries are absolute epoch milliseconds because they are reported to
//! clients (`X-RateLimit-Reset`). [`MockClock`] is available in tests or with the
//! `test-helpers` feature.

use std::time::{SystemTime, UNIX_EPOCH};

/// Source of the current time in epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// Clock backed by [`SystemTime`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default()
    }
}

#[cfg(any(test, feature = "test-helpers"))]
pub use mock::MockClock;

#[cfg(any(test, feature = "test-helpers"))]
mod mock {
    use super::Clock;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    /// Manually driven clock. Clones share the same time.
    #[derive(Debug, Clone)]
    pub struct MockClock {
        now_ms: Arc<AtomicU64>,
    }

    impl MockClock {
        pub fn new(start_ms: u64) -> Self {
            Self {
                now_ms: Arc::new(AtomicU64::new(start_ms)),
            }
        }

        pub fn advance(&self, by: Duration) {
            self.now_ms.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
        }

        pub fn set(&self, now_ms: u64) {
            self.now_ms.store(now_ms, Ordering::SeqCst);
        }
    }

    impl Clock for MockClock {
        fn now_ms(&self) -> u64 {
            self.now_ms.load(Ordering::SeqCst)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn system_clock_is_after_2020() {
        assert!(SystemClock.now_ms() > 1_577_836_800_000);
    }

    #[test]
    fn mock_clock_clones_share_time() {
        let clock = MockClock::new(1_000);
        let other = clock.clone();

        other.advance(Duration::from_millis(500));
        assert_eq!(clock.now_ms(), 1_500);

        clock.set(10);
        assert_eq!(other.now_ms(), 10);
    }
}
