//! Fixed-window counting.
//!
//! A window opens on the first request from a client and lasts `window_ms`.
//! Requests inside it are counted up to the quota; once `now` passes the
//! window's end the next request opens a fresh window with a count of one.

use crate::decision::RateLimitDecision;

/// Per-client counter held by a [`RateLimitStore`](crate::RateLimitStore).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitEntry {
    /// Requests observed in the current window.
    pub count: u32,
    /// Epoch milliseconds at which the window ends.
    pub reset_time: u64,
}

impl RateLimitEntry {
    pub fn new(now_ms: u64, window_ms: u64) -> Self {
        Self {
            count: 1,
            reset_time: now_ms.saturating_add(window_ms),
        }
    }

    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms > self.reset_time
    }
}

/// Apply one request to `slot` and return the decision.
///
/// An absent or expired entry is replaced by a new window. A live entry under
/// quota is incremented. A live entry at quota is left untouched and the request
/// is denied.
pub fn evaluate(
    slot: &mut Option<RateLimitEntry>,
    now_ms: u64,
    max_requests: u32,
    window_ms: u64,
) -> RateLimitDecision {
    match slot {
        Some(entry) if !entry.is_expired(now_ms) => {
            if entry.count >= max_requests {
                RateLimitDecision {
                    allowed: false,
                    remaining: 0,
                    reset_time: entry.reset_time,
                    retry_after: Some(retry_after_secs(entry.reset_time, now_ms)),
                    limit: max_requests,
                }
            } else {
                entry.count += 1;
                RateLimitDecision {
                    allowed: true,
                    remaining: max_requests - entry.count,
                    reset_time: entry.reset_time,
                    retry_after: None,
                    limit: max_requests,
                }
            }
        }
        _ => {
            let entry = RateLimitEntry::new(now_ms, window_ms);
            *slot = Some(entry);
            RateLimitDecision {
                allowed: true,
                remaining: max_requests.saturating_sub(1),
                reset_time: entry.reset_time,
                retry_after: None,
                limit: max_requests,
            }
        }
    }
}

/// Seconds until `reset_time`, rounded up, at least 1.
fn retry_after_secs(reset_time: u64, now_ms: u64) -> u64 {
    reset_time.saturating_sub(now_ms).div_ceil(1000).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: u64 = 1_700_000_000_000;

    #[test]
    fn first_request_opens_window() {
        let mut slot = None;
        let decision = evaluate(&mut slot, NOW, 100, 60_000);

        assert!(decision.allowed);
        assert_eq!(decision.remaining, 99);
        assert_eq!(decision.reset_time, NOW + 60_000);
        assert_eq!(decision.limit, 100);
        assert_eq!(slot, Some(RateLimitEntry { count: 1, reset_time: NOW + 60_000 }));
    }

    #[test]
    fn counts_down_then_denies_without_mutation() {
        let mut slot = None;
        for expected in (0..3).rev() {
            let decision = evaluate(&mut slot, NOW, 3, 60_000);
            assert!(decision.allowed);
            assert_eq!(decision.remaining, expected);
        }

        let denied = evaluate(&mut slot, NOW + 1_500, 3, 60_000);
        assert!(!denied.allowed);
        assert_eq!(denied.remaining, 0);
        assert_eq!(denied.retry_after, Some(59));
        assert_eq!(slot.map(|e| e.count), Some(3));
    }

    #[test]
    fn retry_after_rounds_up_and_never_zero() {
        assert_eq!(retry_after_secs(NOW + 1, NOW), 1);
        assert_eq!(retry_after_secs(NOW + 1_001, NOW), 2);
        assert_eq!(retry_after_secs(NOW, NOW), 1);
    }

    #[test]
    fn window_end_is_inclusive() {
        let mut slot = Some(RateLimitEntry { count: 2, reset_time: NOW });

        let at_boundary = evaluate(&mut slot, NOW, 2, 60_000);
        assert!(!at_boundary.allowed);
        assert_eq!(at_boundary.retry_after, Some(1));

        let after = evaluate(&mut slot, NOW + 1, 2, 60_000);
        assert!(after.allowed);
        assert_eq!(after.remaining, 1);
        assert_eq!(slot.map(|e| e.reset_time), Some(NOW + 1 + 60_000));
    }
}
