/// Outcome of a single rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Requests left in the current window after this one.
    pub remaining: u32,
    /// Epoch milliseconds at which the window ends.
    pub reset_time: u64,
    /// Whole seconds until the window ends; set only on denial and never 0.
    pub retry_after: Option<u64>,
    /// Quota the request was evaluated against.
    pub limit: u32,
}

impl RateLimitDecision {
    /// `X-RateLimit-*` response headers, plus `Retry-After` when denied.
    ///
    /// `X-RateLimit-Reset` is in epoch seconds, rounded up.
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = vec![
            ("x-ratelimit-limit", self.limit.to_string()),
            ("x-ratelimit-remaining", self.remaining.to_string()),
            ("x-ratelimit-reset", self.reset_time.div_ceil(1000).to_string()),
        ];

        if let Some(retry_after) = self.retry_after {
            headers.push(("retry-after", retry_after.to_string()));
        }

        headers
    }
}
