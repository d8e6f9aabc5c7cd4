//! Request admission control
//!
//! The limiter is a capability object built once at startup and handed to the
//! request pipeline. [`InMemoryRateLimiter`] keeps its state in this process
//! only; it deters abuse but does not coordinate between instances.

mod memory;

use std::env;

use async_trait::async_trait;
use axum::http::{HeaderMap, HeaderValue};
use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};

pub use memory::InMemoryRateLimiter;

/// `X-RateLimit-Limit` response header
pub const X_RATELIMIT_LIMIT: &str = "x-ratelimit-limit";
/// `X-RateLimit-Remaining` response header
pub const X_RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";
/// `X-RateLimit-Reset` response header
pub const X_RATELIMIT_RESET: &str = "x-ratelimit-reset";

/// Sliding window parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimitPolicy {
    /// Requests admitted per client inside one window
    pub max_requests: usize,
    /// Length of the trailing window
    pub window: TimeDelta,
    /// Chance, per call, of sweeping idle clients out of memory
    pub sweep_probability: f64,
    /// Clients whose newest request is older than this are swept
    pub sweep_horizon: TimeDelta,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window: TimeDelta::seconds(60),
            sweep_probability: 0.01,
            sweep_horizon: TimeDelta::seconds(600),
        }
    }
}

impl RateLimitPolicy {
    /// Default policy with `RATE_LIMIT_MAX_REQUESTS` and
    /// `RATE_LIMIT_WINDOW_SECS` overrides.
    ///
    /// Unparsable overrides are ignored. The sweep horizon stays at ten windows.
    #[must_use]
    pub fn from_env() -> Self {
        let mut policy = Self::default();

        if let Some(max_requests) = env::var("RATE_LIMIT_MAX_REQUESTS")
            .ok()
            .and_then(|val| val.parse::<usize>().ok())
            .filter(|val| *val > 0)
        {
            policy.max_requests = max_requests;
        }

        if let Some(window_secs) = env::var("RATE_LIMIT_WINDOW_SECS")
            .ok()
            .and_then(|val| val.parse::<i64>().ok())
            .filter(|val| *val > 0)
        {
            policy.window = TimeDelta::seconds(window_secs);
            policy.sweep_horizon = TimeDelta::seconds(window_secs * 10);
        }

        policy
    }
}

/// Outcome of one admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// Whether the request may proceed
    pub allowed: bool,
    /// Configured maximum per window
    pub limit: usize,
    /// Requests left in the current window after this one
    pub remaining: usize,
    /// When the oldest counted request leaves the window
    pub reset_at: DateTime<Utc>,
}

impl RateLimitDecision {
    /// Whole seconds until `reset_at`, rounded up
    #[must_use]
    pub fn retry_after_secs(&self, now: DateTime<Utc>) -> u64 {
        let millis = (self.reset_at - now).num_milliseconds().max(0);
        u64::try_from(millis).map_or(0, |millis| millis.div_ceil(1000))
    }

    /// `X-RateLimit-*` headers describing this decision
    #[must_use]
    pub fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(self.limit));
        headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(self.remaining));
        if let Ok(reset) =
            HeaderValue::from_str(&self.reset_at.to_rfc3339_opts(SecondsFormat::Millis, true))
        {
            headers.insert(X_RATELIMIT_RESET, reset);
        }
        headers
    }
}

/// Admission control keyed by client identity
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Checks whether `client_id` may make another request now, counting the
    /// request if it is admitted. Rejected attempts are not counted.
    async fn check_and_record(&self, client_id: &str) -> RateLimitDecision;
}
