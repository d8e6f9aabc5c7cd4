use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::{RateLimitDecision, RateLimitPolicy, RateLimiter};

/// Sliding-window limiter holding per-client request timestamps in memory.
///
/// Idle clients are removed by an occasional sweep that piggybacks on regular
/// calls, so no background task is needed.
#[derive(Debug)]
pub struct InMemoryRateLimiter {
    policy: RateLimitPolicy,
    requests: Mutex<HashMap<String, Vec<DateTime<Utc>>>>,
}

impl InMemoryRateLimiter {
    #[must_use]
    pub fn new(policy: RateLimitPolicy) -> Self {
        Self {
            policy,
            requests: Mutex::new(HashMap::new()),
        }
    }

    /// Admission check against an explicit clock
    pub async fn check_and_record_at(
        &self,
        client_id: &str,
        now: DateTime<Utc>,
    ) -> RateLimitDecision {
        let sweep = rand::random::<f64>() < self.policy.sweep_probability;
        let mut requests = self.requests.lock().await;

        let mut recent: Vec<DateTime<Utc>> = requests
            .get(client_id)
            .map(|timestamps| {
                timestamps
                    .iter()
                    .copied()
                    .filter(|t| now - *t < self.policy.window)
                    .collect()
            })
            .unwrap_or_default();

        let decision = if recent.len() >= self.policy.max_requests {
            let oldest = recent.iter().min().copied().unwrap_or(now);
            RateLimitDecision {
                allowed: false,
                limit: self.policy.max_requests,
                remaining: 0,
                reset_at: oldest + self.policy.window,
            }
        } else {
            recent.push(now);
            let decision = RateLimitDecision {
                allowed: true,
                limit: self.policy.max_requests,
                remaining: self.policy.max_requests - recent.len(),
                reset_at: recent[0] + self.policy.window,
            };
            requests.insert(client_id.to_string(), recent);
            decision
        };

        if sweep {
            Self::sweep_locked(&mut requests, now, &self.policy);
        }

        decision
    }

    /// Drops every client with no request inside the sweep horizon
    pub async fn sweep_at(&self, now: DateTime<Utc>) {
        let mut requests = self.requests.lock().await;
        Self::sweep_locked(&mut requests, now, &self.policy);
    }

    /// Number of clients currently held in memory
    pub async fn tracked_clients(&self) -> usize {
        self.requests.lock().await.len()
    }

    fn sweep_locked(
        requests: &mut HashMap<String, Vec<DateTime<Utc>>>,
        now: DateTime<Utc>,
        policy: &RateLimitPolicy,
    ) {
        let horizon = now - policy.sweep_horizon;
        let before = requests.len();
        requests.retain(|_, timestamps| timestamps.iter().any(|t| *t >= horizon));

        let removed = before - requests.len();
        if removed > 0 {
            tracing::debug!(removed, remaining = requests.len(), "Swept idle rate limit entries");
        }
    }
}

impl Default for InMemoryRateLimiter {
    fn default() -> Self {
        Self::new(RateLimitPolicy::default())
    }
}

#[async_trait]
impl RateLimiter for InMemoryRateLimiter {
    async fn check_and_record(&self, client_id: &str) -> RateLimitDecision {
        self.check_and_record_at(client_id, Utc::now()).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;

    fn limiter_without_sweep() -> InMemoryRateLimiter {
        InMemoryRateLimiter::new(RateLimitPolicy {
            sweep_probability: 0.0,
            ..RateLimitPolicy::default()
        })
    }

    fn start() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-06-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[tokio::test]
    async fn test_first_request_admitted() {
        let limiter = limiter_without_sweep();
        let t0 = start();

        let decision = limiter.check_and_record_at("10.0.0.1", t0).await;
        assert!(decision.allowed);
        assert_eq!(decision.limit, 10);
        assert_eq!(decision.remaining, 9);
        assert_eq!(decision.reset_at, t0 + TimeDelta::seconds(60));
    }

    #[tokio::test]
    async fn test_eleventh_request_rejected() {
        let limiter = limiter_without_sweep();
        let t0 = start();

        for i in 0..10 {
            let decision = limiter
                .check_and_record_at("10.0.0.1", t0 + TimeDelta::seconds(i))
                .await;
            assert!(decision.allowed, "request {i}");
            assert_eq!(decision.remaining, 9 - usize::try_from(i).unwrap());
            assert_eq!(decision.reset_at, t0 + TimeDelta::seconds(60));
        }

        let rejected = limiter
            .check_and_record_at("10.0.0.1", t0 + TimeDelta::seconds(30))
            .await;
        assert!(!rejected.allowed);
        assert_eq!(rejected.remaining, 0);
        assert_eq!(rejected.reset_at, t0 + TimeDelta::milliseconds(60_000));
    }

    #[tokio::test]
    async fn test_rejected_attempts_do_not_count() {
        let limiter = limiter_without_sweep();
        let t0 = start();

        for _ in 0..10 {
            limiter.check_and_record_at("c", t0).await;
        }
        for i in 1..=20 {
            let decision = limiter
                .check_and_record_at("c", t0 + TimeDelta::seconds(i))
                .await;
            assert!(!decision.allowed);
        }

        // only the original ten are on record, all of which expire at t0 + 60s
        let decision = limiter
            .check_and_record_at("c", t0 + TimeDelta::seconds(60))
            .await;
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 9);
    }

    #[tokio::test]
    async fn test_window_slides() {
        let limiter = limiter_without_sweep();
        let t0 = start();

        for i in 0..10 {
            limiter
                .check_and_record_at("c", t0 + TimeDelta::seconds(i))
                .await;
        }

        // at t0 + 60s the first request has aged out, freeing exactly one slot
        let admitted = limiter
            .check_and_record_at("c", t0 + TimeDelta::seconds(60))
            .await;
        assert!(admitted.allowed);
        assert_eq!(admitted.remaining, 0);
        assert_eq!(admitted.reset_at, t0 + TimeDelta::seconds(61));

        let rejected = limiter
            .check_and_record_at("c", t0 + TimeDelta::milliseconds(60_500))
            .await;
        assert!(!rejected.allowed);
        assert_eq!(rejected.reset_at, t0 + TimeDelta::seconds(61));
    }

    #[tokio::test]
    async fn test_clients_are_independent() {
        let limiter = limiter_without_sweep();
        let t0 = start();

        for _ in 0..10 {
            limiter.check_and_record_at("a", t0).await;
        }
        assert!(!limiter.check_and_record_at("a", t0).await.allowed);
        assert!(limiter.check_and_record_at("b", t0).await.allowed);
    }

    #[tokio::test]
    async fn test_sweep_removes_only_idle_clients() {
        let limiter = limiter_without_sweep();
        let t0 = start();

        limiter.check_and_record_at("idle", t0).await;
        limiter
            .check_and_record_at("active", t0 + TimeDelta::seconds(500))
            .await;
        assert_eq!(limiter.tracked_clients().await, 2);

        limiter.sweep_at(t0 + TimeDelta::seconds(601)).await;
        assert_eq!(limiter.tracked_clients().await, 1);

        // the active client kept its history
        let decision = limiter
            .check_and_record_at("active", t0 + TimeDelta::seconds(520))
            .await;
        assert_eq!(decision.remaining, 8);
    }

    #[tokio::test]
    async fn test_probabilistic_sweep_runs_on_calls() {
        let limiter = InMemoryRateLimiter::new(RateLimitPolicy {
            sweep_probability: 1.0,
            ..RateLimitPolicy::default()
        });
        let t0 = start();

        limiter.check_and_record_at("one-off", t0).await;
        limiter
            .check_and_record_at("later", t0 + TimeDelta::hours(1))
            .await;

        assert_eq!(limiter.tracked_clients().await, 1);
    }

    #[tokio::test]
    async fn test_trait_object_uses_wall_clock() {
        let limiter: std::sync::Arc<dyn RateLimiter> =
            std::sync::Arc::new(limiter_without_sweep());

        let before = Utc::now();
        let decision = limiter.check_and_record("10.0.0.9").await;
        assert!(decision.allowed);
        assert!(decision.reset_at >= before + TimeDelta::seconds(60));
    }
}
