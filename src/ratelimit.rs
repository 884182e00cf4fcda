use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::errors::MarketError;

/// Snapshot of limiter state for observability endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct LimiterUsage {
    pub source: &'static str,
    pub used: usize,
    pub max: usize,
    pub remaining: usize,
    pub retry_count: u32,
}

#[derive(Debug)]
struct LimiterState {
    timestamps: VecDeque<Instant>,
    retry_count: u32,
}

/// Sliding-window rate limiter: at most `max_requests` per `window`, one
/// instance per upstream source. Over-capacity acquires sleep until the
/// oldest request leaves the window plus an exponential backoff term with
/// jitter; after `max_retries` consecutive throttled attempts the acquire
/// fails with `RateLimitExceeded` instead of sleeping forever.
///
/// Upstream free tiers silently 429 past fixed per-minute quotas, so gating
/// client-side avoids burning calls that would fail anyway and spreads batch
/// requests out in time.
#[derive(Clone)]
pub struct RateLimiter {
    source: &'static str,
    state: Arc<Mutex<LimiterState>>,
    max_requests: usize,
    window: Duration,
    base_backoff: Duration,
    max_retries: u32,
}

impl RateLimiter {
    pub fn new(source: &'static str, max_requests: usize, window: Duration) -> Self {
        Self {
            source,
            state: Arc::new(Mutex::new(LimiterState {
                timestamps: VecDeque::new(),
                retry_count: 0,
            })),
            max_requests,
            window,
            base_backoff: Duration::from_millis(500),
            max_retries: 5,
        }
    }

    pub fn with_backoff(mut self, base: Duration, max_retries: u32) -> Self {
        self.base_backoff = base;
        self.max_retries = max_retries;
        self
    }

    /// Acquire a request slot, sleeping through backoff as needed.
    pub async fn acquire(&self) -> Result<(), MarketError> {
        loop {
            let wait = {
                let mut state = self.state.lock().await;
                let now = Instant::now();

                // Evict timestamps that have left the window
                while let Some(&front) = state.timestamps.front() {
                    if now.duration_since(front) >= self.window {
                        state.timestamps.pop_front();
                    } else {
                        break;
                    }
                }

                if state.timestamps.len() < self.max_requests {
                    state.timestamps.push_back(now);
                    state.retry_count = 0;
                    return Ok(());
                }

                // Time until the oldest timestamp exits the window
                let oldest = *state.timestamps.front().unwrap_or(&now);
                let until_free = self.window.saturating_sub(now.duration_since(oldest));

                if state.retry_count >= self.max_retries {
                    let suggested = until_free;
                    state.retry_count = 0;
                    return Err(MarketError::RateLimitExceeded {
                        provider: self.source,
                        suggested_wait: suggested,
                    });
                }

                let jitter = rand::thread_rng().gen_range(0.5..=1.0);
                let backoff = self.base_backoff.mul_f64(
                    2_f64.powi(state.retry_count as i32) * jitter,
                );
                state.retry_count += 1;
                until_free + backoff
            };

            tracing::debug!(
                source = self.source,
                wait_ms = wait.as_millis() as u64,
                "Rate limiter throttled, backing off"
            );
            tokio::time::sleep(wait).await;
        }
    }

    pub async fn usage(&self) -> LimiterUsage {
        let mut state = self.state.lock().await;
        let now = Instant::now();
        while let Some(&front) = state.timestamps.front() {
            if now.duration_since(front) >= self.window {
                state.timestamps.pop_front();
            } else {
                break;
            }
        }

        let used = state.timestamps.len();
        LimiterUsage {
            source: self.source,
            used,
            max: self.max_requests,
            remaining: self.max_requests.saturating_sub(used),
            retry_count: state.retry_count,
        }
    }

    /// Drop all recorded state, freeing the full window immediately.
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        state.timestamps.clear();
        state.retry_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_under_capacity_is_immediate() {
        let limiter = RateLimiter::new("test", 3, Duration::from_secs(60));
        let start = Instant::now();
        for _ in 0..3 {
            limiter.acquire().await.expect("should acquire");
        }
        assert!(start.elapsed() < Duration::from_millis(50));

        let usage = limiter.usage().await;
        assert_eq!(usage.used, 3);
        assert_eq!(usage.remaining, 0);
    }

    #[tokio::test]
    async fn test_over_capacity_waits_for_window() {
        let limiter = RateLimiter::new("test", 2, Duration::from_millis(200))
            .with_backoff(Duration::from_millis(1), 10);

        limiter.acquire().await.unwrap();
        limiter.acquire().await.unwrap();

        // Third acquire in the same window must be delayed until the oldest
        // timestamp ages out.
        let start = Instant::now();
        limiter.acquire().await.unwrap();
        assert!(
            start.elapsed() >= Duration::from_millis(150),
            "elapsed {:?}",
            start.elapsed()
        );
    }

    #[tokio::test]
    async fn test_capacity_returns_after_window() {
        let limiter = RateLimiter::new("test", 1, Duration::from_millis(50))
            .with_backoff(Duration::from_millis(1), 10);

        limiter.acquire().await.unwrap();
        tokio::time::sleep(Duration::from_millis(80)).await;

        let usage = limiter.usage().await;
        assert_eq!(usage.used, 0, "window should have drained");

        let start = Instant::now();
        limiter.acquire().await.unwrap();
        assert!(start.elapsed() < Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_retry_budget_exhaustion_fails() {
        // A window long enough that slots never free up during the test.
        let limiter = RateLimiter::new("test", 1, Duration::from_secs(600))
            .with_backoff(Duration::from_millis(1), 0);

        limiter.acquire().await.unwrap();
        let err = limiter.acquire().await.expect_err("budget of 0 retries");
        assert!(matches!(err, MarketError::RateLimitExceeded { provider: "test", .. }));
    }

    #[tokio::test]
    async fn test_reset_clears_state() {
        let limiter = RateLimiter::new("test", 2, Duration::from_secs(60));
        limiter.acquire().await.unwrap();
        limiter.acquire().await.unwrap();

        limiter.reset().await;
        let usage = limiter.usage().await;
        assert_eq!(usage.used, 0);
        assert_eq!(usage.remaining, 2);
    }
}
