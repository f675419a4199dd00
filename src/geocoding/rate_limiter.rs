//! Minimum spacing between outbound geocoder calls.
//!
//! Time comes from `tokio::time`, so tests drive the limiter with a paused
//! runtime clock instead of real sleeps.

use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::trace;

use crate::utils::constants::GEOCODE_MIN_INTERVAL_MS;

/// When the last outbound call completed.
#[derive(Debug, Clone, Copy, Default)]
pub struct RateLimiterState {
    pub last_call: Option<Instant>,
}

/// Serialises calls and keeps at least `min_interval` between the end of one
/// call and the start of the next.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    state: Mutex<RateLimiterState>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            state: Mutex::new(RateLimiterState::default()),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub async fn state(&self) -> RateLimiterState {
        *self.state.lock().await
    }

    /// Run `call` once the interval since the previous call has elapsed.
    ///
    /// The lock is held for the whole wait-call-record sequence, so concurrent
    /// callers queue behind each other.
    pub async fn throttle<F, Fut, T>(&self, call: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let mut state = self.state.lock().await;

        if let Some(last) = state.last_call {
            let ready_at = last + self.min_interval;
            let now = Instant::now();
            if now < ready_at {
                trace!(wait_ms = (ready_at - now).as_millis() as u64, "Spacing geocoder call");
                tokio::time::sleep_until(ready_at).await;
            }
        }

        let output = call().await;
        state.last_call = Some(Instant::now());
        output
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(Duration::from_millis(GEOCODE_MIN_INTERVAL_MS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_first_call_is_immediate() {
        let limiter = RateLimiter::default();
        let start = Instant::now();
        limiter.throttle(|| async {}).await;
        assert!(start.elapsed() < Duration::from_millis(1));
        assert!(limiter.state().await.last_call.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_consecutive_calls_are_spaced() {
        let limiter = RateLimiter::new(Duration::from_secs(1));
        let start = Instant::now();

        for _ in 0..5 {
            limiter.throttle(|| async {}).await;
        }

        assert!(start.elapsed() >= Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_spacing_counts_from_call_completion() {
        let limiter = RateLimiter::new(Duration::from_secs(1));

        limiter
            .throttle(|| tokio::time::sleep(Duration::from_secs(3)))
            .await;
        let finished = Instant::now();
        let second_started = limiter.throttle(|| async { Instant::now() }).await;

        assert!(second_started - finished >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_are_serialised() {
        let limiter = Arc::new(RateLimiter::new(Duration::from_secs(1)));
        let start = Instant::now();

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move { limiter.throttle(|| async { Instant::now() }).await })
            })
            .collect();

        let mut started = Vec::new();
        for handle in handles {
            started.push(handle.await.unwrap());
        }
        started.sort();

        assert!(started[1] - started[0] >= Duration::from_secs(1));
        assert!(started[2] - started[1] >= Duration::from_secs(1));
        assert!(start.elapsed() >= Duration::from_secs(2));
    }
}
