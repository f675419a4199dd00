use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use super::{RateLimiter, ReverseGeocoder};
use crate::error::{ProcessingError, Result};
use crate::models::AddressComponents;
use crate::settings::GeocoderSettings;
use crate::utils::constants::{GEOCODE_MAX_ATTEMPTS, GEOCODE_RETRY_DELAY_SECS};

/// Bounded, fixed-delay retry for transient geocoder failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Wait between a failed attempt and the next one.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: GEOCODE_MAX_ATTEMPTS,
            delay: Duration::from_secs(GEOCODE_RETRY_DELAY_SECS),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundReason {
    /// The provider answered without an address.
    ProviderEmpty,
    /// Every attempt failed transiently.
    RetriesExhausted { attempts: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeocodeOutcome {
    Found(AddressComponents),
    NotFound(NotFoundReason),
}

impl GeocodeOutcome {
    /// The address to record; `NotFound` becomes an empty address.
    pub fn into_address(self) -> AddressComponents {
        match self {
            GeocodeOutcome::Found(address) => address,
            GeocodeOutcome::NotFound(_) => AddressComponents::empty(),
        }
    }
}

/// Rate-limited, retrying wrapper around a [`ReverseGeocoder`].
pub struct GeocodeClient<G> {
    geocoder: G,
    limiter: RateLimiter,
    policy: RetryPolicy,
    cancel: CancellationToken,
}

impl<G: ReverseGeocoder> GeocodeClient<G> {
    pub fn new(geocoder: G) -> Self {
        Self {
            geocoder,
            limiter: RateLimiter::default(),
            policy: RetryPolicy::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn from_settings(geocoder: G, settings: &GeocoderSettings) -> Self {
        Self::new(geocoder)
            .with_rate_limiter(RateLimiter::new(settings.min_interval()))
            .with_retry_policy(RetryPolicy {
                max_attempts: settings.max_attempts,
                delay: settings.retry_delay(),
            })
    }

    pub fn with_rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn geocoder(&self) -> &G {
        &self.geocoder
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Reverse-geocode one `"lat,lon"` coordinate.
    ///
    /// Attempts run one after another through the rate limiter. Cancellation
    /// is honoured before each attempt, while a request is in flight and
    /// during the backoff wait, and is the only error returned.
    pub async fn reverse(&self, coordinate: &str) -> Result<GeocodeOutcome> {
        let max_attempts = self.policy.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            if self.cancel.is_cancelled() {
                return Err(ProcessingError::Cancelled);
            }

            let result = tokio::select! {
                _ = self.cancel.cancelled() => return Err(ProcessingError::Cancelled),
                result = self.limiter.throttle(|| self.geocoder.reverse(coordinate)) => result,
            };

            match result {
                Ok(Some(address)) => {
                    debug!(coordinate, attempt, "Geocoded");
                    return Ok(GeocodeOutcome::Found(address));
                }
                Ok(None) => {
                    debug!(coordinate, "Provider returned no address");
                    return Ok(GeocodeOutcome::NotFound(NotFoundReason::ProviderEmpty));
                }
                Err(e) if attempt == max_attempts => {
                    error!(
                        coordinate,
                        attempts = attempt,
                        error = %e,
                        "Geocoding gave up; recording empty address"
                    );
                }
                Err(e) => {
                    warn!(
                        coordinate,
                        attempt,
                        max_attempts,
                        error = %e,
                        "Geocoding attempt failed, retrying in {:?}",
                        self.policy.delay
                    );
                    tokio::select! {
                        _ = self.cancel.cancelled() => return Err(ProcessingError::Cancelled),
                        _ = tokio::time::sleep(self.policy.delay) => {}
                    }
                }
            }
        }

        Ok(GeocodeOutcome::NotFound(NotFoundReason::RetriesExhausted {
            attempts: max_attempts,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geocoding::GeocodeError;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// Fails transiently `failures` times, then answers with `answer`.
    struct ScriptedGeocoder {
        failures: u32,
        answer: Option<AddressComponents>,
        calls: Mutex<Vec<Instant>>,
    }

    impl ScriptedGeocoder {
        fn new(failures: u32, answer: Option<AddressComponents>) -> Self {
            Self {
                failures,
                answer,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<Instant> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ReverseGeocoder for ScriptedGeocoder {
        async fn reverse(
            &self,
            _coordinate: &str,
        ) -> std::result::Result<Option<AddressComponents>, GeocodeError> {
            let attempt = {
                let mut calls = self.calls.lock().unwrap();
                calls.push(Instant::now());
                calls.len() as u32
            };
            if attempt <= self.failures {
                Err(GeocodeError::Parse {
                    message: "connection reset".to_string(),
                })
            } else {
                Ok(self.answer.clone())
            }
        }
    }

    fn goias() -> AddressComponents {
        AddressComponents {
            country: Some("Brasil".into()),
            state: Some("Goiás".into()),
            ..AddressComponents::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_found_on_first_attempt() {
        let client = GeocodeClient::new(ScriptedGeocoder::new(0, Some(goias())));
        let outcome = client.reverse("-15.0,-49.0").await.unwrap();
        assert_eq!(outcome, GeocodeOutcome::Found(goias()));
        assert_eq!(client.geocoder.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_provider_empty_consumes_no_retries() {
        let client = GeocodeClient::new(ScriptedGeocoder::new(0, None));
        let outcome = client.reverse("-20.0,-30.0").await.unwrap();
        assert_eq!(outcome, GeocodeOutcome::NotFound(NotFoundReason::ProviderEmpty));
        assert_eq!(client.geocoder.calls().len(), 1);
        assert!(outcome.into_address().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_failures() {
        let client = GeocodeClient::new(ScriptedGeocoder::new(2, Some(goias())));
        let start = Instant::now();
        let outcome = client.reverse("-15.0,-49.0").await.unwrap();

        assert_eq!(outcome, GeocodeOutcome::Found(goias()));
        assert_eq!(client.geocoder.calls().len(), 3);
        assert!(start.elapsed() >= Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_bound_is_exactly_max_attempts() {
        let client = GeocodeClient::new(ScriptedGeocoder::new(u32::MAX, None));
        let outcome = client.reverse("-10.0,-50.0").await.unwrap();

        assert_eq!(
            outcome,
            GeocodeOutcome::NotFound(NotFoundReason::RetriesExhausted { attempts: 300 })
        );

        let calls = client.geocoder.calls();
        assert_eq!(calls.len(), 300);
        for pair in calls.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_secs(30));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_during_backoff() {
        let cancel = CancellationToken::new();
        let client = GeocodeClient::new(ScriptedGeocoder::new(u32::MAX, None))
            .with_cancellation(cancel.clone());

        let (result, _) = tokio::join!(client.reverse("-10.0,-50.0"), async {
            tokio::time::sleep(Duration::from_secs(45)).await;
            cancel.cancel();
        });

        assert!(matches!(result, Err(ProcessingError::Cancelled)));
        assert_eq!(client.geocoder.calls().len(), 2);
    }

    /// Never answers within any reasonable timeout.
    struct HangingGeocoder;

    #[async_trait]
    impl ReverseGeocoder for HangingGeocoder {
        async fn reverse(
            &self,
            _coordinate: &str,
        ) -> std::result::Result<Option<AddressComponents>, GeocodeError> {
            tokio::time::sleep(Duration::from_secs(300)).await;
            Ok(None)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_interrupts_in_flight_request() {
        let cancel = CancellationToken::new();
        let client = GeocodeClient::new(HangingGeocoder).with_cancellation(cancel.clone());
        let start = Instant::now();

        let (result, _) = tokio::join!(client.reverse("-10.0,-50.0"), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            cancel.cancel();
        });

        assert!(matches!(result, Err(ProcessingError::Cancelled)));
        assert!(start.elapsed() < Duration::from_secs(10));
        // The abandoned call released the limiter
        let outcome = tokio::time::timeout(
            Duration::from_secs(1),
            client.rate_limiter().state(),
        )
        .await;
        assert!(outcome.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_before_first_attempt() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let client =
            GeocodeClient::new(ScriptedGeocoder::new(0, Some(goias()))).with_cancellation(cancel);

        assert!(matches!(
            client.reverse("-10.0,-50.0").await,
            Err(ProcessingError::Cancelled)
        ));
        assert!(client.geocoder.calls().is_empty());
    }
}
