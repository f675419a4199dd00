//! Reverse geocoding of grid coordinates.
//!
//! A [`ReverseGeocoder`] performs exactly one lookup and reports transport or
//! provider failures as [`GeocodeError`]. The [`GeocodeClient`] wraps a
//! provider with call spacing ([`RateLimiter`]) and bounded retries, and turns
//! every terminal state into a [`GeocodeOutcome`] so one bad coordinate never
//! stops a batch.

pub mod client;
pub mod nominatim;
pub mod rate_limiter;

pub use client::{GeocodeClient, GeocodeOutcome, NotFoundReason, RetryPolicy};
pub use nominatim::NominatimGeocoder;
pub use rate_limiter::{RateLimiter, RateLimiterState};

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::models::AddressComponents;

/// Errors from a single geocoding attempt. All of them are retried.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// Transport failure (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider answered with a non-success status.
    #[error("Provider returned HTTP {0}")]
    Status(reqwest::StatusCode),

    /// Response or query could not be interpreted.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },
}

/// A reverse-geocoding capability keyed by a `"lat,lon"` string.
#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    /// `Ok(None)` means the provider answered but has no address for the point.
    async fn reverse(&self, coordinate: &str) -> Result<Option<AddressComponents>, GeocodeError>;
}

#[async_trait]
impl<T: ReverseGeocoder + ?Sized> ReverseGeocoder for Arc<T> {
    async fn reverse(&self, coordinate: &str) -> Result<Option<AddressComponents>, GeocodeError> {
        (**self).reverse(coordinate).await
    }
}
