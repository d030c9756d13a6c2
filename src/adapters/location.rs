//! Device location
//!
//! Location is best effort: a missing provider, an error or a timeout all
//! degrade to a fixed fallback coordinate instead of failing the forecast.

use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use super::LocationProvider;
use crate::error::ForecastError;
use crate::types::{Coordinates, Sourced};

/// A location known up front (configuration, CLI flags)
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation(pub Coordinates);

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn locate(&self) -> Result<Coordinates, ForecastError> {
        Ok(self.0)
    }
}

/// No location support on this device
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLocation;

#[async_trait]
impl LocationProvider for NoLocation {
    async fn locate(&self) -> Result<Coordinates, ForecastError> {
        Err(ForecastError::Unavailable(
            "geolocation not supported".to_string(),
        ))
    }
}

/// Read the device location within `limit`, or fall back
pub async fn locate_or_fallback(
    provider: &dyn LocationProvider,
    limit: Duration,
    fallback: Coordinates,
) -> Sourced<Coordinates> {
    match tokio::time::timeout(limit, provider.locate()).await {
        Ok(Ok(coords)) => Sourced::Provided(coords),
        Ok(Err(e)) => {
            warn!(error = %e, "location unavailable, using fallback coordinates");
            Sourced::Fallback(fallback)
        }
        Err(_) => {
            warn!(
                timeout_ms = limit.as_millis() as u64,
                "location timed out, using fallback coordinates"
            );
            Sourced::Fallback(fallback)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FALLBACK_COORDINATES;

    struct SlowLocation;

    #[async_trait]
    impl LocationProvider for SlowLocation {
        async fn locate(&self) -> Result<Coordinates, ForecastError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Coordinates { lat: 0.0, lon: 0.0 })
        }
    }

    #[tokio::test]
    async fn test_provided_location() {
        let here = Coordinates { lat: 51.5, lon: -0.12 };
        let located =
            locate_or_fallback(&FixedLocation(here), Duration::from_secs(4), FALLBACK_COORDINATES)
                .await;
        assert_eq!(located, Sourced::Provided(here));
    }

    #[tokio::test]
    async fn test_unsupported_location_falls_back() {
        let located =
            locate_or_fallback(&NoLocation, Duration::from_secs(4), FALLBACK_COORDINATES).await;
        assert!(located.is_fallback());
        assert_eq!(*located.value(), FALLBACK_COORDINATES);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_falls_back() {
        let located =
            locate_or_fallback(&SlowLocation, Duration::from_secs(4), FALLBACK_COORDINATES).await;
        assert_eq!(located, Sourced::Fallback(FALLBACK_COORDINATES));
    }
}
