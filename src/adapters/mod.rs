//! Collaborator adapters
//!
//! This module defines the boundaries to the outside world (weather provider,
//! scoring service, history service, device location) and their HTTP-backed
//! implementations.

mod location;
mod open_meteo;
mod scoring;

pub use location::{locate_or_fallback, FixedLocation, NoLocation};
pub use open_meteo::{parse_hourly, OpenMeteoClient, DEFAULT_BASE_URL as OPEN_METEO_BASE_URL};
pub use scoring::{decode_history, decode_prediction, HttpScoringClient};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ForecastError;
use crate::types::{Coordinates, HistoryEntry, HourlyWeather, Prediction, VitalsSnapshot};

/// Hourly weather for the current day at a location
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// At most 24 entries, ascending by hour. No retries.
    async fn hourly_weather(
        &self,
        location: Coordinates,
    ) -> Result<Vec<HourlyWeather>, ForecastError>;
}

/// Remote peak-flow scoring model
#[async_trait]
pub trait ScoringService: Send + Sync {
    async fn predict(&self, vitals: &VitalsSnapshot) -> Result<Prediction, ForecastError>;
}

/// Read-only access to past scoring results
#[async_trait]
pub trait HistoryService: Send + Sync {
    /// Most recent results first
    async fn history(&self, limit: usize) -> Result<Vec<HistoryEntry>, ForecastError>;
}

/// Best-effort device location
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn locate(&self) -> Result<Coordinates, ForecastError>;
}

/// Lenient numeric read: JSON numbers and numeric strings
fn json_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
