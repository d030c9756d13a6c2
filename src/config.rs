//! Pipeline configuration
//!
//! Every field has a default, so a config file only needs the values it changes.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::adapters::OPEN_METEO_BASE_URL as DEFAULT_WEATHER_BASE_URL;
use crate::error::ForecastError;
use crate::normalizer::Normalizer;
use crate::trends::{clamp_history_limit, DEFAULT_HISTORY_LIMIT};
use crate::types::{Coordinates, VitalsSnapshot, FALLBACK_COORDINATES};

/// Local scoring service started by the API project
pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:5001";

pub const DEFAULT_GEOLOCATION_TIMEOUT_MS: u64 = 4_000;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_MONITOR_INTERVAL_MS: u64 = 4_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Scoring and history service
    pub api_base_url: String,
    /// Hourly weather provider
    pub weather_base_url: String,
    /// Used when the device location is unavailable
    pub fallback_location: Coordinates,
    pub geolocation_timeout_ms: u64,
    /// Per-request HTTP timeout
    pub request_timeout_ms: u64,
    /// Live monitor drift period
    pub monitor_interval_ms: u64,
    pub history_limit: usize,
    /// Starting vitals for the monitor and the forecast baseline
    pub baseline: VitalsSnapshot,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            weather_base_url: DEFAULT_WEATHER_BASE_URL.to_string(),
            fallback_location: FALLBACK_COORDINATES,
            geolocation_timeout_ms: DEFAULT_GEOLOCATION_TIMEOUT_MS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            monitor_interval_ms: DEFAULT_MONITOR_INTERVAL_MS,
            history_limit: DEFAULT_HISTORY_LIMIT,
            baseline: VitalsSnapshot::default(),
        }
    }
}

impl Config {
    /// Parse and validate a JSON config
    pub fn from_json(json: &str) -> Result<Self, ForecastError> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ForecastError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn to_json(&self) -> Result<String, ForecastError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject unusable values; clamp the baseline and history limit into range
    pub fn validate(mut self) -> Result<Self, ForecastError> {
        for (name, url) in [
            ("api_base_url", &self.api_base_url),
            ("weather_base_url", &self.weather_base_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ForecastError::Config(format!(
                    "{name} must be an http(s) URL, got {url:?}"
                )));
            }
        }

        for (name, ms) in [
            ("geolocation_timeout_ms", self.geolocation_timeout_ms),
            ("request_timeout_ms", self.request_timeout_ms),
            ("monitor_interval_ms", self.monitor_interval_ms),
        ] {
            if ms == 0 {
                return Err(ForecastError::Config(format!("{name} must be positive")));
            }
        }

        let Coordinates { lat, lon } = self.fallback_location;
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(ForecastError::Config(format!(
                "fallback_location out of range: {lat}, {lon}"
            )));
        }

        self.history_limit = clamp_history_limit(self.history_limit);
        self.baseline = Normalizer::clamp(&self.baseline);
        Ok(self)
    }

    pub fn geolocation_timeout(&self) -> Duration {
        Duration::from_millis(self.geolocation_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn monitor_interval(&self) -> Duration {
        Duration::from_millis(self.monitor_interval_ms)
    }

    /// Shared HTTP client for every collaborator
    pub fn http_client(&self) -> Result<reqwest::Client, ForecastError> {
        Ok(reqwest::Client::builder()
            .timeout(self.request_timeout())
            .user_agent(concat!("peakflow-flux/", env!("CARGO_PKG_VERSION")))
            .build()?)
    }
}
