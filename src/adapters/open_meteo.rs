//! Open-Meteo weather adapter
//!
//! Fetches a one-day hourly forecast (temperature and relative humidity) and
//! zips the provider's parallel arrays into hourly weather rows.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Timelike};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::{json_number, WeatherProvider};
use crate::error::ForecastError;
use crate::types::{Coordinates, HourlyWeather, HOURS_PER_DAY};

/// Public Open-Meteo endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.open-meteo.com";

/// Open-Meteo forecast client
#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    http: reqwest::Client,
    base_url: String,
}

impl OpenMeteoClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Client against the public endpoint
    pub fn public(http: reqwest::Client) -> Self {
        Self::new(http, DEFAULT_BASE_URL)
    }

    pub fn forecast_url(&self, location: Coordinates) -> String {
        format!(
            "{}/v1/forecast?latitude={}&longitude={}\
             &hourly=temperature_2m,relative_humidity_2m&forecast_days=1&timezone=auto",
            self.base_url, location.lat, location.lon
        )
    }
}

#[async_trait]
impl WeatherProvider for OpenMeteoClient {
    async fn hourly_weather(
        &self,
        location: Coordinates,
    ) -> Result<Vec<HourlyWeather>, ForecastError> {
        let url = self.forecast_url(location);
        debug!(%url, "fetching hourly weather");

        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ForecastError::Status {
                code: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        Ok(parse_hourly(&body))
    }
}

/// Open-Meteo response; every field may be missing
#[derive(Debug, Default, Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    hourly: Option<HourlyArrays>,
}

#[derive(Debug, Default, Deserialize)]
struct HourlyArrays {
    #[serde(default)]
    time: Vec<Value>,
    #[serde(default)]
    temperature_2m: Vec<Value>,
    #[serde(default)]
    relative_humidity_2m: Vec<Value>,
}

/// Parse a forecast body into at most 24 rows sorted by hour.
///
/// A malformed body yields no rows. Rows whose timestamp, temperature or
/// humidity is missing are skipped and left for padding.
pub fn parse_hourly(raw: &str) -> Vec<HourlyWeather> {
    let response: ForecastResponse = match serde_json::from_str(raw) {
        Ok(response) => response,
        Err(e) => {
            warn!(error = %e, "malformed weather response, treating as empty");
            return Vec::new();
        }
    };

    let hourly = response.hourly.unwrap_or_default();

    let mut rows: Vec<HourlyWeather> = hourly
        .time
        .iter()
        .take(HOURS_PER_DAY)
        .enumerate()
        .filter_map(|(i, ts)| {
            let hour = ts.as_str().and_then(hour_of_timestamp)?;
            let temp_c = hourly.temperature_2m.get(i).and_then(json_number)?;
            let humidity = hourly.relative_humidity_2m.get(i).and_then(json_number)?;
            Some(HourlyWeather {
                hour,
                temp_c,
                humidity,
            })
        })
        .collect();

    rows.sort_by_key(|row| row.hour);
    rows
}

/// Local hour of an ISO-8601 timestamp, with or without offset
fn hour_of_timestamp(ts: &str) -> Option<u8> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(ts) {
        return Some(dt.hour() as u8);
    }
    NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .map(|dt| dt.hour() as u8)
}
