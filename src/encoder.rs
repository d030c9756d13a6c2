//! Forecast encoding
//!
//! This module encodes a finished day forecast into a self-describing JSON
//! payload: producer metadata, location provenance, the 24 hourly results,
//! the four day blocks and the worst-hour summary.

use crate::blocks::aggregate;
use crate::error::ForecastError;
use crate::pipeline::{order_hours, Generation};
use crate::types::{DayBlock, DayForecast, DaySummary, HourlyResult};
use crate::{FLUX_VERSION, PRODUCER_NAME};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current forecast payload schema version
pub const FORECAST_SCHEMA_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadLocation {
    pub lat: f64,
    pub lon: f64,
    /// "provided" or "fallback"
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadQuality {
    /// Hours filled from ambient values
    pub padded_hours: Vec<u8>,
    /// Share of hours backed by provider weather (0-1)
    pub weather_coverage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPayload {
    pub schema_version: String,
    pub producer: PayloadProducer,
    pub generated_at_utc: String,
    pub location: PayloadLocation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation: Option<u64>,
    pub quality: PayloadQuality,
    pub aqi_curve: Vec<u16>,
    pub hours: Vec<HourlyResult>,
    pub blocks: Vec<DayBlock>,
    pub summary: Option<DaySummary>,
}

/// Encoder for forecast payloads
pub struct ForecastEncoder {
    instance_id: String,
}

impl Default for ForecastEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ForecastEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    /// Encode a forecast; rejects forecasts that do not cover the whole day
    pub fn encode(
        &self,
        forecast: &DayForecast,
        generation: Option<Generation>,
    ) -> Result<ForecastPayload, ForecastError> {
        let hours = order_hours(forecast.hours.clone())?;
        let outlook = aggregate(&hours);
        let coords = forecast.location.value();
        let padded = forecast.padded_hours.len().min(hours.len());

        Ok(ForecastPayload {
            schema_version: FORECAST_SCHEMA_VERSION.to_string(),
            producer: PayloadProducer {
                name: PRODUCER_NAME.to_string(),
                version: FLUX_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            generated_at_utc: Utc::now().to_rfc3339(),
            location: PayloadLocation {
                lat: coords.lat,
                lon: coords.lon,
                source: forecast.location.source_str().to_string(),
            },
            generation: generation.map(|g| g.value()),
            quality: PayloadQuality {
                padded_hours: forecast.padded_hours.clone(),
                weather_coverage: (hours.len() - padded) as f64 / hours.len() as f64,
            },
            aqi_curve: forecast.aqi_curve.values().to_vec(),
            hours,
            blocks: outlook.blocks.to_vec(),
            summary: outlook.summary,
        })
    }

    /// Encode to JSON string
    pub fn encode_to_json(
        &self,
        forecast: &DayForecast,
        generation: Option<Generation>,
    ) -> Result<String, ForecastError> {
        let payload = self.encode(forecast, generation)?;
        Ok(serde_json::to_string_pretty(&payload)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ForecastBoard;
    use crate::types::{AqiCurve, Coordinates, Sourced, Zone, FALLBACK_COORDINATES};
    use pretty_assertions::assert_eq;

    fn make_test_forecast() -> DayForecast {
        let hours = (0..24u8)
            .rev()
            .map(|hour| {
                let percent = if hour == 17 { 62.0 } else { 88.0 };
                HourlyResult {
                    hour,
                    temp_c: 9.0,
                    humidity: 71.0,
                    aqi: 120,
                    zone: crate::zone::classify(percent),
                    peak_flow_percent: percent,
                    predicted_peak_flow: percent * 6.0,
                }
            })
            .collect();

        DayForecast {
            location: Sourced::Fallback(FALLBACK_COORDINATES),
            aqi_curve: AqiCurve::new([120; 24]),
            padded_hours: vec![20, 21, 22, 23],
            hours,
        }
    }

    #[test]
    fn test_encode_forecast_payload() {
        let mut board = ForecastBoard::new();
        let generation = board.begin();
        let encoder = ForecastEncoder::with_instance_id("test-instance".to_string());
        let payload = encoder
            .encode(&make_test_forecast(), Some(generation))
            .unwrap();

        assert_eq!(payload.schema_version, FORECAST_SCHEMA_VERSION);
        assert_eq!(payload.producer.name, PRODUCER_NAME);
        assert_eq!(payload.producer.version, FLUX_VERSION);
        assert_eq!(payload.producer.instance_id, "test-instance");
        assert_eq!(payload.generation, Some(1));

        assert_eq!(payload.location.source, "fallback");
        assert_eq!(payload.location.lat, 39.9612);

        // Hours come out ascending even when stored out of order
        let order: Vec<u8> = payload.hours.iter().map(|h| h.hour).collect();
        assert_eq!(order, (0..24).collect::<Vec<u8>>());

        assert_eq!(payload.blocks.len(), 4);
        assert_eq!(payload.blocks[2].zone, Zone::Yellow);
        assert_eq!(payload.summary.as_ref().unwrap().worst.hour, 17);

        assert_eq!(payload.quality.padded_hours, vec![20, 21, 22, 23]);
        assert!((payload.quality.weather_coverage - 20.0 / 24.0).abs() < 1e-9);
    }

    #[test]
    fn test_encode_rejects_partial_day() {
        let mut forecast = make_test_forecast();
        forecast.hours.truncate(20);
        forecast.location = Sourced::Provided(Coordinates { lat: 1.0, lon: 2.0 });

        let err = ForecastEncoder::new().encode(&forecast, None).unwrap_err();
        assert!(matches!(err, ForecastError::IncompleteDay(20)));
    }

    #[test]
    fn test_encode_to_json() {
        let encoder = ForecastEncoder::new();
        let json = encoder.encode_to_json(&make_test_forecast(), None).unwrap();

        // Verify it's valid JSON
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(parsed.get("schema_version").is_some());
        assert!(parsed.get("producer").is_some());
        assert!(parsed.get("generated_at_utc").is_some());
        assert!(parsed.get("generation").is_none());
        assert_eq!(parsed["hours"].as_array().unwrap().len(), 24);
        assert_eq!(parsed["hours"][0]["peakFlowPercent"], 88.0);
        assert_eq!(parsed["blocks"][0]["name"], "Overnight");
    }
}
