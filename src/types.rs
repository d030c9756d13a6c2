//! Core types for the Peakflow Flux pipeline
//!
//! This module defines the data structures that flow through the forecast
//! pipeline: vitals snapshots, hourly weather, the synthetic AQI curve, per-hour
//! results, day blocks and the collaborator wire shapes.

use serde::{Deserialize, Serialize};

/// Hours in a forecast day
pub const HOURS_PER_DAY: usize = 24;

/// Respiratory risk zone, ordered by severity (green < yellow < red)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Zone {
    Green,
    Yellow,
    Red,
}

impl Zone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Zone::Green => "green",
            Zone::Yellow => "yellow",
            Zone::Red => "red",
        }
    }

    /// Parse a wire zone name, case-insensitive
    pub fn parse(raw: &str) -> Option<Zone> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "green" => Some(Zone::Green),
            "yellow" => Some(Zone::Yellow),
            "red" => Some(Zone::Red),
            _ => None,
        }
    }
}

impl std::fmt::Display for Zone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// One scoring cycle's vitals and environment, the scoring request body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VitalsSnapshot {
    /// Heart rate (bpm)
    pub heart_rate: f64,
    /// Respiration rate (breaths per minute)
    pub resp_rate: f64,
    /// Oxygen saturation (percentage)
    pub spo2: f64,
    /// Ambient temperature (celsius)
    pub temp_c: f64,
    /// Relative humidity (percentage)
    pub humidity: f64,
    /// Air quality index
    pub aqi: f64,
    /// Personal-best peak flow (L/min)
    pub personal_best_peak_flow: f64,
}

impl Default for VitalsSnapshot {
    fn default() -> Self {
        Self {
            heart_rate: 85.0,
            resp_rate: 18.0,
            spo2: 96.0,
            temp_c: 10.0,
            humidity: 70.0,
            aqi: 110.0,
            personal_best_peak_flow: 600.0,
        }
    }
}

/// A single editable field of a [`VitalsSnapshot`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VitalField {
    HeartRate,
    RespRate,
    Spo2,
    TempC,
    Humidity,
    Aqi,
    PersonalBestPeakFlow,
}

impl VitalField {
    /// Parse a field name: snake_case or a short alias (`hr`, `rr`, `temp`, `best`)
    pub fn parse(raw: &str) -> Option<VitalField> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "heart_rate" | "hr" => Some(VitalField::HeartRate),
            "resp_rate" | "rr" => Some(VitalField::RespRate),
            "spo2" => Some(VitalField::Spo2),
            "temp_c" | "temp" => Some(VitalField::TempC),
            "humidity" => Some(VitalField::Humidity),
            "aqi" => Some(VitalField::Aqi),
            "personal_best_peak_flow" | "personal_best" | "best" => {
                Some(VitalField::PersonalBestPeakFlow)
            }
            _ => None,
        }
    }
}

impl VitalsSnapshot {
    pub fn get(&self, field: VitalField) -> f64 {
        match field {
            VitalField::HeartRate => self.heart_rate,
            VitalField::RespRate => self.resp_rate,
            VitalField::Spo2 => self.spo2,
            VitalField::TempC => self.temp_c,
            VitalField::Humidity => self.humidity,
            VitalField::Aqi => self.aqi,
            VitalField::PersonalBestPeakFlow => self.personal_best_peak_flow,
        }
    }

    pub fn set(&mut self, field: VitalField, value: f64) {
        match field {
            VitalField::HeartRate => self.heart_rate = value,
            VitalField::RespRate => self.resp_rate = value,
            VitalField::Spo2 => self.spo2 = value,
            VitalField::TempC => self.temp_c = value,
            VitalField::Humidity => self.humidity = value,
            VitalField::Aqi => self.aqi = value,
            VitalField::PersonalBestPeakFlow => self.personal_best_peak_flow = value,
        }
    }
}

/// Hourly temperature and humidity from the weather provider
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlyWeather {
    /// Local hour of day (0-23)
    pub hour: u8,
    /// Temperature (celsius)
    pub temp_c: f64,
    /// Relative humidity (percentage)
    pub humidity: f64,
}

/// Ambient values used to synthesize hours the weather provider did not return
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ambient {
    pub temp_c: f64,
    pub humidity: f64,
}

impl From<&VitalsSnapshot> for Ambient {
    fn from(vitals: &VitalsSnapshot) -> Self {
        Self {
            temp_c: vitals.temp_c,
            humidity: vitals.humidity,
        }
    }
}

/// 24 hourly AQI values, indexed by hour, each in [0, 300]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AqiCurve([u16; HOURS_PER_DAY]);

impl AqiCurve {
    pub fn new(values: [u16; HOURS_PER_DAY]) -> Self {
        Self(values)
    }

    /// AQI for an hour; hours past 23 wrap onto the day
    pub fn at(&self, hour: u8) -> u16 {
        self.0[hour as usize % HOURS_PER_DAY]
    }

    pub fn values(&self) -> &[u16; HOURS_PER_DAY] {
        &self.0
    }
}

/// One hour of the day forecast: weather, AQI and the scoring response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlyResult {
    pub hour: u8,
    pub temp_c: f64,
    pub humidity: f64,
    pub aqi: u16,
    pub zone: Zone,
    pub peak_flow_percent: f64,
    pub predicted_peak_flow: f64,
}

/// Aggregated guidance for one fixed day-part
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayBlock {
    pub name: String,
    pub start_hour: u8,
    pub end_hour: u8,
    /// Worst zone of any hour in the block
    pub zone: Zone,
    pub recommendation: String,
    pub avg_temp: f64,
    pub avg_humidity: f64,
    pub avg_aqi: f64,
}

/// Worst hour of the day and its headline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySummary {
    pub worst: HourlyResult,
    pub headline: String,
}

/// Aggregator output: headline plus the four day-parts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayOutlook {
    pub summary: Option<DaySummary>,
    pub blocks: [DayBlock; 4],
}

/// Scoring service response for one vitals snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub zone: Zone,
    pub peak_flow_percent: f64,
    pub predicted_peak_flow: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// One stored scoring result from the history service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// ISO-8601 timestamp of the scoring call; empty when the service omits it
    #[serde(default)]
    pub ts: String,
    #[serde(default)]
    pub predicted_peak_flow: f64,
    #[serde(default)]
    pub peak_flow_percent: f64,
    pub zone: Zone,
}

/// Geographic coordinates (decimal degrees)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// Columbus, Ohio; used when no device location is available
pub const FALLBACK_COORDINATES: Coordinates = Coordinates {
    lat: 39.9612,
    lon: -82.9988,
};

/// Result of a best-effort collaborator read: the real value or a defined fallback
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", content = "value", rename_all = "snake_case")]
pub enum Sourced<T> {
    Provided(T),
    Fallback(T),
}

impl<T> Sourced<T> {
    pub fn value(&self) -> &T {
        match self {
            Sourced::Provided(v) | Sourced::Fallback(v) => v,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            Sourced::Provided(v) | Sourced::Fallback(v) => v,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Sourced::Fallback(_))
    }

    pub fn source_str(&self) -> &'static str {
        match self {
            Sourced::Provided(_) => "provided",
            Sourced::Fallback(_) => "fallback",
        }
    }
}

/// A complete 24-hour forecast build
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayForecast {
    pub location: Sourced<Coordinates>,
    pub aqi_curve: AqiCurve,
    /// Hours synthesized from ambient values because the provider omitted them
    pub padded_hours: Vec<u8>,
    /// Exactly 24 results, ascending by hour
    pub hours: Vec<HourlyResult>,
}
