//! Vitals normalization
//!
//! This module keeps vitals and environment readings inside physiological and
//! environmental bounds. Out-of-range values are clamped silently, never
//! reported as errors.
//! - Per-field ranges shared by jitter, drift and manual edits
//! - Whole-snapshot clamping before every scoring call

use crate::types::{VitalField, VitalsSnapshot};

/// Inclusive numeric range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Clamp into the range; NaN collapses to the lower bound
    pub fn clamp(&self, value: f64) -> f64 {
        if value.is_nan() {
            return self.min;
        }
        value.clamp(self.min, self.max)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

pub const HEART_RATE: Range = Range::new(50.0, 160.0);
pub const RESP_RATE: Range = Range::new(10.0, 40.0);
pub const SPO2: Range = Range::new(88.0, 100.0);
pub const TEMP_C: Range = Range::new(-10.0, 40.0);
pub const HUMIDITY: Range = Range::new(5.0, 100.0);
pub const AQI: Range = Range::new(0.0, 300.0);
/// Personal best is only required to be positive; the ceiling is generous
pub const PERSONAL_BEST: Range = Range::new(1.0, 1000.0);

/// Normalizer for keeping snapshots in bounds
pub struct Normalizer;

impl Normalizer {
    /// Range for a field
    pub fn range(field: VitalField) -> Range {
        match field {
            VitalField::HeartRate => HEART_RATE,
            VitalField::RespRate => RESP_RATE,
            VitalField::Spo2 => SPO2,
            VitalField::TempC => TEMP_C,
            VitalField::Humidity => HUMIDITY,
            VitalField::Aqi => AQI,
            VitalField::PersonalBestPeakFlow => PERSONAL_BEST,
        }
    }

    /// Clamp a single field value
    pub fn clamp_field(field: VitalField, value: f64) -> f64 {
        Self::range(field).clamp(value)
    }

    /// Clamp every field of a snapshot
    pub fn clamp(snapshot: &VitalsSnapshot) -> VitalsSnapshot {
        VitalsSnapshot {
            heart_rate: HEART_RATE.clamp(snapshot.heart_rate),
            resp_rate: RESP_RATE.clamp(snapshot.resp_rate),
            spo2: SPO2.clamp(snapshot.spo2),
            temp_c: TEMP_C.clamp(snapshot.temp_c),
            humidity: HUMIDITY.clamp(snapshot.humidity),
            aqi: AQI.clamp(snapshot.aqi),
            personal_best_peak_flow: PERSONAL_BEST.clamp(snapshot.personal_best_peak_flow),
        }
    }

    /// Clamp an AQI reading and round to the integer index
    pub fn aqi_index(value: f64) -> u16 {
        AQI.clamp(value).round() as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_out_of_range_snapshot() {
        let wild = VitalsSnapshot {
            heart_rate: 220.0,
            resp_rate: 2.0,
            spo2: 101.5,
            temp_c: -40.0,
            humidity: 0.0,
            aqi: 512.0,
            personal_best_peak_flow: 600.0,
        };
        let clamped = Normalizer::clamp(&wild);

        assert_eq!(clamped.heart_rate, 160.0);
        assert_eq!(clamped.resp_rate, 10.0);
        assert_eq!(clamped.spo2, 100.0);
        assert_eq!(clamped.temp_c, -10.0);
        assert_eq!(clamped.humidity, 5.0);
        assert_eq!(clamped.aqi, 300.0);
        assert_eq!(clamped.personal_best_peak_flow, 600.0);
    }

    #[test]
    fn test_in_range_snapshot_unchanged() {
        let vitals = VitalsSnapshot::default();
        assert_eq!(Normalizer::clamp(&vitals), vitals);
    }

    #[test]
    fn test_nan_collapses_to_min() {
        assert_eq!(Normalizer::clamp_field(VitalField::Spo2, f64::NAN), 88.0);
    }

    #[test]
    fn test_aqi_index_rounding() {
        assert_eq!(Normalizer::aqi_index(110.4), 110);
        assert_eq!(Normalizer::aqi_index(110.5), 111);
        assert_eq!(Normalizer::aqi_index(-3.0), 0);
        assert_eq!(Normalizer::aqi_index(999.0), 300);
    }
}
