//! Per-hour prediction
//!
//! Each forecast hour gets its own vitals: the baseline snapshot with a little
//! symmetric jitter, nudged up (heart and respiration rate) or down (SpO2)
//! when that hour's air is bad, then scored once.

use tracing::debug;

use crate::adapters::ScoringService;
use crate::error::ForecastError;
use crate::noise::NoiseSource;
use crate::normalizer::Normalizer;
use crate::types::{HourlyResult, HourlyWeather, VitalsSnapshot};

const HEART_RATE_JITTER: f64 = 3.0;
const RESP_RATE_JITTER: f64 = 1.2;
const SPO2_JITTER: f64 = 0.5;

/// AQI above which heart and respiration rate are biased upward
pub const RATE_BIAS_AQI: u16 = 180;
const HEART_RATE_BIAS: f64 = 4.0;
const RESP_RATE_BIAS: f64 = 1.0;

/// AQI above which SpO2 is biased downward
pub const SPO2_BIAS_AQI: u16 = 200;
const SPO2_BIAS: f64 = 0.8;

/// Derive the vitals scored for one hour.
///
/// Every field of the result is clamped into its range, including the
/// provider's temperature and humidity.
pub fn jitter_vitals(
    baseline: &VitalsSnapshot,
    weather: &HourlyWeather,
    aqi: u16,
    noise: &mut dyn NoiseSource,
) -> VitalsSnapshot {
    let rate_bias = aqi > RATE_BIAS_AQI;
    let spo2_bias = aqi > SPO2_BIAS_AQI;

    let heart_rate = baseline.heart_rate
        + noise.symmetric(HEART_RATE_JITTER)
        + if rate_bias { HEART_RATE_BIAS } else { 0.0 };
    let resp_rate = baseline.resp_rate
        + noise.symmetric(RESP_RATE_JITTER)
        + if rate_bias { RESP_RATE_BIAS } else { 0.0 };
    let spo2 = baseline.spo2
        + noise.symmetric(SPO2_JITTER)
        - if spo2_bias { SPO2_BIAS } else { 0.0 };

    Normalizer::clamp(&VitalsSnapshot {
        heart_rate,
        resp_rate,
        spo2,
        temp_c: weather.temp_c,
        humidity: weather.humidity,
        aqi: f64::from(aqi),
        personal_best_peak_flow: baseline.personal_best_peak_flow,
    })
}

/// Everything needed to score one hour, with the randomness already drawn
#[derive(Debug, Clone, PartialEq)]
pub struct HourPlan {
    pub weather: HourlyWeather,
    pub aqi: u16,
    pub vitals: VitalsSnapshot,
}

impl HourPlan {
    pub fn new(
        weather: HourlyWeather,
        aqi: u16,
        baseline: &VitalsSnapshot,
        noise: &mut dyn NoiseSource,
    ) -> Self {
        let vitals = jitter_vitals(baseline, &weather, aqi, noise);
        Self {
            weather,
            aqi,
            vitals,
        }
    }
}

/// Score one planned hour
pub async fn predict_planned(
    scorer: &dyn ScoringService,
    plan: &HourPlan,
) -> Result<HourlyResult, ForecastError> {
    let prediction = scorer.predict(&plan.vitals).await?;
    debug!(
        hour = plan.weather.hour,
        zone = %prediction.zone,
        percent = prediction.peak_flow_percent,
        "hour scored"
    );

    Ok(HourlyResult {
        hour: plan.weather.hour,
        temp_c: plan.weather.temp_c,
        humidity: plan.weather.humidity,
        aqi: plan.aqi,
        zone: prediction.zone,
        peak_flow_percent: prediction.peak_flow_percent,
        predicted_peak_flow: prediction.predicted_peak_flow,
    })
}

/// Jitter the baseline for one hour and score it
pub async fn predict_hour(
    scorer: &dyn ScoringService,
    weather: HourlyWeather,
    aqi: u16,
    baseline: &VitalsSnapshot,
    noise: &mut dyn NoiseSource,
) -> Result<HourlyResult, ForecastError> {
    let plan = HourPlan::new(weather, aqi, baseline, noise);
    predict_planned(scorer, &plan).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noise::{FixedNoise, RngNoise};
    use crate::normalizer::{HEART_RATE, HUMIDITY, PERSONAL_BEST, RESP_RATE, SPO2, TEMP_C};
    use crate::types::{Prediction, Zone};
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn weather(hour: u8) -> HourlyWeather {
        HourlyWeather {
            hour,
            temp_c: 12.5,
            humidity: 64.0,
        }
    }

    struct RecordingScorer {
        seen: Mutex<Vec<VitalsSnapshot>>,
    }

    #[async_trait]
    impl ScoringService for RecordingScorer {
        async fn predict(&self, vitals: &VitalsSnapshot) -> Result<Prediction, ForecastError> {
            self.seen.lock().unwrap().push(vitals.clone());
            Ok(Prediction {
                zone: Zone::Yellow,
                peak_flow_percent: 72.0,
                predicted_peak_flow: 432.0,
                message: None,
                warning: None,
            })
        }
    }

    #[test]
    fn test_clean_air_no_bias() {
        let baseline = VitalsSnapshot::default();
        let vitals = jitter_vitals(&baseline, &weather(9), 120, &mut FixedNoise::centered());

        assert_eq!(vitals.heart_rate, baseline.heart_rate);
        assert_eq!(vitals.resp_rate, baseline.resp_rate);
        assert_eq!(vitals.spo2, baseline.spo2);
        assert_eq!(vitals.temp_c, 12.5);
        assert_eq!(vitals.humidity, 64.0);
        assert_eq!(vitals.aqi, 120.0);
    }

    #[test]
    fn test_bias_thresholds() {
        let baseline = VitalsSnapshot::default();
        let mut noise = FixedNoise::centered();

        let at_180 = jitter_vitals(&baseline, &weather(8), 180, &mut noise);
        assert_eq!(at_180.heart_rate, 85.0);

        let at_190 = jitter_vitals(&baseline, &weather(8), 190, &mut noise);
        assert_eq!(at_190.heart_rate, 89.0);
        assert_eq!(at_190.resp_rate, 19.0);
        assert_eq!(at_190.spo2, 96.0);

        let at_210 = jitter_vitals(&baseline, &weather(8), 210, &mut noise);
        assert!((at_210.spo2 - 95.2).abs() < 1e-9);
    }

    #[test]
    fn test_jitter_respects_ranges() {
        let baseline = VitalsSnapshot {
            heart_rate: 159.0,
            resp_rate: 10.2,
            spo2: 88.1,
            ..VitalsSnapshot::default()
        };
        let mut noise = RngNoise::seeded(5);
        for _ in 0..200 {
            let vitals = jitter_vitals(&baseline, &weather(0), 250, &mut noise);
            assert!(HEART_RATE.contains(vitals.heart_rate));
            assert!(RESP_RATE.contains(vitals.resp_rate));
            assert!(SPO2.contains(vitals.spo2));
        }
    }

    #[test]
    fn test_out_of_range_weather_and_best_are_clamped() {
        let baseline = VitalsSnapshot {
            personal_best_peak_flow: 0.0,
            ..VitalsSnapshot::default()
        };
        let winter = HourlyWeather {
            hour: 6,
            temp_c: -18.0,
            humidity: 2.0,
        };

        let vitals = jitter_vitals(&baseline, &winter, 90, &mut FixedNoise::centered());

        assert_eq!(vitals.temp_c, TEMP_C.min);
        assert_eq!(vitals.humidity, HUMIDITY.min);
        assert_eq!(vitals.personal_best_peak_flow, PERSONAL_BEST.min);
    }

    #[tokio::test]
    async fn test_predict_hour_merges_response() {
        let scorer = RecordingScorer {
            seen: Mutex::new(Vec::new()),
        };
        let baseline = VitalsSnapshot::default();

        let result = predict_hour(&scorer, weather(14), 95, &baseline, &mut FixedNoise::centered())
            .await
            .unwrap();

        assert_eq!(result.hour, 14);
        assert_eq!(result.aqi, 95);
        assert_eq!(result.temp_c, 12.5);
        assert_eq!(result.zone, Zone::Yellow);
        assert_eq!(result.peak_flow_percent, 72.0);
        assert_eq!(result.predicted_peak_flow, 432.0);

        let seen = scorer.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].personal_best_peak_flow, 600.0);
        assert_eq!(seen[0].aqi, 95.0);
    }
}
