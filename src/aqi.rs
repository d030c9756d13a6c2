//! Synthetic hourly AQI
//!
//! Stand-in for a real air-quality forecast: a diurnal curve with a morning
//! rush bump, a smaller evening bump, uniform wiggle and the occasional
//! bad-air spike. A real provider can replace it behind [`AqiSource`].

use crate::noise::NoiseSource;
use crate::normalizer::Normalizer;
use crate::types::{AqiCurve, HOURS_PER_DAY};

const MORNING_CENTER: f64 = 8.0;
const MORNING_WIDTH: f64 = 3.0;
const MORNING_AMPLITUDE: f64 = 70.0;

const EVENING_CENTER: f64 = 18.0;
const EVENING_WIDTH: f64 = 3.2;
const EVENING_AMPLITUDE: f64 = 55.0;

const WIGGLE: f64 = 18.0;

const SPIKE_PROBABILITY: f64 = 0.08;
const SPIKE_MIN: f64 = 80.0;
const SPIKE_MAX: f64 = 170.0;

/// Provider of a 24-hour AQI curve around a baseline reading
pub trait AqiSource: Send + Sync {
    fn daily_curve(&self, baseline: f64, noise: &mut dyn NoiseSource) -> AqiCurve;
}

/// The synthetic diurnal generator
#[derive(Debug, Clone, Copy, Default)]
pub struct SyntheticAqi;

impl AqiSource for SyntheticAqi {
    fn daily_curve(&self, baseline: f64, noise: &mut dyn NoiseSource) -> AqiCurve {
        generate_curve(baseline, noise)
    }
}

fn bump(hour: f64, center: f64, width: f64, amplitude: f64) -> f64 {
    (-((hour - center) / width).powi(2)).exp() * amplitude
}

/// Deterministic part of the curve for an hour
pub fn diurnal_shape(hour: usize) -> f64 {
    let h = hour as f64;
    bump(h, MORNING_CENTER, MORNING_WIDTH, MORNING_AMPLITUDE)
        + bump(h, EVENING_CENTER, EVENING_WIDTH, EVENING_AMPLITUDE)
}

/// Generate a fresh curve. Every call draws new noise.
pub fn generate_curve(baseline: f64, noise: &mut dyn NoiseSource) -> AqiCurve {
    let mut values = [0u16; HOURS_PER_DAY];

    for (hour, slot) in values.iter_mut().enumerate() {
        let wiggle = noise.symmetric(WIGGLE);
        let spike = if noise.chance(SPIKE_PROBABILITY) {
            noise.uniform(SPIKE_MIN, SPIKE_MAX)
        } else {
            0.0
        };

        *slot = Normalizer::aqi_index(baseline + diurnal_shape(hour) + wiggle + spike);
    }

    AqiCurve::new(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noise::{FixedNoise, RngNoise};

    #[test]
    fn test_curve_shape_and_bounds() {
        let mut noise = RngNoise::seeded(42);
        for baseline in [0.0, 110.0, 250.0, 400.0] {
            let curve = generate_curve(baseline, &mut noise);
            assert_eq!(curve.values().len(), 24);
            assert!(curve.values().iter().all(|v| *v <= 300));
        }
    }

    #[test]
    fn test_curve_is_rerandomized() {
        let mut noise = RngNoise::seeded(9);
        let first = generate_curve(110.0, &mut noise);
        let second = generate_curve(110.0, &mut noise);
        assert_ne!(first, second);
    }

    #[test]
    fn test_morning_peak_exceeds_evening() {
        let mut noise = FixedNoise::centered();
        let curve = generate_curve(50.0, &mut noise);
        // 50 + 70 + evening tail
        assert!(curve.at(8) > curve.at(18));
        assert!(curve.at(18) > curve.at(3));
        assert_eq!(curve.at(8), 120);
    }

    #[test]
    fn test_spike_raises_every_hour() {
        let calm = generate_curve(100.0, &mut FixedNoise::centered());
        let spiky = generate_curve(100.0, &mut FixedNoise::new(0.0, true));
        for hour in 0..24u8 {
            assert!(spiky.at(hour) >= calm.at(hour));
        }
        // centred spike adds 125
        assert_eq!(spiky.at(0) - calm.at(0), 125);
    }

    #[test]
    fn test_low_baseline_clamps_at_zero() {
        let curve = generate_curve(-500.0, &mut FixedNoise::centered());
        assert!(curve.values().iter().all(|v| *v == 0));
    }
}
