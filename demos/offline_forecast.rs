//! Build a day forecast without network access, using an in-process scoring model

use std::sync::Arc;

use async_trait::async_trait;
use peakflow_flux::adapters::{FixedLocation, ScoringService, WeatherProvider};
use peakflow_flux::noise::RngNoise;
use peakflow_flux::types::{Coordinates, HourlyWeather, Prediction, VitalsSnapshot};
use peakflow_flux::zone::{classify, percent_of_best};
use peakflow_flux::{ForecastEncoder, ForecastEngine, ForecastError};

/// Cool, damp morning warming into a dry afternoon; evening hours missing
struct DemoWeather;

#[async_trait]
impl WeatherProvider for DemoWeather {
    async fn hourly_weather(&self, _: Coordinates) -> Result<Vec<HourlyWeather>, ForecastError> {
        Ok((0..20u8)
            .map(|hour| {
                let warmth = (f64::from(hour) - 4.0).max(0.0);
                HourlyWeather {
                    hour,
                    temp_c: 4.0 + warmth * 0.9,
                    humidity: 85.0 - warmth * 2.5,
                }
            })
            .collect())
    }
}

/// Toy model: bad air, fast breathing and low saturation cut predicted flow
struct DemoScorer;

#[async_trait]
impl ScoringService for DemoScorer {
    async fn predict(&self, v: &VitalsSnapshot) -> Result<Prediction, ForecastError> {
        let penalty = (v.aqi / 300.0) * 0.45
            + ((v.resp_rate - 14.0).max(0.0) / 26.0) * 0.2
            + ((97.0 - v.spo2).max(0.0) / 9.0) * 0.25
            + ((v.heart_rate - 70.0).max(0.0) / 90.0) * 0.1;
        let predicted = v.personal_best_peak_flow * (1.0 - penalty).max(0.1);
        let percent = percent_of_best(predicted, v.personal_best_peak_flow).unwrap_or(0.0);
        Ok(Prediction {
            zone: classify(percent),
            peak_flow_percent: percent,
            predicted_peak_flow: predicted,
            message: None,
            warning: None,
        })
    }
}

#[tokio::main]
async fn main() {
    let here = Coordinates {
        lat: 39.9612,
        lon: -82.9988,
    };
    let engine = ForecastEngine::new(
        Arc::new(DemoWeather),
        Arc::new(DemoScorer),
        Arc::new(FixedLocation(here)),
    )
    .with_noise(Box::new(RngNoise::seeded(2024)));

    let result = engine.build(&VitalsSnapshot::default()).await;
    match result.and_then(|forecast| ForecastEncoder::new().encode_to_json(&forecast, None)) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("Error: {e}"),
    }
}
