//! Day forecast orchestration
//!
//! This module provides the public API for building a 24-hour forecast.
//! It orchestrates the full pipeline from location to ordered hourly results,
//! and tracks which build is authoritative when builds overlap.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::adapters::{
    locate_or_fallback, HttpScoringClient, LocationProvider, OpenMeteoClient, ScoringService,
    WeatherProvider,
};
use crate::aqi::{AqiSource, SyntheticAqi};
use crate::blocks::aggregate;
use crate::config::Config;
use crate::error::ForecastError;
use crate::noise::{NoiseSource, RngNoise};
use crate::normalizer::Normalizer;
use crate::predictor::{predict_planned, HourPlan};
use crate::types::{
    Ambient, Coordinates, DayForecast, DayOutlook, HourlyResult, Sourced, VitalsSnapshot,
    FALLBACK_COORDINATES, HOURS_PER_DAY,
};
use crate::weather::pad_to_day;

/// Default bound on the device location read
pub const DEFAULT_GEOLOCATION_TIMEOUT: Duration = Duration::from_secs(4);

/// Forecast builder over the weather, scoring and location collaborators.
///
/// Pipeline stages:
/// 1. Location (best effort, falls back to fixed coordinates)
/// 2. Hourly weather, padded to 24 hours with ambient readings
/// 3. Synthetic AQI curve around the baseline AQI
/// 4. 24 concurrent scoring calls, one per hour
/// 5. Reassembly in hour order
pub struct ForecastEngine {
    weather: Arc<dyn WeatherProvider>,
    scorer: Arc<dyn ScoringService>,
    location: Arc<dyn LocationProvider>,
    aqi: Box<dyn AqiSource>,
    noise: Mutex<Box<dyn NoiseSource>>,
    fallback_location: Coordinates,
    geolocation_timeout: Duration,
}

impl ForecastEngine {
    /// Create an engine with the synthetic AQI source and entropy-seeded noise
    pub fn new(
        weather: Arc<dyn WeatherProvider>,
        scorer: Arc<dyn ScoringService>,
        location: Arc<dyn LocationProvider>,
    ) -> Self {
        Self {
            weather,
            scorer,
            location,
            aqi: Box::new(SyntheticAqi),
            noise: Mutex::new(Box::new(RngNoise::from_entropy())),
            fallback_location: FALLBACK_COORDINATES,
            geolocation_timeout: DEFAULT_GEOLOCATION_TIMEOUT,
        }
    }

    /// Wire HTTP collaborators from configuration
    pub fn from_config(
        config: &Config,
        location: Arc<dyn LocationProvider>,
    ) -> Result<Self, ForecastError> {
        let http = config.http_client()?;
        let weather = OpenMeteoClient::new(http.clone(), config.weather_base_url.clone());
        let scorer = HttpScoringClient::new(http, config.api_base_url.clone());

        Ok(Self::new(Arc::new(weather), Arc::new(scorer), location)
            .with_fallback_location(config.fallback_location)
            .with_geolocation_timeout(config.geolocation_timeout()))
    }

    pub fn with_aqi_source(mut self, aqi: Box<dyn AqiSource>) -> Self {
        self.aqi = aqi;
        self
    }

    pub fn with_noise(mut self, noise: Box<dyn NoiseSource>) -> Self {
        self.noise = Mutex::new(noise);
        self
    }

    pub fn with_fallback_location(mut self, fallback: Coordinates) -> Self {
        self.fallback_location = fallback;
        self
    }

    pub fn with_geolocation_timeout(mut self, timeout: Duration) -> Self {
        self.geolocation_timeout = timeout;
        self
    }

    /// Resolve the location, then build
    pub async fn build(&self, baseline: &VitalsSnapshot) -> Result<DayForecast, ForecastError> {
        let location = locate_or_fallback(
            self.location.as_ref(),
            self.geolocation_timeout,
            self.fallback_location,
        )
        .await;
        self.build_day_forecast(location, baseline).await
    }

    /// Build a 24-hour forecast for a resolved location.
    ///
    /// `baseline` is copied and clamped at entry; later edits to the caller's
    /// snapshot do not leak into this build. Any failed hour fails the whole build.
    pub async fn build_day_forecast(
        &self,
        location: Sourced<Coordinates>,
        baseline: &VitalsSnapshot,
    ) -> Result<DayForecast, ForecastError> {
        let baseline = Normalizer::clamp(baseline);
        let coords = *location.value();
        info!(
            lat = coords.lat,
            lon = coords.lon,
            location_source = location.source_str(),
            "building day forecast"
        );

        let rows = match self.weather.hourly_weather(coords).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = %e, "weather unavailable, padding the whole day with ambient values");
                Vec::new()
            }
        };
        let day = pad_to_day(&rows, Ambient::from(&baseline));
        if !day.padded.is_empty() {
            debug!(padded = day.padded.len(), "weather padded with ambient values");
        }

        // All randomness is drawn before the fan-out so the hourly calls share no state
        let (aqi_curve, plans) = {
            let mut noise = self.noise.lock().unwrap_or_else(|p| p.into_inner());
            let curve = self.aqi.daily_curve(baseline.aqi.round(), &mut **noise);
            let plans: Vec<HourPlan> = day
                .hours
                .iter()
                .map(|w| HourPlan::new(*w, curve.at(w.hour), &baseline, &mut **noise))
                .collect();
            (curve, plans)
        };

        let scorer = self.scorer.as_ref();
        let outcomes = join_all(plans.iter().map(|plan| predict_planned(scorer, plan))).await;

        let mut hours = Vec::with_capacity(HOURS_PER_DAY);
        for (plan, outcome) in plans.iter().zip(outcomes) {
            match outcome {
                Ok(result) => hours.push(result),
                Err(e) => {
                    warn!(hour = plan.weather.hour, error = %e, "hourly scoring failed");
                    return Err(ForecastError::Scoring {
                        hour: plan.weather.hour,
                        source: Box::new(e),
                    });
                }
            }
        }

        let hours = order_hours(hours)?;
        info!(hours = hours.len(), "day forecast built");

        Ok(DayForecast {
            location,
            aqi_curve,
            padded_hours: day.padded,
            hours,
        })
    }

    /// Build under `board`, applying the result only if it is still the latest
    pub async fn refresh(
        &self,
        board: &Mutex<ForecastBoard>,
        baseline: &VitalsSnapshot,
    ) -> Applied {
        let generation = board.lock().unwrap_or_else(|p| p.into_inner()).begin();
        let result = self.build(baseline).await;
        board
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .apply(generation, result)
    }
}

/// Sort results by hour and require exactly one result per hour 0-23
pub fn order_hours(mut hours: Vec<HourlyResult>) -> Result<Vec<HourlyResult>, ForecastError> {
    hours.sort_by_key(|r| r.hour);

    let mut seen = [false; HOURS_PER_DAY];
    for r in &hours {
        if let Some(slot) = seen.get_mut(r.hour as usize) {
            *slot = true;
        }
    }
    let distinct = seen.iter().filter(|s| **s).count();

    if hours.len() != HOURS_PER_DAY || distinct != HOURS_PER_DAY {
        return Err(ForecastError::IncompleteDay(distinct));
    }
    Ok(hours)
}

/// Identifier of one forecast build, increasing with every request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Generation(u64);

impl Generation {
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// What happened to a finished build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// Latest build succeeded and replaced the visible forecast
    Current,
    /// Latest build failed; the previous forecast stays visible
    Failed,
    /// A newer build was requested meanwhile; result discarded
    Stale,
}

/// The visible forecast and the build generation that owns it
#[derive(Debug, Default)]
pub struct ForecastBoard {
    issued: u64,
    applied: Option<Generation>,
    forecast: Option<DayForecast>,
    outlook: Option<DayOutlook>,
    error: Option<String>,
}

impl ForecastBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new build; it supersedes every earlier one
    pub fn begin(&mut self) -> Generation {
        self.issued += 1;
        self.error = None;
        Generation(self.issued)
    }

    /// Apply a finished build
    pub fn apply(
        &mut self,
        generation: Generation,
        result: Result<DayForecast, ForecastError>,
    ) -> Applied {
        if generation.0 != self.issued {
            debug!(
                generation = generation.0,
                latest = self.issued,
                "discarding stale forecast build"
            );
            return Applied::Stale;
        }

        match result {
            Ok(forecast) => {
                self.outlook = Some(aggregate(&forecast.hours));
                self.forecast = Some(forecast);
                self.applied = Some(generation);
                self.error = None;
                Applied::Current
            }
            Err(e) => {
                self.error = Some(e.user_message());
                Applied::Failed
            }
        }
    }

    pub fn forecast(&self) -> Option<&DayForecast> {
        self.forecast.as_ref()
    }

    pub fn outlook(&self) -> Option<&DayOutlook> {
        self.outlook.as_ref()
    }

    /// Short message from the latest failed build
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Generation of the visible forecast
    pub fn applied_generation(&self) -> Option<Generation> {
        self.applied
    }

    pub fn latest_generation(&self) -> Option<Generation> {
        (self.issued > 0).then_some(Generation(self.issued))
    }
}
