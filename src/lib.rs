//! Peakflow Flux - respiratory risk forecasting from vitals, weather and air quality
//!
//! Flux turns a baseline vitals snapshot into a 24-hour peak-flow risk forecast
//! through a concurrent pipeline: location → hourly weather (padded to a full
//! day) → synthetic AQI curve → 24 parallel scoring calls → day-part blocks.
//!
//! ## Modules
//!
//! - **Day Forecast**: [`ForecastEngine`] builds the day; [`ForecastBoard`] keeps
//!   only the latest build visible
//! - **Live Monitor**: [`LiveMonitor`] drifts and scores the current snapshot,
//!   or scores manual edits

pub mod adapters;
pub mod aqi;
pub mod blocks;
pub mod config;
pub mod encoder;
pub mod error;
pub mod monitor;
pub mod noise;
pub mod normalizer;
pub mod pipeline;
pub mod predictor;
pub mod trends;
pub mod types;
pub mod weather;
pub mod zone;

pub use blocks::aggregate;
pub use config::Config;
pub use encoder::ForecastEncoder;
pub use error::ForecastError;
pub use monitor::{LiveMonitor, MonitorCommand, MonitorMode};
pub use pipeline::{Applied, ForecastBoard, ForecastEngine, Generation};
pub use types::{DayForecast, DayOutlook, Sourced, VitalsSnapshot, Zone};
pub use zone::{classify, worst_of};

/// Flux version embedded in all forecast payloads
pub const FLUX_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for forecast payloads
pub const PRODUCER_NAME: &str = "peakflow-flux";
