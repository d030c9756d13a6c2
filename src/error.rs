//! Error types for Peakflow Flux

use thiserror::Error;

/// Errors that can occur while building forecasts or talking to collaborators
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Service returned status {code}: {body}")]
    Status { code: u16, body: String },

    #[error("Scoring failed for hour {hour}: {source}")]
    Scoring {
        hour: u8,
        #[source]
        source: Box<ForecastError>,
    },

    #[error("Forecast covers {0} distinct hours, expected 24")]
    IncompleteDay(usize),

    #[error("Collaborator unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ForecastError {
    /// Short human-readable string for a failed day forecast
    pub fn user_message(&self) -> String {
        format!("Day forecast failed: {self}")
    }
}
