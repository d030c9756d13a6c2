//! Scoring and history service client
//!
//! Talks JSON over HTTP to the peak-flow scoring API:
//! - `POST /predict` with a vitals snapshot
//! - `GET /history?limit=N` for the most recent stored results

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::{json_number, HistoryService, ScoringService};
use crate::error::ForecastError;
use crate::trends::clamp_history_limit;
use crate::types::{HistoryEntry, Prediction, VitalsSnapshot, Zone};
use crate::zone::classify;

/// HTTP client for the scoring API
#[derive(Debug, Clone)]
pub struct HttpScoringClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpScoringClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn read_json(response: reqwest::Response) -> Result<Value, ForecastError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ForecastError::Status {
                code: status.as_u16(),
                body,
            });
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl ScoringService for HttpScoringClient {
    async fn predict(&self, vitals: &VitalsSnapshot) -> Result<Prediction, ForecastError> {
        let url = format!("{}/predict", self.base_url);
        debug!(heart_rate = vitals.heart_rate, aqi = vitals.aqi, "scoring vitals");

        let response = self.http.post(&url).json(vitals).send().await?;
        let body = Self::read_json(response).await?;
        Ok(decode_prediction(&body))
    }
}

#[async_trait]
impl HistoryService for HttpScoringClient {
    async fn history(&self, limit: usize) -> Result<Vec<HistoryEntry>, ForecastError> {
        let limit = clamp_history_limit(limit);
        let url = format!("{}/history?limit={}", self.base_url, limit);
        debug!(limit, "reading scoring history");

        let response = self.http.get(&url).send().await?;
        let body = Self::read_json(response).await?;
        decode_history(&body)
    }
}

/// Decode a scoring response, tolerating missing or odd fields.
///
/// Absent numbers read as zero. An absent or unknown zone is derived from the
/// percent so a partial response still classifies.
pub fn decode_prediction(body: &Value) -> Prediction {
    let peak_flow_percent = body.get("peakFlowPercent").and_then(json_number).unwrap_or(0.0);
    let predicted_peak_flow = body
        .get("predictedPeakFlow")
        .and_then(json_number)
        .unwrap_or(0.0);
    let zone = body
        .get("zone")
        .and_then(Value::as_str)
        .and_then(Zone::parse)
        .unwrap_or_else(|| classify(peak_flow_percent));

    Prediction {
        zone,
        peak_flow_percent,
        predicted_peak_flow,
        message: text(body, "message"),
        warning: text(body, "warning"),
    }
}

/// Decode a history response.
///
/// The body must be an array. Entries are decoded with the same leniency as
/// [`decode_prediction`]; non-object entries are skipped.
pub fn decode_history(body: &Value) -> Result<Vec<HistoryEntry>, ForecastError> {
    let Some(rows) = body.as_array() else {
        return Err(ForecastError::InvalidInput(
            "history response is not an array".to_string(),
        ));
    };

    let entries: Vec<HistoryEntry> = rows.iter().filter_map(decode_history_entry).collect();
    if entries.len() < rows.len() {
        debug!(skipped = rows.len() - entries.len(), "skipped malformed history entries");
    }
    Ok(entries)
}

fn decode_history_entry(row: &Value) -> Option<HistoryEntry> {
    if !row.is_object() {
        return None;
    }
    let prediction = decode_prediction(row);
    Some(HistoryEntry {
        ts: text(row, "ts").unwrap_or_default(),
        predicted_peak_flow: prediction.predicted_peak_flow,
        peak_flow_percent: prediction.peak_flow_percent,
        zone: prediction.zone,
    })
}

fn text(body: &Value, key: &str) -> Option<String> {
    body.get(key).and_then(Value::as_str).map(str::to_string)
}
