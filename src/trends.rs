//! Scoring history views
//!
//! The history service returns stored results newest first. Charts want them
//! oldest first; the "latest" list wants the first few as-is.

use serde::{Deserialize, Serialize};

use crate::types::{HistoryEntry, Zone};

/// Bounds accepted by the history service
pub const MIN_HISTORY_LIMIT: usize = 1;
pub const MAX_HISTORY_LIMIT: usize = 500;

/// Entries fetched for the trends view
pub const DEFAULT_HISTORY_LIMIT: usize = 60;

/// Entries shown in the latest-results list
pub const LATEST_LIST_LEN: usize = 10;

pub fn clamp_history_limit(limit: usize) -> usize {
    limit.clamp(MIN_HISTORY_LIMIT, MAX_HISTORY_LIMIT)
}

/// One point of the peak-flow trend chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub ts: String,
    pub peak_flow_percent: f64,
}

/// Chart series, oldest first
pub fn trend_series(history: &[HistoryEntry]) -> Vec<TrendPoint> {
    history
        .iter()
        .rev()
        .map(|entry| TrendPoint {
            ts: entry.ts.clone(),
            peak_flow_percent: entry.peak_flow_percent,
        })
        .collect()
}

/// The `n` most recent entries, newest first
pub fn recent(history: &[HistoryEntry], n: usize) -> &[HistoryEntry] {
    &history[..n.min(history.len())]
}

/// "2025-03-01T08:15:42.123456" -> "2025-03-01 08:15:42"
pub fn display_ts(ts: &str) -> String {
    ts.replacen('T', " ", 1).chars().take(19).collect()
}

/// Count of entries per zone, in severity order
pub fn zone_counts(history: &[HistoryEntry]) -> [(Zone, usize); 3] {
    [Zone::Green, Zone::Yellow, Zone::Red]
        .map(|zone| (zone, history.iter().filter(|e| e.zone == zone).count()))
}
