//! Zone classification
//!
//! Maps percent-of-personal-best peak flow onto the green/yellow/red action
//! plan zones and carries the guidance text attached to each zone.

use crate::types::Zone;

/// Lower bound (inclusive) of the green zone
pub const GREEN_THRESHOLD: f64 = 80.0;

/// Lower bound (inclusive) of the yellow zone
pub const YELLOW_THRESHOLD: f64 = 50.0;

/// Upper clamp applied to percent-of-best
pub const MAX_PERCENT_OF_BEST: f64 = 150.0;

/// Classify a percent-of-best value. NaN lands in red.
pub fn classify(percent: f64) -> Zone {
    if percent >= GREEN_THRESHOLD {
        Zone::Green
    } else if percent >= YELLOW_THRESHOLD {
        Zone::Yellow
    } else {
        Zone::Red
    }
}

/// Most severe zone present, green for an empty input
pub fn worst_of<I>(zones: I) -> Zone
where
    I: IntoIterator<Item = Zone>,
{
    zones.into_iter().max().unwrap_or(Zone::Green)
}

/// Predicted peak flow as a percentage of personal best, clamped to [0, 150]
pub fn percent_of_best(predicted: f64, personal_best: f64) -> Option<f64> {
    if personal_best <= 0.0 || !personal_best.is_finite() {
        return None;
    }
    Some(((predicted / personal_best) * 100.0).clamp(0.0, MAX_PERCENT_OF_BEST))
}

impl Zone {
    /// Headline for the live view
    pub fn message(&self) -> &'static str {
        match self {
            Zone::Green => "You can breathe easy!",
            Zone::Yellow => "You may be at moderate risk of an asthma attack",
            Zone::Red => "High risk, follow your action plan",
        }
    }

    /// Inhaler guidance for a day block
    pub fn recommendation(&self) -> &'static str {
        match self {
            Zone::Green => "normal routine",
            Zone::Yellow => "keep inhaler close",
            Zone::Red => "keep inhaler close, avoid triggers",
        }
    }

    /// Day-level headline keyed by the worst hour's zone
    pub fn day_headline(&self) -> &'static str {
        match self {
            Zone::Green => "Low risk today. Still keep your inhaler like normal.",
            Zone::Yellow => "Some risk today. Keep inhaler nearby during the risky hours.",
            Zone::Red => "Highest risk today. Keep inhaler close and follow your plan.",
        }
    }
}
