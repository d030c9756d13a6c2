//! Day-part aggregation
//!
//! Collapses 24 hourly results into four fixed six-hour blocks with a worst-case
//! zone, averaged weather and inhaler guidance, plus a headline for the worst
//! hour of the day.

use crate::types::{DayBlock, DayOutlook, DaySummary, HourlyResult};
use crate::zone::worst_of;

/// A fixed, inclusive range of hours
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayPart {
    pub name: &'static str,
    pub start_hour: u8,
    pub end_hour: u8,
}

impl DayPart {
    pub fn contains(&self, hour: u8) -> bool {
        hour >= self.start_hour && hour <= self.end_hour
    }
}

/// The four day-parts, contiguous and covering hours 0-23
pub const DAY_PARTS: [DayPart; 4] = [
    DayPart {
        name: "Overnight",
        start_hour: 0,
        end_hour: 5,
    },
    DayPart {
        name: "Morning",
        start_hour: 6,
        end_hour: 11,
    },
    DayPart {
        name: "Afternoon",
        start_hour: 12,
        end_hour: 17,
    },
    DayPart {
        name: "Evening",
        start_hour: 18,
        end_hour: 23,
    },
];

/// Day-part an hour belongs to
pub fn day_part_of(hour: u8) -> Option<&'static DayPart> {
    DAY_PARTS.iter().find(|part| part.contains(hour))
}

/// Aggregate hourly results into day blocks and a worst-hour summary
pub fn aggregate(results: &[HourlyResult]) -> DayOutlook {
    DayOutlook {
        summary: summarize(results),
        blocks: DAY_PARTS.map(|part| build_block(&part, results)),
    }
}

fn build_block(part: &DayPart, results: &[HourlyResult]) -> DayBlock {
    let rows: Vec<&HourlyResult> = results.iter().filter(|r| part.contains(r.hour)).collect();
    let zone = worst_of(rows.iter().map(|r| r.zone));
    let count = rows.len().max(1) as f64;

    DayBlock {
        name: part.name.to_string(),
        start_hour: part.start_hour,
        end_hour: part.end_hour,
        zone,
        recommendation: zone.recommendation().to_string(),
        avg_temp: rows.iter().map(|r| r.temp_c).sum::<f64>() / count,
        avg_humidity: rows.iter().map(|r| r.humidity).sum::<f64>() / count,
        avg_aqi: rows.iter().map(|r| f64::from(r.aqi)).sum::<f64>() / count,
    }
}

/// Lowest peak-flow percent of the day, earliest hour on ties
fn summarize(results: &[HourlyResult]) -> Option<DaySummary> {
    let worst = results.iter().min_by(|a, b| {
        a.peak_flow_percent
            .total_cmp(&b.peak_flow_percent)
            .then(a.hour.cmp(&b.hour))
    })?;

    Some(DaySummary {
        worst: worst.clone(),
        headline: worst.zone.day_headline().to_string(),
    })
}

/// 12-hour clock label, e.g. "12 AM", "3 PM"
pub fn hour_label(hour: u8) -> String {
    let suffix = if hour % 24 >= 12 { "PM" } else { "AM" };
    let hour12 = (hour % 24 + 11) % 12 + 1;
    format!("{hour12} {suffix}")
}

impl DayBlock {
    /// e.g. "6 AM - 11 AM"
    pub fn span_label(&self) -> String {
        format!("{} - {}", hour_label(self.start_hour), hour_label(self.end_hour))
    }
}
