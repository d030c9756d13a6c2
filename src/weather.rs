//! Hourly weather padding
//!
//! The weather provider may return fewer than 24 hours (or none at all when
//! the fetch fails). Downstream stages index by hour, so the day is always
//! completed here with the caller's ambient readings.

use crate::types::{Ambient, HourlyWeather, HOURS_PER_DAY};

/// A full day of hourly weather
#[derive(Debug, Clone, PartialEq)]
pub struct PaddedDay {
    /// Exactly 24 entries, hour 0 through 23
    pub hours: Vec<HourlyWeather>,
    /// Hours that were synthesized from the ambient fallback
    pub padded: Vec<u8>,
}

/// Complete a partial provider response to 24 entries.
///
/// Out-of-range hours are dropped, duplicate hours keep the first entry, and
/// every missing hour is filled with `ambient`.
pub fn pad_to_day(rows: &[HourlyWeather], ambient: Ambient) -> PaddedDay {
    let mut slots: [Option<HourlyWeather>; HOURS_PER_DAY] = [None; HOURS_PER_DAY];

    for row in rows {
        let idx = row.hour as usize;
        if idx < HOURS_PER_DAY && slots[idx].is_none() {
            slots[idx] = Some(*row);
        }
    }

    let mut padded = Vec::new();
    let hours = slots
        .iter()
        .enumerate()
        .map(|(idx, slot)| {
            slot.unwrap_or_else(|| {
                padded.push(idx as u8);
                HourlyWeather {
                    hour: idx as u8,
                    temp_c: ambient.temp_c,
                    humidity: ambient.humidity,
                }
            })
        })
        .collect();

    PaddedDay { hours, padded }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ambient() -> Ambient {
        Ambient {
            temp_c: 10.0,
            humidity: 70.0,
        }
    }

    #[test]
    fn test_pads_ten_hours_to_full_day() {
        let rows: Vec<HourlyWeather> = (0..10u8)
            .map(|h| HourlyWeather {
                hour: h,
                temp_c: 15.0 + h as f64,
                humidity: 50.0,
            })
            .collect();

        let day = pad_to_day(&rows, ambient());

        assert_eq!(day.hours.len(), 24);
        for (idx, entry) in day.hours.iter().enumerate() {
            assert_eq!(entry.hour as usize, idx);
        }
        for entry in &day.hours[10..] {
            assert_eq!(entry.temp_c, 10.0);
            assert_eq!(entry.humidity, 70.0);
        }
        assert_eq!(day.hours[3].temp_c, 18.0);
        assert_eq!(day.padded, (10..24u8).collect::<Vec<_>>());
    }

    #[test]
    fn test_empty_response_is_all_ambient() {
        let day = pad_to_day(&[], ambient());
        assert_eq!(day.hours.len(), 24);
        assert_eq!(day.padded.len(), 24);
    }

    #[test]
    fn test_gaps_and_duplicates() {
        let rows = vec![
            HourlyWeather {
                hour: 5,
                temp_c: 1.0,
                humidity: 1.0,
            },
            HourlyWeather {
                hour: 5,
                temp_c: 2.0,
                humidity: 2.0,
            },
            HourlyWeather {
                hour: 30,
                temp_c: 3.0,
                humidity: 3.0,
            },
            HourlyWeather {
                hour: 23,
                temp_c: 4.0,
                humidity: 4.0,
            },
        ];
        let day = pad_to_day(&rows, ambient());

        assert_eq!(day.hours.len(), 24);
        assert_eq!(day.hours[5].temp_c, 1.0);
        assert_eq!(day.hours[23].temp_c, 4.0);
        assert_eq!(day.padded.len(), 22);
        assert!(!day.padded.contains(&5));
    }
}
