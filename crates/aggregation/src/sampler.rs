//! Time resolution sampling.
//!
//! Hourly resolution keeps only hour-aligned 5-minute rows. It never averages or
//! re-aggregates.

use bidstack_core::time::is_hour_aligned;
use bidstack_core::{IntervalTime, Resolution, Timestamped};

/// Downsamples natively 5-minute series.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolutionSampler;

impl ResolutionSampler {
    /// Whether a row at this interval survives sampling.
    #[inline]
    pub fn retains(resolution: Resolution, interval: IntervalTime) -> bool {
        match resolution {
            Resolution::FiveMinute => true,
            Resolution::Hourly => is_hour_aligned(interval),
        }
    }

    /// Filter a series to the requested resolution.
    pub fn sample<T: Timestamped>(rows: Vec<T>, resolution: Resolution) -> Vec<T> {
        match resolution {
            Resolution::FiveMinute => rows,
            Resolution::Hourly => rows
                .into_iter()
                .filter(|row| is_hour_aligned(row.interval()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bidstack_core::AggregateRow;
    use chrono::{Duration, NaiveDate};

    fn series() -> Vec<AggregateRow> {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(0, 5, 0)
            .unwrap();
        (0..36)
            .map(|i| AggregateRow {
                interval: start + Duration::minutes(5 * i),
                key: None,
                value: i as f64,
            })
            .collect()
    }

    #[test]
    fn test_five_minute_is_identity() {
        let rows = series();
        assert_eq!(ResolutionSampler::sample(rows.clone(), Resolution::FiveMinute), rows);
    }

    #[test]
    fn test_hourly_is_a_pure_filter() {
        let rows = series();
        let hourly = ResolutionSampler::sample(rows.clone(), Resolution::Hourly);

        // 01:00, 02:00 and 03:00
        assert_eq!(hourly.len(), 3);
        for row in &hourly {
            assert!(is_hour_aligned(row.interval));
            let original = rows.iter().find(|r| r.interval == row.interval).unwrap();
            assert_eq!(original.value, row.value);
        }
    }

    #[test]
    fn test_retains() {
        let on_hour = NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(3, 0, 0)
            .unwrap();
        assert!(ResolutionSampler::retains(Resolution::Hourly, on_hour));
        assert!(!ResolutionSampler::retains(
            Resolution::Hourly,
            on_hour + Duration::minutes(5)
        ));
        assert!(ResolutionSampler::retains(
            Resolution::FiveMinute,
            on_hour + Duration::minutes(5)
        ));
    }
}
