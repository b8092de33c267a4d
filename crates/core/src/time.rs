//! Timestamp parsing and query time windows.

use crate::error::{Error, Result};
use crate::types::IntervalTime;
use chrono::{Duration, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// Timestamp formats accepted from callers. The first is the market operator's.
const ACCEPTED_FORMATS: [&str; 2] = ["%Y/%m/%d %H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// Canonical storage format; sorts lexically in time order.
pub const STORAGE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse a caller-supplied timestamp, naming `argument` on failure.
pub fn parse_timestamp(text: &str, argument: &'static str) -> Result<IntervalTime> {
    ACCEPTED_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text.trim(), fmt).ok())
        .ok_or_else(|| {
            Error::invalid_argument(
                argument,
                format!("'{text}' is not formatted as YYYY/MM/DD HH:MM:SS"),
            )
        })
}

/// Format a timestamp for storage.
#[inline]
pub fn format_timestamp(ts: IntervalTime) -> String {
    ts.format(STORAGE_FORMAT).to_string()
}

/// Does the interval end exactly on the hour?
#[inline]
pub fn is_hour_aligned(ts: IntervalTime) -> bool {
    ts.minute() == 0
}

/// Half-open query window `(start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    start: IntervalTime,
    end: IntervalTime,
}

impl TimeWindow {
    /// Create a window. Fails unless `start < end`.
    pub fn new(start: IntervalTime, end: IntervalTime) -> Result<Self> {
        if start >= end {
            return Err(Error::invalid_argument(
                "end_time",
                format!("end time {end} must be after start time {start}"),
            ));
        }
        Ok(Self { start, end })
    }

    /// Parse both ends of a window from caller text.
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        let start = parse_timestamp(start, "start_time")?;
        let end = parse_timestamp(end, "end_time")?;
        Self::new(start, end)
    }

    /// Exclusive lower bound.
    pub fn start(&self) -> IntervalTime {
        self.start
    }

    /// Inclusive upper bound.
    pub fn end(&self) -> IntervalTime {
        self.end
    }

    /// Is `ts` inside `(start, end]`?
    #[inline]
    pub fn contains(&self, ts: IntervalTime) -> bool {
        ts > self.start && ts <= self.end
    }

    /// The same window with its end pushed out by `minutes`.
    pub fn extend_end(&self, minutes: i64) -> Self {
        Self {
            start: self.start,
            end: self.end + Duration::minutes(minutes),
        }
    }
}
