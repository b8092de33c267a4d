//! Per-interval dispatch constraint metrics.
//!
//! Ramp-bounded dispatch envelopes from the as-bid ramp rates (MW/min) and the
//! telemetry ramp rates (MW/h), plus the unit's final output for each interval.

use bidstack_core::raw::{RealizedDispatch, VolumeOffer};
use bidstack_core::{IntervalTime, UnitDispatchMetrics};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// As-submitted availability and ramp fields of a unit's offer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AsBidMetrics {
    pub interval: IntervalTime,
    pub unit_id: String,
    /// Maximum availability (MW).
    pub max_avail: f64,
    /// Ramp up rate (MW/min).
    pub ramp_up_rate: f64,
    /// Ramp down rate (MW/min).
    pub ramp_down_rate: f64,
    /// Projected availability (MW).
    pub pasa_availability: f64,
}

impl From<&VolumeOffer> for AsBidMetrics {
    fn from(offer: &VolumeOffer) -> Self {
        Self {
            interval: offer.interval,
            unit_id: offer.unit_id.clone(),
            max_avail: offer.max_avail,
            ramp_up_rate: offer.ramp_up_rate,
            ramp_down_rate: offer.ramp_down_rate,
            pasa_availability: offer.pasa_availability,
        }
    }
}

/// Computes [`UnitDispatchMetrics`] from as-bid and realized dispatch tables.
#[derive(Debug, Clone)]
pub struct DispatchMetricsCalculator {
    /// Dispatch interval length in minutes.
    interval_minutes: u32,
}

impl DispatchMetricsCalculator {
    pub fn new(interval_minutes: u32) -> Self {
        Self { interval_minutes }
    }

    /// Join the two sources and derive the metrics, ordered by interval then unit.
    /// Values are unclamped.
    ///
    /// Rows present in only one source are dropped, as are rows with no
    /// record one interval later for the same unit (no final output).
    pub fn compute(&self, as_bid: &[AsBidMetrics], realized: &[RealizedDispatch]) -> Vec<UnitDispatchMetrics> {
        let realized_lookup: HashMap<(IntervalTime, &str), &RealizedDispatch> = realized
            .iter()
            .map(|r| ((r.interval, r.unit_id.as_str()), r))
            .collect();

        let joined: Vec<(&AsBidMetrics, &RealizedDispatch)> = as_bid
            .iter()
            .filter_map(|b| {
                realized_lookup
                    .get(&(b.interval, b.unit_id.as_str()))
                    .map(|&r| (b, r))
            })
            .collect();

        // Operating level at the start of each joined interval
        let initial_output: HashMap<(IntervalTime, &str), f64> = joined
            .iter()
            .map(|(b, r)| ((b.interval, b.unit_id.as_str()), r.initial_output))
            .collect();

        let step = Duration::minutes(self.interval_minutes as i64);
        let minutes = self.interval_minutes as f64;
        let intervals_per_hour = 60.0 / minutes;

        let mut metrics: Vec<UnitDispatchMetrics> = joined
            .iter()
            .filter_map(|(b, r)| {
                let final_output = *initial_output.get(&(b.interval + step, b.unit_id.as_str()))?;
                Some(UnitDispatchMetrics {
                    interval: b.interval,
                    unit_id: b.unit_id.clone(),
                    availability: r.availability,
                    dispatch_target: r.total_cleared,
                    final_output,
                    as_bid_ramp_up_limit: r.initial_output + b.ramp_up_rate * minutes,
                    as_bid_ramp_down_limit: r.initial_output - b.ramp_down_rate * minutes,
                    telemetry_ramp_up_limit: r.initial_output + r.ramp_up_rate / intervals_per_hour,
                    telemetry_ramp_down_limit: r.initial_output - r.ramp_down_rate / intervals_per_hour,
                    pasa_availability: b.pasa_availability,
                    max_avail: b.max_avail,
                })
            })
            .collect();
        metrics.sort_by(|a, b| (a.interval, &a.unit_id).cmp(&(b.interval, &b.unit_id)));

        debug!(
            as_bid = as_bid.len(),
            realized = realized.len(),
            joined = joined.len(),
            complete = metrics.len(),
            "computed unit dispatch metrics"
        );
        metrics
    }
}

impl Default for DispatchMetricsCalculator {
    fn default() -> Self {
        Self::new(5)
    }
}
