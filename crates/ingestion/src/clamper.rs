//! Availability clamping of bid volumes.
//!
//! A unit's bands are stacked in band-number order (not price order). Once the
//! cumulative offered volume reaches the unit's availability, later bands are
//! truncated so the adjusted stack never exceeds availability.
//!
//! Output is ordered by interval, unit and band.

use bidstack_core::{AdjustedBidRecord, AvailabilityRecord, BidRecord, IntervalTime};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Clamps stacked bids against per-interval unit availability.
#[derive(Debug, Clone, Default)]
pub struct AvailabilityClamper;

impl AvailabilityClamper {
    pub fn new() -> Self {
        Self
    }

    /// Clamp bids, returning them ordered by interval, unit and band.
    ///
    /// Bids for a unit/interval with no availability record are carried through unclamped.
    pub fn clamp(&self, bids: &[BidRecord], availability: &[AvailabilityRecord]) -> Vec<AdjustedBidRecord> {
        let avail: HashMap<(IntervalTime, &str), f64> = availability
            .iter()
            .map(|a| ((a.interval, a.unit_id.as_str()), a.availability))
            .collect();

        let mut groups: BTreeMap<(IntervalTime, &str), Vec<&BidRecord>> = BTreeMap::new();
        for bid in bids {
            groups
                .entry((bid.interval, bid.unit_id.as_str()))
                .or_default()
                .push(bid);
        }

        let mut out = Vec::with_capacity(bids.len());
        let mut unclamped_groups = 0usize;

        for (key, mut group) in groups {
            group.sort_by_key(|b| b.band);
            match avail.get(&key) {
                Some(&availability) => {
                    let mut cumulative = 0.0;
                    for bid in group {
                        cumulative += bid.offered_volume;
                        let adjusted = clamp_band(bid.offered_volume, cumulative, availability);
                        out.push(AdjustedBidRecord {
                            adjusted_volume: adjusted,
                            ..AdjustedBidRecord::unclamped(bid.clone())
                        });
                    }
                }
                None => {
                    unclamped_groups += 1;
                    out.extend(group.into_iter().cloned().map(AdjustedBidRecord::unclamped));
                }
            }
        }

        debug!(bids = out.len(), unclamped_groups, "clamped bids to availability");
        out
    }
}

/// Volume of one band left after clamping.
///
/// `cumulative` includes this band's own volume.
#[inline]
pub fn clamp_band(offered: f64, cumulative: f64, availability: f64) -> f64 {
    let headroom = (availability - cumulative) + offered;
    let headroom = if headroom < 0.0 { 0.0 } else { headroom };
    offered.min(headroom)
}
