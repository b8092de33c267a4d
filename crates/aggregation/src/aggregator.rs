//! Grouping and reduction.
//!
//! Observations are grouped by interval, optionally crossed with a secondary key,
//! and reduced to a sum or a weighted mean. Unit predicates are resolved to a set
//! of unit ids before any reduction takes place.

use bidstack_core::{AggregateRow, IntervalTime, Timestamped, UnitInfo, UnitSelection};
use std::collections::{BTreeMap, HashSet};

/// A single value to reduce.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub interval: IntervalTime,
    /// Secondary grouping key, e.g. a price bin name.
    pub key: Option<String>,
    pub value: f64,
    /// Weight for [`Reducer::WeightedMean`]; ignored when summing.
    pub weight: f64,
}

impl Observation {
    pub fn new(interval: IntervalTime, key: Option<String>, value: f64) -> Self {
        Self {
            interval,
            key,
            value,
            weight: 1.0,
        }
    }

    pub fn weighted(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }
}

impl Timestamped for Observation {
    fn interval(&self) -> IntervalTime {
        self.interval
    }
}

/// Reduction applied to each group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reducer {
    /// Sum of values.
    Sum,
    /// `Σ(value × weight) / Σ(weight)`. Groups with zero total weight produce no row.
    WeightedMean,
}

#[derive(Debug, Default, Clone, Copy)]
struct Accumulator {
    weighted_sum: f64,
    weight: f64,
}

/// Group observations by (interval, key) and reduce.
///
/// Values within a group are accumulated in input order. Rows come out sorted by
/// interval, then key.
pub fn aggregate<I>(observations: I, reducer: Reducer) -> Vec<AggregateRow>
where
    I: IntoIterator<Item = Observation>,
{
    let mut groups: BTreeMap<(IntervalTime, Option<String>), Accumulator> = BTreeMap::new();

    for obs in observations {
        let acc = groups.entry((obs.interval, obs.key)).or_default();
        match reducer {
            Reducer::Sum => acc.weighted_sum += obs.value,
            Reducer::WeightedMean => {
                acc.weighted_sum += obs.value * obs.weight;
                acc.weight += obs.weight;
            }
        }
    }

    groups
        .into_iter()
        .filter_map(|((interval, key), acc)| {
            let value = match reducer {
                Reducer::Sum => acc.weighted_sum,
                Reducer::WeightedMean if acc.weight == 0.0 => return None,
                Reducer::WeightedMean => acc.weighted_sum / acc.weight,
            };
            Some(AggregateRow {
                interval,
                key,
                value,
            })
        })
        .collect()
}

/// Resolve a unit selection against the unit reference table.
///
/// Region selections are the AND of region membership, dispatch direction and
/// technology category; an explicit id list is taken as is.
pub fn selected_units(selection: &UnitSelection, units: &[UnitInfo]) -> HashSet<String> {
    match selection {
        UnitSelection::Regions {
            regions,
            direction,
            tech,
        } => units
            .iter()
            .filter(|u| regions.contains(&u.region))
            .filter(|u| u.direction == *direction)
            .filter(|u| tech.allows(&u.category))
            .map(|u| u.unit_id.clone())
            .collect(),
        UnitSelection::Units(ids) => ids.iter().cloned().collect(),
    }
}
