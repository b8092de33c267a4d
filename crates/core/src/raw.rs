//! Raw tables as delivered by the market data collaborators.
//!
//! Offer tables are wide: one column per band. Band columns are kept by name
//! and unpivoted downstream using the explicit column lists below.

use crate::types::IntervalTime;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Volume band columns of the per-interval offer table, by band number.
pub const VOLUME_BAND_COLUMNS: [(u8, &str); 10] = [
    (1, "BANDAVAIL1"),
    (2, "BANDAVAIL2"),
    (3, "BANDAVAIL3"),
    (4, "BANDAVAIL4"),
    (5, "BANDAVAIL5"),
    (6, "BANDAVAIL6"),
    (7, "BANDAVAIL7"),
    (8, "BANDAVAIL8"),
    (9, "BANDAVAIL9"),
    (10, "BANDAVAIL10"),
];

/// Price band columns of the daily offer table, by band number.
pub const PRICE_BAND_COLUMNS: [(u8, &str); 10] = [
    (1, "PRICEBAND1"),
    (2, "PRICEBAND2"),
    (3, "PRICEBAND3"),
    (4, "PRICEBAND4"),
    (5, "PRICEBAND5"),
    (6, "PRICEBAND6"),
    (7, "PRICEBAND7"),
    (8, "PRICEBAND8"),
    (9, "PRICEBAND9"),
    (10, "PRICEBAND10"),
];

/// Named band values of one wide offer row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BandColumns(BTreeMap<String, f64>);

impl BandColumns {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill columns in band order from `values`, using `columns` for names.
    pub fn from_values(columns: &[(u8, &str)], values: &[f64]) -> Self {
        Self(
            columns
                .iter()
                .zip(values)
                .map(|(&(_, name), &v)| (name.to_string(), v))
                .collect(),
        )
    }

    pub fn get(&self, column: &str) -> Option<f64> {
        self.0.get(column).copied()
    }

    pub fn insert(&mut self, column: impl Into<String>, value: f64) {
        self.0.insert(column.into(), value);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Per-interval volume offer for one unit (BIDPEROFFER).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeOffer {
    /// Interval timestamp.
    pub interval: IntervalTime,
    /// Trading day the offer belongs to.
    pub settlement_day: NaiveDate,
    /// Unit identifier.
    pub unit_id: String,
    /// Market the offer is for, e.g. "ENERGY".
    pub bid_type: String,
    /// Maximum availability as bid (MW).
    pub max_avail: f64,
    /// As-bid ramp up rate (MW/min).
    pub ramp_up_rate: f64,
    /// As-bid ramp down rate (MW/min).
    pub ramp_down_rate: f64,
    /// Projected availability (MW).
    pub pasa_availability: f64,
    /// BANDAVAIL1..BANDAVAIL10.
    #[serde(flatten)]
    pub bands: BandColumns,
}

/// Daily price offer for one unit (BIDDAYOFFER).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceOffer {
    /// Trading day the prices apply to.
    pub settlement_day: NaiveDate,
    /// Unit identifier.
    pub unit_id: String,
    /// Market the offer is for, e.g. "ENERGY".
    pub bid_type: String,
    /// PRICEBAND1..PRICEBAND10.
    #[serde(flatten)]
    pub bands: BandColumns,
}

/// Realized dispatch telemetry for one unit and interval (DISPATCHLOAD).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealizedDispatch {
    /// Interval timestamp.
    pub interval: IntervalTime,
    /// Unit identifier.
    pub unit_id: String,
    /// Technical availability (MW).
    pub availability: f64,
    /// Dispatch target (MW).
    pub total_cleared: f64,
    /// Operating level at the start of the interval (MW).
    pub initial_output: f64,
    /// Telemetry ramp up rate (MW/h).
    pub ramp_up_rate: f64,
    /// Telemetry ramp down rate (MW/h).
    pub ramp_down_rate: f64,
}

/// Unit registration entry as published (Generators and Scheduled Loads).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawUnitInfo {
    pub unit_id: String,
    /// Region id with the market suffix, e.g. "NSW1".
    pub region: String,
    #[serde(default)]
    pub fuel_source: Option<String>,
    /// "Generator" or "Load".
    pub dispatch_type: String,
    #[serde(default)]
    pub technology: Option<String>,
    pub station_name: String,
}

/// Regional demand and price for one interval (DISPATCHREGIONSUM + DISPATCHPRICE).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRegionSample {
    pub interval: IntervalTime,
    /// Region id with the market suffix, e.g. "NSW1".
    pub region: String,
    pub total_demand: f64,
    pub price: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_columns_are_numbered_in_order() {
        for (i, (band, name)) in VOLUME_BAND_COLUMNS.iter().enumerate() {
            assert_eq!(*band as usize, i + 1);
            assert_eq!(*name, format!("BANDAVAIL{}", i + 1));
        }
        for (i, (band, name)) in PRICE_BAND_COLUMNS.iter().enumerate() {
            assert_eq!(*band as usize, i + 1);
            assert_eq!(*name, format!("PRICEBAND{}", i + 1));
        }
    }

    #[test]
    fn test_band_columns_from_values() {
        let bands = BandColumns::from_values(&VOLUME_BAND_COLUMNS, &[5.0, 6.0]);
        assert_eq!(bands.len(), 2);
        assert_eq!(bands.get("BANDAVAIL2"), Some(6.0));
        assert_eq!(bands.get("BANDAVAIL3"), None);
    }

    #[test]
    fn test_volume_offer_deserializes_flat_band_columns() {
        let json = r#"{
            "interval": "2020-01-01T01:00:00",
            "settlement_day": "2020-01-01",
            "unit_id": "A",
            "bid_type": "ENERGY",
            "max_avail": 100.0,
            "ramp_up_rate": 2.0,
            "ramp_down_rate": 3.0,
            "pasa_availability": 100.0,
            "BANDAVAIL1": 10.0,
            "BANDAVAIL10": 20.0
        }"#;
        let offer: VolumeOffer = serde_json::from_str(json).unwrap();
        assert_eq!(offer.bands.get("BANDAVAIL1"), Some(10.0));
        assert_eq!(offer.bands.get("BANDAVAIL10"), Some(20.0));
        assert_eq!(offer.bands.len(), 2);
    }
}
