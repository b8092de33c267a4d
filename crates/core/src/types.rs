//! Core data types for the bid-stack engine.

use crate::error::{Error, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Dispatch interval timestamp (market time, interval end).
pub type IntervalTime = NaiveDateTime;

/// Number of price/volume bands in a unit's offer.
pub const BAND_COUNT: u8 = 10;

/// A market region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Region {
    Qld,
    Nsw,
    Vic,
    Sa,
    Tas,
}

impl Region {
    /// Every legal region.
    pub const ALL: [Region; 5] = [Region::Qld, Region::Nsw, Region::Vic, Region::Sa, Region::Tas];

    /// Short region name, e.g. "NSW".
    pub fn as_str(self) -> &'static str {
        match self {
            Region::Qld => "QLD",
            Region::Nsw => "NSW",
            Region::Vic => "VIC",
            Region::Sa => "SA",
            Region::Tas => "TAS",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Region {
    type Err = Error;

    /// Accepts both the short name ("NSW") and the market operator's region id ("NSW1").
    fn from_str(s: &str) -> Result<Self> {
        let short = s.strip_suffix('1').unwrap_or(s);
        Region::ALL
            .into_iter()
            .find(|r| r.as_str() == short)
            .ok_or_else(|| {
                Error::invalid_argument(
                    "regions",
                    format!("'{s}' is not one of QLD, NSW, VIC, SA or TAS"),
                )
            })
    }
}

/// Whether a unit generates into or consumes from the market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DispatchDirection {
    Generator,
    Load,
}

impl DispatchDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            DispatchDirection::Generator => "Generator",
            DispatchDirection::Load => "Load",
        }
    }
}

impl fmt::Display for DispatchDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DispatchDirection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Generator" => Ok(DispatchDirection::Generator),
            "Load" => Ok(DispatchDirection::Load),
            other => Err(Error::invalid_argument(
                "dispatch_type",
                format!("'{other}' is not 'Generator' or 'Load'"),
            )),
        }
    }
}

/// Time resolution of a query result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resolution {
    /// Native 5-minute dispatch intervals.
    #[serde(rename = "5-min")]
    FiveMinute,
    /// Only intervals ending on the hour.
    #[serde(rename = "hourly")]
    Hourly,
}

impl Resolution {
    pub fn as_str(self) -> &'static str {
        match self {
            Resolution::FiveMinute => "5-min",
            Resolution::Hourly => "hourly",
        }
    }
}

impl FromStr for Resolution {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "5-min" => Ok(Resolution::FiveMinute),
            "hourly" => Ok(Resolution::Hourly),
            other => Err(Error::invalid_argument(
                "resolution",
                format!("'{other}' is not 'hourly' or '5-min'"),
            )),
        }
    }
}

/// Which bid volume column a query reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeKind {
    /// Volume clamped to unit availability.
    Adjusted,
    /// Volume as offered.
    Raw,
}

impl VolumeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            VolumeKind::Adjusted => "adjusted",
            VolumeKind::Raw => "raw",
        }
    }
}

impl FromStr for VolumeKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "adjusted" => Ok(VolumeKind::Adjusted),
            "raw" => Ok(VolumeKind::Raw),
            other => Err(Error::invalid_argument(
                "adjusted",
                format!("'{other}' is not 'adjusted' or 'raw'"),
            )),
        }
    }
}

/// A column of [`UnitDispatchMetrics`] that can be aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DispatchColumn {
    Availability,
    DispatchTarget,
    FinalOutput,
    AsBidRampUpLimit,
    AsBidRampDownLimit,
    TelemetryRampUpLimit,
    TelemetryRampDownLimit,
    PasaAvailability,
    MaxAvail,
}

impl DispatchColumn {
    pub const ALL: [DispatchColumn; 9] = [
        DispatchColumn::Availability,
        DispatchColumn::DispatchTarget,
        DispatchColumn::FinalOutput,
        DispatchColumn::AsBidRampUpLimit,
        DispatchColumn::AsBidRampDownLimit,
        DispatchColumn::TelemetryRampUpLimit,
        DispatchColumn::TelemetryRampDownLimit,
        DispatchColumn::PasaAvailability,
        DispatchColumn::MaxAvail,
    ];

    /// Market operator column name, e.g. "RAMPUPMAXAVAIL".
    pub fn as_str(self) -> &'static str {
        match self {
            DispatchColumn::Availability => "AVAILABILITY",
            DispatchColumn::DispatchTarget => "TOTALCLEARED",
            DispatchColumn::FinalOutput => "FINALMW",
            DispatchColumn::AsBidRampUpLimit => "ASBIDRAMPUPMAXAVAIL",
            DispatchColumn::AsBidRampDownLimit => "ASBIDRAMPDOWNMINAVAIL",
            DispatchColumn::TelemetryRampUpLimit => "RAMPUPMAXAVAIL",
            DispatchColumn::TelemetryRampDownLimit => "RAMPDOWNMINAVAIL",
            DispatchColumn::PasaAvailability => "PASAAVAILABILITY",
            DispatchColumn::MaxAvail => "MAXAVAIL",
        }
    }
}

impl FromStr for DispatchColumn {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        DispatchColumn::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| {
                Error::invalid_argument("column_name", format!("'{s}' is not a dispatch column"))
            })
    }
}

/// Technology-category filter.
///
/// `Any` applies no filtering; `Only` keeps units whose category is in the set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TechFilter {
    #[default]
    Any,
    Only(BTreeSet<String>),
}

impl TechFilter {
    /// Build a filter from a caller-supplied list. An empty list means no filtering.
    pub fn from_list<I, S>(categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: BTreeSet<String> = categories.into_iter().map(Into::into).collect();
        if set.is_empty() {
            TechFilter::Any
        } else {
            TechFilter::Only(set)
        }
    }

    /// Does a unit with this category pass the filter?
    pub fn allows(&self, category: &str) -> bool {
        match self {
            TechFilter::Any => true,
            TechFilter::Only(set) => set.contains(category),
        }
    }
}

/// One price band of one unit's offer for one interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BidRecord {
    /// Interval timestamp.
    pub interval: IntervalTime,
    /// Unit identifier.
    pub unit_id: String,
    /// Band number (1..=10).
    pub band: u8,
    /// Volume offered in the band (MW).
    pub offered_volume: f64,
    /// Band price ($/MWh).
    pub price: f64,
}

/// A bid record with its volume clamped to unit availability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustedBidRecord {
    /// Interval timestamp.
    pub interval: IntervalTime,
    /// Unit identifier.
    pub unit_id: String,
    /// Band number (1..=10).
    pub band: u8,
    /// Volume offered in the band (MW).
    pub offered_volume: f64,
    /// Volume after availability clamping (MW).
    pub adjusted_volume: f64,
    /// Band price ($/MWh).
    pub price: f64,
}

impl AdjustedBidRecord {
    /// Carry a bid through unclamped.
    pub fn unclamped(bid: BidRecord) -> Self {
        Self {
            interval: bid.interval,
            unit_id: bid.unit_id,
            band: bid.band,
            offered_volume: bid.offered_volume,
            adjusted_volume: bid.offered_volume,
            price: bid.price,
        }
    }

    /// Volume for the requested kind.
    #[inline]
    pub fn volume(&self, kind: VolumeKind) -> f64 {
        match kind {
            VolumeKind::Adjusted => self.adjusted_volume,
            VolumeKind::Raw => self.offered_volume,
        }
    }
}

/// A unit's technical availability for one interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityRecord {
    pub interval: IntervalTime,
    pub unit_id: String,
    pub availability: f64,
}

/// Derived per-interval dispatch constraint metrics for a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitDispatchMetrics {
    /// Interval timestamp.
    pub interval: IntervalTime,
    /// Unit identifier.
    pub unit_id: String,
    /// Technical availability (MW).
    pub availability: f64,
    /// Dispatch target (MW).
    pub dispatch_target: f64,
    /// Operating level at the start of the next interval (MW).
    pub final_output: f64,
    /// Upper dispatch limit from the as-bid ramp rate.
    pub as_bid_ramp_up_limit: f64,
    /// Lower dispatch limit from the as-bid ramp rate.
    pub as_bid_ramp_down_limit: f64,
    /// Upper dispatch limit from the telemetry ramp rate.
    pub telemetry_ramp_up_limit: f64,
    /// Lower dispatch limit from the telemetry ramp rate.
    pub telemetry_ramp_down_limit: f64,
    /// Projected availability as bid.
    pub pasa_availability: f64,
    /// Maximum availability as bid.
    pub max_avail: f64,
}

impl UnitDispatchMetrics {
    /// Apply query-time clamping of the ramp envelopes.
    ///
    /// As-bid up limit is capped at `max_avail`, telemetry up limit at `availability`,
    /// and both down limits are floored at zero.
    pub fn clamped(&self) -> Self {
        let mut m = self.clone();
        if m.as_bid_ramp_up_limit > m.max_avail {
            m.as_bid_ramp_up_limit = m.max_avail;
        }
        if m.as_bid_ramp_down_limit < 0.0 {
            m.as_bid_ramp_down_limit = 0.0;
        }
        if m.telemetry_ramp_up_limit > m.availability {
            m.telemetry_ramp_up_limit = m.availability;
        }
        if m.telemetry_ramp_down_limit < 0.0 {
            m.telemetry_ramp_down_limit = 0.0;
        }
        m
    }

    /// Value of a single column.
    pub fn value(&self, column: DispatchColumn) -> f64 {
        match column {
            DispatchColumn::Availability => self.availability,
            DispatchColumn::DispatchTarget => self.dispatch_target,
            DispatchColumn::FinalOutput => self.final_output,
            DispatchColumn::AsBidRampUpLimit => self.as_bid_ramp_up_limit,
            DispatchColumn::AsBidRampDownLimit => self.as_bid_ramp_down_limit,
            DispatchColumn::TelemetryRampUpLimit => self.telemetry_ramp_up_limit,
            DispatchColumn::TelemetryRampDownLimit => self.telemetry_ramp_down_limit,
            DispatchColumn::PasaAvailability => self.pasa_availability,
            DispatchColumn::MaxAvail => self.max_avail,
        }
    }
}

/// Reference data for a unit after preprocessing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitInfo {
    pub unit_id: String,
    pub region: Region,
    pub direction: DispatchDirection,
    /// Fuel source descriptor ("-" when unknown).
    pub fuel_source: String,
    /// Technology type descriptor ("-" when unknown).
    pub technology: String,
    /// Derived technology category, e.g. "CCGT" or "Battery Charge".
    pub category: String,
    pub station_name: String,
}

/// Regional demand and price for one interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionSample {
    pub interval: IntervalTime,
    pub region: Region,
    /// Operational demand (MW).
    pub total_demand: f64,
    /// Regional reference price ($/MWh).
    pub price: f64,
}

/// One row of an aggregated result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRow {
    pub interval: IntervalTime,
    /// Secondary grouping key (price bin name), if any.
    pub key: Option<String>,
    pub value: f64,
}

/// One band of one unit's bid, as returned by unit-level queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitBidRow {
    pub interval: IntervalTime,
    pub unit_id: String,
    pub band: u8,
    pub volume: f64,
    pub price: f64,
}

/// Unit identifier with its station name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitName {
    pub unit_id: String,
    pub station_name: String,
}

/// Items carrying an interval timestamp.
pub trait Timestamped {
    fn interval(&self) -> IntervalTime;
}

impl Timestamped for BidRecord {
    fn interval(&self) -> IntervalTime {
        self.interval
    }
}

impl Timestamped for AdjustedBidRecord {
    fn interval(&self) -> IntervalTime {
        self.interval
    }
}

impl Timestamped for UnitDispatchMetrics {
    fn interval(&self) -> IntervalTime {
        self.interval
    }
}

impl Timestamped for RegionSample {
    fn interval(&self) -> IntervalTime {
        self.interval
    }
}

impl Timestamped for AggregateRow {
    fn interval(&self) -> IntervalTime {
        self.interval
    }
}

impl Timestamped for UnitBidRow {
    fn interval(&self) -> IntervalTime {
        self.interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(h: u32, m: u32) -> IntervalTime {
        NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn metrics() -> UnitDispatchMetrics {
        UnitDispatchMetrics {
            interval: ts(1, 0),
            unit_id: "A".to_string(),
            availability: 90.0,
            dispatch_target: 50.0,
            final_output: 55.0,
            as_bid_ramp_up_limit: 120.0,
            as_bid_ramp_down_limit: -10.0,
            telemetry_ramp_up_limit: 95.0,
            telemetry_ramp_down_limit: -5.0,
            pasa_availability: 100.0,
            max_avail: 100.0,
        }
    }

    #[test]
    fn test_region_parses_market_ids() {
        assert_eq!("NSW".parse::<Region>().unwrap(), Region::Nsw);
        assert_eq!("NSW1".parse::<Region>().unwrap(), Region::Nsw);
        assert_eq!("TAS1".parse::<Region>().unwrap(), Region::Tas);
    }

    #[test]
    fn test_region_rejects_unknown() {
        let err = "WA".parse::<Region>().unwrap_err();
        assert_eq!(err.argument(), Some("regions"));
    }

    #[test]
    fn test_enumerations_reject_unknown_values() {
        assert_eq!("daily".parse::<Resolution>().unwrap_err().argument(), Some("resolution"));
        assert_eq!("Both".parse::<DispatchDirection>().unwrap_err().argument(), Some("dispatch_type"));
        assert_eq!("clamped".parse::<VolumeKind>().unwrap_err().argument(), Some("adjusted"));
        assert_eq!("FOO".parse::<DispatchColumn>().unwrap_err().argument(), Some("column_name"));
    }

    #[test]
    fn test_dispatch_column_names_round_trip() {
        for column in DispatchColumn::ALL {
            assert_eq!(column.as_str().parse::<DispatchColumn>().unwrap(), column);
        }
    }

    #[test]
    fn test_empty_tech_list_is_no_filter() {
        let filter = TechFilter::from_list(Vec::<String>::new());
        assert_eq!(filter, TechFilter::Any);
        assert!(filter.allows("Anything"));
    }

    #[test]
    fn test_tech_filter_only() {
        let filter = TechFilter::from_list(["Solar", "Wind"]);
        assert!(filter.allows("Wind"));
        assert!(!filter.allows("CCGT"));
    }

    #[test]
    fn test_clamped_metrics() {
        let m = metrics().clamped();
        assert_eq!(m.as_bid_ramp_up_limit, 100.0);
        assert_eq!(m.as_bid_ramp_down_limit, 0.0);
        assert_eq!(m.telemetry_ramp_up_limit, 90.0);
        assert_eq!(m.telemetry_ramp_down_limit, 0.0);
        // Untouched columns
        assert_eq!(m.final_output, 55.0);
    }

    #[test]
    fn test_clamping_leaves_values_inside_limits() {
        let mut raw = metrics();
        raw.as_bid_ramp_up_limit = 60.0;
        raw.telemetry_ramp_down_limit = 20.0;
        let m = raw.clamped();
        assert_eq!(m.as_bid_ramp_up_limit, 60.0);
        assert_eq!(m.telemetry_ramp_down_limit, 20.0);
    }

    #[test]
    fn test_adjusted_volume_selection() {
        let bid = AdjustedBidRecord {
            interval: ts(1, 0),
            unit_id: "A".to_string(),
            band: 1,
            offered_volume: 30.0,
            adjusted_volume: 10.0,
            price: 50.0,
        };
        assert_eq!(bid.volume(VolumeKind::Raw), 30.0);
        assert_eq!(bid.volume(VolumeKind::Adjusted), 10.0);
    }
}
