//! Query requests and the two seams of the engine.
//!
//! [`MarketDataSource`] is what the collaborators that fetch raw tables implement.
//! [`MarketQueries`] is the query surface; the in-core engine and the persisted
//! mirror both implement it and must return identical results.

use crate::error::{Error, Result};
use crate::raw::{PriceOffer, RawRegionSample, RawUnitInfo, RealizedDispatch, VolumeOffer};
use crate::time::TimeWindow;
use crate::types::{
    AggregateRow, DispatchColumn, DispatchDirection, Region, Resolution, TechFilter, UnitBidRow,
    UnitName, VolumeKind,
};
use serde::{Deserialize, Serialize};

/// Parse a list of region names.
pub fn parse_regions<S: AsRef<str>>(regions: &[S]) -> Result<Vec<Region>> {
    let mut parsed: Vec<Region> = regions
        .iter()
        .map(|r| r.as_ref().parse())
        .collect::<Result<_>>()?;
    parsed.sort();
    parsed.dedup();
    Ok(parsed)
}

/// Validate a list of identifiers (unit ids, categories, station names).
pub fn parse_identifiers<S: AsRef<str>>(ids: &[S], argument: &'static str) -> Result<Vec<String>> {
    ids.iter()
        .map(|id| {
            let id = id.as_ref();
            if id.trim().is_empty() {
                Err(Error::invalid_argument(argument, "identifiers must not be blank"))
            } else {
                Ok(id.to_string())
            }
        })
        .collect()
}

/// Per-interval, per-price-bin volume across a set of units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BidAggregateQuery {
    pub regions: Vec<Region>,
    pub window: TimeWindow,
    pub resolution: Resolution,
    pub direction: DispatchDirection,
    pub volume: VolumeKind,
    pub tech: TechFilter,
}

impl BidAggregateQuery {
    /// Build from raw caller arguments, validating every one of them.
    pub fn parse<S: AsRef<str>, T: AsRef<str>>(
        regions: &[S],
        start_time: &str,
        end_time: &str,
        resolution: &str,
        dispatch_type: &str,
        adjusted: &str,
        tech_types: &[T],
    ) -> Result<Self> {
        Ok(Self {
            regions: parse_regions(regions)?,
            window: TimeWindow::parse(start_time, end_time)?,
            resolution: resolution.parse()?,
            direction: dispatch_type.parse()?,
            volume: adjusted.parse()?,
            tech: TechFilter::from_list(parse_identifiers(tech_types, "tech_types")?),
        })
    }
}

/// Band-level bids for an explicit list of units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitBidQuery {
    pub unit_ids: Vec<String>,
    pub window: TimeWindow,
    pub resolution: Resolution,
    pub volume: VolumeKind,
}

impl UnitBidQuery {
    pub fn parse<S: AsRef<str>>(
        unit_ids: &[S],
        start_time: &str,
        end_time: &str,
        resolution: &str,
        adjusted: &str,
    ) -> Result<Self> {
        Ok(Self {
            unit_ids: parse_identifiers(unit_ids, "duids")?,
            window: TimeWindow::parse(start_time, end_time)?,
            resolution: resolution.parse()?,
            volume: adjusted.parse()?,
        })
    }
}

/// Which units a dispatch metric aggregation covers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UnitSelection {
    /// Units in the given regions with the given direction and technology.
    Regions {
        regions: Vec<Region>,
        direction: DispatchDirection,
        tech: TechFilter,
    },
    /// An explicit list of unit ids.
    Units(Vec<String>),
}

/// Per-interval sum of one dispatch metric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchQuery {
    pub column: DispatchColumn,
    pub selection: UnitSelection,
    pub window: TimeWindow,
    pub resolution: Resolution,
}

impl DispatchQuery {
    /// Region-filtered form.
    pub fn parse_for_regions<S: AsRef<str>, T: AsRef<str>>(
        column_name: &str,
        regions: &[S],
        start_time: &str,
        end_time: &str,
        resolution: &str,
        dispatch_type: &str,
        tech_types: &[T],
    ) -> Result<Self> {
        Ok(Self {
            column: column_name.parse()?,
            selection: UnitSelection::Regions {
                regions: parse_regions(regions)?,
                direction: dispatch_type.parse()?,
                tech: TechFilter::from_list(parse_identifiers(tech_types, "tech_types")?),
            },
            window: TimeWindow::parse(start_time, end_time)?,
            resolution: resolution.parse()?,
        })
    }

    /// Explicit unit list form.
    pub fn parse_for_units<S: AsRef<str>>(
        column_name: &str,
        unit_ids: &[S],
        start_time: &str,
        end_time: &str,
        resolution: &str,
    ) -> Result<Self> {
        Ok(Self {
            column: column_name.parse()?,
            selection: UnitSelection::Units(parse_identifiers(unit_ids, "duids")?),
            window: TimeWindow::parse(start_time, end_time)?,
            resolution: resolution.parse()?,
        })
    }
}

/// Units with at least one bid in a window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitScopeQuery {
    pub regions: Vec<Region>,
    pub window: TimeWindow,
    pub direction: DispatchDirection,
    pub tech: TechFilter,
}

impl UnitScopeQuery {
    pub fn parse<S: AsRef<str>, T: AsRef<str>>(
        regions: &[S],
        start_time: &str,
        end_time: &str,
        dispatch_type: &str,
        tech_types: &[T],
    ) -> Result<Self> {
        Ok(Self {
            regions: parse_regions(regions)?,
            window: TimeWindow::parse(start_time, end_time)?,
            direction: dispatch_type.parse()?,
            tech: TechFilter::from_list(parse_identifiers(tech_types, "tech_types")?),
        })
    }
}

/// Raw table fetches. Every windowed fetch is restricted to `(start, end]`.
pub trait MarketDataSource {
    /// Per-interval volume offers.
    fn volume_offers(&self, window: &TimeWindow) -> Result<Vec<VolumeOffer>>;

    /// Daily price offers for every trading day the window touches.
    fn price_offers(&self, window: &TimeWindow) -> Result<Vec<PriceOffer>>;

    /// Realized dispatch telemetry, including unit availability.
    fn realized_dispatch(&self, window: &TimeWindow) -> Result<Vec<RealizedDispatch>>;

    /// Unit registration table.
    fn unit_reference(&self) -> Result<Vec<RawUnitInfo>>;

    /// Regional demand and price.
    fn region_samples(&self, window: &TimeWindow) -> Result<Vec<RawRegionSample>>;
}

/// The fixed set of aggregation shapes the engine answers.
pub trait MarketQueries {
    /// Volume per interval per price bin.
    fn aggregate_bids(&self, query: &BidAggregateQuery) -> Result<Vec<AggregateRow>>;

    /// Band-level bids per interval per unit.
    fn unit_bids(&self, query: &UnitBidQuery) -> Result<Vec<UnitBidRow>>;

    /// Sum of one clamped dispatch metric per interval.
    fn aggregate_dispatch_metrics(&self, query: &DispatchQuery) -> Result<Vec<AggregateRow>>;

    /// Demand-weighted average price per interval.
    fn weighted_average_price(
        &self,
        regions: &[Region],
        window: &TimeWindow,
    ) -> Result<Vec<AggregateRow>>;

    /// Total demand per interval.
    fn region_demand(&self, regions: &[Region], window: &TimeWindow) -> Result<Vec<AggregateRow>>;

    /// Units matching the filters with at least one bid in the window.
    fn units_in_scope(&self, query: &UnitScopeQuery) -> Result<Vec<UnitName>>;

    /// Unit ids belonging to the named stations.
    fn units_for_stations(&self, stations: &[String]) -> Result<Vec<String>>;

    /// Distinct technology categories, optionally filtered.
    fn distinct_technology_categories(
        &self,
        regions: Option<&[Region]>,
        direction: Option<DispatchDirection>,
    ) -> Result<Vec<String>>;
}

/// Sort unit bid rows by interval, unit, then band.
pub fn sort_unit_bid_rows(rows: &mut [UnitBidRow]) {
    rows.sort_by(|a, b| {
        a.interval
            .cmp(&b.interval)
            .then_with(|| a.unit_id.cmp(&b.unit_id))
            .then_with(|| a.band.cmp(&b.band))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bid_query_parse() {
        let query = BidAggregateQuery::parse(
            &["SA", "TAS1", "SA"],
            "2020/01/01 00:00:00",
            "2020/01/01 05:00:00",
            "hourly",
            "Generator",
            "adjusted",
            &Vec::<String>::new(),
        )
        .unwrap();
        assert_eq!(query.regions, vec![Region::Sa, Region::Tas]);
        assert_eq!(query.resolution, Resolution::Hourly);
        assert_eq!(query.volume, VolumeKind::Adjusted);
        assert_eq!(query.tech, TechFilter::Any);
    }

    #[test]
    fn test_bid_query_names_bad_argument() {
        let err = BidAggregateQuery::parse(
            &["SA"],
            "2020/01/01 00:00:00",
            "2020/01/01 05:00:00",
            "hourly",
            "Generator",
            "clamped",
            &["Solar"],
        )
        .unwrap_err();
        assert_eq!(err.argument(), Some("adjusted"));

        let err = BidAggregateQuery::parse(
            &["WA"],
            "2020/01/01 00:00:00",
            "2020/01/01 05:00:00",
            "hourly",
            "Generator",
            "raw",
            &["Solar"],
        )
        .unwrap_err();
        assert_eq!(err.argument(), Some("regions"));
    }

    #[test]
    fn test_start_after_end_is_rejected() {
        let err = UnitBidQuery::parse(
            &["AGLHAL"],
            "2020/01/01 05:00:00",
            "2020/01/01 00:00:00",
            "5-min",
            "raw",
        )
        .unwrap_err();
        assert_eq!(err.argument(), Some("end_time"));
    }

    #[test]
    fn test_blank_identifier_is_rejected() {
        let err = DispatchQuery::parse_for_units(
            "AVAILABILITY",
            &["AGLHAL", " "],
            "2020/01/01 00:00:00",
            "2020/01/01 01:00:00",
            "5-min",
        )
        .unwrap_err();
        assert_eq!(err.argument(), Some("duids"));
    }

    #[test]
    fn test_dispatch_query_for_regions() {
        let query = DispatchQuery::parse_for_regions(
            "RAMPUPMAXAVAIL",
            &["NSW"],
            "2020/01/01 00:00:00",
            "2020/01/01 01:00:00",
            "5-min",
            "Load",
            &["Battery Charge"],
        )
        .unwrap();
        assert_eq!(query.column, DispatchColumn::TelemetryRampUpLimit);
        match query.selection {
            UnitSelection::Regions { direction, tech, .. } => {
                assert_eq!(direction, DispatchDirection::Load);
                assert!(tech.allows("Battery Charge"));
                assert!(!tech.allows("Solar"));
            }
            UnitSelection::Units(_) => panic!("expected region selection"),
        }
    }
}
