//! SQL implementations of the query operations.
//!
//! Each operation mirrors the in-core engine: half-open windows, hourly sampling by
//! the minute field of the stored timestamp, clamping of the ramp envelopes at query
//! time, and a bid outside every price bin reported as an out-of-range price.
//!
//! SQL selects, joins, bins and orders the rows; they are then reduced with the
//! same [`aggregate`] as the in-core engine, in interval, unit and band order.

use crate::store::{database_error, SqliteStore};
use bidstack_aggregation::{aggregate, Observation, Reducer};
use bidstack_core::time::{format_timestamp, STORAGE_FORMAT};
use bidstack_core::{
    AggregateRow, BidAggregateQuery, DispatchColumn, DispatchDirection, DispatchQuery, Error,
    IntervalTime, MarketQueries, Region, Resolution, Result, TechFilter, TimeWindow, UnitBidQuery,
    UnitBidRow, UnitName, UnitScopeQuery, UnitSelection, VolumeKind,
};
use chrono::NaiveDateTime;
use rusqlite::types::{ToSql, Type};
use rusqlite::{OptionalExtension, Row};
use tracing::debug;

/// Conjunction of WHERE clauses with positional parameters.
#[derive(Default)]
struct Filter {
    clauses: Vec<String>,
    params: Vec<Box<dyn ToSql>>,
}

impl Filter {
    fn new() -> Self {
        Self::default()
    }

    fn clause(&mut self, clause: impl Into<String>) -> &mut Self {
        self.clauses.push(clause.into());
        self
    }

    fn bind(&mut self, clause: impl Into<String>, value: impl ToSql + 'static) -> &mut Self {
        self.clauses.push(clause.into());
        self.params.push(Box::new(value));
        self
    }

    /// `column IN (...)`. An empty list matches nothing.
    fn one_of<I, V>(&mut self, column: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: ToSql + 'static,
    {
        let before = self.params.len();
        self.params
            .extend(values.into_iter().map(|v| Box::new(v) as Box<dyn ToSql>));
        let count = self.params.len() - before;
        if count == 0 {
            self.clauses.push("0".to_string());
        } else {
            let marks = vec!["?"; count].join(", ");
            self.clauses.push(format!("{column} IN ({marks})"));
        }
        self
    }

    /// Half-open `(start, end]` window on a timestamp column.
    fn window(&mut self, column: &str, window: &TimeWindow) -> &mut Self {
        self.bind(format!("{column} > ?"), format_timestamp(window.start()))
            .bind(format!("{column} <= ?"), format_timestamp(window.end()))
    }

    fn resolution(&mut self, column: &str, resolution: Resolution) -> &mut Self {
        if resolution == Resolution::Hourly {
            self.clause(format!("substr({column}, 15, 2) = '00'"));
        }
        self
    }

    fn tech(&mut self, column: &str, tech: &TechFilter) -> &mut Self {
        match tech {
            TechFilter::Any => self,
            TechFilter::Only(categories) => self.one_of(column, categories.iter().cloned()),
        }
    }

    fn sql(&self) -> String {
        if self.clauses.is_empty() {
            "1".to_string()
        } else {
            self.clauses.join(" AND ")
        }
    }

    fn params(&self) -> Vec<&dyn ToSql> {
        self.params.iter().map(|p| p.as_ref()).collect()
    }
}

fn read_interval(row: &Row<'_>, idx: usize) -> rusqlite::Result<IntervalTime> {
    let text: String = row.get(idx)?;
    NaiveDateTime::parse_from_str(&text, STORAGE_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn region_names(regions: &[Region]) -> Vec<&'static str> {
    regions.iter().map(|r| r.as_str()).collect()
}

fn volume_column(kind: VolumeKind) -> &'static str {
    match kind {
        VolumeKind::Adjusted => "b.bidvolumeadjusted",
        VolumeKind::Raw => "b.bidvolume",
    }
}

/// Column expression for a dispatch metric, clamped as the query path requires.
fn dispatch_expression(column: DispatchColumn) -> &'static str {
    match column {
        DispatchColumn::Availability => "u.availability",
        DispatchColumn::DispatchTarget => "u.totalcleared",
        DispatchColumn::FinalOutput => "u.finalmw",
        DispatchColumn::AsBidRampUpLimit => "MIN(u.asbidrampupmaxavail, u.maxavail)",
        DispatchColumn::AsBidRampDownLimit => "MAX(u.asbidrampdownminavail, 0.0)",
        DispatchColumn::TelemetryRampUpLimit => "MIN(u.rampupmaxavail, u.availability)",
        DispatchColumn::TelemetryRampDownLimit => "MAX(u.rampdownminavail, 0.0)",
        DispatchColumn::PasaAvailability => "u.pasaavailability",
        DispatchColumn::MaxAvail => "u.maxavail",
    }
}

/// Window and unit predicates of a bid aggregation, without sampling.
fn bid_scope(query: &BidAggregateQuery) -> Filter {
    let mut filter = Filter::new();
    filter
        .window("b.interval_datetime", &query.window)
        .one_of("d.region", region_names(&query.regions))
        .bind("d.dispatch_type = ?", query.direction.as_str())
        .tech("d.unit_type", &query.tech);
    filter
}

impl SqliteStore {
    /// Run a query yielding ordered (interval, key, value, weight) rows and reduce them.
    fn reduce(&self, sql: &str, filter: &Filter, reducer: Reducer) -> Result<Vec<AggregateRow>> {
        let mut stmt = self.conn.prepare(sql).map_err(database_error)?;
        let observations = stmt
            .query_map(filter.params().as_slice(), |row| {
                Ok(Observation::new(read_interval(row, 0)?, row.get(1)?, row.get(2)?)
                    .weighted(row.get(3)?))
            })
            .map_err(database_error)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(database_error)?;
        Ok(aggregate(observations, reducer))
    }

    /// Price of the first in-scope bid, in interval, unit and band order, that no bin covers.
    fn first_unbinned_price(&self, query: &BidAggregateQuery) -> Result<Option<f64>> {
        let scope = bid_scope(query);
        let sql = format!(
            "SELECT b.bidprice \
             FROM bidding_data b \
             JOIN duid_info d ON d.duid = b.duid \
             WHERE {} \
               AND NOT EXISTS (SELECT 1 FROM price_bins p \
                               WHERE b.bidprice >= p.lower_edge AND b.bidprice < p.upper_edge) \
             ORDER BY b.interval_datetime, b.duid, b.bidband \
             LIMIT 1",
            scope.sql()
        );
        self.conn
            .query_row(&sql, scope.params().as_slice(), |row| row.get(0))
            .optional()
            .map_err(database_error)
    }

    fn strings(&self, sql: &str, filter: &Filter) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(sql).map_err(database_error)?;
        let values = stmt
            .query_map(filter.params().as_slice(), |row| row.get(0))
            .map_err(database_error)?
            .collect::<rusqlite::Result<Vec<String>>>()
            .map_err(database_error)?;
        Ok(values)
    }
}

impl MarketQueries for SqliteStore {
    fn aggregate_bids(&self, query: &BidAggregateQuery) -> Result<Vec<AggregateRow>> {
        // Checked over the whole window, before hourly sampling
        if let Some(price) = self.first_unbinned_price(query)? {
            return Err(Error::PriceOutOfRange(price));
        }

        let mut filter = bid_scope(query);
        filter.resolution("b.interval_datetime", query.resolution);

        let sql = format!(
            "SELECT b.interval_datetime, p.bin_name, {volume}, 1.0 \
             FROM bidding_data b \
             JOIN duid_info d ON d.duid = b.duid \
             JOIN price_bins p ON b.bidprice >= p.lower_edge AND b.bidprice < p.upper_edge \
             WHERE {filter} \
             ORDER BY b.interval_datetime, b.duid, b.bidband",
            volume = volume_column(query.volume),
            filter = filter.sql(),
        );
        let rows = self.reduce(&sql, &filter, Reducer::Sum)?;
        debug!(rows = rows.len(), "aggregated bids in store");
        Ok(rows)
    }

    fn unit_bids(&self, query: &UnitBidQuery) -> Result<Vec<UnitBidRow>> {
        let mut filter = Filter::new();
        filter
            .window("b.interval_datetime", &query.window)
            .resolution("b.interval_datetime", query.resolution)
            .one_of("b.duid", query.unit_ids.clone());

        let sql = format!(
            "SELECT b.interval_datetime, b.duid, b.bidband, {volume}, b.bidprice \
             FROM bidding_data b \
             WHERE {filter} \
             ORDER BY b.interval_datetime, b.duid, b.bidband",
            volume = volume_column(query.volume),
            filter = filter.sql(),
        );

        let mut stmt = self.conn.prepare(&sql).map_err(database_error)?;
        let rows = stmt
            .query_map(filter.params().as_slice(), |row| {
                Ok(UnitBidRow {
                    interval: read_interval(row, 0)?,
                    unit_id: row.get(1)?,
                    band: row.get(2)?,
                    volume: row.get(3)?,
                    price: row.get(4)?,
                })
            })
            .map_err(database_error)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(database_error)?;
        Ok(rows)
    }

    fn aggregate_dispatch_metrics(&self, query: &DispatchQuery) -> Result<Vec<AggregateRow>> {
        let mut filter = Filter::new();
        filter
            .window("u.interval_datetime", &query.window)
            .resolution("u.interval_datetime", query.resolution);

        let join = match &query.selection {
            UnitSelection::Regions {
                regions,
                direction,
                tech,
            } => {
                filter
                    .one_of("d.region", region_names(regions))
                    .bind("d.dispatch_type = ?", direction.as_str())
                    .tech("d.unit_type", tech);
                "JOIN duid_info d ON d.duid = u.duid"
            }
            UnitSelection::Units(ids) => {
                filter.one_of("u.duid", ids.clone());
                ""
            }
        };

        let sql = format!(
            "SELECT u.interval_datetime, NULL, {column}, 1.0 \
             FROM unit_dispatch u {join} \
             WHERE {filter} \
             ORDER BY u.interval_datetime, u.duid",
            column = dispatch_expression(query.column),
            filter = filter.sql(),
        );
        self.reduce(&sql, &filter, Reducer::Sum)
    }

    fn weighted_average_price(
        &self,
        regions: &[Region],
        window: &TimeWindow,
    ) -> Result<Vec<AggregateRow>> {
        let mut filter = Filter::new();
        filter
            .window("settlementdate", window)
            .one_of("regionid", region_names(regions));

        let sql = format!(
            "SELECT settlementdate, NULL, rrp, totaldemand \
             FROM demand_data \
             WHERE {} \
             ORDER BY settlementdate, regionid",
            filter.sql()
        );
        // Intervals with zero total demand yield no row
        self.reduce(&sql, &filter, Reducer::WeightedMean)
    }

    fn region_demand(&self, regions: &[Region], window: &TimeWindow) -> Result<Vec<AggregateRow>> {
        let mut filter = Filter::new();
        filter
            .window("settlementdate", window)
            .one_of("regionid", region_names(regions));

        let sql = format!(
            "SELECT settlementdate, NULL, totaldemand, 1.0 \
             FROM demand_data \
             WHERE {} \
             ORDER BY settlementdate, regionid",
            filter.sql()
        );
        self.reduce(&sql, &filter, Reducer::Sum)
    }

    fn units_in_scope(&self, query: &UnitScopeQuery) -> Result<Vec<UnitName>> {
        let mut bids = Filter::new();
        bids.window("b.interval_datetime", &query.window);

        let mut filter = Filter::new();
        filter
            .one_of("d.region", region_names(&query.regions))
            .bind("d.dispatch_type = ?", query.direction.as_str())
            .tech("d.unit_type", &query.tech);

        let sql = format!(
            "SELECT DISTINCT d.duid, d.station_name \
             FROM duid_info d \
             WHERE {units} \
               AND EXISTS (SELECT 1 FROM bidding_data b WHERE b.duid = d.duid AND {bids}) \
             ORDER BY d.duid, d.station_name",
            units = filter.sql(),
            bids = bids.sql(),
        );
        let mut params = filter.params();
        params.extend(bids.params());

        let mut stmt = self.conn.prepare(&sql).map_err(database_error)?;
        let names = stmt
            .query_map(params.as_slice(), |row| {
                Ok(UnitName {
                    unit_id: row.get(0)?,
                    station_name: row.get(1)?,
                })
            })
            .map_err(database_error)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(database_error)?;
        Ok(names)
    }

    fn units_for_stations(&self, stations: &[String]) -> Result<Vec<String>> {
        let mut filter = Filter::new();
        filter.one_of("station_name", stations.to_vec());
        let sql = format!(
            "SELECT DISTINCT duid FROM duid_info WHERE {} ORDER BY duid",
            filter.sql()
        );
        self.strings(&sql, &filter)
    }

    fn distinct_technology_categories(
        &self,
        regions: Option<&[Region]>,
        direction: Option<DispatchDirection>,
    ) -> Result<Vec<String>> {
        let mut filter = Filter::new();
        if let Some(regions) = regions {
            filter.one_of("region", region_names(regions));
        }
        if let Some(direction) = direction {
            filter.bind("dispatch_type = ?", direction.as_str());
        }
        let sql = format!(
            "SELECT DISTINCT unit_type FROM duid_info WHERE {} ORDER BY unit_type",
            filter.sql()
        );
        self.strings(&sql, &filter)
    }
}
