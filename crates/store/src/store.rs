//! SQLite-backed persisted mirror.
//!
//! Holds the same clamped bids, dispatch metrics, unit reference, regional
//! samples and price bins the in-core path derives, written by [`SqliteStore::populate`].

use crate::schema::{self, BIDDING_DATA, DEMAND_DATA, DUID_INFO, PRICE_BINS, UNIT_DISPATCH};
use bidstack_core::config::BinningConfig;
use bidstack_core::time::format_timestamp;
use bidstack_core::{Config, Error, MarketDataSource, Result, TimeWindow};
use bidstack_ingestion::Preprocessor;
use rusqlite::{params, Connection, Transaction};
use tracing::{debug, info};

/// Map a storage failure into the engine error type.
pub(crate) fn database_error(e: rusqlite::Error) -> Error {
    Error::database(e.to_string())
}

/// Rows written by one [`SqliteStore::populate`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PopulateSummary {
    pub bids: usize,
    pub dispatch: usize,
    pub units: usize,
    pub region_samples: usize,
}

/// Persisted mirror on SQLite.
pub struct SqliteStore {
    /// Open database connection.
    pub(crate) conn: Connection,
    /// Ingestion pipeline used to populate the store.
    preprocessor: Preprocessor,
    /// Price bin table written on open.
    binning: BinningConfig,
    /// Dispatch interval length in minutes.
    interval_minutes: u32,
}

impl SqliteStore {
    /// Open the store configured in `config.store`, creating the schema if needed.
    ///
    /// With no path configured the database lives in memory.
    pub fn open(config: &Config) -> Result<Self> {
        let conn = match &config.store.path {
            Some(path) => Connection::open(path),
            None => Connection::open_in_memory(),
        }
        .map_err(database_error)?;
        Self::with_connection(conn, config)
    }

    /// Open a fresh in-memory store.
    pub fn open_in_memory(config: &Config) -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(database_error)?;
        Self::with_connection(conn, config)
    }

    fn with_connection(conn: Connection, config: &Config) -> Result<Self> {
        config.validate()?;
        schema::create_schema(&conn).map_err(database_error)?;
        let mut store = Self {
            conn,
            preprocessor: Preprocessor::new(&config.market),
            binning: config.binning.clone(),
            interval_minutes: config.market.interval_minutes,
        };
        store.write_price_bins()?;
        info!(path = ?config.store.path, "opened store");
        Ok(store)
    }

    /// Replace the price bin table with the configured bins.
    fn write_price_bins(&mut self) -> Result<()> {
        let tx = self.conn.transaction().map_err(database_error)?;
        tx.execute("DELETE FROM price_bins", []).map_err(database_error)?;
        {
            let mut stmt = tx
                .prepare("INSERT INTO price_bins (bin_name, lower_edge, upper_edge) VALUES (?1, ?2, ?3)")
                .map_err(database_error)?;
            for bin in &self.binning.bins {
                stmt.execute(params![bin.name(), bin.lower_edge, bin.upper_edge])
                    .map_err(database_error)?;
            }
        }
        tx.commit().map_err(database_error)?;
        debug!(bins = self.binning.bins.len(), "wrote price bins");
        Ok(())
    }

    /// Run the ingestion pipeline over a window and persist its output.
    ///
    /// Existing rows with the same keys are replaced. Dispatch metrics are derived
    /// over one extra interval so the last interval of the window has a final output.
    pub fn populate<S: MarketDataSource + ?Sized>(
        &mut self,
        source: &S,
        window: &TimeWindow,
    ) -> Result<PopulateSummary> {
        let bids = self.preprocessor.bid_data(source, window)?;
        let mut dispatch = self
            .preprocessor
            .unit_dispatch(source, &window.extend_end(self.interval_minutes as i64))?;
        dispatch.retain(|m| window.contains(m.interval));
        let units = self.preprocessor.unit_info(source)?;
        let samples = self.preprocessor.region_data(source, window)?;

        let tx = self.conn.transaction().map_err(database_error)?;
        insert_rows(&tx, &bids, &dispatch, &units, &samples).map_err(database_error)?;
        tx.commit().map_err(database_error)?;

        let summary = PopulateSummary {
            bids: bids.len(),
            dispatch: dispatch.len(),
            units: units.len(),
            region_samples: samples.len(),
        };
        info!(
            start = %window.start(),
            end = %window.end(),
            bids = summary.bids,
            dispatch = summary.dispatch,
            units = summary.units,
            region_samples = summary.region_samples,
            "populated store"
        );
        Ok(summary)
    }

    /// Number of rows in each table, keyed by table name.
    pub fn table_counts(&self) -> Result<Vec<(&'static str, i64)>> {
        [BIDDING_DATA, UNIT_DISPATCH, DUID_INFO, DEMAND_DATA, PRICE_BINS]
            .into_iter()
            .map(|table| {
                schema::row_count(&self.conn, table)
                    .map(|n| (table, n))
                    .map_err(database_error)
            })
            .collect()
    }
}

fn insert_rows(
    tx: &Transaction<'_>,
    bids: &[bidstack_core::AdjustedBidRecord],
    dispatch: &[bidstack_core::UnitDispatchMetrics],
    units: &[bidstack_core::UnitInfo],
    samples: &[bidstack_core::RegionSample],
) -> rusqlite::Result<()> {
    let mut stmt = tx.prepare(
        "INSERT OR REPLACE INTO bidding_data \
         (interval_datetime, duid, bidband, bidvolume, bidvolumeadjusted, bidprice) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    for b in bids {
        stmt.execute(params![
            format_timestamp(b.interval),
            b.unit_id,
            b.band,
            b.offered_volume,
            b.adjusted_volume,
            b.price
        ])?;
    }

    let mut stmt = tx.prepare(
        "INSERT OR REPLACE INTO unit_dispatch \
         (interval_datetime, duid, availability, totalcleared, finalmw, asbidrampupmaxavail, \
          asbidrampdownminavail, rampupmaxavail, rampdownminavail, pasaavailability, maxavail) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
    )?;
    for m in dispatch {
        stmt.execute(params![
            format_timestamp(m.interval),
            m.unit_id,
            m.availability,
            m.dispatch_target,
            m.final_output,
            m.as_bid_ramp_up_limit,
            m.as_bid_ramp_down_limit,
            m.telemetry_ramp_up_limit,
            m.telemetry_ramp_down_limit,
            m.pasa_availability,
            m.max_avail
        ])?;
    }

    let mut stmt = tx.prepare(
        "INSERT OR REPLACE INTO duid_info \
         (duid, region, dispatch_type, fuel_source, technology, unit_type, station_name) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?;
    for u in units {
        stmt.execute(params![
            u.unit_id,
            u.region.as_str(),
            u.direction.as_str(),
            u.fuel_source,
            u.technology,
            u.category,
            u.station_name
        ])?;
    }

    let mut stmt = tx.prepare(
        "INSERT OR REPLACE INTO demand_data (settlementdate, regionid, totaldemand, rrp) \
         VALUES (?1, ?2, ?3, ?4)",
    )?;
    for s in samples {
        stmt.execute(params![
            format_timestamp(s.interval),
            s.region.as_str(),
            s.total_demand,
            s.price
        ])?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bidstack_core::raw::{
        BandColumns, PriceOffer, RawRegionSample, RawUnitInfo, RealizedDispatch, VolumeOffer,
        PRICE_BAND_COLUMNS, VOLUME_BAND_COLUMNS,
    };
    use bidstack_core::IntervalTime;
    use bidstack_ingestion::InMemorySource;
    use chrono::{Duration, NaiveDate};

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
    }

    fn ts(h: u32, m: u32) -> IntervalTime {
        day().and_hms_opt(h, m, 0).unwrap()
    }

    fn source() -> InMemorySource {
        let mut src = InMemorySource::new();
        src.units = vec![RawUnitInfo {
            unit_id: "A".to_string(),
            region: "QLD1".to_string(),
            fuel_source: Some("Black Coal".to_string()),
            dispatch_type: "Generator".to_string(),
            technology: Some("Steam Sub-Critical".to_string()),
            station_name: "A Power Station".to_string(),
        }];
        src.price_offers = vec![PriceOffer {
            settlement_day: day(),
            unit_id: "A".to_string(),
            bid_type: "ENERGY".to_string(),
            bands: BandColumns::from_values(&PRICE_BAND_COLUMNS, &[-10.0, 40.0]),
        }];
        for i in 0..4 {
            let interval = ts(1, 0) + Duration::minutes(5 * i);
            src.volume_offers.push(VolumeOffer {
                interval,
                settlement_day: day(),
                unit_id: "A".to_string(),
                bid_type: "ENERGY".to_string(),
                max_avail: 300.0,
                ramp_up_rate: 2.0,
                ramp_down_rate: 2.0,
                pasa_availability: 300.0,
                bands: BandColumns::from_values(&VOLUME_BAND_COLUMNS, &[100.0, 200.0]),
            });
            src.realized_dispatch.push(RealizedDispatch {
                interval,
                unit_id: "A".to_string(),
                availability: 250.0,
                total_cleared: 200.0,
                initial_output: 200.0,
                ramp_up_rate: 120.0,
                ramp_down_rate: 120.0,
            });
            src.region_samples.push(RawRegionSample {
                interval,
                region: "QLD1".to_string(),
                total_demand: 6000.0,
                price: 40.0,
            });
        }
        src
    }

    fn counts(store: &SqliteStore) -> Vec<i64> {
        store.table_counts().unwrap().into_iter().map(|(_, n)| n).collect()
    }

    #[test]
    fn test_open_writes_price_bins() {
        let store = SqliteStore::open_in_memory(&Config::default()).unwrap();
        assert_eq!(counts(&store), vec![0, 0, 0, 0, 11]);
    }

    #[test]
    fn test_populate_persists_window() {
        let mut store = SqliteStore::open_in_memory(&Config::default()).unwrap();
        let window = TimeWindow::new(ts(1, 0), ts(1, 10)).unwrap();

        let summary = store.populate(&source(), &window).unwrap();

        // 01:05 and 01:10, two bands each
        assert_eq!(summary.bids, 4);
        // 01:10 takes its final output from 01:15, past the window end
        assert_eq!(summary.dispatch, 2);
        assert_eq!(summary.units, 1);
        assert_eq!(summary.region_samples, 2);
        assert_eq!(counts(&store), vec![4, 2, 1, 2, 11]);
    }

    #[test]
    fn test_populate_twice_replaces_rows() {
        let mut store = SqliteStore::open_in_memory(&Config::default()).unwrap();
        let window = TimeWindow::new(ts(1, 0), ts(1, 10)).unwrap();

        store.populate(&source(), &window).unwrap();
        store.populate(&source(), &window).unwrap();

        assert_eq!(counts(&store), vec![4, 2, 1, 2, 11]);
    }

    #[test]
    fn test_adjusted_volume_is_persisted() {
        let mut store = SqliteStore::open_in_memory(&Config::default()).unwrap();
        let window = TimeWindow::new(ts(1, 0), ts(1, 5)).unwrap();
        store.populate(&source(), &window).unwrap();

        let adjusted: f64 = store
            .conn
            .query_row(
                "SELECT bidvolumeadjusted FROM bidding_data WHERE bidband = 2",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert!((adjusted - 150.0).abs() < 1e-10);
    }
}
