//! SQLite schema for the persisted mirror.
//!
//! Timestamps are stored as `YYYY-MM-DD HH:MM:SS` text so that lexical and
//! chronological order agree. Dispatch metrics are stored unclamped.

use rusqlite::Connection;

pub const BIDDING_DATA: &str = "bidding_data";
pub const UNIT_DISPATCH: &str = "unit_dispatch";
pub const DUID_INFO: &str = "duid_info";
pub const DEMAND_DATA: &str = "demand_data";
pub const PRICE_BINS: &str = "price_bins";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS bidding_data (
    interval_datetime  TEXT    NOT NULL,
    duid               TEXT    NOT NULL,
    bidband            INTEGER NOT NULL,
    bidvolume          REAL    NOT NULL,
    bidvolumeadjusted  REAL    NOT NULL,
    bidprice           REAL    NOT NULL,
    PRIMARY KEY (interval_datetime, duid, bidband)
);

CREATE TABLE IF NOT EXISTS unit_dispatch (
    interval_datetime      TEXT NOT NULL,
    duid                   TEXT NOT NULL,
    availability           REAL NOT NULL,
    totalcleared           REAL NOT NULL,
    finalmw                REAL NOT NULL,
    asbidrampupmaxavail    REAL NOT NULL,
    asbidrampdownminavail  REAL NOT NULL,
    rampupmaxavail         REAL NOT NULL,
    rampdownminavail       REAL NOT NULL,
    pasaavailability       REAL NOT NULL,
    maxavail               REAL NOT NULL,
    PRIMARY KEY (interval_datetime, duid)
);

CREATE TABLE IF NOT EXISTS duid_info (
    duid           TEXT PRIMARY KEY,
    region         TEXT NOT NULL,
    dispatch_type  TEXT NOT NULL,
    fuel_source    TEXT NOT NULL,
    technology     TEXT NOT NULL,
    unit_type      TEXT NOT NULL,
    station_name   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS demand_data (
    settlementdate  TEXT NOT NULL,
    regionid        TEXT NOT NULL,
    totaldemand     REAL NOT NULL,
    rrp             REAL NOT NULL,
    PRIMARY KEY (settlementdate, regionid)
);

CREATE TABLE IF NOT EXISTS price_bins (
    bin_name    TEXT PRIMARY KEY,
    lower_edge  REAL NOT NULL,
    upper_edge  REAL NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_bidding_duid ON bidding_data (duid, interval_datetime);
CREATE INDEX IF NOT EXISTS idx_dispatch_duid ON unit_dispatch (duid, interval_datetime);
CREATE INDEX IF NOT EXISTS idx_duid_station ON duid_info (station_name);
";

/// Create all tables and indexes if they do not exist.
pub fn create_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA)
}

/// Count rows in a table.
pub fn row_count(conn: &Connection, table: &str) -> rusqlite::Result<i64> {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        create_schema(&conn).unwrap();
        create_schema(&conn).unwrap();

        for table in [BIDDING_DATA, UNIT_DISPATCH, DUID_INFO, DEMAND_DATA, PRICE_BINS] {
            assert_eq!(row_count(&conn, table).unwrap(), 0, "{table}");
        }
    }

    #[test]
    fn test_bid_key_is_unique() {
        let conn = Connection::open_in_memory().unwrap();
        create_schema(&conn).unwrap();
        let insert = "INSERT OR REPLACE INTO bidding_data VALUES ('2020-01-01 01:00:00', 'A', 1, ?1, ?1, 10.0)";

        conn.execute(insert, [5.0]).unwrap();
        conn.execute(insert, [7.0]).unwrap();

        assert_eq!(row_count(&conn, BIDDING_DATA).unwrap(), 1);
        let volume: f64 = conn
            .query_row("SELECT bidvolume FROM bidding_data", [], |row| row.get(0))
            .unwrap();
        assert!((volume - 7.0).abs() < 1e-10);
    }
}
