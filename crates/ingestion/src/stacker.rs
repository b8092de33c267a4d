//! Bid stacking.
//!
//! Combines the per-interval volume offer table and the daily price offer table
//! into one row per (interval, unit, band) with both volume and price.

use bidstack_core::raw::{BandColumns, PriceOffer, VolumeOffer, PRICE_BAND_COLUMNS, VOLUME_BAND_COLUMNS};
use bidstack_core::BidRecord;
use chrono::NaiveDate;
use std::collections::HashMap;
use tracing::{debug, warn};

/// One value pulled out of a wide row.
#[derive(Debug, Clone, PartialEq)]
pub struct BandValue<K> {
    /// Key columns of the source row.
    pub key: K,
    /// Band number.
    pub band: u8,
    /// Band value.
    pub value: f64,
}

/// Unpivot wide rows into one value per (row, band).
///
/// `columns` maps band numbers to column names and fixes the output order within a row.
/// Columns absent from a row are skipped.
pub fn unpivot<'a, R, K, FK, FB>(
    rows: &'a [R],
    columns: &[(u8, &str)],
    key: FK,
    bands: FB,
) -> Vec<BandValue<K>>
where
    FK: Fn(&'a R) -> K,
    FB: Fn(&'a R) -> &'a BandColumns,
    K: Clone,
{
    let mut out = Vec::with_capacity(rows.len() * columns.len());
    for row in rows {
        let row_key = key(row);
        let row_bands = bands(row);
        for &(band, column) in columns {
            if let Some(value) = row_bands.get(column) {
                out.push(BandValue {
                    key: row_key.clone(),
                    band,
                    value,
                });
            }
        }
    }
    out
}

/// Joins volume and price offers band by band.
#[derive(Debug, Clone)]
pub struct BidStacker {
    volume_columns: Vec<(u8, &'static str)>,
    price_columns: Vec<(u8, &'static str)>,
}

impl BidStacker {
    /// Create a stacker using the market's ten band columns.
    pub fn new() -> Self {
        Self {
            volume_columns: VOLUME_BAND_COLUMNS.to_vec(),
            price_columns: PRICE_BAND_COLUMNS.to_vec(),
        }
    }

    /// Stack offers into bid records.
    ///
    /// Volume rows are joined to price rows on (settlement day, unit, band). A value
    /// with no counterpart on the other side is dropped.
    pub fn stack(&self, volume_offers: &[VolumeOffer], price_offers: &[PriceOffer]) -> Vec<BidRecord> {
        let prices = unpivot(
            price_offers,
            &self.price_columns,
            |p| (p.settlement_day, p.unit_id.as_str()),
            |p| &p.bands,
        );

        let mut price_lookup: HashMap<(NaiveDate, &str, u8), f64> = HashMap::with_capacity(prices.len());
        for p in prices {
            let (day, unit) = p.key;
            if price_lookup.insert((day, unit, p.band), p.value).is_some() {
                warn!(unit, %day, band = p.band, "duplicate price band, keeping the last");
            }
        }

        let volumes = unpivot(
            volume_offers,
            &self.volume_columns,
            |v| (v.interval, v.settlement_day, v.unit_id.as_str()),
            |v| &v.bands,
        );

        let total = volumes.len();
        let bids: Vec<BidRecord> = volumes
            .into_iter()
            .filter_map(|v| {
                let (interval, day, unit) = v.key;
                price_lookup.get(&(day, unit, v.band)).map(|&price| BidRecord {
                    interval,
                    unit_id: unit.to_string(),
                    band: v.band,
                    offered_volume: v.value,
                    price,
                })
            })
            .collect();

        debug!(
            volume_bands = total,
            stacked = bids.len(),
            unmatched = total - bids.len(),
            "stacked unit bids"
        );
        bids
    }
}

impl Default for BidStacker {
    fn default() -> Self {
        Self::new()
    }
}
