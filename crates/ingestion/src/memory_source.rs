//! In-memory market data source.
//!
//! Holds fully materialised raw tables (typically loaded from a JSON fixture)
//! and serves windowed fetches from them.

use bidstack_core::raw::{PriceOffer, RawRegionSample, RawUnitInfo, RealizedDispatch, VolumeOffer};
use bidstack_core::{MarketDataSource, Result, TimeWindow};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Raw tables held in memory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemorySource {
    #[serde(default)]
    pub volume_offers: Vec<VolumeOffer>,
    #[serde(default)]
    pub price_offers: Vec<PriceOffer>,
    #[serde(default)]
    pub realized_dispatch: Vec<RealizedDispatch>,
    #[serde(default)]
    pub units: Vec<RawUnitInfo>,
    #[serde(default)]
    pub region_samples: Vec<RawRegionSample>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse raw tables from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load raw tables from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

impl MarketDataSource for InMemorySource {
    fn volume_offers(&self, window: &TimeWindow) -> Result<Vec<VolumeOffer>> {
        Ok(self
            .volume_offers
            .iter()
            .filter(|v| window.contains(v.interval))
            .cloned()
            .collect())
    }

    fn price_offers(&self, window: &TimeWindow) -> Result<Vec<PriceOffer>> {
        // A trading day can start the calendar day before its first interval
        let first_day = (window.start() - Duration::days(1)).date();
        let last_day = window.end().date();
        Ok(self
            .price_offers
            .iter()
            .filter(|p| p.settlement_day >= first_day && p.settlement_day <= last_day)
            .cloned()
            .collect())
    }

    fn realized_dispatch(&self, window: &TimeWindow) -> Result<Vec<RealizedDispatch>> {
        Ok(self
            .realized_dispatch
            .iter()
            .filter(|r| window.contains(r.interval))
            .cloned()
            .collect())
    }

    fn unit_reference(&self) -> Result<Vec<RawUnitInfo>> {
        Ok(self.units.clone())
    }

    fn region_samples(&self, window: &TimeWindow) -> Result<Vec<RawRegionSample>> {
        Ok(self
            .region_samples
            .iter()
            .filter(|s| window.contains(s.interval))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const FIXTURE: &str = r#"{
        "volume_offers": [
            {"interval": "2020-01-01T01:00:00", "settlement_day": "2020-01-01", "unit_id": "A",
             "bid_type": "ENERGY", "max_avail": 100, "ramp_up_rate": 1, "ramp_down_rate": 1,
             "pasa_availability": 100, "BANDAVAIL1": 10},
            {"interval": "2020-01-01T01:05:00", "settlement_day": "2020-01-01", "unit_id": "A",
             "bid_type": "ENERGY", "max_avail": 100, "ramp_up_rate": 1, "ramp_down_rate": 1,
             "pasa_availability": 100, "BANDAVAIL1": 10}
        ],
        "price_offers": [
            {"settlement_day": "2019-12-30", "unit_id": "A", "bid_type": "ENERGY", "PRICEBAND1": 1},
            {"settlement_day": "2020-01-01", "unit_id": "A", "bid_type": "ENERGY", "PRICEBAND1": 2}
        ],
        "units": [
            {"unit_id": "A", "region": "SA1", "fuel_source": "Wind", "dispatch_type": "Generator",
             "technology": "Wind - Onshore", "station_name": "A Wind Farm"}
        ]
    }"#;

    fn window(start: (u32, u32), end: (u32, u32)) -> TimeWindow {
        let day = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        TimeWindow::new(
            day.and_hms_opt(start.0, start.1, 0).unwrap(),
            day.and_hms_opt(end.0, end.1, 0).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_load_fixture() {
        let source = InMemorySource::from_json_str(FIXTURE).unwrap();
        assert_eq!(source.volume_offers.len(), 2);
        assert_eq!(source.units.len(), 1);
        assert!(source.realized_dispatch.is_empty());
    }

    #[test]
    fn test_windowed_fetch_is_half_open() {
        let source = InMemorySource::from_json_str(FIXTURE).unwrap();
        let offers = source.volume_offers(&window((1, 0), (1, 5))).unwrap();
        assert_eq!(offers.len(), 1);
        assert_eq!(offers[0].interval.format("%H:%M").to_string(), "01:05");
    }

    #[test]
    fn test_price_offers_cover_window_days() {
        let source = InMemorySource::from_json_str(FIXTURE).unwrap();
        let prices = source.price_offers(&window((1, 0), (2, 0))).unwrap();
        assert_eq!(prices.len(), 1);
        assert_eq!(prices[0].bands.get("PRICEBAND1"), Some(2.0));
    }
}
