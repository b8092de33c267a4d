//! Preprocessing pipeline.
//!
//! Raw offer tables → stacked bids → availability-clamped bids, and
//! raw offer + telemetry tables → unit dispatch metrics.

use crate::clamper::AvailabilityClamper;
use crate::dispatch_metrics::{AsBidMetrics, DispatchMetricsCalculator};
use crate::stacker::BidStacker;
use crate::unit_catalog::UnitCatalog;
use bidstack_core::config::MarketConfig;
use bidstack_core::raw::{PriceOffer, RawRegionSample, RealizedDispatch, VolumeOffer};
use bidstack_core::{
    AdjustedBidRecord, AvailabilityRecord, MarketDataSource, RegionSample, Result, TimeWindow,
    UnitDispatchMetrics, UnitInfo,
};
use tracing::{debug, warn};

/// Runs the ingestion components in order.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    energy_bid_type: String,
    stacker: BidStacker,
    clamper: AvailabilityClamper,
    calculator: DispatchMetricsCalculator,
    catalog: UnitCatalog,
}

impl Preprocessor {
    /// Create a preprocessor from market configuration.
    pub fn new(config: &MarketConfig) -> Self {
        Self {
            energy_bid_type: config.energy_bid_type.clone(),
            stacker: BidStacker::new(),
            clamper: AvailabilityClamper::new(),
            calculator: DispatchMetricsCalculator::new(config.interval_minutes),
            catalog: UnitCatalog::new(config.excluded_units.clone()),
        }
    }

    /// Stack energy offers, drop empty bands and clamp to availability.
    pub fn prepare_bids(
        &self,
        volume_offers: &[VolumeOffer],
        price_offers: &[PriceOffer],
        realized: &[RealizedDispatch],
    ) -> Vec<AdjustedBidRecord> {
        let volumes: Vec<VolumeOffer> = volume_offers
            .iter()
            .filter(|v| v.bid_type == self.energy_bid_type)
            .cloned()
            .collect();
        let prices: Vec<PriceOffer> = price_offers
            .iter()
            .filter(|p| p.bid_type == self.energy_bid_type)
            .cloned()
            .collect();

        let stacked = self.stacker.stack(&volumes, &prices);
        let stacked_count = stacked.len();
        let bids: Vec<_> = stacked.into_iter().filter(|b| b.offered_volume > 0.0).collect();
        debug!(dropped = stacked_count - bids.len(), "dropped zero volume bands");

        let availability: Vec<AvailabilityRecord> = realized
            .iter()
            .map(|r| AvailabilityRecord {
                interval: r.interval,
                unit_id: r.unit_id.clone(),
                availability: r.availability,
            })
            .collect();

        self.clamper.clamp(&bids, &availability)
    }

    /// Derive unit dispatch metrics from energy offers and telemetry.
    pub fn prepare_dispatch(
        &self,
        volume_offers: &[VolumeOffer],
        realized: &[RealizedDispatch],
    ) -> Vec<UnitDispatchMetrics> {
        let as_bid: Vec<AsBidMetrics> = volume_offers
            .iter()
            .filter(|v| v.bid_type == self.energy_bid_type)
            .map(AsBidMetrics::from)
            .collect();
        self.calculator.compute(&as_bid, realized)
    }

    /// Convert regional samples, skipping unknown regions.
    pub fn prepare_region_samples(&self, raw: &[RawRegionSample]) -> Vec<RegionSample> {
        raw.iter()
            .filter_map(|s| match s.region.parse() {
                Ok(region) => Some(RegionSample {
                    interval: s.interval,
                    region,
                    total_demand: s.total_demand,
                    price: s.price,
                }),
                Err(_) => {
                    warn!(region = %s.region, "skipping sample for unknown region");
                    None
                }
            })
            .collect()
    }

    /// Fetch and prepare clamped bids for a window, ordered by interval, unit and band.
    pub fn bid_data<S: MarketDataSource + ?Sized>(
        &self,
        source: &S,
        window: &TimeWindow,
    ) -> Result<Vec<AdjustedBidRecord>> {
        let volumes = source.volume_offers(window)?;
        let prices = source.price_offers(window)?;
        let realized = source.realized_dispatch(window)?;
        let mut bids = self.prepare_bids(&volumes, &prices, &realized);
        bids.retain(|b| window.contains(b.interval));
        Ok(bids)
    }

    /// Fetch and prepare unit dispatch metrics for a window, ordered by interval then unit.
    ///
    /// The last interval of the window has no successor inside the window and is dropped.
    pub fn unit_dispatch<S: MarketDataSource + ?Sized>(
        &self,
        source: &S,
        window: &TimeWindow,
    ) -> Result<Vec<UnitDispatchMetrics>> {
        let volumes = source.volume_offers(window)?;
        let realized = source.realized_dispatch(window)?;
        let mut metrics = self.prepare_dispatch(&volumes, &realized);
        metrics.retain(|m| window.contains(m.interval));
        Ok(metrics)
    }

    /// Fetch and prepare the unit reference table.
    pub fn unit_info<S: MarketDataSource + ?Sized>(&self, source: &S) -> Result<Vec<UnitInfo>> {
        Ok(self.catalog.prepare(&source.unit_reference()?))
    }

    /// Fetch and prepare regional demand and price for a window, ordered by
    /// interval then region name.
    pub fn region_data<S: MarketDataSource + ?Sized>(
        &self,
        source: &S,
        window: &TimeWindow,
    ) -> Result<Vec<RegionSample>> {
        let mut samples = self.prepare_region_samples(&source.region_samples(window)?);
        samples.retain(|s| window.contains(s.interval));
        samples.sort_by(|a, b| {
            (a.interval, a.region.as_str()).cmp(&(b.interval, b.region.as_str()))
        });
        Ok(samples)
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new(&MarketConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bidstack_core::raw::{BandColumns, PRICE_BAND_COLUMNS, VOLUME_BAND_COLUMNS};
    use bidstack_core::{IntervalTime, Region};
    use chrono::NaiveDate;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
    }

    fn ts(h: u32, m: u32) -> IntervalTime {
        day().and_hms_opt(h, m, 0).unwrap()
    }

    fn volume_offer(interval: IntervalTime, bid_type: &str, volumes: &[f64]) -> VolumeOffer {
        VolumeOffer {
            interval,
            settlement_day: day(),
            unit_id: "A".to_string(),
            bid_type: bid_type.to_string(),
            max_avail: 100.0,
            ramp_up_rate: 1.0,
            ramp_down_rate: 1.0,
            pasa_availability: 100.0,
            bands: BandColumns::from_values(&VOLUME_BAND_COLUMNS, volumes),
        }
    }

    fn price_offer(bid_type: &str, prices: &[f64]) -> PriceOffer {
        PriceOffer {
            settlement_day: day(),
            unit_id: "A".to_string(),
            bid_type: bid_type.to_string(),
            bands: BandColumns::from_values(&PRICE_BAND_COLUMNS, prices),
        }
    }

    fn realized(interval: IntervalTime, availability: f64) -> RealizedDispatch {
        RealizedDispatch {
            interval,
            unit_id: "A".to_string(),
            availability,
            total_cleared: 0.0,
            initial_output: 0.0,
            ramp_up_rate: 0.0,
            ramp_down_rate: 0.0,
        }
    }

    #[test]
    fn test_prepare_bids_filters_market_and_zero_volume() {
        let pre = Preprocessor::default();
        let volumes = vec![
            volume_offer(ts(1, 0), "ENERGY", &[10.0, 0.0, 30.0]),
            volume_offer(ts(1, 0), "RAISE6SEC", &[99.0]),
        ];
        let prices = vec![
            price_offer("ENERGY", &[10.0, 20.0, 30.0]),
            price_offer("RAISE6SEC", &[1.0]),
        ];

        let mut bids = pre.prepare_bids(&volumes, &prices, &[realized(ts(1, 0), 25.0)]);
        bids.sort_by_key(|b| b.band);

        assert_eq!(bids.len(), 2);
        assert_eq!(bids[0].band, 1);
        assert_eq!(bids[1].band, 3);
        assert_eq!(bids[0].adjusted_volume, 10.0);
        assert_eq!(bids[1].adjusted_volume, 15.0);
    }

    #[test]
    fn test_prepare_dispatch_ignores_other_markets() {
        let pre = Preprocessor::default();
        let volumes = vec![
            volume_offer(ts(1, 0), "ENERGY", &[]),
            volume_offer(ts(1, 5), "ENERGY", &[]),
            volume_offer(ts(1, 0), "LOWER5MIN", &[]),
        ];
        let dispatch = vec![realized(ts(1, 0), 10.0), realized(ts(1, 5), 10.0)];

        let metrics = pre.prepare_dispatch(&volumes, &dispatch);

        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].interval, ts(1, 0));
    }

    #[test]
    fn test_region_samples_strip_market_suffix() {
        let pre = Preprocessor::default();
        let raw = vec![
            RawRegionSample {
                interval: ts(1, 0),
                region: "SA1".to_string(),
                total_demand: 1000.0,
                price: 55.4,
            },
            RawRegionSample {
                interval: ts(1, 0),
                region: "SNOWY1".to_string(),
                total_demand: 1.0,
                price: 1.0,
            },
        ];

        let samples = pre.prepare_region_samples(&raw);

        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].region, Region::Sa);
    }

    #[test]
    fn test_region_data_is_ordered_by_interval_and_name() {
        let pre = Preprocessor::default();
        let mut source = crate::InMemorySource::new();
        for (h, m, region) in [(1, 5, "VIC1"), (1, 5, "NSW1"), (1, 0, "SA1"), (1, 0, "QLD1")] {
            source.region_samples.push(RawRegionSample {
                interval: ts(h, m),
                region: region.to_string(),
                total_demand: 100.0,
                price: 50.0,
            });
        }
        let window = TimeWindow::new(ts(0, 55), ts(1, 5)).unwrap();

        let order: Vec<(IntervalTime, Region)> = pre
            .region_data(&source, &window)
            .unwrap()
            .into_iter()
            .map(|s| (s.interval, s.region))
            .collect();

        // Region names sort as text: "QLD" before "SA", "NSW" before "VIC"
        assert_eq!(
            order,
            vec![
                (ts(1, 0), Region::Qld),
                (ts(1, 0), Region::Sa),
                (ts(1, 5), Region::Nsw),
                (ts(1, 5), Region::Vic),
            ]
        );
    }
}
