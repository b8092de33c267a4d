//! In-core query engine.
//!
//! Fetches raw tables from a [`MarketDataSource`], runs the ingestion pipeline and
//! answers every [`MarketQueries`] operation in memory.

use crate::aggregator::{aggregate, selected_units, Observation, Reducer};
use crate::price_bins::PriceBinner;
use crate::sampler::ResolutionSampler;
use bidstack_core::query::sort_unit_bid_rows;
use bidstack_core::{
    AggregateRow, BidAggregateQuery, Config, DispatchDirection, DispatchQuery, MarketDataSource,
    MarketQueries, Region, Result, TimeWindow, UnitBidQuery, UnitBidRow, UnitName, UnitScopeQuery,
    UnitSelection,
};
use bidstack_ingestion::Preprocessor;
use std::collections::{BTreeSet, HashSet};
use tracing::debug;

/// Query engine over a raw data source.
pub struct QueryEngine<S> {
    /// Raw table provider.
    source: S,
    /// Ingestion pipeline.
    preprocessor: Preprocessor,
    /// Price bin table.
    binner: PriceBinner,
    /// Dispatch interval length in minutes.
    interval_minutes: u32,
}

impl<S: MarketDataSource> QueryEngine<S> {
    /// Create a new engine from configuration.
    pub fn new(source: S, config: &Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            source,
            preprocessor: Preprocessor::new(&config.market),
            binner: PriceBinner::new(&config.binning)?,
            interval_minutes: config.market.interval_minutes,
        })
    }
}

impl<S: MarketDataSource> MarketQueries for QueryEngine<S> {
    fn aggregate_bids(&self, query: &BidAggregateQuery) -> Result<Vec<AggregateRow>> {
        let bids = self.preprocessor.bid_data(&self.source, &query.window)?;
        let units = self.preprocessor.unit_info(&self.source)?;
        let selection = UnitSelection::Regions {
            regions: query.regions.clone(),
            direction: query.direction,
            tech: query.tech.clone(),
        };
        let in_scope = selected_units(&selection, &units);

        // Every bid in the window is binned before sampling so no bad price is skipped
        let binned = bids
            .iter()
            .filter(|b| in_scope.contains(&b.unit_id))
            .map(|b| -> Result<Observation> {
                let bin = self.binner.classify(b.price)?;
                Ok(Observation::new(
                    b.interval,
                    Some(bin.to_string()),
                    b.volume(query.volume),
                ))
            })
            .collect::<Result<Vec<_>>>()?;
        let observations = ResolutionSampler::sample(binned, query.resolution);

        let rows = aggregate(observations, Reducer::Sum);
        debug!(
            regions = ?query.regions,
            resolution = query.resolution.as_str(),
            units = in_scope.len(),
            rows = rows.len(),
            "aggregated bids"
        );
        Ok(rows)
    }

    fn unit_bids(&self, query: &UnitBidQuery) -> Result<Vec<UnitBidRow>> {
        let bids = self.preprocessor.bid_data(&self.source, &query.window)?;
        let wanted: HashSet<&str> = query.unit_ids.iter().map(String::as_str).collect();

        let mut rows: Vec<UnitBidRow> = bids
            .into_iter()
            .filter(|b| wanted.contains(b.unit_id.as_str()))
            .filter(|b| ResolutionSampler::retains(query.resolution, b.interval))
            .map(|b| UnitBidRow {
                interval: b.interval,
                band: b.band,
                volume: b.volume(query.volume),
                price: b.price,
                unit_id: b.unit_id,
            })
            .collect();
        sort_unit_bid_rows(&mut rows);

        debug!(units = wanted.len(), rows = rows.len(), "fetched unit bids");
        Ok(rows)
    }

    fn aggregate_dispatch_metrics(&self, query: &DispatchQuery) -> Result<Vec<AggregateRow>> {
        // One extra interval so the last requested interval has a successor
        let fetch_window = query.window.extend_end(self.interval_minutes as i64);
        let metrics = self.preprocessor.unit_dispatch(&self.source, &fetch_window)?;

        let units = match query.selection {
            UnitSelection::Regions { .. } => self.preprocessor.unit_info(&self.source)?,
            UnitSelection::Units(_) => Vec::new(),
        };
        let in_scope = selected_units(&query.selection, &units);

        let observations: Vec<Observation> = metrics
            .iter()
            .filter(|m| query.window.contains(m.interval))
            .filter(|m| in_scope.contains(&m.unit_id))
            .map(|m| Observation::new(m.interval, None, m.clamped().value(query.column)))
            .collect();

        let rows = aggregate(
            ResolutionSampler::sample(observations, query.resolution),
            Reducer::Sum,
        );
        debug!(
            column = query.column.as_str(),
            units = in_scope.len(),
            rows = rows.len(),
            "aggregated dispatch metrics"
        );
        Ok(rows)
    }

    fn weighted_average_price(
        &self,
        regions: &[Region],
        window: &TimeWindow,
    ) -> Result<Vec<AggregateRow>> {
        let samples = self.preprocessor.region_data(&self.source, window)?;
        let observations = samples
            .into_iter()
            .filter(|s| regions.contains(&s.region))
            .map(|s| Observation::new(s.interval, None, s.price).weighted(s.total_demand));
        Ok(aggregate(observations, Reducer::WeightedMean))
    }

    fn region_demand(&self, regions: &[Region], window: &TimeWindow) -> Result<Vec<AggregateRow>> {
        let samples = self.preprocessor.region_data(&self.source, window)?;
        let observations = samples
            .into_iter()
            .filter(|s| regions.contains(&s.region))
            .map(|s| Observation::new(s.interval, None, s.total_demand));
        Ok(aggregate(observations, Reducer::Sum))
    }

    fn units_in_scope(&self, query: &UnitScopeQuery) -> Result<Vec<UnitName>> {
        let bids = self.preprocessor.bid_data(&self.source, &query.window)?;
        let bidding: HashSet<&str> = bids.iter().map(|b| b.unit_id.as_str()).collect();

        let names: BTreeSet<UnitName> = self
            .preprocessor
            .unit_info(&self.source)?
            .into_iter()
            .filter(|u| query.regions.contains(&u.region))
            .filter(|u| u.direction == query.direction)
            .filter(|u| query.tech.allows(&u.category))
            .filter(|u| bidding.contains(u.unit_id.as_str()))
            .map(|u| UnitName {
                unit_id: u.unit_id,
                station_name: u.station_name,
            })
            .collect();
        Ok(names.into_iter().collect())
    }

    fn units_for_stations(&self, stations: &[String]) -> Result<Vec<String>> {
        let ids: BTreeSet<String> = self
            .preprocessor
            .unit_info(&self.source)?
            .into_iter()
            .filter(|u| stations.contains(&u.station_name))
            .map(|u| u.unit_id)
            .collect();
        Ok(ids.into_iter().collect())
    }

    fn distinct_technology_categories(
        &self,
        regions: Option<&[Region]>,
        direction: Option<DispatchDirection>,
    ) -> Result<Vec<String>> {
        let categories: BTreeSet<String> = self
            .preprocessor
            .unit_info(&self.source)?
            .into_iter()
            .filter(|u| regions.map_or(true, |r| r.contains(&u.region)))
            .filter(|u| direction.map_or(true, |d| d == u.direction))
            .map(|u| u.category)
            .collect();
        Ok(categories.into_iter().collect())
    }
}
