//! Price bin classification.
//!
//! A fixed, ordered partition of the price axis. Lower edges are inclusive and
//! upper edges exclusive, so a price on a boundary falls into the upper bin.

use bidstack_core::config::{BinningConfig, DEFAULT_PRICE_BINS};
use bidstack_core::PriceBinSpec;
use bidstack_core::{Error, Result};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One named price range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBin {
    /// Display name, e.g. "[0,50)".
    pub name: String,
    /// Inclusive lower edge ($/MWh).
    pub lower_edge: f64,
    /// Exclusive upper edge ($/MWh).
    pub upper_edge: f64,
}

impl PriceBin {
    #[inline]
    pub fn contains(&self, price: f64) -> bool {
        price >= self.lower_edge && price < self.upper_edge
    }
}

/// Classifies prices into bins.
#[derive(Debug, Clone)]
pub struct PriceBinner {
    /// Bins keyed by lower edge.
    bins: BTreeMap<OrderedFloat<f64>, PriceBin>,
}

impl PriceBinner {
    /// Build a binner from a validated bin table.
    pub fn new(config: &BinningConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_specs(&config.bins))
    }

    fn from_specs(specs: &[PriceBinSpec]) -> Self {
        let bins = specs
            .iter()
            .map(|spec| {
                (
                    OrderedFloat(spec.lower_edge),
                    PriceBin {
                        name: spec.name(),
                        lower_edge: spec.lower_edge,
                        upper_edge: spec.upper_edge,
                    },
                )
            })
            .collect();
        Self { bins }
    }

    /// Get the bin for a price.
    pub fn bin_for(&self, price: f64) -> Result<&PriceBin> {
        if price.is_nan() {
            return Err(Error::PriceOutOfRange(price));
        }
        self.bins
            .range(..=OrderedFloat(price))
            .next_back()
            .map(|(_, bin)| bin)
            .filter(|bin| bin.contains(price))
            .ok_or(Error::PriceOutOfRange(price))
    }

    /// Get the bin name for a price.
    pub fn classify(&self, price: f64) -> Result<&str> {
        self.bin_for(price).map(|bin| bin.name.as_str())
    }
}

impl Default for PriceBinner {
    fn default() -> Self {
        Self::from_specs(&DEFAULT_PRICE_BINS)
    }
}
