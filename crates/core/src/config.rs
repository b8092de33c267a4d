//! Configuration structures for the bid-stack engine.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Market data conventions.
    #[serde(default)]
    pub market: MarketConfig,
    /// Price bin table.
    #[serde(default)]
    pub binning: BinningConfig,
    /// Persisted store settings.
    #[serde(default)]
    pub store: StoreConfig,
}

impl Config {
    /// Parse configuration from JSON and validate it.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file and validate it.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Check internal consistency.
    ///
    /// The bin table must cover every price between the market floor and cap.
    pub fn validate(&self) -> Result<()> {
        self.market.validate()?;
        self.binning.validate()?;
        let (first, last) = match (self.binning.bins.first(), self.binning.bins.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Err(Error::config("price bin table is empty")),
        };
        if first.lower_edge > self.market.market_price_floor
            || last.upper_edge <= self.market.market_price_cap
        {
            return Err(Error::config(format!(
                "price bins [{},{}) do not cover the market price range [{},{}]",
                first.lower_edge,
                last.upper_edge,
                self.market.market_price_floor,
                self.market.market_price_cap
            )));
        }
        Ok(())
    }
}

/// Market data conventions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Dispatch interval length in minutes.
    pub interval_minutes: u32,
    /// Market price floor ($/MWh).
    pub market_price_floor: f64,
    /// Market price cap ($/MWh).
    pub market_price_cap: f64,
    /// Bid type of the energy market; other markets are ignored.
    pub energy_bid_type: String,
    /// Placeholder units excluded from the unit reference table.
    pub excluded_units: Vec<String>,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            interval_minutes: 5,
            market_price_floor: -1000.0,
            market_price_cap: 15500.0,
            energy_bid_type: "ENERGY".to_string(),
            excluded_units: vec!["BLNKVIC".to_string(), "BLNKTAS".to_string()],
        }
    }
}

impl MarketConfig {
    fn validate(&self) -> Result<()> {
        if self.interval_minutes == 0 || 60 % self.interval_minutes != 0 {
            return Err(Error::config(format!(
                "interval_minutes must divide an hour, got {}",
                self.interval_minutes
            )));
        }
        if self.market_price_floor >= self.market_price_cap {
            return Err(Error::config("market_price_floor must be below market_price_cap"));
        }
        Ok(())
    }
}

/// Edges of one price bin: `[lower_edge, upper_edge)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBinSpec {
    pub lower_edge: f64,
    pub upper_edge: f64,
}

impl PriceBinSpec {
    pub const fn new(lower_edge: f64, upper_edge: f64) -> Self {
        Self {
            lower_edge,
            upper_edge,
        }
    }

    /// Display name, e.g. "[0,50)".
    pub fn name(&self) -> String {
        format!("[{},{})", self.lower_edge, self.upper_edge)
    }
}

/// Default bin edges.
pub const DEFAULT_PRICE_BINS: [PriceBinSpec; 11] = [
    PriceBinSpec::new(-2000.0, -100.0),
    PriceBinSpec::new(-100.0, 0.0),
    PriceBinSpec::new(0.0, 50.0),
    PriceBinSpec::new(50.0, 100.0),
    PriceBinSpec::new(100.0, 200.0),
    PriceBinSpec::new(200.0, 300.0),
    PriceBinSpec::new(300.0, 500.0),
    PriceBinSpec::new(500.0, 1000.0),
    PriceBinSpec::new(1000.0, 5000.0),
    PriceBinSpec::new(5000.0, 10000.0),
    PriceBinSpec::new(10000.0, 16000.0),
];

/// Price bin table configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinningConfig {
    /// Ordered, contiguous bins.
    pub bins: Vec<PriceBinSpec>,
}

impl Default for BinningConfig {
    fn default() -> Self {
        Self {
            bins: DEFAULT_PRICE_BINS.to_vec(),
        }
    }
}

impl BinningConfig {
    /// Bins must be non-empty, each of positive width, and contiguous.
    pub fn validate(&self) -> Result<()> {
        if self.bins.is_empty() {
            return Err(Error::config("price bin table is empty"));
        }
        for bin in &self.bins {
            if !(bin.lower_edge < bin.upper_edge) {
                return Err(Error::config(format!("price bin {} has no width", bin.name())));
            }
        }
        for pair in self.bins.windows(2) {
            if pair[0].upper_edge != pair[1].lower_edge {
                return Err(Error::config(format!(
                    "price bins {} and {} leave a gap or overlap",
                    pair[0].name(),
                    pair[1].name()
                )));
            }
        }
        Ok(())
    }
}

/// Persisted store configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite database file. `None` keeps the store in memory.
    pub path: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.market.interval_minutes, 5);
        assert_eq!(config.binning.bins.len(), 11);
        assert!(config.store.path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bin_names() {
        assert_eq!(DEFAULT_PRICE_BINS[0].name(), "[-2000,-100)");
        assert_eq!(DEFAULT_PRICE_BINS[2].name(), "[0,50)");
        assert_eq!(DEFAULT_PRICE_BINS[10].name(), "[10000,16000)");
    }

    #[test]
    fn test_gap_is_rejected() {
        let binning = BinningConfig {
            bins: vec![PriceBinSpec::new(0.0, 50.0), PriceBinSpec::new(60.0, 100.0)],
        };
        assert!(binning.validate().is_err());
    }

    #[test]
    fn test_overlap_is_rejected() {
        let binning = BinningConfig {
            bins: vec![PriceBinSpec::new(0.0, 50.0), PriceBinSpec::new(40.0, 100.0)],
        };
        assert!(binning.validate().is_err());
    }

    #[test]
    fn test_bins_must_cover_price_range() {
        let mut config = Config::default();
        config.binning.bins = vec![PriceBinSpec::new(-1000.0, 0.0), PriceBinSpec::new(0.0, 15000.0)];
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        config.binning.bins.push(PriceBinSpec::new(15000.0, 15500.5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_uses_defaults_for_missing_sections() {
        let config = Config::from_json_str(r#"{"store": {"path": "bids.db"}}"#).unwrap();
        assert_eq!(config.store.path.as_deref(), Some("bids.db"));
        assert_eq!(config.market.energy_bid_type, "ENERGY");
    }

    #[test]
    fn test_from_json_rejects_bad_interval() {
        let json = r#"{"market": {
            "interval_minutes": 7,
            "market_price_floor": -1000.0,
            "market_price_cap": 15500.0,
            "energy_bid_type": "ENERGY",
            "excluded_units": []
        }}"#;
        assert!(matches!(Config::from_json_str(json), Err(Error::Config(_))));
    }
}
