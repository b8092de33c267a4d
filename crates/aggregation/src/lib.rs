//! Price binning, sampling and aggregation for the bid-stack engine.
//!
//! This crate handles:
//! - Price bin classification
//! - Hourly resolution sampling
//! - Grouped sum and demand-weighted mean reduction
//! - The in-core query engine

pub mod price_bins;
pub mod sampler;
pub mod aggregator;
pub mod engine;

pub use price_bins::{PriceBin, PriceBinner};
pub use sampler::ResolutionSampler;
pub use aggregator::{aggregate, selected_units, Observation, Reducer};
pub use engine::QueryEngine;
