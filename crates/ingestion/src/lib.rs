//! Data ingestion and preprocessing for the bid-stack engine.
//!
//! This crate handles:
//! - Bid stacking (volume and price offers unpivoted and joined per band)
//! - Availability clamping of bid volumes
//! - Dispatch metric derivation (ramp envelopes, final output)
//! - Unit reference preprocessing and technology categorisation
//! - An in-memory source of raw tables

pub mod stacker;
pub mod clamper;
pub mod dispatch_metrics;
pub mod unit_catalog;
pub mod pipeline;
pub mod memory_source;

pub use stacker::{unpivot, BidStacker};
pub use clamper::AvailabilityClamper;
pub use dispatch_metrics::{AsBidMetrics, DispatchMetricsCalculator};
pub use unit_catalog::{categorise, UnitCatalog};
pub use pipeline::Preprocessor;
pub use memory_source::InMemorySource;
