//! Core types and configuration for the bid-stack engine.
//!
//! This crate provides shared types used across all other crates:
//! - Raw offer, dispatch and unit reference tables
//! - Derived bid and dispatch metric records
//! - Query requests, time windows and argument validation
//! - The data-source and query-backend traits
//! - Configuration structures and the common error type

pub mod config;
pub mod error;
pub mod query;
pub mod raw;
pub mod time;
pub mod types;

pub use config::{Config, PriceBinSpec};
pub use error::{Error, Result};
pub use query::{
    BidAggregateQuery, DispatchQuery, MarketDataSource, MarketQueries, UnitBidQuery,
    UnitScopeQuery, UnitSelection,
};
pub use time::TimeWindow;
pub use types::*;
