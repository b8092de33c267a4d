//! Persisted mirror of the bid-stack engine on SQLite.
//!
//! This crate provides:
//! - The relational schema for clamped bids, dispatch metrics, unit reference,
//!   regional demand and price bins
//! - Population of the store from the ingestion pipeline
//! - SQL implementations of every query operation

pub mod schema;
pub mod store;
pub mod queries;

pub use store::{PopulateSummary, SqliteStore};
