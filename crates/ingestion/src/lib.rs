//! Data ingestion and normalization for the ticksmith system.
//!
//! This crate handles:
//! - The data source fetch interface and a CSV directory source
//! - Feed CSV parsing
//! - Trade ledger normalization (ordering, derivatives filter, alias fix)
//! - Quote snapshot clipping to session hours
//! - Daily history ordering

pub mod feed;
pub mod history;
pub mod ledger;
pub mod positions;
pub mod source;

pub use history::HistorySeries;
pub use ledger::{LedgerStats, TradeLedger};
pub use positions::PositionBook;
pub use source::{CsvDirectorySource, DataSource};
