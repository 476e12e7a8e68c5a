//! Derived series computation for the ticksmith system.
//!
//! This crate handles:
//! - Cumulative VWAP
//! - Fixed-interval OHLCV resampling with gap filling
//! - Broker net-flow tables
//! - Moving averages over daily history

pub mod broker;
pub mod moving_average;
pub mod resampler;
pub mod vwap;

pub use broker::BrokerNetter;
pub use moving_average::MovingAverageEngine;
pub use resampler::Resampler;
pub use vwap::VwapCalculator;
