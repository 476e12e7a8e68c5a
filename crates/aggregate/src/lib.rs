//! Per-day and multi-day orchestration for the ticksmith system.
//!
//! This crate handles:
//! - Weekday calendar walking between two dates
//! - Per-day units of work with cached trades, bars, quotes and broker stats
//! - Concatenating per-day results over a date range, sequentially or on a
//!   rayon pool

pub mod calendar;
pub mod day;
pub mod multi;

pub use calendar::{is_weekend, CalendarWalker, IntoDate};
pub use day::DayUnit;
pub use multi::{Artifact, MultiDayAggregator, MultiDaySeries};
