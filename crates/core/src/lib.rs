//! Core types and configuration for the ticksmith system.
//!
//! This crate provides shared types used across all other crates:
//! - Market data types (raw feed rows, trades, quotes, bars, broker stats, history)
//! - Configuration structures and interval parsing
//! - Exchange and nickname registry
//! - Common error types

pub mod config;
pub mod error;
pub mod registry;
pub mod types;

pub use config::{Config, Interval};
pub use error::{Error, Result};
pub use registry::{Registry, SessionHours};
pub use types::*;
