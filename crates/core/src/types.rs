//! Core data types for the ticksmith system.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Exchange-local wall clock time of a trade or quote.
pub type Timestamp = NaiveDateTime;

/// Volume in shares/contracts.
pub type Volume = u64;

/// Trade source marking an exchange-reported derivatives trade.
pub const SOURCE_DERIVATIVES: &str = "Derivatives trade";

/// Trade source marking an official (closing/reference) print.
pub const SOURCE_OFFICIAL: &str = "Official";

/// Convert feed epoch seconds to a timestamp.
#[inline]
pub fn epoch_to_timestamp(secs: i64) -> Option<Timestamp> {
    DateTime::from_timestamp(secs, 0).map(|dt| dt.naive_utc())
}

/// Convert a timestamp back to feed epoch seconds.
#[inline]
pub fn timestamp_to_epoch(ts: Timestamp) -> i64 {
    ts.and_utc().timestamp()
}

/// Floor a timestamp to an interval boundary aligned to midnight of its date.
#[inline]
pub fn floor_to_interval(ts: Timestamp, interval_secs: i64) -> Timestamp {
    let midnight = ts.date().and_time(NaiveTime::MIN);
    let elapsed = (ts - midnight).num_seconds();
    midnight + Duration::seconds((elapsed / interval_secs) * interval_secs)
}

/// Raw trade row as delivered by the data source, before ledger normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTradeRow {
    /// Seconds since Unix epoch, exchange-local wall clock.
    pub time: i64,
    pub price: f64,
    pub volume: Volume,
    pub source: String,
    pub buyer: String,
    pub seller: String,
    pub initiator: String,
}

/// Raw quote row as delivered by the data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPositionRow {
    /// Seconds since Unix epoch, exchange-local wall clock.
    pub time: i64,
    pub bid: f64,
    pub bid_depth: Volume,
    pub bid_depth_total: Volume,
    pub ask: f64,
    pub ask_depth: Volume,
    pub ask_depth_total: Volume,
}

/// Raw daily history row. Feeds deliver these newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawHistoryRow {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Volume,
    pub turnover: f64,
}

/// A single normalized trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Trade time.
    pub time: Timestamp,
    /// Trade price.
    pub price: f64,
    /// Traded volume.
    pub volume: Volume,
    /// Feed source tag (e.g. "Auto trade", "Official").
    pub source: String,
    /// Buying broker code.
    pub buyer: String,
    /// Selling broker code.
    pub seller: String,
    /// Initiating side as reported by the feed.
    pub initiator: String,
    /// Cumulative VWAP at this trade, once computed.
    pub vwap: Option<f64>,
}

impl Trade {
    /// Whether this print is a derivatives or official trade.
    #[inline]
    pub fn is_derivative_or_official(&self) -> bool {
        self.source == SOURCE_DERIVATIVES || self.source == SOURCE_OFFICIAL
    }

    /// price × volume.
    #[inline]
    pub fn notional(&self) -> f64 {
        self.price * self.volume as f64
    }
}

/// Order book top-of-book snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub time: Timestamp,
    pub bid: f64,
    pub bid_depth: Volume,
    pub bid_depth_total: Volume,
    pub ask: f64,
    pub ask_depth: Volume,
    pub ask_depth_total: Volume,
}

impl Position {
    /// Calculate spread.
    #[inline]
    pub fn spread(&self) -> f64 {
        self.ask - self.bid
    }

    /// Calculate mid price.
    #[inline]
    pub fn mid(&self) -> f64 {
        (self.bid + self.ask) / 2.0
    }
}

/// Fixed-interval OHLCV bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcvBar {
    /// Bucket start, aligned to the interval from midnight.
    pub bucket_start: Timestamp,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Total volume (0 for gap-filled buckets).
    pub volume: Volume,
    /// Mean of per-trade cumulative VWAP inside the bucket, when requested.
    pub vwap: Option<f64>,
}

impl OhlcvBar {
    /// Whether this bar was synthesized for a bucket with no trades.
    #[inline]
    pub fn is_gap(&self) -> bool {
        self.volume == 0
    }
}

/// Per-broker net flow for one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerStat {
    /// Position in the table after sorting by net flow.
    pub rank: usize,
    pub broker: String,
    pub sold_volume: Volume,
    pub sold_trades: u64,
    pub bought_volume: Volume,
    pub bought_trades: u64,
    /// bought_volume - sold_volume.
    pub net: i64,
    /// net > 0.
    pub positive: bool,
}

/// Column of a daily history row that moving averages can run over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueField {
    Open,
    High,
    Low,
    #[default]
    Close,
    Volume,
    Turnover,
}

impl fmt::Display for ValueField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueField::Open => "open",
            ValueField::High => "high",
            ValueField::Low => "low",
            ValueField::Close => "close",
            ValueField::Volume => "volume",
            ValueField::Turnover => "turnover",
        };
        f.write_str(name)
    }
}

impl FromStr for ValueField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(ValueField::Open),
            "high" => Ok(ValueField::High),
            "low" => Ok(ValueField::Low),
            "close" => Ok(ValueField::Close),
            "volume" => Ok(ValueField::Volume),
            "turnover" => Ok(ValueField::Turnover),
            other => Err(Error::config(format!("unknown value field '{other}'"))),
        }
    }
}

/// One trading day of history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyHistoryRow {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Volume,
    pub turnover: f64,
    /// Moving averages keyed by window size; `None` until the window fills.
    pub moving_averages: BTreeMap<usize, Option<f64>>,
}

impl DailyHistoryRow {
    /// Read the given column as f64.
    pub fn value(&self, field: ValueField) -> f64 {
        match field {
            ValueField::Open => self.open,
            ValueField::High => self.high,
            ValueField::Low => self.low,
            ValueField::Close => self.close,
            ValueField::Volume => self.volume as f64,
            ValueField::Turnover => self.turnover,
        }
    }

    /// Moving average for `window` (the `ma<window>` column).
    pub fn moving_average(&self, window: usize) -> Option<f64> {
        self.moving_averages.get(&window).copied().flatten()
    }
}

impl From<RawHistoryRow> for DailyHistoryRow {
    fn from(raw: RawHistoryRow) -> Self {
        Self {
            date: raw.date,
            open: raw.open,
            high: raw.high,
            low: raw.low,
            close: raw.close,
            volume: raw.volume,
            turnover: raw.turnover,
            moving_averages: BTreeMap::new(),
        }
    }
}
