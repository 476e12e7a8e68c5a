//! Fixed-interval OHLCV resampling.
//!
//! Buckets are aligned to midnight of the trade date and form a contiguous
//! range from the first to the last traded bucket (optionally widened to the
//! session window). Buckets without trades are gap-filled:
//!
//! 1. `close` is carried forward from the previous bucket.
//! 2. Leading buckets take the next known `close`; every empty bucket's
//!    open/high/low then take its own `close`.
//!
//! Empty buckets always have zero volume.

use chrono::{Duration, NaiveDate};
use ticksmith_core::{
    config::ResampleConfig, floor_to_interval, Interval, OhlcvBar, SessionHours, Timestamp, Volume,
};
use ticksmith_ingestion::TradeLedger;
use tracing::debug;

use crate::vwap::VwapCalculator;

/// A bucket that's currently being built.
#[derive(Debug, Clone, Default)]
struct BucketAccumulator {
    open: Option<f64>,
    high: f64,
    low: f64,
    close: f64,
    volume: Volume,
    vwap_sum: f64,
    vwap_count: u32,
}

impl BucketAccumulator {
    fn add_trade(&mut self, price: f64, volume: Volume, vwap: Option<f64>) {
        if self.open.is_none() {
            self.open = Some(price);
            self.high = price;
            self.low = price;
        }
        self.high = self.high.max(price);
        self.low = self.low.min(price);
        self.close = price;
        self.volume += volume;
        if let Some(v) = vwap {
            self.vwap_sum += v;
            self.vwap_count += 1;
        }
    }

    fn to_partial(&self) -> PartialBar {
        match self.open {
            Some(open) => PartialBar {
                open: Some(open),
                high: Some(self.high),
                low: Some(self.low),
                close: Some(self.close),
                volume: self.volume,
                vwap: (self.vwap_count > 0).then(|| self.vwap_sum / self.vwap_count as f64),
            },
            None => PartialBar::default(),
        }
    }
}

/// Bar with possibly missing prices, before gap filling.
#[derive(Debug, Clone, Default)]
struct PartialBar {
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    volume: Volume,
    vwap: Option<f64>,
}

/// Resampler from a trade ledger to OHLCV bars.
#[derive(Debug, Clone)]
pub struct Resampler {
    interval: Interval,
    with_vwap: bool,
    session: Option<SessionHours>,
}

impl Resampler {
    /// Create a resampler for the given bucket width.
    pub fn new(interval: Interval) -> Self {
        Self {
            interval,
            with_vwap: false,
            session: None,
        }
    }

    /// Create from configuration. `session` is used only when the config asks
    /// for session-wide bars.
    pub fn from_config(config: &ResampleConfig, session: SessionHours) -> Self {
        let resampler = Self::new(config.interval).with_vwap(config.vwap);
        if config.fill_session {
            resampler.with_session(session)
        } else {
            resampler
        }
    }

    /// Attach per-bar mean VWAP.
    pub fn with_vwap(mut self, with_vwap: bool) -> Self {
        self.with_vwap = with_vwap;
        self
    }

    /// Cover the full pre-open..post-close window, not just traded buckets.
    pub fn with_session(mut self, session: SessionHours) -> Self {
        self.session = Some(session);
        self
    }

    pub fn interval(&self) -> Interval {
        self.interval
    }

    /// Resample a day's ledger.
    ///
    /// Returns `None` when the ledger has no trades.
    pub fn resample(&self, ledger: &TradeLedger) -> Option<Vec<OhlcvBar>> {
        let trades = ledger.trades();
        let first = trades.first()?;
        let last = trades.last()?;
        let secs = self.interval.secs();

        let (start, end) = self.bucket_range(ledger.date(), first.time, last.time);
        let count = ((end - start).num_seconds() / secs + 1) as usize;

        let vwap: Vec<Option<f64>> = match (self.with_vwap, ledger.has_vwap()) {
            (false, _) => vec![None; trades.len()],
            (true, true) => trades.iter().map(|t| t.vwap).collect(),
            (true, false) => VwapCalculator::compute(trades),
        };

        let mut buckets = vec![BucketAccumulator::default(); count];
        for (trade, vwap) in trades.iter().zip(vwap) {
            let idx = ((floor_to_interval(trade.time, secs) - start).num_seconds() / secs) as usize;
            buckets[idx].add_trade(trade.price, trade.volume, vwap);
        }

        let partials: Vec<PartialBar> = buckets.iter().map(BucketAccumulator::to_partial).collect();
        let bars = gap_fill(partials, start, self.interval)?;

        debug!(
            date = %ledger.date(),
            interval = %self.interval,
            bars = bars.len(),
            gaps = bars.iter().filter(|b| b.is_gap()).count(),
            "resampled trades"
        );

        Some(bars)
    }

    fn bucket_range(
        &self,
        date: NaiveDate,
        first: Timestamp,
        last: Timestamp,
    ) -> (Timestamp, Timestamp) {
        let secs = self.interval.secs();
        let mut start = floor_to_interval(first, secs);
        let mut end = floor_to_interval(last, secs);

        if let Some(session) = &self.session {
            let (open, close) = session.window(date);
            start = start.min(floor_to_interval(open, secs));
            // The last session bucket is the one holding the final second
            // before post-close.
            end = end.max(floor_to_interval(close - Duration::seconds(1), secs));
        }

        (start, end)
    }
}

/// Fill missing prices. Returns `None` only if no bucket has a close.
fn gap_fill(
    mut partials: Vec<PartialBar>,
    start: Timestamp,
    interval: Interval,
) -> Option<Vec<OhlcvBar>> {
    let mut prev_close = None;
    for bar in partials.iter_mut() {
        match bar.close {
            Some(close) => prev_close = Some(close),
            None => bar.close = prev_close,
        }
    }

    let mut next_close = None;
    for bar in partials.iter_mut().rev() {
        match bar.close {
            Some(close) => next_close = Some(close),
            None => bar.close = next_close,
        }
    }

    let step = interval.duration();
    partials
        .into_iter()
        .enumerate()
        .map(|(i, bar)| {
            let close = bar.close?;
            Some(OhlcvBar {
                bucket_start: start + step * i as i32,
                open: bar.open.unwrap_or(close),
                high: bar.high.unwrap_or(close),
                low: bar.low.unwrap_or(close),
                close,
                volume: bar.volume,
                vwap: bar.vwap,
            })
        })
        .collect()
}
