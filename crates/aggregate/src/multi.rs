//! Multi-day aggregation.
//!
//! Walks the trading calendar, runs one [`DayUnit`] per date and concatenates
//! each day's non-empty result into a single date-ascending series.

use chrono::NaiveDate;
use rayon::prelude::*;
use std::fmt;
use std::sync::Arc;
use ticksmith_core::{Config, Error, Interval, OhlcvBar, Position, Registry, Result, Trade};
use ticksmith_ingestion::DataSource;
use tracing::{debug, info, warn};

use crate::calendar::{CalendarWalker, IntoDate};
use crate::day::DayUnit;

/// Which per-day artifact a walk collects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    Trades,
    Positions,
    Ohlcv,
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Artifact::Trades => write!(f, "trades"),
            Artifact::Positions => write!(f, "positions"),
            Artifact::Ohlcv => write!(f, "ohlcv"),
        }
    }
}

/// Rows from several trading days, appended one whole day at a time.
#[derive(Debug, Clone)]
pub struct MultiDaySeries<T> {
    dates: Vec<NaiveDate>,
    /// Index of each day's first row in `rows`.
    offsets: Vec<usize>,
    rows: Vec<T>,
}

impl<T> Default for MultiDaySeries<T> {
    fn default() -> Self {
        Self {
            dates: Vec::new(),
            offsets: Vec::new(),
            rows: Vec::new(),
        }
    }
}

impl<T> MultiDaySeries<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one day's rows.
    ///
    /// The day must be later than every day already held and must bring at
    /// least one row.
    pub fn push_day(&mut self, date: NaiveDate, rows: Vec<T>) -> Result<()> {
        if rows.is_empty() {
            return Err(Error::data(format!("no rows for {date}")));
        }
        if let Some(&last) = self.dates.last() {
            if date <= last {
                return Err(Error::data(format!("day {date} appended after {last}")));
            }
        }
        self.dates.push(date);
        self.offsets.push(self.rows.len());
        self.rows.extend(rows);
        Ok(())
    }

    /// Dates held, ascending.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<T> {
        self.rows
    }

    pub fn day_count(&self) -> usize {
        self.dates.len()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows for a single date, if held.
    pub fn day(&self, date: NaiveDate) -> Option<&[T]> {
        let idx = self.dates.binary_search(&date).ok()?;
        Some(&self.rows[self.day_bounds(idx)])
    }

    /// `(date, rows)` per day, ascending.
    pub fn iter_days(&self) -> impl Iterator<Item = (NaiveDate, &[T])> + '_ {
        self.dates
            .iter()
            .enumerate()
            .map(move |(idx, &date)| (date, &self.rows[self.day_bounds(idx)]))
    }

    fn day_bounds(&self, idx: usize) -> std::ops::Range<usize> {
        let start = self.offsets[idx];
        let end = self.offsets.get(idx + 1).copied().unwrap_or(self.rows.len());
        start..end
    }
}

/// Concatenates per-day results for one instrument over a date range.
pub struct MultiDayAggregator {
    source: Arc<dyn DataSource>,
    registry: Arc<Registry>,
    instrument: String,
    exchange: String,
    config: Config,
}

impl MultiDayAggregator {
    /// Create with the default config and the built-in registry.
    pub fn new(source: Arc<dyn DataSource>, instrument: &str, exchange: &str) -> Self {
        Self {
            source,
            registry: Arc::new(Registry::builtin()),
            instrument: instrument.to_string(),
            exchange: exchange.to_string(),
            config: Config::default(),
        }
    }

    pub fn with_config(mut self, config: Config) -> Result<Self> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    pub fn with_registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Trades for every trading day in the range. `None` when no day had any.
    pub fn trades(
        &self,
        start: impl IntoDate,
        end: impl IntoDate,
    ) -> Result<Option<MultiDaySeries<Trade>>> {
        let fix_alias = self.config.ledger.fix_alias;
        self.collect(Artifact::Trades, start, end, |unit| {
            let ledger = unit.trades(false, fix_alias)?;
            Ok((!ledger.is_empty()).then(|| ledger.trades().to_vec()))
        })
    }

    /// In-session quote snapshots for every trading day in the range.
    pub fn positions(
        &self,
        start: impl IntoDate,
        end: impl IntoDate,
    ) -> Result<Option<MultiDaySeries<Position>>> {
        self.collect(Artifact::Positions, start, end, |unit| {
            let book = unit.positions()?;
            Ok((!book.is_empty()).then(|| book.positions().to_vec()))
        })
    }

    /// OHLCV bars at the configured interval for every trading day.
    pub fn ohlcv(
        &self,
        start: impl IntoDate,
        end: impl IntoDate,
    ) -> Result<Option<MultiDaySeries<OhlcvBar>>> {
        self.ohlcv_with(start, end, self.config.resample.interval)
    }

    /// OHLCV bars at `interval` for every trading day.
    pub fn ohlcv_with(
        &self,
        start: impl IntoDate,
        end: impl IntoDate,
        interval: Interval,
    ) -> Result<Option<MultiDaySeries<OhlcvBar>>> {
        let vwap = self.config.resample.vwap;
        self.collect(Artifact::Ohlcv, start, end, |unit| unit.ohlcv_with(interval, vwap))
    }

    fn collect<T, F>(
        &self,
        artifact: Artifact,
        start: impl IntoDate,
        end: impl IntoDate,
        compute: F,
    ) -> Result<Option<MultiDaySeries<T>>>
    where
        T: Send,
        F: Fn(&mut DayUnit) -> Result<Option<Vec<T>>> + Sync,
    {
        let mut dates: Vec<NaiveDate> = CalendarWalker::between(start, end)?.collect();
        dates.sort_unstable();

        let run_day = |date: &NaiveDate| -> (NaiveDate, Result<Option<Vec<T>>>) {
            let result = DayUnit::new(
                Arc::clone(&self.source),
                &self.registry,
                &self.instrument,
                &self.exchange,
                *date,
                self.config.clone(),
            )
            .and_then(|mut unit| compute(&mut unit));
            (*date, result)
        };

        let results: Vec<(NaiveDate, Result<Option<Vec<T>>>)> = if self.config.aggregator.parallel {
            let workers = self.config.aggregator.workers as usize;
            if workers > 0 {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(workers)
                    .build()
                    .map_err(|e| Error::config(format!("failed to build worker pool: {e}")))?;
                pool.install(|| dates.par_iter().map(run_day).collect())
            } else {
                dates.par_iter().map(run_day).collect()
            }
        } else {
            dates.iter().map(run_day).collect()
        };

        let mut series: Option<MultiDaySeries<T>> = None;
        let mut skipped = 0usize;
        for (date, result) in results {
            match result {
                Ok(Some(rows)) if !rows.is_empty() => {
                    series.get_or_insert_with(MultiDaySeries::new).push_day(date, rows)?;
                }
                Ok(_) => {
                    debug!(%date, %artifact, instrument = %self.instrument, "no data, day skipped");
                    skipped += 1;
                }
                Err(e @ Error::Config(_)) => return Err(e),
                Err(e) => {
                    warn!(
                        %date,
                        %artifact,
                        instrument = %self.instrument,
                        error = %e,
                        "day failed, skipped"
                    );
                    skipped += 1;
                }
            }
        }

        info!(
            %artifact,
            instrument = %self.instrument,
            exchange = %self.exchange,
            days = series.as_ref().map_or(0, MultiDaySeries::day_count),
            skipped,
            rows = series.as_ref().map_or(0, MultiDaySeries::len),
            "multi-day aggregation complete"
        );

        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use ticksmith_core::{timestamp_to_epoch, RawHistoryRow, RawPositionRow, RawTradeRow};

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Two trades per listed day; fails on `broken`.
    struct ScriptedSource {
        trading_days: HashSet<NaiveDate>,
        broken: Option<NaiveDate>,
    }

    impl ScriptedSource {
        fn make(days: &[NaiveDate], broken: Option<NaiveDate>) -> Arc<Self> {
            Arc::new(Self {
                trading_days: days.iter().copied().collect(),
                broken,
            })
        }
    }

    fn make_trade(date: NaiveDate, h: u32, m: u32, price: f64) -> RawTradeRow {
        RawTradeRow {
            time: timestamp_to_epoch(date.and_hms_opt(h, m, 0).unwrap()),
            price,
            volume: 10,
            source: "Auto trade".to_string(),
            buyer: "DNB".to_string(),
            seller: "NMBR".to_string(),
            initiator: String::new(),
        }
    }

    impl DataSource for ScriptedSource {
        fn name(&self) -> &str {
            "scripted"
        }

        fn fetch_trades(&self, _: &str, _: &str, date: NaiveDate) -> Result<Vec<RawTradeRow>> {
            if self.broken == Some(date) {
                return Err(Error::fetch("timeout"));
            }
            if !self.trading_days.contains(&date) {
                return Ok(Vec::new());
            }
            Ok(vec![make_trade(date, 9, 0, 100.0), make_trade(date, 9, 12, 101.0)])
        }

        fn fetch_positions(
            &self,
            _: &str,
            _: &str,
            date: NaiveDate,
        ) -> Result<Vec<RawPositionRow>> {
            if !self.trading_days.contains(&date) {
                return Ok(Vec::new());
            }
            Ok(vec![RawPositionRow {
                time: timestamp_to_epoch(date.and_hms_opt(10, 0, 0).unwrap()),
                bid: 99.0,
                bid_depth: 1,
                bid_depth_total: 1,
                ask: 101.0,
                ask_depth: 1,
                ask_depth_total: 1,
            }])
        }

        fn fetch_history(&self, _: &str, _: &str) -> Result<Vec<RawHistoryRow>> {
            Ok(Vec::new())
        }
    }

    fn week() -> Vec<NaiveDate> {
        (2..=6).map(|d| ymd(2023, 1, d)).collect()
    }

    #[test]
    fn test_series_push_day_ordering() {
        let mut series = MultiDaySeries::new();
        series.push_day(ymd(2023, 1, 3), vec![1, 2]).unwrap();
        series.push_day(ymd(2023, 1, 4), vec![3]).unwrap();

        assert!(matches!(series.push_day(ymd(2023, 1, 4), vec![4]), Err(Error::Data(_))));
        assert!(matches!(series.push_day(ymd(2023, 1, 5), Vec::new()), Err(Error::Data(_))));

        assert_eq!(series.day_count(), 2);
        assert_eq!(series.rows(), &[1, 2, 3]);
        assert_eq!(series.day(ymd(2023, 1, 3)), Some(&[1, 2][..]));
        assert_eq!(series.day(ymd(2023, 1, 4)), Some(&[3][..]));
        assert_eq!(series.day(ymd(2023, 1, 5)), None);

        let days: Vec<(NaiveDate, usize)> = series.iter_days().map(|(d, r)| (d, r.len())).collect();
        assert_eq!(days, vec![(ymd(2023, 1, 3), 2), (ymd(2023, 1, 4), 1)]);
    }

    #[test]
    fn test_trades_skip_weekend_and_empty_day() {
        // Mon 2 .. Mon 9, no data on Wed 4.
        let mut days = week();
        days.push(ymd(2023, 1, 9));
        days.retain(|d| *d != ymd(2023, 1, 4));
        let agg = MultiDayAggregator::new(ScriptedSource::make(&days, None), "EQNR", "OSE");

        let series = agg.trades("20230102", "20230109").unwrap().unwrap();
        // 8 calendar days, 2 weekend days, 1 empty day.
        assert_eq!(series.day_count(), 8 - 2 - 1);
        assert_eq!(series.len(), 10);
        assert!(series.rows().windows(2).all(|w| w[0].time <= w[1].time));
    }

    #[test]
    fn test_descending_range_is_ascending_output() {
        let agg = MultiDayAggregator::new(ScriptedSource::make(&week(), None), "EQNR", "OSE");
        let forward = agg.trades(ymd(2023, 1, 2), ymd(2023, 1, 6)).unwrap().unwrap();
        let backward = agg.trades(ymd(2023, 1, 6), ymd(2023, 1, 2)).unwrap().unwrap();
        assert_eq!(forward.dates(), backward.dates());
        assert_eq!(forward.dates()[0], ymd(2023, 1, 2));
    }

    #[test]
    fn test_fetch_failure_skips_day() {
        let source = ScriptedSource::make(&week(), Some(ymd(2023, 1, 3)));
        let agg = MultiDayAggregator::new(source, "EQNR", "OSE");
        let series = agg.trades(ymd(2023, 1, 2), ymd(2023, 1, 6)).unwrap().unwrap();
        assert_eq!(series.day_count(), 4);
        assert!(series.day(ymd(2023, 1, 3)).is_none());
    }

    #[test]
    fn test_no_data_is_none() {
        let agg = MultiDayAggregator::new(ScriptedSource::make(&[], None), "EQNR", "OSE");
        assert!(agg.ohlcv(ymd(2023, 1, 2), ymd(2023, 1, 6)).unwrap().is_none());
        // Weekend-only range.
        assert!(agg.positions(ymd(2023, 1, 7), ymd(2023, 1, 8)).unwrap().is_none());
    }

    #[test]
    fn test_ohlcv_per_day() {
        let agg = MultiDayAggregator::new(ScriptedSource::make(&week(), None), "EQNR", "OSE");
        let series = agg
            .ohlcv_with(ymd(2023, 1, 2), ymd(2023, 1, 3), Interval::from_minutes(5))
            .unwrap()
            .unwrap();

        // 09:00, 09:05, 09:10 each day
        assert_eq!(series.day_count(), 2);
        assert_eq!(series.len(), 6);
        assert_eq!(series.rows().iter().map(|b| b.volume).sum::<u64>(), 40);
    }

    #[test]
    fn test_positions() {
        let agg = MultiDayAggregator::new(ScriptedSource::make(&week(), None), "EQNR", "OSE");
        let series = agg.positions("20230102", "20230106").unwrap().unwrap();
        assert_eq!(series.len(), 5);
    }

    #[test]
    fn test_trades_alias_fix_from_config() {
        let mut config = Config::default();
        config.ledger.fix_alias = true;
        let agg = MultiDayAggregator::new(ScriptedSource::make(&week(), None), "EQNR", "OSE")
            .with_config(config)
            .unwrap();

        let series = agg.trades(ymd(2023, 1, 2), ymd(2023, 1, 2)).unwrap().unwrap();
        assert!(series.rows().iter().all(|t| t.seller == "DNB"));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let mut config = Config::default();
        config.aggregator.parallel = true;
        config.aggregator.workers = 2;

        let source = ScriptedSource::make(&week(), Some(ymd(2023, 1, 5)));
        let sequential = MultiDayAggregator::new(source.clone(), "EQNR", "OSE");
        let parallel = MultiDayAggregator::new(source, "EQNR", "OSE")
            .with_config(config)
            .unwrap();

        let a = sequential.ohlcv(ymd(2023, 1, 2), ymd(2023, 1, 8)).unwrap().unwrap();
        let b = parallel.ohlcv(ymd(2023, 1, 2), ymd(2023, 1, 8)).unwrap().unwrap();
        assert_eq!(a.dates(), b.dates());
        assert_eq!(a.rows(), b.rows());
    }

    #[test]
    fn test_malformed_range_is_parse_error() {
        let agg = MultiDayAggregator::new(ScriptedSource::make(&week(), None), "EQNR", "OSE");
        assert!(matches!(agg.trades("2023-01-02", "20230106"), Err(Error::Parse(_))));
    }

    #[test]
    fn test_artifact_display() {
        assert_eq!(Artifact::Ohlcv.to_string(), "ohlcv");
        assert_eq!(Artifact::Trades.to_string(), "trades");
    }
}
