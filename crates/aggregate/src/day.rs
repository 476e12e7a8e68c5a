//! Per-day unit of work.
//!
//! A [`DayUnit`] owns everything computed for one (instrument, exchange,
//! date): the trade ledger, its alias-fixed variant, positions and broker
//! stats. Each is fetched or computed on first access and cached on the
//! instance until the date changes or the unit is refreshed.

use chrono::NaiveDate;
use std::sync::Arc;
use ticksmith_core::{
    config::ResampleConfig, BrokerStat, Config, Interval, OhlcvBar, Registry, Result,
    SessionHours, ValueField,
};
use ticksmith_features::{BrokerNetter, MovingAverageEngine, Resampler, VwapCalculator};
use ticksmith_ingestion::{DataSource, HistorySeries, PositionBook, TradeLedger};
use tracing::debug;

use crate::calendar::IntoDate;

/// One instrument on one exchange on one trading date.
pub struct DayUnit {
    source: Arc<dyn DataSource>,
    instrument: String,
    exchange: String,
    date: NaiveDate,
    session: SessionHours,
    config: Config,
    /// Ledger with the derivatives filter applied.
    ledger: Option<TradeLedger>,
    /// `ledger` after the alias fix.
    aliased: Option<TradeLedger>,
    positions: Option<PositionBook>,
    broker_stats: Option<Vec<BrokerStat>>,
    /// Not tied to the date; survives `set_date`.
    history: Option<HistorySeries>,
}

impl DayUnit {
    /// Create a unit of work. Nicknames are resolved through `registry`.
    ///
    /// Fails on an invalid `config` or malformed date text.
    pub fn new(
        source: Arc<dyn DataSource>,
        registry: &Registry,
        instrument: &str,
        exchange: &str,
        date: impl IntoDate,
        config: Config,
    ) -> Result<Self> {
        config.validate()?;
        let date = date.into_date()?;
        let (instrument, exchange) = registry.resolve(instrument, exchange);
        let session = registry.session(&exchange);

        Ok(Self {
            source,
            instrument,
            exchange,
            date,
            session,
            config,
            ledger: None,
            aliased: None,
            positions: None,
            broker_stats: None,
            history: None,
        })
    }

    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Move the unit to another date, dropping every per-day cache.
    pub fn set_date(&mut self, date: impl IntoDate) -> Result<()> {
        self.date = date.into_date()?;
        self.invalidate();
        Ok(())
    }

    /// Drop per-day caches so the next access fetches again.
    pub fn invalidate(&mut self) {
        self.ledger = None;
        self.aliased = None;
        self.positions = None;
        self.broker_stats = None;
    }

    /// Re-fetch trades and positions now.
    pub fn refresh(&mut self) -> Result<()> {
        self.invalidate();
        self.base_ledger(false)?;
        self.positions()?;
        Ok(())
    }

    /// The day's trade ledger, optionally with the VWAP column and the alias
    /// fix applied. An empty ledger means no trades that day.
    pub fn trades(&mut self, vwap: bool, fix_alias: bool) -> Result<&TradeLedger> {
        if fix_alias {
            self.aliased_ledger(vwap)
        } else {
            self.base_ledger(vwap)
        }
    }

    /// OHLCV bars using the configured interval and VWAP setting.
    pub fn ohlcv(&mut self) -> Result<Option<Vec<OhlcvBar>>> {
        let interval = self.config.resample.interval;
        let vwap = self.config.resample.vwap;
        self.ohlcv_with(interval, vwap)
    }

    /// OHLCV bars at `interval`. `None` when the day has no trades.
    pub fn ohlcv_with(&mut self, interval: Interval, vwap: bool) -> Result<Option<Vec<OhlcvBar>>> {
        let resample = ResampleConfig {
            interval,
            vwap,
            ..self.config.resample.clone()
        };
        let resampler = Resampler::from_config(&resample, self.session);
        let ledger = self.base_ledger(vwap)?;
        Ok(resampler.resample(ledger))
    }

    /// Quote snapshots inside the session window.
    pub fn positions(&mut self) -> Result<&PositionBook> {
        let book = match self.positions.take() {
            Some(book) => book,
            None => {
                let rows = self
                    .source
                    .fetch_positions(&self.instrument, &self.exchange, self.date)?;
                debug!(
                    source = self.source.name(),
                    instrument = %self.instrument,
                    date = %self.date,
                    rows = rows.len(),
                    "fetched positions"
                );
                PositionBook::from_raw(self.date, rows, &self.session)?
            }
        };
        Ok(self.positions.insert(book))
    }

    /// Broker net-flow table. Uses the alias-fixed ledger when the config
    /// enables the alias fix.
    pub fn broker_stats(&mut self) -> Result<&[BrokerStat]> {
        let stats = match self.broker_stats.take() {
            Some(stats) => stats,
            None => {
                let fix_alias = self.config.ledger.fix_alias;
                BrokerNetter::from_ledger(self.trades(false, fix_alias)?)
            }
        };
        Ok(self.broker_stats.insert(stats))
    }

    /// Daily history with the configured moving averages.
    pub fn history(&mut self) -> Result<&HistorySeries> {
        let windows = self.config.history.moving_averages.clone();
        let field = self.config.history.value_field;
        self.history_with(&windows, field)
    }

    /// Daily history, oldest first, with an `ma<w>` column for each window.
    pub fn history_with(&mut self, windows: &[usize], field: ValueField) -> Result<&HistorySeries> {
        let engine = MovingAverageEngine::new(windows.to_vec())?;

        let mut series = match self.history.take() {
            Some(series) => series,
            None => {
                let rows = self.source.fetch_history(&self.instrument, &self.exchange)?;
                HistorySeries::from_raw(rows)
            }
        };
        engine.apply(&mut series, field);
        Ok(self.history.insert(series))
    }

    fn base_ledger(&mut self, vwap: bool) -> Result<&TradeLedger> {
        let ledger = match self.ledger.take() {
            Some(ledger) => ledger,
            None => self.fetch_ledger()?,
        };
        let ledger = if vwap {
            VwapCalculator::apply(ledger)?
        } else {
            ledger
        };
        Ok(self.ledger.insert(ledger))
    }

    fn aliased_ledger(&mut self, vwap: bool) -> Result<&TradeLedger> {
        let aliased = match self.aliased.take() {
            Some(ledger) => ledger,
            None => {
                let alias_code = self.config.ledger.alias_code.clone();
                self.base_ledger(false)?.with_alias_fixed(&alias_code)?
            }
        };
        let aliased = if vwap {
            VwapCalculator::apply(aliased)?
        } else {
            aliased
        };
        Ok(self.aliased.insert(aliased))
    }

    fn fetch_ledger(&self) -> Result<TradeLedger> {
        let rows = self
            .source
            .fetch_trades(&self.instrument, &self.exchange, self.date)?;
        debug!(
            source = self.source.name(),
            instrument = %self.instrument,
            date = %self.date,
            rows = rows.len(),
            "fetched trades"
        );
        TradeLedger::from_raw(self.date, rows, self.config.ledger.exclude_derivatives)
    }
}
