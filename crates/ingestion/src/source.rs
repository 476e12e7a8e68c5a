//! Data source abstraction.
//!
//! The core never talks to the network. Everything it needs arrives through
//! [`DataSource`], so feeds can be swapped or mocked in tests.

use chrono::NaiveDate;
use std::fs::File;
use std::path::{Path, PathBuf};
use ticksmith_core::{Error, RawHistoryRow, RawPositionRow, RawTradeRow, Result};
use tracing::debug;

use crate::feed;

/// Per-date fetch operations supplied by an external collaborator.
///
/// An empty vector means "no data for that day". Failures are reported as
/// [`Error::Fetch`] and are never retried by the core.
pub trait DataSource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// All trades for one instrument on one date, in feed order.
    fn fetch_trades(
        &self,
        instrument: &str,
        exchange: &str,
        date: NaiveDate,
    ) -> Result<Vec<RawTradeRow>>;

    /// All quote snapshots for one instrument on one date, in feed order.
    fn fetch_positions(
        &self,
        instrument: &str,
        exchange: &str,
        date: NaiveDate,
    ) -> Result<Vec<RawPositionRow>>;

    /// Daily history, newest first.
    fn fetch_history(&self, instrument: &str, exchange: &str) -> Result<Vec<RawHistoryRow>>;
}

/// Reads feed CSV files from a local directory tree:
///
/// ```text
/// <root>/<YYYYMMDD>/<instrument>.<exchange>.trades.csv
/// <root>/<YYYYMMDD>/<instrument>.<exchange>.positions.csv
/// <root>/<instrument>.<exchange>.history.csv
/// ```
///
/// A missing file is an empty day; an unreadable or malformed one is a fetch
/// failure.
#[derive(Debug, Clone)]
pub struct CsvDirectorySource {
    root: PathBuf,
}

impl CsvDirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a per-day feed file.
    pub fn day_path(
        &self,
        instrument: &str,
        exchange: &str,
        date: NaiveDate,
        kind: &str,
    ) -> PathBuf {
        self.root
            .join(date.format("%Y%m%d").to_string())
            .join(format!("{instrument}.{exchange}.{kind}.csv"))
    }

    /// Path of the history feed file.
    pub fn history_path(&self, instrument: &str, exchange: &str) -> PathBuf {
        self.root.join(format!("{instrument}.{exchange}.history.csv"))
    }

    fn open(path: &Path) -> Result<Option<File>> {
        match File::open(path) {
            Ok(file) => Ok(Some(file)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "feed file missing, treating as empty");
                Ok(None)
            }
            Err(e) => Err(Error::fetch(format!("{}: {e}", path.display()))),
        }
    }

    fn read_with<T>(
        path: &Path,
        parse: impl FnOnce(File) -> Result<Vec<T>>,
    ) -> Result<Vec<T>> {
        match Self::open(path)? {
            Some(file) => {
                parse(file).map_err(|e| Error::fetch(format!("{}: {e}", path.display())))
            }
            None => Ok(Vec::new()),
        }
    }
}

impl DataSource for CsvDirectorySource {
    fn name(&self) -> &str {
        "csv-directory"
    }

    fn fetch_trades(
        &self,
        instrument: &str,
        exchange: &str,
        date: NaiveDate,
    ) -> Result<Vec<RawTradeRow>> {
        let path = self.day_path(instrument, exchange, date, "trades");
        Self::read_with(&path, feed::parse_trades)
    }

    fn fetch_positions(
        &self,
        instrument: &str,
        exchange: &str,
        date: NaiveDate,
    ) -> Result<Vec<RawPositionRow>> {
        let path = self.day_path(instrument, exchange, date, "positions");
        Self::read_with(&path, feed::parse_positions)
    }

    fn fetch_history(&self, instrument: &str, exchange: &str) -> Result<Vec<RawHistoryRow>> {
        let path = self.history_path(instrument, exchange);
        Self::read_with(&path, feed::parse_history)
    }
}
