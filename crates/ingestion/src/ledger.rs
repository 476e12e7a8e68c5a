//! Trade ledger normalization.
//!
//! Turns a day's raw trade rows into an ordered, immutable record set:
//! timestamps are derived from feed epoch seconds, rows are stably sorted by
//! time, and derivatives/official prints are optionally dropped.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ticksmith_core::{
    config::LedgerConfig, epoch_to_timestamp, Error, RawTradeRow, Result, Trade, Volume,
};
use tracing::{debug, warn};

/// Normalization counters for one ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerStats {
    /// Rows received from the source.
    pub raw_rows: usize,
    /// Rows removed by the derivatives/official filter.
    pub excluded_rows: usize,
    /// Rows whose buyer was rewritten by the alias fix.
    pub aliased_buyers: usize,
    /// Rows whose seller was rewritten by the alias fix.
    pub aliased_sellers: usize,
    /// Whether the feed delivered rows out of time order.
    pub reordered: bool,
}

/// Canonical trade record set for one trading day.
#[derive(Debug, Clone)]
pub struct TradeLedger {
    date: NaiveDate,
    trades: Vec<Trade>,
    has_vwap: bool,
    stats: LedgerStats,
}

impl TradeLedger {
    /// Normalize raw rows for `date`.
    ///
    /// Rows with an invalid epoch or a negative/non-finite price are rejected
    /// with [`Error::Data`].
    pub fn from_raw(
        date: NaiveDate,
        rows: Vec<RawTradeRow>,
        exclude_derivatives: bool,
    ) -> Result<Self> {
        let mut stats = LedgerStats {
            raw_rows: rows.len(),
            ..LedgerStats::default()
        };

        let mut trades = rows
            .into_iter()
            .map(normalize_row)
            .collect::<Result<Vec<_>>>()?;

        if !trades.windows(2).all(|w| w[0].time <= w[1].time) {
            // Stable: trades sharing a timestamp keep feed order.
            trades.sort_by_key(|t| t.time);
            stats.reordered = true;
            warn!(%date, "trade feed out of time order, re-sorted");
        }

        if exclude_derivatives {
            let before = trades.len();
            trades.retain(|t| !t.is_derivative_or_official());
            stats.excluded_rows = before - trades.len();
        }

        debug!(
            %date,
            raw = stats.raw_rows,
            kept = trades.len(),
            excluded = stats.excluded_rows,
            "trade ledger normalized"
        );

        Ok(Self {
            date,
            trades,
            has_vwap: false,
            stats,
        })
    }

    /// Normalize with every option in `config`. The derivatives filter runs
    /// before the alias fix.
    pub fn build(date: NaiveDate, rows: Vec<RawTradeRow>, config: &LedgerConfig) -> Result<Self> {
        config.validate()?;
        let ledger = Self::from_raw(date, rows, config.exclude_derivatives)?;
        if config.fix_alias {
            ledger.with_alias_fixed(&config.alias_code)
        } else {
            Ok(ledger)
        }
    }

    /// Ledger in which the aliased leg of every trade takes the identity of
    /// the other leg. Trades aliased on both sides are left as they are.
    pub fn with_alias_fixed(&self, alias_code: &str) -> Result<Self> {
        if alias_code.trim().is_empty() {
            return Err(Error::config("alias code must not be empty"));
        }

        let mut fixed = self.clone();
        for trade in &mut fixed.trades {
            let buyer_aliased = trade.buyer == alias_code;
            let seller_aliased = trade.seller == alias_code;

            if buyer_aliased && !seller_aliased {
                trade.buyer = trade.seller.clone();
                fixed.stats.aliased_buyers += 1;
            } else if seller_aliased && !buyer_aliased {
                trade.seller = trade.buyer.clone();
                fixed.stats.aliased_sellers += 1;
            }
        }

        debug!(
            date = %self.date,
            alias = alias_code,
            buyers = fixed.stats.aliased_buyers,
            sellers = fixed.stats.aliased_sellers,
            "alias fix applied"
        );

        Ok(fixed)
    }

    /// Attach one cumulative VWAP value per trade.
    pub fn with_vwap(mut self, vwap: Vec<Option<f64>>) -> Result<Self> {
        if vwap.len() != self.trades.len() {
            return Err(Error::data(format!(
                "vwap column has {} values for {} trades",
                vwap.len(),
                self.trades.len()
            )));
        }
        for (trade, value) in self.trades.iter_mut().zip(vwap) {
            trade.vwap = value;
        }
        self.has_vwap = true;
        Ok(self)
    }

    /// Trading date this ledger belongs to.
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Trades in non-decreasing time order.
    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    /// Consume the ledger, returning its trades.
    pub fn into_trades(self) -> Vec<Trade> {
        self.trades
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    /// Whether the VWAP column has been attached.
    pub fn has_vwap(&self) -> bool {
        self.has_vwap
    }

    /// Sum of all trade volumes.
    pub fn total_volume(&self) -> Volume {
        self.trades.iter().map(|t| t.volume).sum()
    }

    /// Normalization counters.
    pub fn stats(&self) -> &LedgerStats {
        &self.stats
    }
}

fn normalize_row(row: RawTradeRow) -> Result<Trade> {
    let time = epoch_to_timestamp(row.time)
        .ok_or_else(|| Error::data(format!("trade time {} out of range", row.time)))?;

    if !row.price.is_finite() || row.price < 0.0 {
        return Err(Error::data(format!("invalid trade price {} at {time}", row.price)));
    }

    Ok(Trade {
        time,
        price: row.price,
        volume: row.volume,
        source: row.source,
        buyer: row.buyer,
        seller: row.seller,
        initiator: row.initiator,
        vwap: None,
    })
}
