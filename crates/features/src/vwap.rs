//! Cumulative VWAP.
//!
//! Running sum(price * volume) / sum(volume) over a whole day, evaluated per
//! trade in time order.

use ticksmith_core::{Result, Trade, Volume};
use ticksmith_ingestion::TradeLedger;

/// Running VWAP accumulator.
#[derive(Debug, Clone, Default)]
pub struct VwapCalculator {
    /// Running sum of price * volume.
    cum_notional: f64,
    /// Running sum of volume.
    cum_volume: Volume,
}

impl VwapCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a trade and return the VWAP so far.
    ///
    /// Returns `None` while no volume has traded.
    pub fn add_trade(&mut self, price: f64, volume: Volume) -> Option<f64> {
        self.cum_notional += price * volume as f64;
        self.cum_volume += volume;
        self.vwap()
    }

    /// Current VWAP.
    pub fn vwap(&self) -> Option<f64> {
        if self.cum_volume > 0 {
            Some(self.cum_notional / self.cum_volume as f64)
        } else {
            None
        }
    }

    /// Cumulative volume seen.
    pub fn volume(&self) -> Volume {
        self.cum_volume
    }

    /// One VWAP value per trade.
    pub fn compute(trades: &[Trade]) -> Vec<Option<f64>> {
        let mut calc = Self::new();
        trades
            .iter()
            .map(|t| calc.add_trade(t.price, t.volume))
            .collect()
    }

    /// Attach the VWAP column to a ledger unless it already has one.
    pub fn apply(ledger: TradeLedger) -> Result<TradeLedger> {
        if ledger.has_vwap() {
            return Ok(ledger);
        }
        let values = Self::compute(ledger.trades());
        ledger.with_vwap(values)
    }

    /// Clear all state.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
