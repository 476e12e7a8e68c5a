//! Trailing simple moving averages over daily history.

use statrs::statistics::Statistics;
use ticksmith_core::{config::validate_windows, Result, ValueField};
use ticksmith_ingestion::HistorySeries;

/// Attaches `ma<window>` columns to a history series.
#[derive(Debug, Clone)]
pub struct MovingAverageEngine {
    windows: Vec<usize>,
}

impl MovingAverageEngine {
    /// Create an engine for the given window sizes.
    ///
    /// A zero window is a configuration error.
    pub fn new(windows: Vec<usize>) -> Result<Self> {
        validate_windows(&windows)?;
        Ok(Self { windows })
    }

    pub fn windows(&self) -> &[usize] {
        &self.windows
    }

    /// Trailing mean over `window` values ending at each index. The first
    /// `window - 1` entries are `None`.
    pub fn rolling_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
        (0..values.len())
            .map(|i| {
                if window == 0 || i + 1 < window {
                    None
                } else {
                    Some(values[i + 1 - window..=i].iter().mean())
                }
            })
            .collect()
    }

    /// Compute every window over `field` and store it on each row.
    pub fn apply(&self, series: &mut HistorySeries, field: ValueField) {
        let values: Vec<f64> = series.rows().iter().map(|r| r.value(field)).collect();

        for &window in &self.windows {
            let means = Self::rolling_mean(&values, window);
            for (row, mean) in series.rows_mut().iter_mut().zip(means) {
                row.moving_averages.insert(window, mean);
            }
        }
    }
}
