//! Daily history normalization.
//!
//! The history feed is newest first; the series is kept oldest first with at
//! most one row per date.

use ticksmith_core::{DailyHistoryRow, RawHistoryRow};
use tracing::warn;

/// Date-ascending daily history, one row per trading day.
#[derive(Debug, Clone, Default)]
pub struct HistorySeries {
    rows: Vec<DailyHistoryRow>,
}

impl HistorySeries {
    /// Build from reverse-chronological feed rows.
    pub fn from_raw(rows: Vec<RawHistoryRow>) -> Self {
        let mut rows: Vec<DailyHistoryRow> = rows.into_iter().rev().map(Into::into).collect();
        rows.sort_by_key(|r| r.date);

        let before = rows.len();
        rows.dedup_by_key(|r| r.date);
        if rows.len() != before {
            warn!(dropped = before - rows.len(), "duplicate history dates dropped");
        }

        Self { rows }
    }

    pub fn rows(&self) -> &[DailyHistoryRow] {
        &self.rows
    }

    /// Mutable access for attaching derived columns; the row set itself is fixed.
    pub fn rows_mut(&mut self) -> &mut [DailyHistoryRow] {
        &mut self.rows
    }

    pub fn into_rows(self) -> Vec<DailyHistoryRow> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_row(day: u32, close: f64) -> RawHistoryRow {
        RawHistoryRow {
            date: NaiveDate::from_ymd_opt(2023, 1, day).unwrap(),
            open: close,
            high: close,
            low: close,
            close,
            volume: 100,
            turnover: close * 100.0,
        }
    }

    #[test]
    fn test_inverts_feed_order() {
        let series =
            HistorySeries::from_raw(vec![make_row(4, 3.0), make_row(3, 2.0), make_row(2, 1.0)]);

        let closes: Vec<f64> = series.rows().iter().map(|r| r.close).collect();
        assert_eq!(closes, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_drops_duplicate_dates() {
        let series =
            HistorySeries::from_raw(vec![make_row(3, 2.5), make_row(3, 2.0), make_row(2, 1.0)]);

        assert_eq!(series.len(), 2);
        // After inversion the older feed row comes first and is kept.
        assert_eq!(series.rows()[1].close, 2.0);
    }

    #[test]
    fn test_empty() {
        assert!(HistorySeries::from_raw(Vec::new()).is_empty());
    }
}
