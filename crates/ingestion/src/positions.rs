//! Quote snapshot normalization.

use chrono::NaiveDate;
use ticksmith_core::{epoch_to_timestamp, Error, Position, RawPositionRow, Result, SessionHours};
use tracing::debug;

/// A day's quote snapshots, clipped to the exchange session window.
#[derive(Debug, Clone)]
pub struct PositionBook {
    date: NaiveDate,
    positions: Vec<Position>,
}

impl PositionBook {
    /// Normalize raw quote rows and keep those inside
    /// `session.pre_open..=session.post_close` on `date`.
    pub fn from_raw(
        date: NaiveDate,
        rows: Vec<RawPositionRow>,
        session: &SessionHours,
    ) -> Result<Self> {
        let (start, end) = session.window(date);
        let raw_rows = rows.len();

        let mut positions = Vec::with_capacity(rows.len());
        for row in rows {
            let time = epoch_to_timestamp(row.time)
                .ok_or_else(|| Error::data(format!("quote time {} out of range", row.time)))?;
            if time < start || time > end {
                continue;
            }
            positions.push(Position {
                time,
                bid: row.bid,
                bid_depth: row.bid_depth,
                bid_depth_total: row.bid_depth_total,
                ask: row.ask,
                ask_depth: row.ask_depth,
                ask_depth_total: row.ask_depth_total,
            });
        }
        positions.sort_by_key(|p| p.time);

        debug!(%date, raw = raw_rows, kept = positions.len(), "positions clipped to session");

        Ok(Self { date, positions })
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn into_positions(self) -> Vec<Position> {
        self.positions
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
