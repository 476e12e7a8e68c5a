//! Trading-day calendar.
//!
//! Walks the dates between two endpoints (inclusive), skipping Saturdays and
//! Sundays. Direction follows operand order. There is no holiday calendar:
//! a weekday the exchange was closed simply yields no data downstream.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use ticksmith_core::Result;
use ticksmith_ingestion::feed::parse_feed_date;

/// Anything that names a trading date: typed dates or `%Y%m%d` text.
pub trait IntoDate {
    fn into_date(self) -> Result<NaiveDate>;
}

impl IntoDate for NaiveDate {
    fn into_date(self) -> Result<NaiveDate> {
        Ok(self)
    }
}

impl IntoDate for NaiveDateTime {
    fn into_date(self) -> Result<NaiveDate> {
        Ok(self.date())
    }
}

impl IntoDate for &str {
    fn into_date(self) -> Result<NaiveDate> {
        parse_feed_date(self)
    }
}

impl IntoDate for String {
    fn into_date(self) -> Result<NaiveDate> {
        parse_feed_date(&self)
    }
}

impl IntoDate for &String {
    fn into_date(self) -> Result<NaiveDate> {
        parse_feed_date(self)
    }
}

/// ISO weekday 6 or 7.
#[inline]
pub fn is_weekend(date: NaiveDate) -> bool {
    date.weekday().number_from_monday() >= 6
}

/// Iterator over the weekdays from `start` to `end`, inclusive.
///
/// Ascending when `start <= end`, descending otherwise.
#[derive(Debug, Clone)]
pub struct CalendarWalker {
    cursor: Option<NaiveDate>,
    end: NaiveDate,
    ascending: bool,
}

impl CalendarWalker {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            cursor: Some(start),
            end,
            ascending: start <= end,
        }
    }

    /// Walk between typed or textual endpoints.
    pub fn between(start: impl IntoDate, end: impl IntoDate) -> Result<Self> {
        Ok(Self::new(start.into_date()?, end.into_date()?))
    }

    pub fn is_ascending(&self) -> bool {
        self.ascending
    }

    fn step(&self, date: NaiveDate) -> Option<NaiveDate> {
        if date == self.end {
            None
        } else if self.ascending {
            date.succ_opt()
        } else {
            date.pred_opt()
        }
    }
}

impl Iterator for CalendarWalker {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        while let Some(date) = self.cursor {
            self.cursor = self.step(date);
            if !is_weekend(date) {
                return Some(date);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ticksmith_core::Error;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_ascending_skips_weekend() {
        // Mon 2023-01-02 .. Sun 2023-01-08
        let dates: Vec<NaiveDate> = CalendarWalker::new(ymd(2023, 1, 2), ymd(2023, 1, 8)).collect();
        assert_eq!(
            dates,
            vec![
                ymd(2023, 1, 2),
                ymd(2023, 1, 3),
                ymd(2023, 1, 4),
                ymd(2023, 1, 5),
                ymd(2023, 1, 6)
            ]
        );
    }

    #[test]
    fn test_descending_is_reverse() {
        let forward: Vec<NaiveDate> =
            CalendarWalker::new(ymd(2023, 1, 2), ymd(2023, 1, 8)).collect();
        let mut backward: Vec<NaiveDate> =
            CalendarWalker::new(ymd(2023, 1, 8), ymd(2023, 1, 2)).collect();
        backward.reverse();
        assert_eq!(forward, backward);
        assert!(!CalendarWalker::new(ymd(2023, 1, 8), ymd(2023, 1, 2)).is_ascending());
    }

    #[test]
    fn test_single_day() {
        assert_eq!(
            CalendarWalker::new(ymd(2023, 1, 4), ymd(2023, 1, 4)).collect::<Vec<_>>(),
            vec![ymd(2023, 1, 4)]
        );
        // A lone Saturday yields nothing.
        assert_eq!(CalendarWalker::new(ymd(2023, 1, 7), ymd(2023, 1, 7)).count(), 0);
    }

    #[test]
    fn test_textual_endpoints() {
        let dates: Vec<NaiveDate> = CalendarWalker::between("20230106", "20230109")
            .unwrap()
            .collect();
        assert_eq!(dates, vec![ymd(2023, 1, 6), ymd(2023, 1, 9)]);
    }

    #[test]
    fn test_malformed_text_is_parse_error() {
        assert!(matches!(
            CalendarWalker::between("2023-01-02", "20230108"),
            Err(Error::Parse(_))
        ));
    }

    #[test]
    fn test_datetime_endpoint() {
        let start = ymd(2023, 1, 2).and_hms_opt(15, 0, 0).unwrap();
        let dates: Vec<NaiveDate> = CalendarWalker::between(start, ymd(2023, 1, 3))
            .unwrap()
            .collect();
        assert_eq!(dates.len(), 2);
    }

    #[test]
    fn test_is_weekend() {
        assert!(is_weekend(ymd(2023, 1, 7)));
        assert!(is_weekend(ymd(2023, 1, 8)));
        assert!(!is_weekend(ymd(2023, 1, 9)));
    }
}
