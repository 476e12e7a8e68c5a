//! CSV feed parsing.
//!
//! Feed files carry a header row and fixed column order. Trade and quote
//! times are `%Y%m%dT%H%M%S`; history dates are `%Y%m%d` and the history
//! feed's `paper`/`exch` identifier columns are dropped.

use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;
use std::io::Read;
use ticksmith_core::{
    timestamp_to_epoch, Error, RawHistoryRow, RawPositionRow, RawTradeRow, Result, Volume,
};

/// Feed time stamp format for trades and quotes.
pub const FEED_TIME_FORMAT: &str = "%Y%m%dT%H%M%S";

/// Feed date format for history rows and per-day requests.
pub const FEED_DATE_FORMAT: &str = "%Y%m%d";

/// Parse a feed time stamp into epoch seconds.
pub fn parse_feed_time(text: &str) -> Result<i64> {
    NaiveDateTime::parse_from_str(text.trim(), FEED_TIME_FORMAT)
        .map(timestamp_to_epoch)
        .map_err(|e| Error::parse(format!("bad feed time '{text}': {e}")))
}

/// Parse a feed date.
pub fn parse_feed_date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), FEED_DATE_FORMAT)
        .map_err(|e| Error::parse(format!("bad feed date '{text}': {e}")))
}

/// Parse a trade feed: `time,price,quantity,source,buyer,seller,initiator`.
pub fn parse_trades<R: Read>(reader: R) -> Result<Vec<RawTradeRow>> {
    read_records(reader, 7, |rec| {
        Ok(RawTradeRow {
            time: parse_feed_time(field(rec, 0)?)?,
            price: parse_f64(rec, 1, "price")?,
            volume: parse_volume(rec, 2, "quantity")?,
            source: field(rec, 3)?.trim().to_string(),
            buyer: field(rec, 4)?.trim().to_string(),
            seller: field(rec, 5)?.trim().to_string(),
            initiator: field(rec, 6)?.trim().to_string(),
        })
    })
}

/// Parse a quote feed:
/// `time,bid,bid_depth,bid_depth_total,offer,offer_depth,offer_depth_total`.
pub fn parse_positions<R: Read>(reader: R) -> Result<Vec<RawPositionRow>> {
    read_records(reader, 7, |rec| {
        Ok(RawPositionRow {
            time: parse_feed_time(field(rec, 0)?)?,
            bid: parse_f64(rec, 1, "bid")?,
            bid_depth: parse_volume(rec, 2, "bid_depth")?,
            bid_depth_total: parse_volume(rec, 3, "bid_depth_total")?,
            ask: parse_f64(rec, 4, "offer")?,
            ask_depth: parse_volume(rec, 5, "offer_depth")?,
            ask_depth_total: parse_volume(rec, 6, "offer_depth_total")?,
        })
    })
}

/// Parse a history feed:
/// `quote_date,paper,exch,open,high,low,close,volume,value`.
pub fn parse_history<R: Read>(reader: R) -> Result<Vec<RawHistoryRow>> {
    read_records(reader, 9, |rec| {
        Ok(RawHistoryRow {
            date: parse_feed_date(field(rec, 0)?)?,
            open: parse_f64(rec, 3, "open")?,
            high: parse_f64(rec, 4, "high")?,
            low: parse_f64(rec, 5, "low")?,
            close: parse_f64(rec, 6, "close")?,
            volume: parse_volume(rec, 7, "volume")?,
            turnover: parse_f64(rec, 8, "value")?,
        })
    })
}

fn read_records<R, T, F>(reader: R, columns: usize, mut parse: F) -> Result<Vec<T>>
where
    R: Read,
    F: FnMut(&StringRecord) -> Result<T>,
{
    let mut csv = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let mut rows = Vec::new();
    for (line, record) in csv.records().enumerate() {
        let record = record.map_err(|e| Error::parse(format!("csv: {e}")))?;
        if record.len() < columns {
            return Err(Error::parse(format!(
                "row {}: expected {columns} columns, got {}",
                line + 1,
                record.len()
            )));
        }
        rows.push(parse(&record).map_err(|e| Error::parse(format!("row {}: {e}", line + 1)))?);
    }
    Ok(rows)
}

fn field(rec: &StringRecord, idx: usize) -> Result<&str> {
    rec.get(idx)
        .ok_or_else(|| Error::parse(format!("missing column {idx}")))
}

fn parse_f64(rec: &StringRecord, idx: usize, name: &str) -> Result<f64> {
    let text = field(rec, idx)?.trim();
    text.parse()
        .map_err(|_| Error::parse(format!("bad {name} '{text}'")))
}

/// Volumes are whole numbers but some feeds write them as "100.0".
fn parse_volume(rec: &StringRecord, idx: usize, name: &str) -> Result<Volume> {
    let text = field(rec, idx)?.trim();
    if text.is_empty() {
        return Ok(0);
    }
    if let Ok(v) = text.parse::<Volume>() {
        return Ok(v);
    }
    match text.parse::<f64>() {
        Ok(v) if v >= 0.0 && v.fract() == 0.0 => Ok(v as Volume),
        _ => Err(Error::parse(format!("bad {name} '{text}'"))),
    }
}
