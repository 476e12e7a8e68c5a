//! Configuration structures for the ticksmith system.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::types::ValueField;

/// Seconds in one calendar day.
pub const SECONDS_PER_DAY: i64 = 86_400;

/// Main configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Trade ledger normalization.
    pub ledger: LedgerConfig,
    /// OHLCV resampling.
    pub resample: ResampleConfig,
    /// Daily history and moving averages.
    pub history: HistoryConfig,
    /// Multi-day walk.
    pub aggregator: AggregatorConfig,
}

impl Config {
    /// Parse a configuration from JSON. Missing sections take their defaults.
    ///
    /// A bad `resample.interval` is reported as [`Error::Config`], not as a
    /// JSON error.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let mut value: serde_json::Value = serde_json::from_str(json)?;
        let interval = match value
            .get_mut("resample")
            .and_then(serde_json::Value::as_object_mut)
            .and_then(|resample| resample.remove("interval"))
        {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::String(text)) => Some(text.parse::<Interval>()?),
            Some(other) => {
                return Err(Error::config(format!("interval must be a string, got {other}")))
            }
        };

        let mut config: Config = serde_json::from_value(value)?;
        if let Some(interval) = interval {
            config.resample.interval = interval;
        }
        config.validate()?;
        Ok(config)
    }

    /// Check every section, failing on the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        self.ledger.validate()?;
        self.resample.interval.validate()?;
        self.history.validate()?;
        Ok(())
    }
}

/// Trade ledger configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Drop "Derivatives trade" and "Official" prints.
    pub exclude_derivatives: bool,
    /// Rewrite aliased counterparties before broker netting.
    pub fix_alias: bool,
    /// Sentinel counterparty code treated as a pass-through alias.
    pub alias_code: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            exclude_derivatives: true,
            fix_alias: false,
            alias_code: "NMBR".to_string(),
        }
    }
}

impl LedgerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.alias_code.trim().is_empty() {
            return Err(Error::config("alias code must not be empty"));
        }
        Ok(())
    }
}

/// OHLCV resampling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResampleConfig {
    /// Bucket width.
    pub interval: Interval,
    /// Attach per-bar mean VWAP.
    pub vwap: bool,
    /// Widen the bucket range to the exchange's pre-market..post-market hours.
    pub fill_session: bool,
}

impl Default for ResampleConfig {
    fn default() -> Self {
        Self {
            interval: Interval::from_minutes(5),
            vwap: false,
            fill_session: false,
        }
    }
}

/// Daily history configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Moving average window sizes in rows.
    pub moving_averages: Vec<usize>,
    /// Column the moving averages run over.
    pub value_field: ValueField,
}

impl HistoryConfig {
    pub fn validate(&self) -> Result<()> {
        validate_windows(&self.moving_averages)
    }
}

/// Reject non-positive moving average windows.
pub fn validate_windows(windows: &[usize]) -> Result<()> {
    if windows.iter().any(|&w| w == 0) {
        return Err(Error::config("moving average window must be positive"));
    }
    Ok(())
}

/// Multi-day aggregation configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Process days on a rayon pool instead of sequentially.
    pub parallel: bool,
    /// Number of pool threads (0 = rayon's global pool).
    pub workers: u32,
}

/// Bucket width for resampling, e.g. "30s", "5min", "1h".
///
/// Must be positive, at most one day, and divide a day evenly so buckets stay
/// aligned to midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Interval {
    secs: i64,
}

impl Interval {
    /// Build an interval from seconds, validating it.
    pub fn from_secs(secs: i64) -> Result<Self> {
        let interval = Self { secs };
        interval.validate()?;
        Ok(interval)
    }

    /// Whole-minute interval. Panics unless `minutes` divides a day; use
    /// [`Interval::from_secs`] or `str::parse` for untrusted input.
    pub const fn from_minutes(minutes: i64) -> Self {
        assert!(minutes > 0 && minutes <= 1_440 && 1_440 % minutes == 0);
        Self { secs: minutes * 60 }
    }

    /// Width in seconds.
    #[inline]
    pub fn secs(&self) -> i64 {
        self.secs
    }

    /// Width as a chrono duration.
    #[inline]
    pub fn duration(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.secs)
    }

    /// Number of buckets in one day.
    pub fn buckets_per_day(&self) -> i64 {
        SECONDS_PER_DAY / self.secs
    }

    fn validate(&self) -> Result<()> {
        if self.secs <= 0 {
            return Err(Error::config(format!(
                "interval must be positive, got {}s",
                self.secs
            )));
        }
        if self.secs > SECONDS_PER_DAY || SECONDS_PER_DAY % self.secs != 0 {
            return Err(Error::config(format!(
                "interval of {}s does not divide a day",
                self.secs
            )));
        }
        Ok(())
    }
}

impl FromStr for Interval {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let split = s
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(s.len());
        let (count, unit) = s.split_at(split);

        let count: i64 = if count.is_empty() {
            1
        } else {
            count
                .parse()
                .map_err(|_| Error::config(format!("invalid interval '{s}'")))?
        };

        let unit_secs = match unit.trim() {
            "s" | "S" | "sec" => 1,
            "min" | "T" | "m" => 60,
            "h" | "H" | "hour" => 3_600,
            "d" | "D" | "day" => SECONDS_PER_DAY,
            _ => return Err(Error::config(format!("invalid interval unit in '{s}'"))),
        };

        let secs = count
            .checked_mul(unit_secs)
            .ok_or_else(|| Error::config(format!("interval '{s}' is out of range")))?;
        Interval::from_secs(secs)
    }
}

impl TryFrom<String> for Interval {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Interval> for String {
    fn from(interval: Interval) -> Self {
        interval.to_string()
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.secs % 3_600 == 0 {
            write!(f, "{}h", self.secs / 3_600)
        } else if self.secs % 60 == 0 {
            write!(f, "{}min", self.secs / 60)
        } else {
            write!(f, "{}s", self.secs)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.ledger.exclude_derivatives);
        assert!(!config.ledger.fix_alias);
        assert_eq!(config.ledger.alias_code, "NMBR");
        assert_eq!(config.resample.interval.secs(), 300);
        assert_eq!(config.history.value_field, ValueField::Close);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_interval_parse() {
        assert_eq!("5min".parse::<Interval>().unwrap().secs(), 300);
        assert_eq!("15T".parse::<Interval>().unwrap().secs(), 900);
        assert_eq!("30s".parse::<Interval>().unwrap().secs(), 30);
        assert_eq!("1h".parse::<Interval>().unwrap().secs(), 3_600);
        assert_eq!("min".parse::<Interval>().unwrap().secs(), 60);
    }

    #[test]
    fn test_interval_rejects_bad_values() {
        assert!(matches!("0min".parse::<Interval>(), Err(Error::Config(_))));
        assert!(matches!("7min".parse::<Interval>(), Err(Error::Config(_))));
        assert!(matches!("2d".parse::<Interval>(), Err(Error::Config(_))));
        assert!(matches!("5 fortnights".parse::<Interval>(), Err(Error::Config(_))));
        assert!(matches!(Interval::from_secs(-60), Err(Error::Config(_))));
    }

    #[test]
    fn test_interval_overflow_is_config_error() {
        assert!(matches!(
            "999999999999999d".parse::<Interval>(),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            "99999999999999999999s".parse::<Interval>(),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_from_minutes_accepts_day_divisors() {
        assert_eq!(Interval::from_minutes(1_440).secs(), SECONDS_PER_DAY);
        assert_eq!(Interval::from_minutes(15).buckets_per_day(), 96);
    }

    #[test]
    #[should_panic]
    fn test_from_minutes_rejects_non_divisor() {
        let _ = Interval::from_minutes(7);
    }

    #[test]
    fn test_interval_display() {
        assert_eq!(Interval::from_minutes(5).to_string(), "5min");
        assert_eq!(Interval::from_minutes(60).to_string(), "1h");
        assert_eq!(Interval::from_secs(45).unwrap().to_string(), "45s");
    }

    #[test]
    fn test_config_from_json() {
        let config = Config::from_json_str(
            r#"{
                "ledger": { "fix_alias": true },
                "resample": { "interval": "15min", "vwap": true },
                "history": { "moving_averages": [5, 20], "value_field": "turnover" }
            }"#,
        )
        .unwrap();

        assert!(config.ledger.fix_alias);
        assert!(config.ledger.exclude_derivatives);
        assert_eq!(config.resample.interval.secs(), 900);
        assert!(config.resample.vwap);
        assert_eq!(config.history.moving_averages, vec![5, 20]);
        assert_eq!(config.history.value_field, ValueField::Turnover);
        assert!(!config.aggregator.parallel);
    }

    #[test]
    fn test_config_rejects_zero_window() {
        let err = Config::from_json_str(r#"{ "history": { "moving_averages": [0] } }"#);
        assert!(matches!(err, Err(Error::Config(_))));
    }

    #[test]
    fn test_config_rejects_bad_interval() {
        let err = Config::from_json_str(r#"{ "resample": { "interval": "7min" } }"#);
        assert!(matches!(err, Err(Error::Config(_))));

        let err = Config::from_json_str(r#"{ "resample": { "interval": "fortnight" } }"#);
        assert!(matches!(err, Err(Error::Config(_))));

        let err = Config::from_json_str(r#"{ "resample": { "interval": 300 } }"#);
        assert!(matches!(err, Err(Error::Config(_))));

        // Malformed JSON is still a JSON error.
        assert!(matches!(Config::from_json_str("{ resample"), Err(Error::Json(_))));
    }

    #[test]
    fn test_config_interval_keeps_other_resample_fields() {
        let config =
            Config::from_json_str(r#"{ "resample": { "interval": "1h", "fill_session": true } }"#)
                .unwrap();
        assert_eq!(config.resample.interval.secs(), 3_600);
        assert!(config.resample.fill_session);
    }

    #[test]
    fn test_config_rejects_empty_alias() {
        let mut config = Config::default();
        config.ledger.alias_code = "  ".to_string();
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }
}
