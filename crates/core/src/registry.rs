//! Exchange and instrument nickname lookup.
//!
//! Built once at startup and shared read-only.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::Result;
use crate::types::Timestamp;

/// Trading hours for one exchange day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionHours {
    /// Pre-market open.
    pub pre_open: NaiveTime,
    /// Continuous trading open.
    pub open: NaiveTime,
    /// Continuous trading close.
    pub close: NaiveTime,
    /// Post-market close.
    pub post_close: NaiveTime,
}

impl Default for SessionHours {
    fn default() -> Self {
        Self {
            pre_open: hms(8, 15, 0),
            open: hms(9, 0, 0),
            close: hms(16, 25, 59),
            post_close: hms(17, 0, 0),
        }
    }
}

impl SessionHours {
    /// Pre-open..post-close window on `date`, inclusive on both ends.
    pub fn window(&self, date: NaiveDate) -> (Timestamp, Timestamp) {
        (date.and_time(self.pre_open), date.and_time(self.post_close))
    }
}

fn hms(h: u32, m: u32, s: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, s).unwrap_or(NaiveTime::MIN)
}

/// Exchange metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeInfo {
    /// Feed exchange suffix (e.g. "OSE", "N").
    pub code: String,
    /// Display name.
    pub name: String,
    /// Whether the feed currently serves this exchange.
    #[serde(default = "default_true")]
    pub active: bool,
    /// Session hours; falls back to the registry default.
    #[serde(default)]
    pub session: Option<SessionHours>,
}

fn default_true() -> bool {
    true
}

/// Shorthand for an instrument that lives on a non-default exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Nickname {
    /// Display name.
    pub name: String,
    /// Feed instrument code.
    pub instrument: String,
    /// Feed exchange suffix.
    pub exchange: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    exchanges: Vec<ExchangeInfo>,
    #[serde(default)]
    nicknames: HashMap<String, Nickname>,
    #[serde(default)]
    default_session: SessionHours,
}

/// Immutable exchange / nickname lookup.
#[derive(Debug, Clone)]
pub struct Registry {
    exchanges: HashMap<String, ExchangeInfo>,
    nicknames: HashMap<String, Nickname>,
    default_session: SessionHours,
}

impl Registry {
    /// Registry with the exchanges and nicknames the feed is known to serve.
    pub fn builtin() -> Self {
        let exchange = |code: &str, name: &str, active: bool| ExchangeInfo {
            code: code.to_string(),
            name: name.to_string(),
            active,
            session: None,
        };

        let exchanges = vec![
            exchange("OSE", "Oslo Børs", true),
            exchange("O", "NASDAQ", false),
            exchange("N", "NYSE", true),
            exchange("A", "Amex", true),
            exchange("FXSX", "Currency", true),
            exchange("GTIS", "Commodities", true),
        ];

        let mut nicknames = HashMap::new();
        nicknames.insert(
            "WTI".to_string(),
            Nickname {
                name: "West Texas Intermediate Crude Oil".to_string(),
                instrument: "C-EWTIUSDBR-SP".to_string(),
                exchange: "GTIS".to_string(),
            },
        );

        Self::from_parts(exchanges, nicknames, SessionHours::default())
    }

    /// Load a registry from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: RegistryFile = serde_json::from_str(json)?;
        Ok(Self::from_parts(
            file.exchanges,
            file.nicknames,
            file.default_session,
        ))
    }

    fn from_parts(
        exchanges: Vec<ExchangeInfo>,
        nicknames: HashMap<String, Nickname>,
        default_session: SessionHours,
    ) -> Self {
        Self {
            exchanges: exchanges
                .into_iter()
                .map(|e| (e.code.clone(), e))
                .collect(),
            nicknames,
            default_session,
        }
    }

    /// Look up an exchange by feed code.
    pub fn exchange(&self, code: &str) -> Option<&ExchangeInfo> {
        self.exchanges.get(code)
    }

    /// Look up a nickname.
    pub fn nickname(&self, nickname: &str) -> Option<&Nickname> {
        self.nicknames.get(nickname)
    }

    /// Session hours for an exchange, or the default when it has none.
    pub fn session(&self, exchange: &str) -> SessionHours {
        self.exchanges
            .get(exchange)
            .and_then(|e| e.session)
            .unwrap_or(self.default_session)
    }

    /// Resolve a nickname to its (instrument, exchange); anything else passes
    /// through unchanged.
    pub fn resolve(&self, instrument: &str, exchange: &str) -> (String, String) {
        match self.nicknames.get(instrument) {
            Some(n) => (n.instrument.clone(), n.exchange.clone()),
            None => (instrument.to_string(), exchange.to_string()),
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::builtin()
    }
}
