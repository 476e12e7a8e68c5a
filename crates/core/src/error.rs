//! Error types for the ticksmith system.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the ticksmith system.
///
/// An empty day is never an error: accessors signal it with `None` or an
/// empty collection.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error (bad interval, window, alias code, value field).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed date or timestamp text.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Failure reported by the data source collaborator.
    #[error("Fetch failure: {0}")]
    Fetch(String),

    /// Data error (invalid rows or inconsistent series).
    #[error("Data error: {0}")]
    Data(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Error::Parse(msg.into())
    }

    /// Create a fetch failure.
    pub fn fetch(msg: impl Into<String>) -> Self {
        Error::Fetch(msg.into())
    }

    /// Create a data error.
    pub fn data(msg: impl Into<String>) -> Self {
        Error::Data(msg.into())
    }

    /// Whether the error came from the data source rather than the core.
    pub fn is_fetch(&self) -> bool {
        matches!(self, Error::Fetch(_))
    }
}
