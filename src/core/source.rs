//! Market-data source abstraction

use crate::core::raw::{RaggedTable, RawTable};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::time::Duration;
use thiserror::Error;

/// Why a single (symbol, provider) attempt produced no rows.
///
/// Every variant is recoverable: the resolver records it and moves on to the
/// next provider or symbol variant.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request error: {0}")]
    Transport(String),

    #[error("HTTP error: {status} for symbol: {symbol}")]
    Http { status: u16, symbol: String },

    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    #[error("Empty response for symbol: {0}")]
    Empty(String),

    #[error("Malformed response for symbol {symbol}: {message}")]
    Malformed { symbol: String, message: String },

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("No {0} column found")]
    MissingColumn(&'static str),

    #[error("No valid rows after coercion")]
    NoValidRows,
}

impl FetchError {
    pub fn malformed(symbol: &str, message: impl ToString) -> Self {
        FetchError::Malformed {
            symbol: symbol.to_string(),
            message: message.to_string(),
        }
    }
}

impl From<RaggedTable> for FetchError {
    fn from(err: RaggedTable) -> Self {
        FetchError::Malformed {
            symbol: String::new(),
            message: err.to_string(),
        }
    }
}

impl From<anyhow::Error> for FetchError {
    fn from(err: anyhow::Error) -> Self {
        FetchError::Transport(format!("{err:#}"))
    }
}

#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Canonical provider identifier stamped on every row this source yields.
    fn id(&self) -> &str;

    /// Daily history for `symbol` over the inclusive range `[start, end]`.
    async fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RawTable, FetchError>;
}
