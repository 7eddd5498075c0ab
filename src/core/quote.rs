//! Quote request and output table types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::Display;

pub const DEFAULT_PROVIDERS: [&str; 3] = ["yahoo", "stooq", "fmp"];
pub const DEFAULT_SYMBOL_VARIANTS: [&str; 4] = ["", ".BA", ".BCBA", ".SA"];

/// Header of the output table, in the order downstream consumers expect.
pub const OUTPUT_COLUMNS: [&str; 5] = ["Fecha", "Ticker", "Close", "Dividend", "Provider"];

const OUTPUT_DATE_FORMAT: &str = "%d-%m-%Y";

/// Market suffix appended to a base ticker. The empty suffix is the identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolVariant(String);

impl SymbolVariant {
    pub fn identity() -> Self {
        SymbolVariant(String::new())
    }

    pub fn suffix(suffix: &str) -> Self {
        SymbolVariant(suffix.trim().to_string())
    }

    pub fn apply(&self, ticker: &str) -> String {
        format!("{ticker}{}", self.0)
    }

    pub fn defaults() -> Vec<SymbolVariant> {
        DEFAULT_SYMBOL_VARIANTS
            .iter()
            .map(|s| SymbolVariant::suffix(s))
            .collect()
    }
}

impl Display for SymbolVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            write!(f, "<none>")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    #[error("Start date {start} is after end date {end}")]
    InvertedRange { start: NaiveDate, end: NaiveDate },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteRequest {
    pub tickers: BTreeSet<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub providers: Vec<String>,
    pub symbol_variants: Vec<SymbolVariant>,
}

impl QuoteRequest {
    /// Builds a request, filling in today, the default providers and the
    /// default variants for whatever is left unset.
    pub fn new<I, S>(
        tickers: I,
        start_date: NaiveDate,
        end_date: Option<NaiveDate>,
        providers: Option<Vec<String>>,
        symbol_variants: Option<Vec<SymbolVariant>>,
    ) -> Result<Self, RequestError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let end_date = end_date.unwrap_or_else(|| chrono::Local::now().date_naive());
        if start_date > end_date {
            return Err(RequestError::InvertedRange {
                start: start_date,
                end: end_date,
            });
        }

        let tickers = tickers
            .into_iter()
            .map(|t| t.as_ref().trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();

        let providers = providers
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| DEFAULT_PROVIDERS.iter().map(|p| p.to_string()).collect());

        let symbol_variants = symbol_variants
            .filter(|v| !v.is_empty())
            .unwrap_or_else(SymbolVariant::defaults);

        Ok(QuoteRequest {
            tickers,
            start_date,
            end_date,
            providers,
            symbol_variants,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuoteRow {
    pub date: NaiveDate,
    pub ticker: String,
    pub close: f64,
    pub dividend: f64,
    pub provider: String,
}

/// A row rendered in the output schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuoteRecord {
    #[serde(rename = "Fecha")]
    pub fecha: String,
    #[serde(rename = "Ticker")]
    pub ticker: String,
    #[serde(rename = "Close")]
    pub close: f64,
    #[serde(rename = "Dividend")]
    pub dividend: f64,
    #[serde(rename = "Provider")]
    pub provider: String,
}

impl From<&QuoteRow> for QuoteRecord {
    fn from(row: &QuoteRow) -> Self {
        QuoteRecord {
            fecha: row.date.format(OUTPUT_DATE_FORMAT).to_string(),
            ticker: row.ticker.clone(),
            close: row.close,
            dividend: row.dividend,
            provider: row.provider.clone(),
        }
    }
}

/// Long-format table sorted by (ticker, date).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuoteTable {
    rows: Vec<QuoteRow>,
}

impl QuoteTable {
    pub fn from_rows(mut rows: Vec<QuoteRow>) -> Self {
        rows.sort_by(|a, b| a.ticker.cmp(&b.ticker).then(a.date.cmp(&b.date)));
        QuoteTable { rows }
    }

    pub fn rows(&self) -> &[QuoteRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn records(&self) -> Vec<QuoteRecord> {
        self.rows.iter().map(QuoteRecord::from).collect()
    }
}
