//! Column detection and coercion for heterogeneous provider schemas.
//!
//! Providers disagree on field names (`Date`, `timestamp`, `adjClose`,
//! `Adj Close`, `indicators_quote_close`, ...). Detection is driven by the
//! [`FIELD_RULES`] table: for each canonical field the rules are tried in
//! priority order, and within a rule the first column (in response order)
//! whose flattened, lower-cased name contains any of the patterns wins.

use crate::core::quote::QuoteRow;
use crate::core::raw::{RawTable, RawValue};
use crate::core::source::FetchError;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalField {
    Date,
    Close,
    Dividend,
}

impl CanonicalField {
    pub fn label(&self) -> &'static str {
        match self {
            CanonicalField::Date => "date",
            CanonicalField::Close => "close",
            CanonicalField::Dividend => "dividend",
        }
    }
}

#[derive(Debug)]
pub struct FieldRule {
    pub field: CanonicalField,
    pub patterns: &'static [&'static str],
    /// Lower wins.
    pub priority: u8,
}

pub const FIELD_RULES: &[FieldRule] = &[
    FieldRule {
        field: CanonicalField::Date,
        patterns: &["date", "time"],
        priority: 0,
    },
    FieldRule {
        field: CanonicalField::Close,
        patterns: &["adj close", "adjclose", "adj_close"],
        priority: 0,
    },
    FieldRule {
        field: CanonicalField::Close,
        patterns: &["close"],
        priority: 1,
    },
    FieldRule {
        field: CanonicalField::Dividend,
        patterns: &["dividend"],
        priority: 0,
    },
];

/// Column indices selected for a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSelection {
    pub date: usize,
    pub close: usize,
    pub dividend: Option<usize>,
}

/// Index of the column matching `field` by name, following [`FIELD_RULES`].
pub fn match_field(names: &[String], field: CanonicalField) -> Option<usize> {
    let lowered: Vec<String> = names.iter().map(|n| n.to_lowercase()).collect();

    let mut rules: Vec<&FieldRule> = FIELD_RULES.iter().filter(|r| r.field == field).collect();
    rules.sort_by_key(|r| r.priority);

    rules.iter().find_map(|rule| {
        lowered
            .iter()
            .position(|name| rule.patterns.iter().any(|p| name.contains(p)))
    })
}

pub fn detect_columns(table: &RawTable) -> Result<ColumnSelection, FetchError> {
    let names: Vec<String> = table.columns().iter().map(|c| c.name.flatten()).collect();

    let date = match_field(&names, CanonicalField::Date)
        .or_else(|| {
            table.columns().iter().position(|c| {
                c.values
                    .iter()
                    .find(|v| !v.is_null())
                    .is_some_and(RawValue::is_temporal)
            })
        })
        .ok_or(FetchError::MissingColumn(CanonicalField::Date.label()))?;

    let close = match_field(&names, CanonicalField::Close)
        .ok_or(FetchError::MissingColumn(CanonicalField::Close.label()))?;

    let dividend = match_field(&names, CanonicalField::Dividend);

    Ok(ColumnSelection {
        date,
        close,
        dividend,
    })
}

const TEXT_DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y", "%Y%m%d"];
const TEXT_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

pub fn coerce_date(value: &RawValue) -> Option<NaiveDate> {
    match value {
        RawValue::Date(d) => Some(*d),
        RawValue::Timestamp(ts) => DateTime::from_timestamp(*ts, 0).map(|dt| dt.date_naive()),
        RawValue::Number(n) if n.is_finite() && n.fract() == 0.0 => {
            DateTime::from_timestamp(*n as i64, 0).map(|dt| dt.date_naive())
        }
        RawValue::Text(s) => parse_text_date(s.trim()),
        _ => None,
    }
}

fn parse_text_date(s: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    TEXT_DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok().map(|dt| dt.date()))
        .or_else(|| {
            TEXT_DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
        })
}

pub fn coerce_number(value: &RawValue) -> Option<f64> {
    let n = match value {
        RawValue::Number(n) => *n,
        RawValue::Text(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn coerce_close(value: &RawValue) -> Option<f64> {
    coerce_number(value).filter(|n| *n >= 0.0)
}

/// Turns a provider response for `symbol` into rows for `ticker`.
///
/// Rows whose date or close cannot be coerced are dropped, as are repeated
/// dates after the first. Fails when no column can be detected or no row
/// survives.
pub fn normalize(
    table: &RawTable,
    ticker: &str,
    symbol: &str,
    provider: &str,
) -> Result<Vec<QuoteRow>, FetchError> {
    if table.is_empty() {
        return Err(FetchError::Empty(symbol.to_string()));
    }

    let selection = detect_columns(table)?;
    let columns = table.columns();
    let dates = &columns[selection.date].values;
    let closes = &columns[selection.close].values;
    let dividends = selection.dividend.map(|i| &columns[i].values);

    let mut seen = HashSet::new();
    let rows: Vec<QuoteRow> = (0..table.row_count())
        .filter_map(|i| {
            let date = coerce_date(&dates[i])?;
            let close = coerce_close(&closes[i])?;
            if !seen.insert(date) {
                return None;
            }
            let dividend = dividends
                .and_then(|d| coerce_number(&d[i]))
                .unwrap_or(0.0);
            Some(QuoteRow {
                date,
                ticker: ticker.to_string(),
                close,
                dividend,
                provider: provider.to_string(),
            })
        })
        .collect();

    if rows.is_empty() {
        return Err(FetchError::NoValidRows);
    }
    Ok(rows)
}
