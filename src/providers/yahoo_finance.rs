use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveDate, NaiveTime};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, instrument};

use crate::core::raw::{FieldName, RawColumn, RawTable, RawValue};
use crate::core::source::{FetchError, QuoteSource};
use crate::providers::util::{HttpSettings, get_text};

pub const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";

fn day_start(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp()
}

fn day_end(date: NaiveDate) -> i64 {
    date.checked_add_days(Days::new(1))
        .map_or(i64::MAX, |next| day_start(next) - 1)
}

/// Calendar date at the exchange. Daily bars are stamped at the session
/// open, so the UTC date lags a day east of Greenwich.
fn local_date(ts: i64, gmtoffset: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp(ts.checked_add(gmtoffset)?, 0).map(|dt| dt.date_naive())
}

pub struct YahooFinanceProvider {
    base_url: String,
    http: HttpSettings,
}

impl YahooFinanceProvider {
    pub fn new(base_url: &str, http: HttpSettings) -> Self {
        YahooFinanceProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        }
    }

    fn history_url(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
        format!(
            "{}/v8/finance/chart/{}?period1={}&period2={}&interval=1d&events=div",
            self.base_url,
            urlencoding::encode(symbol),
            start
                .checked_sub_days(Days::new(1))
                .map_or(i64::MIN, day_start),
            end.checked_add_days(Days::new(1)).map_or(i64::MAX, day_end)
        )
    }
}

#[derive(Deserialize, Debug)]
struct YahooChartResponse {
    chart: ChartResult,
}

#[derive(Deserialize, Debug)]
struct ChartResult {
    result: Option<Vec<ChartItem>>,
    error: Option<ChartError>,
}

#[derive(Deserialize, Debug)]
struct ChartError {
    code: String,
    description: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
struct Meta {
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Deserialize, Debug)]
struct ChartItem {
    #[serde(default)]
    meta: Meta,
    timestamp: Option<Vec<i64>>,
    indicators: Option<Indicators>,
    events: Option<Events>,
}

#[derive(Deserialize, Debug)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
    adjclose: Option<Vec<AdjClose>>,
}

#[derive(Deserialize, Debug)]
struct Quote {
    close: Option<Vec<Option<f64>>>,
}

#[derive(Deserialize, Debug)]
struct AdjClose {
    adjclose: Vec<Option<f64>>,
}

#[derive(Deserialize, Debug)]
struct Events {
    dividends: Option<HashMap<String, DividendEvent>>,
}

#[derive(Deserialize, Debug)]
struct DividendEvent {
    amount: f64,
    date: i64,
}

/// Lays the chart out as columns named after their JSON path, keeping only
/// sessions whose exchange-local date falls in `[start, end]`.
fn chart_to_table(
    symbol: &str,
    item: ChartItem,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<RawTable, FetchError> {
    let offset = item.meta.gmtoffset;
    let timestamps = item
        .timestamp
        .filter(|ts| !ts.is_empty())
        .ok_or_else(|| FetchError::Empty(symbol.to_string()))?;
    let dates: Vec<Option<NaiveDate>> = timestamps
        .iter()
        .map(|ts| local_date(*ts, offset))
        .collect();
    let keep: Vec<usize> = (0..dates.len())
        .filter(|&i| dates[i].is_some_and(|d| d >= start && d <= end))
        .collect();
    if keep.is_empty() {
        return Err(FetchError::Empty(symbol.to_string()));
    }
    let pick = |values: Vec<Option<f64>>| -> Vec<RawValue> {
        keep.iter()
            .map(|&i| RawValue::from(values.get(i).copied().flatten()))
            .collect()
    };

    let mut columns = vec![RawColumn {
        name: FieldName::from("timestamp"),
        values: keep
            .iter()
            .map(|&i| dates[i].map_or(RawValue::Null, RawValue::Date))
            .collect(),
    }];

    if let Some(indicators) = item.indicators {
        if let Some(close) = indicators.quote.into_iter().next().and_then(|q| q.close) {
            columns.push(RawColumn {
                name: FieldName::new(["indicators", "quote", "close"]),
                values: pick(close),
            });
        }
        if let Some(adj) = indicators.adjclose.and_then(|a| a.into_iter().next()) {
            columns.push(RawColumn {
                name: FieldName::new(["indicators", "adjclose", "adjclose"]),
                values: pick(adj.adjclose),
            });
        }
    }

    if let Some(dividends) = item.events.and_then(|e| e.dividends) {
        let by_date: HashMap<NaiveDate, f64> = dividends
            .values()
            .filter_map(|d| local_date(d.date, offset).map(|date| (date, d.amount)))
            .collect();
        columns.push(RawColumn {
            name: FieldName::new(["events", "dividends", "amount"]),
            values: keep
                .iter()
                .map(|&i| RawValue::from(dates[i].and_then(|d| by_date.get(&d).copied())))
                .collect(),
        });
    }

    debug!("Yahoo chart for {} has {} rows in range", symbol, keep.len());
    RawTable::new(columns).map_err(|e| FetchError::malformed(symbol, e))
}

#[async_trait]
impl QuoteSource for YahooFinanceProvider {
    fn id(&self) -> &str {
        "yahoo"
    }

    #[instrument(name = "YahooHistoryFetch", skip(self), fields(symbol = %symbol))]
    async fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RawTable, FetchError> {
        let url = self.history_url(symbol, start, end);
        debug!("Requesting price history from {}", url);

        let (status, body) = get_text(&self.http, &url).await?;

        // Yahoo reports unknown symbols as 404 with a JSON error body
        if status.as_u16() == 404 {
            return Err(FetchError::SymbolNotFound(symbol.to_string()));
        }
        if !status.is_success() {
            return Err(FetchError::Http {
                status: status.as_u16(),
                symbol: symbol.to_string(),
            });
        }

        let data: YahooChartResponse =
            serde_json::from_str(&body).map_err(|e| FetchError::malformed(symbol, e))?;

        if let Some(err) = data.chart.error {
            debug!(
                "Yahoo error for {}: {} {}",
                symbol,
                err.code,
                err.description.unwrap_or_default()
            );
            return Err(FetchError::SymbolNotFound(symbol.to_string()));
        }

        let item = data
            .chart
            .result
            .and_then(|r| r.into_iter().next())
            .ok_or_else(|| FetchError::SymbolNotFound(symbol.to_string()))?;

        chart_to_table(symbol, item, start, end)
    }
}
