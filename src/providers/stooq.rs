//! Stooq daily history, served as CSV.

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::{debug, instrument};

use crate::core::raw::{FieldName, RawColumn, RawTable, RawValue};
use crate::core::source::{FetchError, QuoteSource};
use crate::providers::util::{HttpSettings, get_text};

pub const DEFAULT_BASE_URL: &str = "https://stooq.com";

pub struct StooqProvider {
    base_url: String,
    http: HttpSettings,
}

impl StooqProvider {
    pub fn new(base_url: &str, http: HttpSettings) -> Self {
        StooqProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        }
    }

    fn history_url(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
        format!(
            "{}/q/d/l/?s={}&d1={}&d2={}&i=d",
            self.base_url,
            urlencoding::encode(&symbol.to_lowercase()),
            start.format("%Y%m%d"),
            end.format("%Y%m%d")
        )
    }
}

fn csv_to_table(symbol: &str, body: &str) -> Result<RawTable, FetchError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(false)
        .from_reader(body.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| FetchError::malformed(symbol, e))?
        .clone();

    let mut columns: Vec<RawColumn> = headers
        .iter()
        .map(|h| RawColumn {
            name: FieldName::from(h),
            values: Vec::new(),
        })
        .collect();

    for record in reader.records() {
        let record = record.map_err(|e| FetchError::malformed(symbol, e))?;
        for (column, field) in columns.iter_mut().zip(record.iter()) {
            let value = if field.is_empty() {
                RawValue::Null
            } else {
                RawValue::Text(field.to_string())
            };
            column.values.push(value);
        }
    }

    let table = RawTable::new(columns).map_err(|e| FetchError::malformed(symbol, e))?;
    if table.is_empty() {
        return Err(FetchError::Empty(symbol.to_string()));
    }
    Ok(table)
}

#[async_trait]
impl QuoteSource for StooqProvider {
    fn id(&self) -> &str {
        "stooq"
    }

    #[instrument(name = "StooqHistoryFetch", skip(self), fields(symbol = %symbol))]
    async fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RawTable, FetchError> {
        let url = self.history_url(symbol, start, end);
        debug!("Requesting price history from {}", url);

        let (status, body) = get_text(&self.http, &url).await?;
        if !status.is_success() {
            return Err(FetchError::Http {
                status: status.as_u16(),
                symbol: symbol.to_string(),
            });
        }

        // Unknown symbols come back as a bare "No data" with a 200
        let body = body.trim();
        if body.is_empty() || body.eq_ignore_ascii_case("no data") {
            return Err(FetchError::Empty(symbol.to_string()));
        }

        csv_to_table(symbol, body)
    }
}
