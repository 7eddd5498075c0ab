//! Financial Modeling Prep historical prices.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::core::raw::RawTable;
use crate::core::source::{FetchError, QuoteSource};
use crate::providers::records::records_to_table;
use crate::providers::util::{HttpSettings, get_text};

pub const DEFAULT_BASE_URL: &str = "https://financialmodelingprep.com";

pub struct FmpProvider {
    base_url: String,
    api_key: String,
    http: HttpSettings,
}

impl FmpProvider {
    pub fn new(base_url: &str, api_key: &str, http: HttpSettings) -> Self {
        FmpProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            http,
        }
    }

    fn history_url(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
        format!(
            "{}/api/v3/historical-price-full/{}?from={}&to={}&apikey={}",
            self.base_url,
            urlencoding::encode(symbol),
            start.format("%Y-%m-%d"),
            end.format("%Y-%m-%d"),
            urlencoding::encode(&self.api_key)
        )
    }
}

#[derive(Deserialize, Debug)]
struct FmpHistoryResponse {
    #[serde(default)]
    historical: Vec<serde_json::Value>,
}

#[async_trait]
impl QuoteSource for FmpProvider {
    fn id(&self) -> &str {
        "fmp"
    }

    #[instrument(name = "FmpHistoryFetch", skip(self), fields(symbol = %symbol))]
    async fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RawTable, FetchError> {
        let url = self.history_url(symbol, start, end);
        debug!(
            "Requesting price history for {} from {}/api/v3/historical-price-full",
            symbol, self.base_url
        );

        let (status, body) = get_text(&self.http, &url).await?;
        if !status.is_success() {
            return Err(FetchError::Http {
                status: status.as_u16(),
                symbol: symbol.to_string(),
            });
        }

        let data: FmpHistoryResponse =
            serde_json::from_str(&body).map_err(|e| FetchError::malformed(symbol, e))?;
        if data.historical.is_empty() {
            return Err(FetchError::Empty(symbol.to_string()));
        }

        records_to_table(symbol, &data.historical)
    }
}
