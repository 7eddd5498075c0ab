//! Multi-provider quote resolution.
//!
//! Each ticker is resolved on its own: symbol variants are tried in order,
//! and for each variant every provider is tried in order. The first
//! (variant, provider) pair that yields at least one valid row wins and no
//! further attempts are made for that ticker. Failures never escape; a ticker
//! for which every attempt failed simply contributes no rows.

use crate::core::columns::normalize;
use crate::core::quote::{QuoteRequest, QuoteRow, QuoteTable};
use crate::core::source::FetchError;
use crate::providers::registry::ProviderRegistry;
use futures::stream::{self, StreamExt};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONCURRENCY: usize = 4;

#[derive(Debug, Clone, Copy)]
pub struct ResolverSettings {
    /// Upper bound for a single provider call.
    pub timeout: Duration,
    /// Tickers resolved at the same time.
    pub concurrency: usize,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        ResolverSettings {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

/// A failed (symbol, provider) attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub symbol: String,
    pub provider: String,
    pub error: String,
}

/// Which provider, if any, covered a ticker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickerOutcome {
    pub ticker: String,
    pub provider: Option<String>,
    pub symbol: Option<String>,
    pub rows: usize,
    pub attempts: Vec<Attempt>,
}

impl TickerOutcome {
    pub fn is_covered(&self) -> bool {
        self.provider.is_some()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub table: QuoteTable,
    /// Sorted by ticker.
    pub outcomes: Vec<TickerOutcome>,
}

pub struct QuoteResolver {
    registry: ProviderRegistry,
    settings: ResolverSettings,
}

impl QuoteResolver {
    pub fn new(registry: ProviderRegistry, settings: ResolverSettings) -> Self {
        QuoteResolver { registry, settings }
    }

    pub async fn resolve(&self, request: &QuoteRequest) -> QuoteTable {
        self.resolve_detailed(request, &|_| {}).await.table
    }

    /// Resolves every ticker and reports each outcome through `on_progress`
    /// as soon as the ticker is done.
    pub async fn resolve_detailed(
        &self,
        request: &QuoteRequest,
        on_progress: &(dyn Fn(&TickerOutcome) + Sync),
    ) -> Resolution {
        info!(
            tickers = request.tickers.len(),
            start = %request.start_date,
            end = %request.end_date,
            providers = ?request.providers,
            "Resolving quotes"
        );

        let results: Vec<(TickerOutcome, Vec<QuoteRow>)> = stream::iter(request.tickers.iter())
            .map(|ticker| async move {
                let result = self.resolve_ticker(ticker, request).await;
                on_progress(&result.0);
                result
            })
            .buffer_unordered(self.settings.concurrency.max(1))
            .collect()
            .await;

        let mut outcomes = Vec::with_capacity(results.len());
        let mut rows = Vec::new();
        for (outcome, ticker_rows) in results {
            outcomes.push(outcome);
            rows.extend(ticker_rows);
        }
        outcomes.sort_by(|a, b| a.ticker.cmp(&b.ticker));

        let table = QuoteTable::from_rows(rows);
        info!(
            rows = table.len(),
            covered = outcomes.iter().filter(|o| o.is_covered()).count(),
            "Resolution finished"
        );
        Resolution { table, outcomes }
    }

    #[instrument(name = "ResolveTicker", skip(self, request), fields(ticker = %ticker))]
    async fn resolve_ticker(
        &self,
        ticker: &str,
        request: &QuoteRequest,
    ) -> (TickerOutcome, Vec<QuoteRow>) {
        let mut attempts = Vec::new();

        for variant in &request.symbol_variants {
            let symbol = variant.apply(ticker);
            debug!("Trying variant {} for {}", variant, ticker);
            for provider in &request.providers {
                match self.attempt(ticker, &symbol, provider, request).await {
                    Ok(rows) => {
                        let provider_id = rows
                            .first()
                            .map_or_else(|| provider.clone(), |r| r.provider.clone());
                        info!(
                            "{} resolved via {} as {} ({} rows)",
                            ticker,
                            provider_id,
                            symbol,
                            rows.len()
                        );
                        let outcome = TickerOutcome {
                            ticker: ticker.to_string(),
                            provider: Some(provider_id),
                            symbol: Some(symbol),
                            rows: rows.len(),
                            attempts,
                        };
                        return (outcome, rows);
                    }
                    Err(err) => {
                        debug!("Attempt {} via {} failed: {}", symbol, provider, err);
                        attempts.push(Attempt {
                            symbol: symbol.clone(),
                            provider: provider.clone(),
                            error: err.to_string(),
                        });
                    }
                }
            }
        }

        warn!(
            attempts = attempts.len(),
            "No provider returned data for {}", ticker
        );
        let outcome = TickerOutcome {
            ticker: ticker.to_string(),
            provider: None,
            symbol: None,
            rows: 0,
            attempts,
        };
        (outcome, Vec::new())
    }

    async fn attempt(
        &self,
        ticker: &str,
        symbol: &str,
        provider: &str,
        request: &QuoteRequest,
    ) -> Result<Vec<QuoteRow>, FetchError> {
        let source = self
            .registry
            .get(provider)
            .ok_or_else(|| FetchError::UnknownProvider(provider.to_string()))?;

        let raw = tokio::time::timeout(
            self.settings.timeout,
            source.fetch(symbol, request.start_date, request.end_date),
        )
        .await
        .map_err(|_| FetchError::Timeout(self.settings.timeout))??;

        normalize(&raw, ticker, symbol, source.id())
    }
}
