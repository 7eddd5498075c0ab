use crate::core::config::ProvidersConfig;
use crate::core::source::QuoteSource;
use crate::providers::fmp::FmpProvider;
use crate::providers::stooq::StooqProvider;
use crate::providers::util::HttpSettings;
use crate::providers::yahoo_finance::YahooFinanceProvider;
use std::sync::Arc;
use tracing::debug;

/// Maps user-facing provider names onto the id a source registers under.
pub fn canonical_id(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    match lowered.as_str() {
        "yfinance" | "yahoo_finance" | "yahoo" => "yahoo".to_string(),
        "financialmodelingprep" | "fmp" => "fmp".to_string(),
        _ => lowered,
    }
}

/// Quote sources addressable by provider id, in registration order.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    sources: Vec<Arc<dyn QuoteSource>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a source, replacing any previous one with the same id.
    pub fn register(&mut self, source: Arc<dyn QuoteSource>) {
        let id = canonical_id(source.id());
        self.sources.retain(|s| canonical_id(s.id()) != id);
        debug!("Registered quote source {}", id);
        self.sources.push(source);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn QuoteSource>> {
        let id = canonical_id(name);
        self.sources
            .iter()
            .find(|s| canonical_id(s.id()) == id)
            .cloned()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.id()).collect()
    }

    /// Builds the sources enabled in configuration. FMP is only registered
    /// when an API key is present.
    pub fn from_config(config: &ProvidersConfig, http: &HttpSettings) -> Self {
        let mut registry = Self::new();
        if let Some(yahoo) = &config.yahoo {
            registry.register(Arc::new(YahooFinanceProvider::new(
                &yahoo.base_url,
                http.clone(),
            )));
        }
        if let Some(stooq) = &config.stooq {
            registry.register(Arc::new(StooqProvider::new(&stooq.base_url, http.clone())));
        }
        if let Some(fmp) = &config.fmp {
            match fmp.api_key.as_deref().filter(|k| !k.is_empty()) {
                Some(key) => {
                    registry.register(Arc::new(FmpProvider::new(&fmp.base_url, key, http.clone())))
                }
                None => debug!("Skipping fmp provider: no api_key configured"),
            }
        }
        registry
    }
}
