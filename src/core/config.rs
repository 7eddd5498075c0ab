use anyhow::{Context, Result};
use chrono::NaiveDate;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};
use tracing::debug;

use crate::core::quote::{QuoteRequest, SymbolVariant};
use crate::core::resolver::{DEFAULT_CONCURRENCY, DEFAULT_TIMEOUT_SECS, ResolverSettings};
use crate::providers::util::HttpSettings;
use crate::providers::{fmp, stooq, yahoo_finance};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct YahooProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StooqProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FmpProviderConfig {
    #[serde(default = "default_fmp_base_url")]
    pub base_url: String,
    pub api_key: Option<String>,
}

fn default_fmp_base_url() -> String {
    fmp::DEFAULT_BASE_URL.to_string()
}

fn default_yahoo() -> Option<YahooProviderConfig> {
    Some(YahooProviderConfig {
        base_url: yahoo_finance::DEFAULT_BASE_URL.to_string(),
    })
}

fn default_stooq() -> Option<StooqProviderConfig> {
    Some(StooqProviderConfig {
        base_url: stooq::DEFAULT_BASE_URL.to_string(),
    })
}

/// Keyless providers fall back to their public endpoint when their section
/// is omitted; an explicit `null` disables them. FMP stays off without a key.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    #[serde(default = "default_yahoo")]
    pub yahoo: Option<YahooProviderConfig>,
    #[serde(default = "default_stooq")]
    pub stooq: Option<StooqProviderConfig>,
    #[serde(default)]
    pub fmp: Option<FmpProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            yahoo: default_yahoo(),
            stooq: default_stooq(),
            fmp: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ResolverConfig {
    pub timeout_secs: u64,
    pub concurrency: usize,
    pub retries: usize,
    pub retry_delay_ms: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        ResolverConfig {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            concurrency: DEFAULT_CONCURRENCY,
            retries: 1,
            retry_delay_ms: 500,
        }
    }
}

impl ResolverConfig {
    pub fn settings(&self) -> ResolverSettings {
        ResolverSettings {
            timeout: Duration::from_secs(self.timeout_secs),
            concurrency: self.concurrency.max(1),
        }
    }

    /// Each HTTP attempt gets an equal share of the per-call budget, so a
    /// timed-out request can still be retried before the resolver gives up.
    pub fn http(&self) -> HttpSettings {
        let attempts = self.retries.saturating_add(1) as u32;
        HttpSettings {
            timeout: Duration::from_secs(self.timeout_secs) / attempts,
            retries: self.retries,
            retry_delay_ms: self.retry_delay_ms,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    /// Local workbook path; `.csv` writes CSV instead of xlsx.
    pub local_path: String,
    /// Folder inside the drive the workbook is uploaded to.
    pub remote_folder: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            local_path: "cotizaciones.xlsx".to_string(),
            remote_folder: "Tableros BI/Planillas de Input/Descargables SyC".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub auth_base_url: String,
    pub graph_base_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            auth_base_url: "https://login.microsoftonline.com".to_string(),
            graph_base_url: "https://graph.microsoft.com".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub tickers: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub providers: Option<Vec<String>>,
    pub symbol_variants: Option<Vec<SymbolVariant>>,
    #[serde(default)]
    pub provider_settings: ProvidersConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Default, Clone)]
pub struct RequestOverrides {
    pub tickers: Option<Vec<String>>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub providers: Option<Vec<String>>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "quotesync", "quotesync")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn to_request(&self, overrides: &RequestOverrides) -> Result<QuoteRequest> {
        let tickers = overrides.tickers.as_ref().unwrap_or(&self.tickers);
        let request = QuoteRequest::new(
            tickers,
            overrides.start_date.unwrap_or(self.start_date),
            overrides.end_date.or(self.end_date),
            overrides.providers.clone().or_else(|| self.providers.clone()),
            self.symbol_variants.clone(),
        )?;
        Ok(request)
    }
}

pub const CREDENTIAL_VARS: [&str; 5] = [
    "AZURE_CLIENT_ID",
    "AZURE_CLIENT_SECRET",
    "AZURE_TENANT_ID",
    "SHAREPOINT_HOSTNAME",
    "SHAREPOINT_SITE_SEARCH",
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variables: {}", .0.join(", "))]
    MissingEnv(Vec<String>),
}

/// Storage credentials and site lookup parameters.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub tenant_id: String,
    pub hostname: String,
    pub site_search: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("tenant_id", &self.tenant_id)
            .field("hostname", &self.hostname)
            .field("site_search", &self.site_search)
            .finish()
    }
}

impl Credentials {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads every variable in [`CREDENTIAL_VARS`]; blank counts as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let values: Vec<Option<String>> = CREDENTIAL_VARS
            .iter()
            .map(|key| lookup(key).filter(|v| !v.trim().is_empty()))
            .collect();

        let missing: Vec<String> = CREDENTIAL_VARS
            .iter()
            .zip(&values)
            .filter(|(_, v)| v.is_none())
            .map(|(k, _)| k.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::MissingEnv(missing));
        }

        let mut values = values.into_iter().flatten();
        let mut next = || values.next().unwrap_or_default();
        Ok(Credentials {
            client_id: next(),
            client_secret: next(),
            tenant_id: next(),
            hostname: next(),
            site_search: next(),
        })
    }
}
