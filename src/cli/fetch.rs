use super::ui;
use crate::core::config::{AppConfig, RequestOverrides};
use crate::core::resolver::{QuoteResolver, Resolution, TickerOutcome};
use crate::providers::ProviderRegistry;
use crate::workbook;
use anyhow::Result;
use comfy_table::Cell;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Default, Clone)]
pub struct FetchOptions {
    pub overrides: RequestOverrides,
    /// Overrides `output.local_path`.
    pub output: Option<PathBuf>,
}

impl FetchOptions {
    pub fn output_path(&self, config: &AppConfig) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| PathBuf::from(&config.output.local_path))
    }
}

/// Resolves the configured universe with a progress bar.
pub async fn resolve_quotes(config: &AppConfig, overrides: &RequestOverrides) -> Result<Resolution> {
    let request = config.to_request(overrides)?;
    let registry =
        ProviderRegistry::from_config(&config.provider_settings, &config.resolver.http());
    debug!("Available providers: {:?}", registry.ids());
    let resolver = QuoteResolver::new(registry, config.resolver.settings());

    let pb = ui::new_progress_bar(request.tickers.len() as u64);
    pb.set_message("Fetching quotes...");
    let resolution = resolver
        .resolve_detailed(&request, &|outcome| {
            pb.set_message(outcome.ticker.clone());
            pb.inc(1);
        })
        .await;
    pb.finish_and_clear();

    Ok(resolution)
}

/// Per-ticker coverage: which provider and symbol satisfied each ticker.
pub fn display_outcomes(outcomes: &[TickerOutcome]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Ticker"),
        ui::header_cell("Provider"),
        ui::header_cell("Symbol"),
        ui::header_cell("Rows"),
        ui::header_cell("Failed attempts"),
    ]);

    for outcome in outcomes {
        table.add_row(vec![
            Cell::new(&outcome.ticker),
            ui::found_cell(outcome.provider.as_deref()),
            ui::found_cell(outcome.symbol.as_deref()),
            ui::count_cell(outcome.rows),
            ui::attempts_cell(outcome.attempts.len()),
        ]);
    }

    let covered = outcomes.iter().filter(|o| o.is_covered()).count();
    let coverage_style = if covered == outcomes.len() {
        ui::StyleType::Complete
    } else {
        ui::StyleType::Partial
    };

    let mut output = format!(
        "{}\n\n",
        ui::style_text("Quote coverage", ui::StyleType::Title)
    );
    output.push_str(&table.to_string());
    output.push_str(&format!(
        "\n\n{} {}",
        ui::style_text("Covered tickers:", ui::StyleType::Label),
        ui::style_text(&format!("{covered}/{}", outcomes.len()), coverage_style)
    ));

    let uncovered: Vec<&str> = outcomes
        .iter()
        .filter(|o| !o.is_covered())
        .map(|o| o.ticker.as_str())
        .collect();
    if !uncovered.is_empty() {
        output.push_str(&format!(
            "\n{}",
            ui::style_text(
                &format!("No data for: {}", uncovered.join(", ")),
                ui::StyleType::Subtle
            )
        ));
    }
    output
}

/// Resolves, prints the coverage table and writes the local file.
pub async fn write_quotes(config: &AppConfig, options: &FetchOptions) -> Result<(PathBuf, Vec<u8>)> {
    let resolution = resolve_quotes(config, &options.overrides).await?;
    println!("{}", display_outcomes(&resolution.outcomes));

    let path = options.output_path(config);
    let bytes = workbook::write_table(&resolution.table, &path)?;
    println!(
        "\nWrote {} rows to {}",
        resolution.table.len(),
        path.display()
    );
    Ok((path, bytes))
}

pub async fn run(config: &AppConfig, options: &FetchOptions) -> Result<()> {
    write_quotes(config, options).await.map(|_| ())
}

pub fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("Output path has no file name: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::resolver::Attempt;

    #[test]
    fn test_display_outcomes_lists_uncovered() {
        let outcomes = vec![
            TickerOutcome {
                ticker: "GGAL".to_string(),
                provider: Some("yahoo".to_string()),
                symbol: Some("GGAL.BA".to_string()),
                rows: 20,
                attempts: vec![Attempt {
                    symbol: "GGAL".to_string(),
                    provider: "yahoo".to_string(),
                    error: "Symbol not found: GGAL".to_string(),
                }],
            },
            TickerOutcome {
                ticker: "XXXX".to_string(),
                provider: None,
                symbol: None,
                rows: 0,
                attempts: vec![],
            },
        ];

        let output = console::strip_ansi_codes(&display_outcomes(&outcomes)).to_string();
        assert!(output.contains("GGAL.BA"));
        assert!(output.contains("1/2"));
        assert!(output.contains("No data for: XXXX"));
    }

    #[test]
    fn test_output_path_prefers_option() {
        let config: AppConfig =
            serde_yaml::from_str("tickers: [A]\nstart_date: 2024-01-01\n").unwrap();
        let options = FetchOptions::default();
        assert_eq!(options.output_path(&config), PathBuf::from("cotizaciones.xlsx"));

        let options = FetchOptions {
            output: Some(PathBuf::from("/tmp/q.csv")),
            ..FetchOptions::default()
        };
        assert_eq!(options.output_path(&config), PathBuf::from("/tmp/q.csv"));
        assert_eq!(file_name(&options.output_path(&config)).unwrap(), "q.csv");
    }
}
