use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, CommandFactory, Parser, Subcommand};
use quotesync::cli::fetch::FetchOptions;
use quotesync::cli::publish::{DownloadOptions, PublishOptions};
use quotesync::core::config::RequestOverrides;
use quotesync::core::log::init_logging;
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args, Default)]
struct RequestArgs {
    /// Comma separated tickers, replacing the configured list
    #[arg(long, value_delimiter = ',')]
    tickers: Option<Vec<String>>,

    /// First date (YYYY-MM-DD)
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Last date (YYYY-MM-DD), defaults to today
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Comma separated providers in priority order
    #[arg(long, value_delimiter = ',')]
    providers: Option<Vec<String>>,

    /// Local output file; `.csv` writes CSV, anything else xlsx
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl From<RequestArgs> for FetchOptions {
    fn from(args: RequestArgs) -> FetchOptions {
        FetchOptions {
            overrides: RequestOverrides {
                tickers: args.tickers,
                start_date: args.start,
                end_date: args.end,
                providers: args.providers,
            },
            output: args.output,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Fetch quotes and write the workbook locally
    Fetch(RequestArgs),
    /// Fetch quotes, write the workbook and upload it
    Publish {
        #[command(flatten)]
        request: RequestArgs,

        /// Download the uploaded file again and compare it
        #[arg(long)]
        verify: bool,
    },
    /// Download a file from the drive
    Download {
        /// Path inside the drive, e.g. "Reports/cotizaciones.xlsx"
        #[arg(long)]
        remote: String,

        /// Local destination
        #[arg(short, long)]
        output: PathBuf,
    },
}

impl From<Commands> for quotesync::AppCommand {
    fn from(cmd: Commands) -> quotesync::AppCommand {
        match cmd {
            Commands::Fetch(request) => quotesync::AppCommand::Fetch(request.into()),
            Commands::Publish { request, verify } => {
                quotesync::AppCommand::Publish(PublishOptions {
                    fetch: request.into(),
                    verify,
                })
            }
            Commands::Download { remote, output } => {
                quotesync::AppCommand::Download(DownloadOptions { remote, output })
            }
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    // Credentials may live in a local .env file
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!("Loaded environment from {}", path.display());
    }

    let result = match cli.command {
        Some(Commands::Setup) => quotesync::cli::setup::setup(),
        Some(cmd) => quotesync::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
