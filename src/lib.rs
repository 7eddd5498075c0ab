pub mod cli;
pub mod core;
pub mod providers;
pub mod storage;
pub mod workbook;

use crate::cli::fetch::FetchOptions;
use crate::cli::publish::{DownloadOptions, PublishOptions};
use crate::core::config::{AppConfig, Credentials};
use anyhow::Result;
use tracing::{debug, info};

pub enum AppCommand {
    Fetch(FetchOptions),
    Publish(PublishOptions),
    Download(DownloadOptions),
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("quotesync starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    match command {
        AppCommand::Fetch(options) => cli::fetch::run(&config, &options).await,
        AppCommand::Publish(options) => {
            let credentials = Credentials::from_env()?;
            cli::publish::run(&config, &credentials, &options)
                .await
                .map(|_| ())
        }
        AppCommand::Download(options) => {
            let credentials = Credentials::from_env()?;
            cli::publish::download(&config, &credentials, &options).await
        }
    }
}
