use super::fetch::{self, FetchOptions};
use crate::core::config::{AppConfig, Credentials};
use crate::storage::{self, ContainerResolver, ObjectStore, StorageError, TokenProvider};
use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Default, Clone)]
pub struct PublishOptions {
    pub fetch: FetchOptions,
    /// Download the object again after uploading and compare bytes.
    pub verify: bool,
}

#[derive(Debug, Default, Clone)]
pub struct DownloadOptions {
    /// Path inside the drive.
    pub remote: String,
    pub output: PathBuf,
}

/// Authenticated handle on the site's drive.
pub struct Session {
    pub token: String,
    pub container_id: String,
    pub store: ObjectStore,
}

/// Acquires a token and resolves the site. Either failure is fatal.
pub async fn open_session(config: &AppConfig, credentials: &Credentials) -> Result<Session> {
    let token = TokenProvider::new(&config.storage.auth_base_url)
        .acquire_token(credentials)
        .await
        .context("Failed to obtain access token")?;
    info!("Access token obtained");

    let container_id = ContainerResolver::new(&config.storage.graph_base_url)
        .find_container(&token, &credentials.hostname, &credentials.site_search)
        .await
        .context("Failed to search for site")?
        .ok_or_else(|| StorageError::ContainerNotFound(credentials.site_search.clone()))?;
    info!("Using site {}", container_id);

    Ok(Session {
        token,
        container_id,
        store: ObjectStore::new(&config.storage.graph_base_url),
    })
}

/// Resolves quotes, writes the workbook locally and uploads it.
///
/// Storage access is checked before any quote is fetched so that bad
/// credentials fail fast.
pub async fn run(
    config: &AppConfig,
    credentials: &Credentials,
    options: &PublishOptions,
) -> Result<String> {
    let session = open_session(config, credentials).await?;

    let (path, bytes) = fetch::write_quotes(config, &options.fetch).await?;
    let remote = storage::remote_path(&config.output.remote_folder, &fetch::file_name(&path)?);

    let item_id = session
        .store
        .put_object(&session.token, &session.container_id, &remote, bytes.clone())
        .await
        .with_context(|| format!("Failed to upload {remote}"))?;
    info!("Uploaded {} as item {}", remote, item_id);
    println!("Uploaded {remote} (id {item_id})");

    if options.verify {
        let downloaded = session
            .store
            .get_object(&session.token, &session.container_id, &remote)
            .await
            .with_context(|| format!("Failed to download {remote} for verification"))?;
        if downloaded != bytes {
            anyhow::bail!(
                "Uploaded {} differs from local copy ({} vs {} bytes)",
                remote,
                downloaded.len(),
                bytes.len()
            );
        }
        println!("Verified {remote}");
    }

    Ok(item_id)
}

pub async fn download(
    config: &AppConfig,
    credentials: &Credentials,
    options: &DownloadOptions,
) -> Result<()> {
    let session = open_session(config, credentials).await?;
    let bytes = session
        .store
        .get_object(&session.token, &session.container_id, &options.remote)
        .await
        .with_context(|| format!("Failed to download {}", options.remote))?;

    if let Some(parent) = options.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    std::fs::write(&options.output, &bytes)
        .with_context(|| format!("Failed to write {}", options.output.display()))?;
    println!(
        "Downloaded {} ({} bytes) to {}",
        options.remote,
        bytes.len(),
        options.output.display()
    );
    Ok(())
}
