//! Thin clients for the Microsoft Graph drive the workbook is published to.

pub mod auth;
pub mod drive;
pub mod sites;

pub use auth::TokenProvider;
pub use drive::ObjectStore;
pub use sites::ContainerResolver;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Authentication failed ({status}): {message}")]
    Auth { status: u16, message: String },

    #[error("HTTP error: {status} for {operation}")]
    Http { status: u16, operation: String },

    #[error("Request error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected response for {operation}: {message}")]
    Decode { operation: String, message: String },

    #[error("No site found for search '{0}'")]
    ContainerNotFound(String),
}

/// Percent-encodes each path segment, keeping `/` separators.
pub fn encode_path(path: &str) -> String {
    path.trim_matches('/')
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Joins the remote folder and a file name into a drive path.
pub fn remote_path(folder: &str, file_name: &str) -> String {
    let folder = folder.trim_matches('/');
    if folder.is_empty() {
        file_name.to_string()
    } else {
        format!("{folder}/{file_name}")
    }
}
