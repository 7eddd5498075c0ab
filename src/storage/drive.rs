use serde::Deserialize;
use tracing::{debug, instrument};

use crate::providers::util::USER_AGENT;
use crate::storage::{StorageError, encode_path};

#[derive(Deserialize, Debug)]
struct DriveItem {
    id: String,
}

/// Small-file put/get against a site's default drive.
pub struct ObjectStore {
    graph_base_url: String,
}

impl ObjectStore {
    pub fn new(graph_base_url: &str) -> Self {
        ObjectStore {
            graph_base_url: graph_base_url.trim_end_matches('/').to_string(),
        }
    }

    fn content_url(&self, container_id: &str, path: &str) -> String {
        format!(
            "{}/v1.0/sites/{}/drive/root:/{}:/content",
            self.graph_base_url,
            container_id,
            encode_path(path)
        )
    }

    /// Uploads `bytes` to `path`, returning the drive item id.
    #[instrument(name = "PutObject", skip(self, token, bytes), fields(size = bytes.len()))]
    pub async fn put_object(
        &self,
        token: &str,
        container_id: &str,
        path: &str,
        bytes: Vec<u8>,
    ) -> Result<String, StorageError> {
        let url = self.content_url(container_id, path);
        debug!("Uploading to {}", url);

        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        let response = client
            .put(&url)
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StorageError::Http {
                status: response.status().as_u16(),
                operation: format!("upload of {path}"),
            });
        }

        let item: DriveItem = response.json().await.map_err(|e| StorageError::Decode {
            operation: format!("upload of {path}"),
            message: e.to_string(),
        })?;
        Ok(item.id)
    }

    #[instrument(name = "GetObject", skip(self, token))]
    pub async fn get_object(
        &self,
        token: &str,
        container_id: &str,
        path: &str,
    ) -> Result<Vec<u8>, StorageError> {
        let url = self.content_url(container_id, path);
        debug!("Downloading from {}", url);

        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        let response = client.get(&url).bearer_auth(token).send().await?;

        if !response.status().is_success() {
            return Err(StorageError::Http {
                status: response.status().as_u16(),
                operation: format!("download of {path}"),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}
