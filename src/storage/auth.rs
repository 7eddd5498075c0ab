use serde::Deserialize;
use tracing::{debug, instrument};

use crate::core::config::Credentials;
use crate::providers::util::USER_AGENT;
use crate::storage::StorageError;

pub const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";

#[derive(Deserialize, Debug)]
struct TokenResponse {
    access_token: Option<String>,
    error_description: Option<String>,
}

/// OAuth client-credentials token endpoint.
pub struct TokenProvider {
    auth_base_url: String,
}

impl TokenProvider {
    pub fn new(auth_base_url: &str) -> Self {
        TokenProvider {
            auth_base_url: auth_base_url.trim_end_matches('/').to_string(),
        }
    }

    #[instrument(name = "AcquireToken", skip(self, credentials), fields(tenant = %credentials.tenant_id))]
    pub async fn acquire_token(&self, credentials: &Credentials) -> Result<String, StorageError> {
        let url = format!(
            "{}/{}/oauth2/v2.0/token",
            self.auth_base_url, credentials.tenant_id
        );
        debug!("Requesting access token from {}", url);

        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        let response = client
            .post(&url)
            .form(&[
                ("client_id", credentials.client_id.as_str()),
                ("scope", GRAPH_SCOPE),
                ("client_secret", credentials.client_secret.as_str()),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let parsed: Option<TokenResponse> = serde_json::from_str(&body).ok();

        if !status.is_success() {
            let message = parsed
                .and_then(|p| p.error_description)
                .unwrap_or(body);
            return Err(StorageError::Auth {
                status: status.as_u16(),
                message,
            });
        }

        parsed
            .and_then(|p| p.access_token)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| StorageError::Auth {
                status: status.as_u16(),
                message: "response has no access_token".to_string(),
            })
    }
}
