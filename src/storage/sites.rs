use serde::Deserialize;
use tracing::{debug, instrument};

use crate::providers::util::USER_AGENT;
use crate::storage::StorageError;

#[derive(Deserialize, Debug)]
struct SiteSearchResponse {
    #[serde(default)]
    value: Vec<Site>,
}

#[derive(Deserialize, Debug)]
struct Site {
    id: Option<String>,
    #[serde(rename = "webUrl", default)]
    web_url: String,
}

/// Looks up the SharePoint site id the drive lives under.
pub struct ContainerResolver {
    graph_base_url: String,
}

impl ContainerResolver {
    pub fn new(graph_base_url: &str) -> Self {
        ContainerResolver {
            graph_base_url: graph_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Searches sites for `search_term`, preferring the first result whose
    /// web URL contains `hostname`, then the first result at all.
    #[instrument(name = "FindContainer", skip(self, token))]
    pub async fn find_container(
        &self,
        token: &str,
        hostname: &str,
        search_term: &str,
    ) -> Result<Option<String>, StorageError> {
        let url = format!(
            "{}/v1.0/sites?search={}",
            self.graph_base_url,
            urlencoding::encode(search_term)
        );
        debug!("Searching sites at {}", url);

        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        let response = client.get(&url).bearer_auth(token).send().await?;

        if !response.status().is_success() {
            return Err(StorageError::Http {
                status: response.status().as_u16(),
                operation: "site search".to_string(),
            });
        }

        let data: SiteSearchResponse = response.json().await.map_err(|e| StorageError::Decode {
            operation: "site search".to_string(),
            message: e.to_string(),
        })?;
        debug!("Site search returned {} results", data.value.len());

        let by_host = data
            .value
            .iter()
            .find(|site| site.web_url.contains(hostname))
            .and_then(|site| site.id.clone());

        Ok(by_host.or_else(|| data.value.first().and_then(|site| site.id.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn create_mock_server(body: &str) -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1.0/sites"))
            .and(query_param("search", "Grupo Finance"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&mock_server)
            .await;
        mock_server
    }

    #[tokio::test]
    async fn test_prefers_hostname_match() {
        let body = r#"{"value": [
            {"id": "other-site", "webUrl": "https://fabrikam.sharepoint.com/sites/GrupoFinance"},
            {"id": "our-site", "webUrl": "https://contoso.sharepoint.com/sites/GrupoFinance"}
        ]}"#;
        let mock_server = create_mock_server(body).await;

        let id = ContainerResolver::new(&mock_server.uri())
            .find_container("tok", "contoso.sharepoint.com", "Grupo Finance")
            .await
            .unwrap();
        assert_eq!(id.as_deref(), Some("our-site"));
    }

    #[tokio::test]
    async fn test_falls_back_to_first_result() {
        let body = r#"{"value": [
            {"id": "first", "webUrl": "https://fabrikam.sharepoint.com/sites/a"},
            {"id": "second", "webUrl": "https://fabrikam.sharepoint.com/sites/b"}
        ]}"#;
        let mock_server = create_mock_server(body).await;

        let id = ContainerResolver::new(&mock_server.uri())
            .find_container("tok", "contoso.sharepoint.com", "Grupo Finance")
            .await
            .unwrap();
        assert_eq!(id.as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn test_no_results_is_none() {
        let mock_server = create_mock_server(r#"{"value": []}"#).await;
        let id = ContainerResolver::new(&mock_server.uri())
            .find_container("tok", "contoso.sharepoint.com", "Grupo Finance")
            .await
            .unwrap();
        assert!(id.is_none());
    }

    #[tokio::test]
    async fn test_forbidden_is_http_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&mock_server)
            .await;

        let result = ContainerResolver::new(&mock_server.uri())
            .find_container("tok", "contoso.sharepoint.com", "Grupo Finance")
            .await;
        assert!(matches!(result, Err(StorageError::Http { status: 403, .. })));
    }
}
