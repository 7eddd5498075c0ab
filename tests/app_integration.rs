use quotesync::cli::fetch::FetchOptions;
use quotesync::cli::publish::{self, DownloadOptions, PublishOptions};
use quotesync::core::config::{AppConfig, Credentials, RequestOverrides};
use quotesync::{AppCommand, run_command};
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use tracing::info;

mod test_utils {
    use std::sync::{Arc, Mutex};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

    pub const GGAL_CHART: &str = r#"{
        "chart": {
            "result": [{
                "meta": {"currency": "ARS", "symbol": "GGAL.BA"},
                "timestamp": [1704204000, 1704290400, 1704376800],
                "events": {
                    "dividends": {
                        "1704376800": {"amount": 12.5, "date": 1704376800}
                    }
                },
                "indicators": {
                    "quote": [{"close": [100.0, null, 104.0]}],
                    "adjclose": [{"adjclose": [98.0, null, 102.0]}]
                }
            }],
            "error": null
        }
    }"#;

    pub const AAPL_CSV: &str = "Date,Open,High,Low,Close,Volume\n\
                                2024-01-02,185.0,186.0,184.0,185.5,1000\n\
                                2024-01-03,186.0,187.0,185.0,186.5,1100\n";

    /// Yahoo knows only `GGAL.BA`, Stooq knows only `aapl`. Everything else 404s.
    pub async fn create_quote_server() -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/GGAL.BA"))
            .respond_with(ResponseTemplate::new(200).set_body_string(GGAL_CHART))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/q/d/l/"))
            .and(query_param("s", "aapl"))
            .respond_with(ResponseTemplate::new(200).set_body_string(AAPL_CSV))
            .mount(&mock_server)
            .await;

        mock_server
    }

    /// Remembers the last uploaded body and serves it back on download.
    #[derive(Clone, Default)]
    pub struct EchoStore {
        pub body: Arc<Mutex<Option<Vec<u8>>>>,
    }

    impl Respond for EchoStore {
        fn respond(&self, request: &Request) -> ResponseTemplate {
            let mut stored = self.body.lock().unwrap();
            if request.method.as_str() == "PUT" {
                *stored = Some(request.body.clone());
                ResponseTemplate::new(201).set_body_string(r#"{"id": "item-7"}"#)
            } else {
                match stored.as_ref() {
                    Some(body) => ResponseTemplate::new(200).set_body_bytes(body.clone()),
                    None => ResponseTemplate::new(404),
                }
            }
        }
    }

    pub async fn create_storage_server(store: EchoStore, item_path: &str) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/tenant-1/oauth2/v2.0/token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"token_type":"Bearer","access_token":"tok"}"#),
            )
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/v1.0/sites"))
            .and(query_param("search", "Finance"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"value": [{"id": "site-1", "webUrl": "https://contoso.sharepoint.com/sites/Finance"}]}"#,
            ))
            .mount(&mock_server)
            .await;

        Mock::given(wiremock::matchers::any())
            .and(path(item_path))
            .respond_with(store)
            .mount(&mock_server)
            .await;

        mock_server
    }
}

fn write_config(dir: &Path, quotes_url: &str, storage_url: &str, output: &Path) -> AppConfig {
    let config_path = dir.join("config.yaml");
    let content = format!(
        r#"
tickers: [GGAL, AAPL, NOPE]
start_date: 2024-01-01
end_date: 2024-01-31
providers: [yahoo, stooq]
provider_settings:
  yahoo:
    base_url: {quotes_url}
  stooq:
    base_url: {quotes_url}
resolver:
  timeout_secs: 5
  concurrency: 2
  retries: 0
output:
  local_path: {}
  remote_folder: Reports/Quotes
storage:
  auth_base_url: {storage_url}
  graph_base_url: {storage_url}
"#,
        output.display()
    );
    fs::write(&config_path, content).unwrap();
    AppConfig::load_from_path(&config_path).unwrap()
}

fn credentials() -> Credentials {
    Credentials {
        client_id: "client".to_string(),
        client_secret: "secret".to_string(),
        tenant_id: "tenant-1".to_string(),
        hostname: "contoso.sharepoint.com".to_string(),
        site_search: "Finance".to_string(),
    }
}

#[test_log::test(tokio::test)]
async fn test_fetch_command_writes_normalized_csv() {
    let quotes = test_utils::create_quote_server().await;
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("out").join("quotes.csv");
    write_config(temp_dir.path(), &quotes.uri(), "http://unused", &output);

    let config_path = temp_dir.path().join("config.yaml");
    run_command(
        AppCommand::Fetch(FetchOptions::default()),
        config_path.to_str(),
    )
    .await
    .unwrap();

    let content = fs::read_to_string(&output).unwrap();
    info!(%content, "Fetched quotes");
    let lines: Vec<&str> = content.lines().collect();

    assert_eq!(lines[0], "Fecha,Ticker,Close,Dividend,Provider");
    // AAPL sorts before GGAL; NOPE is absent. GGAL keeps its base ticker.
    assert_eq!(lines.len(), 5);
    assert!(lines[1].starts_with("02-01-2024,AAPL,185.5,0"));
    assert!(lines[1].ends_with(",stooq"));
    assert!(lines[2].starts_with("03-01-2024,AAPL,186.5,0"));
    assert!(lines[3].starts_with("02-01-2024,GGAL,98"));
    assert!(lines[3].ends_with(",yahoo"));
    assert!(lines[4].starts_with("04-01-2024,GGAL,102"));
    assert!(lines[4].contains(",12.5,"));
    assert!(!content.contains("NOPE"));
}

#[test_log::test(tokio::test)]
async fn test_fetch_overrides_replace_config_values() {
    let quotes = test_utils::create_quote_server().await;
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("quotes.csv");
    let config = write_config(temp_dir.path(), &quotes.uri(), "http://unused", &output);

    let options = FetchOptions {
        overrides: RequestOverrides {
            tickers: Some(vec!["GGAL".to_string()]),
            providers: Some(vec!["stooq".to_string()]),
            ..RequestOverrides::default()
        },
        output: Some(output.clone()),
    };
    let resolution = quotesync::cli::fetch::resolve_quotes(&config, &options.overrides)
        .await
        .unwrap();

    // Stooq alone does not know GGAL under any variant
    assert!(resolution.table.is_empty());
    assert_eq!(resolution.outcomes.len(), 1);
    assert!(!resolution.outcomes[0].is_covered());
    assert_eq!(resolution.outcomes[0].attempts.len(), 4);
}

#[test_log::test(tokio::test)]
async fn test_publish_uploads_and_verifies() {
    let quotes = test_utils::create_quote_server().await;
    let store = test_utils::EchoStore::default();
    let storage = test_utils::create_storage_server(
        store.clone(),
        "/v1.0/sites/site-1/drive/root:/Reports/Quotes/quotes.csv:/content",
    )
    .await;

    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("quotes.csv");
    let config = write_config(temp_dir.path(), &quotes.uri(), &storage.uri(), &output);

    let options = PublishOptions {
        verify: true,
        ..PublishOptions::default()
    };
    let item_id = publish::run(&config, &credentials(), &options)
        .await
        .unwrap();
    assert_eq!(item_id, "item-7");

    let local = fs::read(&output).unwrap();
    let uploaded: Option<Vec<u8>> = store.body.lock().unwrap().clone();
    assert_eq!(uploaded, Some(local));

    // Round trip through download
    let downloaded = temp_dir.path().join("copy").join("quotes.csv");
    publish::download(
        &config,
        &credentials(),
        &DownloadOptions {
            remote: "Reports/Quotes/quotes.csv".to_string(),
            output: downloaded.clone(),
        },
    )
    .await
    .unwrap();
    assert_eq!(fs::read(&downloaded).unwrap(), fs::read(&output).unwrap());
}

#[test_log::test(tokio::test)]
async fn test_publish_verify_detects_mismatch() {
    let quotes = test_utils::create_quote_server().await;
    let store = test_utils::EchoStore::default();
    let storage = test_utils::create_storage_server(
        store,
        "/v1.0/sites/site-1/drive/root:/Reports/Quotes/quotes.csv:/content",
    )
    .await;
    // Takes precedence over the echo mock for downloads
    wiremock::Mock::given(wiremock::matchers::method("GET"))
        .and(wiremock::matchers::path(
            "/v1.0/sites/site-1/drive/root:/Reports/Quotes/quotes.csv:/content",
        ))
        .respond_with(wiremock::ResponseTemplate::new(200).set_body_string("stale"))
        .with_priority(1)
        .mount(&storage)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("quotes.csv");
    let config = write_config(temp_dir.path(), &quotes.uri(), &storage.uri(), &output);

    let options = PublishOptions {
        verify: true,
        ..PublishOptions::default()
    };
    let err = publish::run(&config, &credentials(), &options)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("differs from local copy"));
}

#[test_log::test(tokio::test)]
async fn test_publish_fails_before_fetch_when_auth_is_rejected() {
    let storage = wiremock::MockServer::start().await;
    wiremock::Mock::given(wiremock::matchers::method("POST"))
        .respond_with(
            wiremock::ResponseTemplate::new(401)
                .set_body_string(r#"{"error":"invalid_client"}"#),
        )
        .mount(&storage)
        .await;
    let quotes = wiremock::MockServer::start().await;

    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("quotes.csv");
    let config = write_config(temp_dir.path(), &quotes.uri(), &storage.uri(), &output);

    let err = publish::run(&config, &credentials(), &PublishOptions::default())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Failed to obtain access token"));
    assert!(!output.exists());
    assert!(quotes.received_requests().await.unwrap().is_empty());
}

#[test_log::test(tokio::test)]
async fn test_missing_config_is_reported() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("nope.yaml");

    let result = run_command(AppCommand::Fetch(FetchOptions::default()), missing.to_str()).await;
    let err = result.unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}
