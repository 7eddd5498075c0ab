use anyhow::Error;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

pub const USER_AGENT: &str = "quotesync/1.0";

/// HTTP knobs shared by every quote source.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub timeout: Duration,
    pub retries: usize,
    pub retry_delay_ms: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        HttpSettings {
            timeout: Duration::from_secs(30),
            retries: 1,
            retry_delay_ms: 500,
        }
    }
}

impl HttpSettings {
    /// A fresh client per call; sources share no connection state.
    pub fn client(&self) -> Result<reqwest::Client, reqwest::Error> {
        reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(self.timeout)
            .build()
    }
}

fn is_transient(err: &reqwest::Error) -> bool {
    err.is_connect() || err.is_timeout() || err.is_request()
}

/// Runs `operation` up to `1 + settings.retries` times, sleeping
/// `retry_delay_ms` between runs. Only transport failures are retried;
/// an HTTP response of any status is returned as is.
pub async fn with_retry<F, Fut, T>(settings: &HttpSettings, mut operation: F) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, reqwest::Error>>,
{
    let total = settings.retries + 1;
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(val) => return Ok(val),
            Err(err) if attempt < total && is_transient(&err) => {
                debug!("Attempt {}/{} failed: {}. Retrying...", attempt, total, err);
                attempt += 1;
                tokio::time::sleep(Duration::from_millis(settings.retry_delay_ms)).await;
            }
            Err(err) => {
                return Err(Error::from(err)
                    .context(format!("Request failed after {attempt} attempt(s)")));
            }
        }
    }
}

/// Sends a GET and returns the status and body.
pub async fn get_text(
    settings: &HttpSettings,
    url: &str,
) -> Result<(reqwest::StatusCode, String), Error> {
    let client = settings.client()?;
    let response = with_retry(settings, || client.get(url).send()).await?;
    let status = response.status();
    let body = response.text().await?;
    Ok((status, body))
}
