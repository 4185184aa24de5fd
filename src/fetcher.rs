use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::FetchError;

/// HTML of the source page as fetched for one request.
#[derive(Debug, Clone)]
pub struct RawPage {
    pub url: String,
    pub html: String,
    pub fetched_at: DateTime<Utc>,
}

/// Where the pipeline gets its page from.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch(&self) -> Result<RawPage, FetchError>;
}

/// Fetches one fixed URL over HTTP.
pub struct HttpFetcher {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(client: reqwest::Client, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            url: url.into(),
            timeout,
        }
    }
}

#[async_trait]
impl PageSource for HttpFetcher {
    async fn fetch(&self) -> Result<RawPage, FetchError> {
        fetch(&self.client, &self.url, self.timeout).await
    }
}

/// Single GET with a deadline. Non-2xx answers are errors; no retries.
pub async fn fetch(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> Result<RawPage, FetchError> {
    info!("Fetching source page: {}", url);

    let response = client
        .get(url)
        .timeout(timeout)
        .header(reqwest::header::ACCEPT, "text/html,application/xhtml+xml")
        .send()
        .await
        .map_err(|e| classify(url, timeout, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let html = response
        .text()
        .await
        .map_err(|e| classify(url, timeout, e))?;
    debug!("Fetched {} bytes from {}", html.len(), url);

    Ok(RawPage {
        url: url.to_string(),
        html,
        fetched_at: Utc::now(),
    })
}

fn classify(url: &str, timeout: Duration, e: reqwest::Error) -> FetchError {
    let url = url.to_string();
    if e.is_timeout() {
        FetchError::Timeout {
            url,
            secs: timeout.as_secs(),
        }
    } else if e.is_connect() {
        FetchError::Connect { url, source: e }
    } else {
        FetchError::Transport { url, source: e }
    }
}

// ── Tests ──
