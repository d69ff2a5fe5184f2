pub mod article;

use std::time::Duration;

use anyhow::Context;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("could not connect to the source site: {0}")]
    Connect(String),
    #[error("request to the source site timed out")]
    Timeout,
    #[error("source site returned HTTP {0}")]
    Status(u16),
    #[error("no article with a post id on the page")]
    NotFound,
    #[error("failed to parse page: {0}")]
    Parse(String),
    #[error("unexpected fetch error: {0}")]
    Other(String),
}

impl ExtractError {
    /// Failure category reported in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connect(_) => "connectivity",
            Self::Timeout => "timeout",
            Self::Status(_) => "http-status",
            Self::NotFound => "not-found",
            Self::Parse(_) | Self::Other(_) => "unexpected",
        }
    }
}

impl From<reqwest::Error> for ExtractError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_connect() {
            Self::Connect(e.to_string())
        } else {
            Self::Other(e.to_string())
        }
    }
}

/// A successful GET of the source page.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub status: u16,
    pub body: String,
}

/// Fetches a page and reduces its post article to normalized text.
/// Every call performs a fresh fetch.
pub struct ContentExtractor {
    client: reqwest::Client,
}

impl ContentExtractor {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client })
    }

    /// GET the page. Any non-2xx status aborts the extraction.
    pub async fn fetch(&self, url: &str) -> Result<FetchResult, ExtractError> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        info!(url, status = status.as_u16(), "source page fetched");

        if !status.is_success() {
            return Err(ExtractError::Status(status.as_u16()));
        }

        let body = resp.text().await?;
        Ok(FetchResult {
            status: status.as_u16(),
            body,
        })
    }

    /// Fetch and convert, keeping the failure reason.
    pub async fn try_extract(&self, url: &str) -> Result<String, ExtractError> {
        let page = self.fetch(url).await?;
        debug!(status = page.status, bytes = page.body.len(), "parsing source page");
        article::article_markdown(&page.body)
    }

    /// Fetch and convert; any failure degrades to empty context.
    pub async fn extract(&self, url: &str) -> String {
        match self.try_extract(url).await {
            Ok(text) => text,
            Err(e) => {
                warn!(url, kind = e.kind(), error = %e, "content extraction failed");
                String::new()
            }
        }
    }
}
