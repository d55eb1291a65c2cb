// src/services/feed.rs

//! Live feed fetcher.

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{AppError, Result};
use crate::models::{FeedConfig, RawPayload};
use crate::utils::http::create_async_client;

/// Source of raw feed payloads.
///
/// Any failure to obtain a payload is an [`AppError::Fetch`].
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(&self) -> Result<RawPayload>;

    /// Where the payload comes from, for log messages.
    fn endpoint(&self) -> &str;
}

/// Fetches the feed over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpFeedFetcher {
    client: Client,
    url: String,
}

impl HttpFeedFetcher {
    /// Create a fetcher with a client built from the feed configuration.
    pub fn new(config: &FeedConfig) -> Result<Self> {
        Ok(Self::with_client(create_async_client(config)?, &config.url))
    }

    /// Create a fetcher reusing an existing client.
    pub fn with_client(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl FeedFetcher for HttpFeedFetcher {
    async fn fetch(&self) -> Result<RawPayload> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| AppError::fetch(&self.url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::fetch(&self.url, format!("HTTP status {status}")));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| AppError::fetch(&self.url, e))?;
        log::debug!("Fetched {} bytes from {}", body.len(), self.url);
        Ok(RawPayload::new(body.to_vec()))
    }

    fn endpoint(&self) -> &str {
        &self.url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_endpoint_is_fetch_failure() {
        let config = FeedConfig {
            // Port 9 (discard) on loopback refuses connections.
            url: "http://127.0.0.1:9/nextbike-live.json".to_string(),
            timeout_secs: 2,
            ..FeedConfig::default()
        };
        let fetcher = HttpFeedFetcher::new(&config).unwrap();
        assert_eq!(fetcher.endpoint(), config.url);

        let err = fetcher.fetch().await.unwrap_err();
        assert!(err.is_fetch_failure(), "{err}");
    }
}
